//! # BOARDOBJ Shared Surface
//!
//! The byte region shared between the host driver and the runtime. The
//! host writes group headers and entries into it, the runtime copies them
//! into local scratch, and status replies are copied back.
//!
//! Every access is a bounded, explicit copy: nothing hands out references
//! into the surface, so the runtime never works on bytes the host may still
//! be rewriting.
//!
//! # Module Structure
//!
//! - [`surface`] - The [`Surface`] trait
//! - [`mem`] - Heap-backed surface for tests and in-process hosts
//! - [`mapped`] - File-backed surface through `memmap2`
//! - [`error`] - [`SurfaceError`]
//!
//! ```rust
//! use boardobj_surface::{MemSurface, Surface};
//!
//! # fn main() -> Result<(), boardobj_surface::SurfaceError> {
//! let mut surface = MemSurface::new(64);
//! surface.write(8, &[1, 2, 3])?;
//!
//! let mut out = [0u8; 3];
//! surface.read(8, &mut out)?;
//! assert_eq!(out, [1, 2, 3]);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod mapped;
pub mod mem;
pub mod surface;

pub use error::{SurfaceError, SurfaceResult};
pub use mapped::MappedSurface;
pub use mem::MemSurface;
pub use surface::Surface;

/// Initialize a default tracing subscriber for tools and tests.
///
/// Honors `RUST_LOG`. Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_line_number(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
