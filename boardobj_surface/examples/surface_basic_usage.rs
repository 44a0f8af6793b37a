//! Host and runtime sharing one file-backed surface.
//!
//! Run with `RUST_LOG=debug` to see the mapping events.

use boardobj_surface::{MappedSurface, Surface, SurfaceResult};
use tempfile::TempDir;

fn main() -> SurfaceResult<()> {
    boardobj_surface::init_tracing();

    let dir = TempDir::new()?;
    let path = dir.path().join("surface.bin");

    let mut host = MappedSurface::create(&path, 4096)?;
    let runtime = MappedSurface::open(&path)?;
    println!("Surface {} mapped twice ({} bytes)", path.display(), host.len());

    // Host stages a command word, the runtime copies it out.
    host.write(0x40, &0x0102_0304u32.to_le_bytes())?;
    host.flush()?;

    let mut word = [0u8; 4];
    runtime.read(0x40, &mut word)?;
    println!("Runtime read {:#010x} at 0x40", u32::from_le_bytes(word));
    Ok(())
}
