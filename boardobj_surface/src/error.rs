//! Error types for surface transfers

use thiserror::Error;

/// Errors that can occur while copying to or from a surface
#[derive(Error, Debug)]
pub enum SurfaceError {
    /// Transfer reaches past the end of the surface
    #[error("Transfer out of bounds: {offset:#x}+{len} exceeds surface size {size}")]
    OutOfBounds {
        /// Start offset
        offset: usize,
        /// Transfer length
        len: usize,
        /// Surface size
        size: usize,
    },

    /// Surface size is zero or otherwise unusable
    #[error("Invalid surface size: {size} bytes")]
    InvalidSize {
        /// Requested size
        size: usize,
    },

    /// IO error
    #[error("IO error: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },
}

/// Result type for surface operations
pub type SurfaceResult<T> = Result<T, SurfaceError>;
