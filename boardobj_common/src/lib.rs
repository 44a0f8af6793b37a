//! BOARDOBJ Common Library
//!
//! Shared building blocks for every crate of the BOARDOBJ workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - Capacity limits, wire sizes and defaults
//! - [`ids`] - Class and object type identifiers
//! - [`tier`] - Group capacity tiers
//! - [`mask`] - Capacity-bounded membership bitset
//! - [`wire`] - Group header / entry codec for the shared surface
//! - [`error`] - Error taxonomy and status codes
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! Add to your `Cargo.toml` with alias for shorter imports:
//! ```toml
//! [dependencies]
//! boardobj = { package = "boardobj_common", path = "../boardobj_common" }
//! ```
//!
//! Then import:
//! ```rust
//! use boardobj_common::mask::BoardObjMask;
//! use boardobj_common::tier::GroupTier;
//! ```

pub mod config;
pub mod consts;
pub mod error;
pub mod ids;
pub mod mask;
pub mod prelude;
pub mod tier;
pub mod wire;
