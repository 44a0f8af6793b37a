//! # BOARDOBJ Runtime
//!
//! Object/group/serialization framework for board management objects
//! living on a memory-constrained controller. The host driver describes
//! groups of objects as byte blobs on a shared surface; the runtime turns
//! them into live objects (Set) and reports their state back (GetStatus).
//!
//! ## Object Model
//!
//! 1. **BoardObjBase** - Identity every object starts with
//! 2. **Levels** - `#[repr(C)]` structs chained through a leading `super_`
//! 3. **Interfaces** - Capability blocks embedded at a fixed offset
//! 4. **Virtual tables** - Per concrete type: checked casts and capability lookup
//!
//! ## Ownership
//!
//! [`runtime::Runtime`] owns every group, the registries and the scratch
//! buffer. Commands run one at a time to completion; nothing here is
//! shared between threads.
//!
//! # Module Structure
//!
//! - [`obj`] - Base object, `BoardObject` trait, casts
//! - [`iface`] - Embedded interfaces and their static tables
//! - [`vtable`] - Virtual tables and registry
//! - [`grp`] - Fixed-capacity sparse groups
//! - [`alloc`] - Object memory budget
//! - [`protocol`] - Set / GetStatus engines
//! - [`source`] - Non-RPC construction sources
//! - [`iter`] - Checked-cast traversal
//! - [`dispatch`] - `(class, command)` dispatch table
//! - [`runtime`] - Service locator and command entry point
//! - [`classes`] - Demonstration classes
//! - [`host`] - Host-side command staging
//! - [`config`] - Runtime configuration

pub mod alloc;
pub mod classes;
pub mod config;
pub mod dispatch;
pub mod grp;
pub mod host;
pub mod iface;
pub mod iter;
pub mod obj;
pub mod protocol;
pub mod runtime;
pub mod source;
pub mod vtable;
