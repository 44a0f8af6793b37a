//! Demonstration object classes.
//!
//! Neither class carries control logic. They drive the framework with a
//! real hierarchy, an embedded interface and class header fields.
//!
//! # Module Structure
//!
//! - [`clk_domain`] - Clock domains: five-level hierarchy with a PROG interface
//! - [`therm_channel`] - Thermal channels: flat class with a header query

pub mod clk_domain;
pub mod therm_channel;

use std::any::Any;

use boardobj::error::{BoardObjError, BoardObjResult};

use crate::dispatch::TransferMode;
use crate::obj::BoardObject;
use crate::runtime::Runtime;

pub use clk_domain::ClkDomainClass;
pub use therm_channel::ThermChannelClass;

/// Register both classes and their default Set/GetStatus rows.
pub fn register_all(rt: &mut Runtime, mode: TransferMode) -> BoardObjResult<()> {
    rt.register_class(Box::new(ClkDomainClass::default()))?;
    rt.register_default_cmds(clk_domain::CLASS_ID, clk_domain::LOCATION, mode);

    rt.register_class(Box::new(ThermChannelClass::default()))?;
    rt.register_default_cmds(therm_channel::CLASS_ID, therm_channel::LOCATION, mode);
    Ok(())
}

// ─── Concrete access ────────────────────────────────────────────────

/// Concrete view of an object the class allocated itself.
pub(crate) fn concrete<T: Any>(obj: &dyn BoardObject) -> BoardObjResult<&T> {
    let (class, obj_type) = (obj.class_id(), obj.obj_type());
    obj.as_any()
        .downcast_ref::<T>()
        .ok_or(BoardObjError::UnknownType { class, obj_type })
}

/// Mutable form of [`concrete`].
pub(crate) fn concrete_mut<T: Any>(obj: &mut dyn BoardObject) -> BoardObjResult<&mut T> {
    let (class, obj_type) = (obj.class_id(), obj.obj_type());
    obj.as_any_mut()
        .downcast_mut::<T>()
        .ok_or(BoardObjError::UnknownType { class, obj_type })
}
