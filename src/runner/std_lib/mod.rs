//! The default whitelist.
//!
//! Each module declares the native classes it backs (static member tables
//! of plain functions) and a `register` function that whitelists them in
//! a [`DefinitionBuilder`]. `core` fixes the registration order.

pub mod collections;
pub mod core;
pub mod functions;
pub mod lang;
pub mod utility;

use std::rc::Rc;
use std::sync::Arc;

use crate::runner::definition::{Definition, DefinitionBuilder};
use crate::runner::ds::error::{DefinitionError, ScriptError};
use crate::runner::ds::native::NativeCatalog;
use crate::runner::ds::value::{ListRef, MapRef, SetRef, Value};

lazy_static! {
    /// Every native class scripts may be whitelisted against.
    pub static ref NATIVES: NativeCatalog = self::core::native_catalog();
    static ref DEFAULT_DEFINITION: Result<Arc<Definition>, DefinitionError> = {
        let mut builder = DefinitionBuilder::new(&NATIVES);
        self::core::register_core_whitelist(&mut builder)
            .and_then(|_| builder.build())
            .map(Arc::new)
    };
}

/// The shared default registry, built on first use.
pub fn default_definition() -> Result<Arc<Definition>, DefinitionError> {
    DEFAULT_DEFINITION.clone()
}

pub(crate) fn arg(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&Value::Null)
}

fn wrong_receiver(value: &Value, expected: &str) -> ScriptError {
    match value {
        Value::Null => ScriptError::NullPointer(format!("expected [{}] but found null", expected)),
        other => ScriptError::class_cast(&other.class_name(), expected),
    }
}

pub(crate) fn string_of(value: &Value) -> Result<Rc<str>, ScriptError> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        other => Err(wrong_receiver(other, "String")),
    }
}

pub(crate) fn list_of(value: &Value) -> Result<ListRef, ScriptError> {
    match value {
        Value::List(l) => Ok(l.clone()),
        other => Err(wrong_receiver(other, "List")),
    }
}

pub(crate) fn map_of(value: &Value) -> Result<MapRef, ScriptError> {
    match value {
        Value::Map(m) => Ok(m.clone()),
        other => Err(wrong_receiver(other, "Map")),
    }
}

pub(crate) fn set_of(value: &Value) -> Result<SetRef, ScriptError> {
    match value {
        Value::Set(s) => Ok(s.clone()),
        other => Err(wrong_receiver(other, "Set")),
    }
}
