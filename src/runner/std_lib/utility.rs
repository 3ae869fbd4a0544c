//! Conversions that need a method: `char` to and from `String`, and
//! everything out of `def`.

use crate::runner::def::conversion::{char_value, DEF_CLASS, DEF_CONVERSIONS};
use crate::runner::definition::DefinitionBuilder;
use crate::runner::ds::error::{DefinitionError, ScriptError};
use crate::runner::ds::native::{Invoker, NativeCatalog, NativeClass, NativeMember};
use crate::runner::ds::value::Value;
use crate::runner::std_lib::{arg, string_of};

fn char_to_string(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> Result<Value, ScriptError> {
    let c = char_value(arg(args, 0))?;
    Ok(Value::string(&String::from_utf16_lossy(&[c])))
}

/// Only single character strings convert.
fn string_to_char(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> Result<Value, ScriptError> {
    let s = string_of(arg(args, 0))?;
    let mut units = s.encode_utf16();
    match (units.next(), units.next()) {
        (Some(c), None) => Ok(Value::Char(c)),
        _ => Err(ScriptError::class_cast(&format!("String [{}]", s), "char")),
    }
}

pub static UTILITY: NativeClass = NativeClass {
    name: "Utility",
    superclass: Some("Object"),
    interfaces: &[],
    is_interface: false,
    members: &[
        NativeMember::static_method("charToString", &["char"], "String", char_to_string),
        NativeMember::static_method("StringTochar", &["String"], "char", string_to_char),
    ],
};

pub fn add_natives(catalog: &mut NativeCatalog) {
    catalog.add(&UTILITY);
    catalog.add(&DEF_CLASS);
}

pub fn declare(builder: &mut DefinitionBuilder) -> Result<(), DefinitionError> {
    builder.register("Utility", "Utility")?.register("Def", "Def")?;
    Ok(())
}

pub fn register(builder: &mut DefinitionBuilder) -> Result<(), DefinitionError> {
    builder
        .register_method("Utility", "charToString", true, "String", &["char"])?
        .register_method("Utility", "StringTochar", true, "char", &["String"])?;
    for (target, implicit, explicit) in DEF_CONVERSIONS {
        builder
            .register_method("Def", implicit, true, target, &["def"])?
            .register_method("Def", explicit, true, target, &["def"])?;
    }
    Ok(())
}

pub fn inherit(builder: &mut DefinitionBuilder) -> Result<(), DefinitionError> {
    builder.inherit("Utility", &["Object"])?.inherit("Def", &["Object"])?;
    Ok(())
}

pub fn add_casts(builder: &mut DefinitionBuilder) -> Result<(), DefinitionError> {
    builder
        .add_transform("char", "String", "Utility", "charToString", true, true, None, None)?
        .add_transform("String", "char", "Utility", "StringTochar", true, true, None, None)?;
    for (target, implicit, explicit) in DEF_CONVERSIONS {
        builder
            .add_transform("def", target, "Def", implicit, true, false, None, None)?
            .add_transform("def", target, "Def", explicit, true, true, None, None)?;
    }
    Ok(())
}
