//! Conversions of untyped values.
//!
//! Exposed to the registry as the `Def` native class: one named static
//! function per target type and direction (`DefTointImplicit`,
//! `DefToIntegerExplicit`, ...), so every cast site out of `def` calls a
//! precise function instead of carrying inline conversion logic.

use crate::runner::def::operators::{as_double, as_float, as_int, as_long, OperandKind};
use crate::runner::ds::error::ScriptError;
use crate::runner::ds::native::{Invoker, NativeClass, NativeMember};
use crate::runner::ds::value::Value;

/// Numeric rank for implicit widening; `char` sits beside `short` but
/// neither widens into the other.
fn widens_to(from: &Value, to: OperandKind) -> bool {
    use OperandKind::*;
    match from {
        Value::Byte(_) => matches!(to, Byte | Short | Int | Long | Float | Double),
        Value::Short(_) => matches!(to, Short | Int | Long | Float | Double),
        Value::Char(_) => matches!(to, Char | Int | Long | Float | Double),
        Value::Int(_) => matches!(to, Int | Long | Float | Double),
        Value::Long(_) => matches!(to, Long | Float | Double),
        Value::Float(_) => matches!(to, Float | Double),
        Value::Double(_) => matches!(to, Double),
        _ => false,
    }
}

/// Java primitive cast semantics. Decimal to sub-int narrowing goes
/// through `int` first.
pub fn convert_numeric(value: &Value, to: OperandKind) -> Result<Value, ScriptError> {
    let fail = || ScriptError::class_cast(&value.class_name(), to.name());
    let is_decimal = matches!(value, Value::Float(_) | Value::Double(_));
    let as_wide = |v: &Value| -> Option<i64> {
        if is_decimal {
            as_double(v).map(|d| d as i32 as i64)
        } else {
            as_long(v)
        }
    };
    Ok(match to {
        OperandKind::Byte => Value::Byte(as_wide(value).ok_or_else(fail)? as i8),
        OperandKind::Short => Value::Short(as_wide(value).ok_or_else(fail)? as i16),
        OperandKind::Char => Value::Char(as_wide(value).ok_or_else(fail)? as u16),
        OperandKind::Int => match value {
            Value::Float(f) => Value::Int(*f as i32),
            Value::Double(d) => Value::Int(*d as i32),
            other => Value::Int(as_long(other).ok_or_else(fail)? as i32),
        },
        OperandKind::Long => match value {
            Value::Float(f) => Value::Long(*f as i64),
            Value::Double(d) => Value::Long(*d as i64),
            other => Value::Long(as_long(other).ok_or_else(fail)?),
        },
        OperandKind::Float => match value {
            Value::Double(d) => Value::Float(*d as f32),
            other => Value::Float(as_float(other).ok_or_else(fail)?),
        },
        OperandKind::Double => Value::Double(as_double(value).ok_or_else(fail)?),
        OperandKind::Bool => match value {
            Value::Bool(b) => Value::Bool(*b),
            _ => return Err(fail()),
        },
        _ => value.clone(),
    })
}

fn null_unbox(target: &str) -> ScriptError {
    ScriptError::NullPointer(format!("cannot unbox a null value to [{}]", target))
}

/// Conversion allowed without a cast: same kind or numeric widening.
pub fn implicit(value: &Value, to: OperandKind, boxed: bool, target: &str) -> Result<Value, ScriptError> {
    match value {
        Value::Null if boxed => Ok(Value::Null),
        Value::Null => Err(null_unbox(target)),
        Value::Bool(_) if to == OperandKind::Bool => Ok(value.clone()),
        v if to.is_numeric() && widens_to(v, to) => convert_numeric(v, to),
        v => Err(ScriptError::class_cast(&v.class_name(), target)),
    }
}

/// Conversion requested by an explicit cast: any numeric (or char)
/// source narrows or widens into any numeric target.
pub fn explicit(value: &Value, to: OperandKind, boxed: bool, target: &str) -> Result<Value, ScriptError> {
    match value {
        Value::Null if boxed => Ok(Value::Null),
        Value::Null => Err(null_unbox(target)),
        Value::Bool(_) if to == OperandKind::Bool => Ok(value.clone()),
        v if to.is_numeric() && v.is_numeric() => convert_numeric(v, to),
        v => Err(ScriptError::class_cast(&v.class_name(), target)),
    }
}

fn first(args: &[Value]) -> &Value {
    args.first().unwrap_or(&Value::Null)
}

/// Unboxes a value for a native expecting an `int`.
pub fn int_arg(args: &[Value], index: usize) -> Result<i32, ScriptError> {
    match args.get(index) {
        Some(v) => match implicit(v, OperandKind::Int, false, "int")? {
            Value::Int(i) => Ok(i),
            other => Err(ScriptError::class_cast(&other.class_name(), "int")),
        },
        None => Err(ScriptError::illegal(format!("missing argument {}", index))),
    }
}

pub fn long_arg(args: &[Value], index: usize) -> Result<i64, ScriptError> {
    match args.get(index) {
        Some(v) => as_long(&implicit(v, OperandKind::Long, false, "long")?)
            .ok_or_else(|| ScriptError::class_cast(&v.class_name(), "long")),
        None => Err(ScriptError::illegal(format!("missing argument {}", index))),
    }
}

pub fn double_arg(args: &[Value], index: usize) -> Result<f64, ScriptError> {
    match args.get(index) {
        Some(v) => as_double(&implicit(v, OperandKind::Double, false, "double")?)
            .ok_or_else(|| ScriptError::class_cast(&v.class_name(), "double")),
        None => Err(ScriptError::illegal(format!("missing argument {}", index))),
    }
}

pub fn bool_value(value: &Value) -> Result<bool, ScriptError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Null => Err(null_unbox("boolean")),
        other => Err(ScriptError::class_cast(&other.class_name(), "boolean")),
    }
}

pub fn char_value(value: &Value) -> Result<u16, ScriptError> {
    match value {
        Value::Char(c) => Ok(*c),
        Value::Null => Err(null_unbox("char")),
        other => Err(ScriptError::class_cast(&other.class_name(), "char")),
    }
}

pub fn int_value(value: &Value) -> Result<i32, ScriptError> {
    as_int(value).ok_or_else(|| ScriptError::class_cast(&value.class_name(), "int"))
}

macro_rules! def_conversions {
    ($( $implicit_fn:ident, $explicit_fn:ident, $implicit_name:literal, $explicit_name:literal,
        $target:literal, $kind:expr, $boxed:expr; )*) => {
        $(
            fn $implicit_fn(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> Result<Value, ScriptError> {
                implicit(first(args), $kind, $boxed, $target)
            }

            fn $explicit_fn(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> Result<Value, ScriptError> {
                explicit(first(args), $kind, $boxed, $target)
            }
        )*

        static DEF_MEMBERS: &[NativeMember] = &[
            $(
                NativeMember::static_method($implicit_name, &["Object"], $target, $implicit_fn),
                NativeMember::static_method($explicit_name, &["Object"], $target, $explicit_fn),
            )*
        ];

        /// `(target type, implicit function, explicit function)` for every
        /// conversion out of `def`.
        pub const DEF_CONVERSIONS: &[(&str, &str, &str)] = &[
            $( ($target, $implicit_name, $explicit_name), )*
        ];
    };
}

def_conversions! {
    def_to_boolean_implicit, def_to_boolean_explicit, "DefTobooleanImplicit", "DefTobooleanExplicit", "boolean", OperandKind::Bool, false;
    def_to_byte_implicit, def_to_byte_explicit, "DefTobyteImplicit", "DefTobyteExplicit", "byte", OperandKind::Byte, false;
    def_to_short_implicit, def_to_short_explicit, "DefToshortImplicit", "DefToshortExplicit", "short", OperandKind::Short, false;
    def_to_char_implicit, def_to_char_explicit, "DefTocharImplicit", "DefTocharExplicit", "char", OperandKind::Char, false;
    def_to_int_implicit, def_to_int_explicit, "DefTointImplicit", "DefTointExplicit", "int", OperandKind::Int, false;
    def_to_long_implicit, def_to_long_explicit, "DefTolongImplicit", "DefTolongExplicit", "long", OperandKind::Long, false;
    def_to_float_implicit, def_to_float_explicit, "DefTofloatImplicit", "DefTofloatExplicit", "float", OperandKind::Float, false;
    def_to_double_implicit, def_to_double_explicit, "DefTodoubleImplicit", "DefTodoubleExplicit", "double", OperandKind::Double, false;
    def_to_boolean_obj_implicit, def_to_boolean_obj_explicit, "DefToBooleanImplicit", "DefToBooleanExplicit", "Boolean", OperandKind::Bool, true;
    def_to_byte_obj_implicit, def_to_byte_obj_explicit, "DefToByteImplicit", "DefToByteExplicit", "Byte", OperandKind::Byte, true;
    def_to_short_obj_implicit, def_to_short_obj_explicit, "DefToShortImplicit", "DefToShortExplicit", "Short", OperandKind::Short, true;
    def_to_char_obj_implicit, def_to_char_obj_explicit, "DefToCharacterImplicit", "DefToCharacterExplicit", "Character", OperandKind::Char, true;
    def_to_int_obj_implicit, def_to_int_obj_explicit, "DefToIntegerImplicit", "DefToIntegerExplicit", "Integer", OperandKind::Int, true;
    def_to_long_obj_implicit, def_to_long_obj_explicit, "DefToLongImplicit", "DefToLongExplicit", "Long", OperandKind::Long, true;
    def_to_float_obj_implicit, def_to_float_obj_explicit, "DefToFloatImplicit", "DefToFloatExplicit", "Float", OperandKind::Float, true;
    def_to_double_obj_implicit, def_to_double_obj_explicit, "DefToDoubleImplicit", "DefToDoubleExplicit", "Double", OperandKind::Double, true;
}

pub static DEF_CLASS: NativeClass = NativeClass {
    name: "Def",
    superclass: Some("Object"),
    interfaces: &[],
    is_interface: false,
    members: DEF_MEMBERS,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implicit_only_widens() {
        assert_eq!(implicit(&Value::Byte(3), OperandKind::Int, false, "int").unwrap(), Value::Int(3));
        assert_eq!(implicit(&Value::Char(97), OperandKind::Long, false, "long").unwrap(), Value::Long(97));
        assert!(implicit(&Value::Long(3), OperandKind::Int, false, "int").is_err());
        assert!(implicit(&Value::Char(1), OperandKind::Short, false, "short").is_err());
        assert!(matches!(
            implicit(&Value::Null, OperandKind::Int, false, "int"),
            Err(ScriptError::NullPointer(_))
        ));
        assert_eq!(implicit(&Value::Null, OperandKind::Int, true, "Integer").unwrap(), Value::Null);
    }

    #[test]
    fn explicit_narrows_like_java() {
        assert_eq!(explicit(&Value::Double(300.7), OperandKind::Byte, false, "byte").unwrap(), Value::Byte(44));
        assert_eq!(explicit(&Value::Double(f64::NAN), OperandKind::Int, false, "int").unwrap(), Value::Int(0));
        assert_eq!(explicit(&Value::Long(1 << 40), OperandKind::Int, false, "int").unwrap(), Value::Int(0));
        assert_eq!(explicit(&Value::Int(65), OperandKind::Char, false, "char").unwrap(), Value::Char(65));
        assert!(explicit(&Value::string("1"), OperandKind::Int, false, "int").is_err());
    }
}
