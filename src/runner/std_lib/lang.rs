//! `Object`, the primitives and their boxes, `String` and `Math`.

use std::cmp::Ordering;

use crate::runner::def::conversion::{char_value, convert_numeric, double_arg, int_arg, long_arg};
use crate::runner::def::operators::{as_double, as_long, OperandKind};
use crate::runner::definition::DefinitionBuilder;
use crate::runner::ds::error::{DefinitionError, ScriptError};
use crate::runner::ds::native::{Invoker, NativeCatalog, NativeClass, NativeMember};
use crate::runner::ds::value::Value;
use crate::runner::std_lib::{arg, list_of, set_of, string_of};

type NativeResult = Result<Value, ScriptError>;

const fn primitive(name: &'static str) -> NativeClass {
    NativeClass {
        name,
        superclass: None,
        interfaces: &[],
        is_interface: false,
        members: &[],
    }
}

static PRIMITIVE_CLASSES: [NativeClass; 9] = [
    primitive("void"),
    primitive("boolean"),
    primitive("byte"),
    primitive("short"),
    primitive("char"),
    primitive("int"),
    primitive("long"),
    primitive("float"),
    primitive("double"),
];

/// `(primitive, box, unboxing method)`.
pub const BOXES: [(&str, &str, &str); 8] = [
    ("boolean", "Boolean", "booleanValue"),
    ("byte", "Byte", "byteValue"),
    ("short", "Short", "shortValue"),
    ("char", "Character", "charValue"),
    ("int", "Integer", "intValue"),
    ("long", "Long", "longValue"),
    ("float", "Float", "floatValue"),
    ("double", "Double", "doubleValue"),
];

const NUMERIC: [&str; 7] = ["byte", "short", "char", "int", "long", "float", "double"];

/// Primitive conversions allowed without a cast.
pub fn widens(from: &str, to: &str) -> bool {
    let targets: &[&str] = match from {
        "byte" => &["short", "int", "long", "float", "double"],
        "short" | "char" => &["int", "long", "float", "double"],
        "int" => &["long", "float", "double"],
        "long" => &["float", "double"],
        "float" => &["double"],
        _ => &[],
    };
    targets.contains(&to)
}

// ── Object ──

fn object_equals(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Bool(this == arg(args, 0)))
}

fn object_hash_code(_: &mut dyn Invoker, this: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::Int(this.hash_code()))
}

fn object_to_string(_: &mut dyn Invoker, this: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::string(&this.to_string()))
}

pub static OBJECT: NativeClass = NativeClass {
    name: "Object",
    superclass: None,
    interfaces: &[],
    is_interface: false,
    members: &[
        NativeMember::method("equals", &["Object"], "boolean", object_equals),
        NativeMember::method("hashCode", &[], "int", object_hash_code),
        NativeMember::method("toString", &[], "String", object_to_string),
    ],
};

// ── Comparable / Number ──

fn java_string_compare(left: &str, right: &str) -> i32 {
    let mut l = left.encode_utf16();
    let mut r = right.encode_utf16();
    loop {
        match (l.next(), r.next()) {
            (Some(a), Some(b)) if a != b => return a as i32 - b as i32,
            (Some(_), Some(_)) => {}
            (Some(_), None) => return 1 + l.count() as i32,
            (None, Some(_)) => return -1 - r.count() as i32,
            (None, None) => return 0,
        }
    }
}

fn sign(ordering: Ordering) -> i32 {
    match ordering {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

/// `compareTo` for the comparable values: numbers, chars, booleans and
/// strings.
pub fn natural_compare(left: &Value, right: &Value) -> Result<i32, ScriptError> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => {
            Err(ScriptError::NullPointer("cannot compare a null value".to_string()))
        }
        (Value::Str(l), Value::Str(r)) => Ok(java_string_compare(l, r)),
        (Value::Bool(l), Value::Bool(r)) => Ok(sign(l.cmp(r))),
        (Value::Float(_), _) | (Value::Double(_), _) | (_, Value::Float(_)) | (_, Value::Double(_))
            if left.is_numeric() && right.is_numeric() =>
        {
            let l = as_double(left).unwrap_or(f64::NAN);
            let r = as_double(right).unwrap_or(f64::NAN);
            Ok(sign(l.total_cmp(&r)))
        }
        (l, r) => match (as_long(l), as_long(r)) {
            (Some(a), Some(b)) => Ok(sign(a.cmp(&b))),
            _ => Err(ScriptError::class_cast(&r.class_name(), &l.class_name())),
        },
    }
}

fn compare_to(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    natural_compare(this, arg(args, 0)).map(Value::Int)
}

pub static COMPARABLE: NativeClass = NativeClass {
    name: "Comparable",
    superclass: None,
    interfaces: &[],
    is_interface: true,
    members: &[NativeMember::abstract_method("compareTo", &["Object"], "int", compare_to)],
};

macro_rules! number_values {
    ($($fn_name:ident => $kind:expr;)*) => {
        $(
            fn $fn_name(_: &mut dyn Invoker, this: &Value, _: &[Value]) -> NativeResult {
                convert_numeric(this, $kind)
            }
        )*
    };
}

number_values! {
    number_byte_value => OperandKind::Byte;
    number_short_value => OperandKind::Short;
    number_int_value => OperandKind::Int;
    number_long_value => OperandKind::Long;
    number_float_value => OperandKind::Float;
    number_double_value => OperandKind::Double;
}

pub static NUMBER: NativeClass = NativeClass {
    name: "Number",
    superclass: Some("Object"),
    interfaces: &[],
    is_interface: false,
    members: &[
        NativeMember::method("byteValue", &[], "byte", number_byte_value),
        NativeMember::method("shortValue", &[], "short", number_short_value),
        NativeMember::method("intValue", &[], "int", number_int_value),
        NativeMember::method("longValue", &[], "long", number_long_value),
        NativeMember::method("floatValue", &[], "float", number_float_value),
        NativeMember::method("doubleValue", &[], "double", number_double_value),
    ],
};

// ── Boxes ──

fn number_format(input: &str) -> ScriptError {
    ScriptError::NumberFormat(format!("For input string: \"{}\"", input))
}

fn value_of_boolean(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    match arg(args, 0) {
        Value::Bool(b) => Ok(Value::Bool(*b)),
        other => Err(ScriptError::class_cast(&other.class_name(), "boolean")),
    }
}

fn boolean_value(_: &mut dyn Invoker, this: &Value, _: &[Value]) -> NativeResult {
    match this {
        Value::Bool(b) => Ok(Value::Bool(*b)),
        other => Err(ScriptError::class_cast(&other.class_name(), "boolean")),
    }
}

fn parse_boolean(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    match arg(args, 0) {
        Value::Null => Ok(Value::Bool(false)),
        other => Ok(Value::Bool(string_of(other)?.eq_ignore_ascii_case("true"))),
    }
}

pub static BOOLEAN: NativeClass = NativeClass {
    name: "Boolean",
    superclass: Some("Object"),
    interfaces: &["Comparable"],
    is_interface: false,
    members: &[
        NativeMember::method("booleanValue", &[], "boolean", boolean_value),
        NativeMember::method("compareTo", &["Boolean"], "int", compare_to),
        NativeMember::static_method("valueOf", &["boolean"], "Boolean", value_of_boolean),
        NativeMember::static_method("parseBoolean", &["String"], "boolean", parse_boolean),
    ],
};

macro_rules! value_of {
    ($($fn_name:ident => $kind:expr;)*) => {
        $(
            fn $fn_name(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
                convert_numeric(arg(args, 0), $kind)
            }
        )*
    };
}

value_of! {
    value_of_byte => OperandKind::Byte;
    value_of_short => OperandKind::Short;
    value_of_char => OperandKind::Char;
    value_of_int => OperandKind::Int;
    value_of_long => OperandKind::Long;
    value_of_float => OperandKind::Float;
    value_of_double => OperandKind::Double;
}

pub static BYTE: NativeClass = NativeClass {
    name: "Byte",
    superclass: Some("Number"),
    interfaces: &["Comparable"],
    is_interface: false,
    members: &[
        NativeMember::method("compareTo", &["Byte"], "int", compare_to),
        NativeMember::static_method("valueOf", &["byte"], "Byte", value_of_byte),
    ],
};

pub static SHORT: NativeClass = NativeClass {
    name: "Short",
    superclass: Some("Number"),
    interfaces: &["Comparable"],
    is_interface: false,
    members: &[
        NativeMember::method("compareTo", &["Short"], "int", compare_to),
        NativeMember::static_method("valueOf", &["short"], "Short", value_of_short),
    ],
};

fn char_of(args: &[Value]) -> Result<Option<char>, ScriptError> {
    Ok(std::char::from_u32(char_value(arg(args, 0))? as u32))
}

fn char_value_of(_: &mut dyn Invoker, this: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::Char(char_value(this)?))
}

macro_rules! char_predicates {
    ($($fn_name:ident => $test:expr;)*) => {
        $(
            fn $fn_name(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
                let test: fn(char) -> bool = $test;
                Ok(Value::Bool(char_of(args)?.map(test).unwrap_or(false)))
            }
        )*
    };
}

char_predicates! {
    char_is_digit => |c| c.is_numeric();
    char_is_letter => char::is_alphabetic;
    char_is_letter_or_digit => char::is_alphanumeric;
    char_is_whitespace => char::is_whitespace;
    char_is_upper_case => char::is_uppercase;
    char_is_lower_case => char::is_lowercase;
}

fn map_char(args: &[Value], map: fn(char) -> Option<char>) -> NativeResult {
    let original = char_value(arg(args, 0))?;
    let mapped = std::char::from_u32(original as u32)
        .and_then(map)
        .filter(|c| c.len_utf16() == 1)
        .map(|c| c as u32 as u16)
        .unwrap_or(original);
    Ok(Value::Char(mapped))
}

fn char_to_upper_case(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    map_char(args, |c| c.to_uppercase().next())
}

fn char_to_lower_case(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    map_char(args, |c| c.to_lowercase().next())
}

pub static CHARACTER: NativeClass = NativeClass {
    name: "Character",
    superclass: Some("Object"),
    interfaces: &["Comparable"],
    is_interface: false,
    members: &[
        NativeMember::method("charValue", &[], "char", char_value_of),
        NativeMember::method("compareTo", &["Character"], "int", compare_to),
        NativeMember::static_method("valueOf", &["char"], "Character", value_of_char),
        NativeMember::static_method("isDigit", &["char"], "boolean", char_is_digit),
        NativeMember::static_method("isLetter", &["char"], "boolean", char_is_letter),
        NativeMember::static_method("isLetterOrDigit", &["char"], "boolean", char_is_letter_or_digit),
        NativeMember::static_method("isWhitespace", &["char"], "boolean", char_is_whitespace),
        NativeMember::static_method("isUpperCase", &["char"], "boolean", char_is_upper_case),
        NativeMember::static_method("isLowerCase", &["char"], "boolean", char_is_lower_case),
        NativeMember::static_method("toUpperCase", &["char"], "char", char_to_upper_case),
        NativeMember::static_method("toLowerCase", &["char"], "char", char_to_lower_case),
    ],
};

fn parse_int(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    let text = string_of(arg(args, 0))?;
    text.parse::<i32>().map(Value::Int).map_err(|_| number_format(&text))
}

fn parse_int_radix(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    let text = string_of(arg(args, 0))?;
    let radix = int_arg(args, 1)?;
    if !(2..=36).contains(&radix) {
        return Err(number_format(&text));
    }
    i32::from_str_radix(&text, radix as u32)
        .map(Value::Int)
        .map_err(|_| number_format(&text))
}

fn int_to_string(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::string(&int_arg(args, 0)?.to_string()))
}

fn int_to_hex_string(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::string(&format!("{:x}", int_arg(args, 0)?)))
}

fn int_to_binary_string(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::string(&format!("{:b}", int_arg(args, 0)?)))
}

fn int_compare(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Int(sign(int_arg(args, 0)?.cmp(&int_arg(args, 1)?))))
}

fn int_max(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Int(int_arg(args, 0)?.max(int_arg(args, 1)?)))
}

fn int_min(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Int(int_arg(args, 0)?.min(int_arg(args, 1)?)))
}

fn int_sum(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Int(int_arg(args, 0)?.wrapping_add(int_arg(args, 1)?)))
}

fn int_max_value(_: &mut dyn Invoker, _: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::Int(i32::MAX))
}

fn int_min_value(_: &mut dyn Invoker, _: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::Int(i32::MIN))
}

pub static INTEGER: NativeClass = NativeClass {
    name: "Integer",
    superclass: Some("Number"),
    interfaces: &["Comparable"],
    is_interface: false,
    members: &[
        NativeMember::method("compareTo", &["Integer"], "int", compare_to),
        NativeMember::static_method("valueOf", &["int"], "Integer", value_of_int),
        NativeMember::static_method("parseInt", &["String"], "int", parse_int),
        NativeMember::static_method("parseInt", &["String", "int"], "int", parse_int_radix),
        NativeMember::static_method("toString", &["int"], "String", int_to_string),
        NativeMember::static_method("toHexString", &["int"], "String", int_to_hex_string),
        NativeMember::static_method("toBinaryString", &["int"], "String", int_to_binary_string),
        NativeMember::static_method("compare", &["int", "int"], "int", int_compare),
        NativeMember::static_method("max", &["int", "int"], "int", int_max),
        NativeMember::static_method("min", &["int", "int"], "int", int_min),
        NativeMember::static_method("sum", &["int", "int"], "int", int_sum),
        NativeMember::static_field("MAX_VALUE", "int", int_max_value),
        NativeMember::static_field("MIN_VALUE", "int", int_min_value),
    ],
};

fn parse_long(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    let text = string_of(arg(args, 0))?;
    text.parse::<i64>().map(Value::Long).map_err(|_| number_format(&text))
}

fn long_to_string(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::string(&long_arg(args, 0)?.to_string()))
}

fn long_compare(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Int(sign(long_arg(args, 0)?.cmp(&long_arg(args, 1)?))))
}

fn long_max(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Long(long_arg(args, 0)?.max(long_arg(args, 1)?)))
}

fn long_min(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Long(long_arg(args, 0)?.min(long_arg(args, 1)?)))
}

fn long_max_value(_: &mut dyn Invoker, _: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::Long(i64::MAX))
}

fn long_min_value(_: &mut dyn Invoker, _: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::Long(i64::MIN))
}

pub static LONG: NativeClass = NativeClass {
    name: "Long",
    superclass: Some("Number"),
    interfaces: &["Comparable"],
    is_interface: false,
    members: &[
        NativeMember::method("compareTo", &["Long"], "int", compare_to),
        NativeMember::static_method("valueOf", &["long"], "Long", value_of_long),
        NativeMember::static_method("parseLong", &["String"], "long", parse_long),
        NativeMember::static_method("toString", &["long"], "String", long_to_string),
        NativeMember::static_method("compare", &["long", "long"], "int", long_compare),
        NativeMember::static_method("max", &["long", "long"], "long", long_max),
        NativeMember::static_method("min", &["long", "long"], "long", long_min),
        NativeMember::static_field("MAX_VALUE", "long", long_max_value),
        NativeMember::static_field("MIN_VALUE", "long", long_min_value),
    ],
};

fn parse_decimal(args: &[Value]) -> Result<f64, ScriptError> {
    let text = string_of(arg(args, 0))?;
    let trimmed = text.trim_matches(|c: char| c <= ' ');
    let digits = trimmed.trim_end_matches(|c| matches!(c, 'd' | 'D' | 'f' | 'F'));
    digits.parse::<f64>().map_err(|_| number_format(&text))
}

fn parse_float(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Float(parse_decimal(args)? as f32))
}

fn parse_double(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Double(parse_decimal(args)?))
}

fn decimal_is_nan(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Bool(double_arg(args, 0)?.is_nan()))
}

fn decimal_is_infinite(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Bool(double_arg(args, 0)?.is_infinite()))
}

fn decimal_compare(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Int(sign(double_arg(args, 0)?.total_cmp(&double_arg(args, 1)?))))
}

fn this_is_nan(_: &mut dyn Invoker, this: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::Bool(as_double(this).map(f64::is_nan).unwrap_or(false)))
}

fn float_max_value(_: &mut dyn Invoker, _: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::Float(f32::MAX))
}

fn float_min_value(_: &mut dyn Invoker, _: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::Float(f32::from_bits(1)))
}

pub static FLOAT: NativeClass = NativeClass {
    name: "Float",
    superclass: Some("Number"),
    interfaces: &["Comparable"],
    is_interface: false,
    members: &[
        NativeMember::method("compareTo", &["Float"], "int", compare_to),
        NativeMember::method("isNaN", &[], "boolean", this_is_nan),
        NativeMember::static_method("valueOf", &["float"], "Float", value_of_float),
        NativeMember::static_method("parseFloat", &["String"], "float", parse_float),
        NativeMember::static_method("isNaN", &["float"], "boolean", decimal_is_nan),
        NativeMember::static_method("isInfinite", &["float"], "boolean", decimal_is_infinite),
        NativeMember::static_method("compare", &["float", "float"], "int", decimal_compare),
        NativeMember::static_field("MAX_VALUE", "float", float_max_value),
        NativeMember::static_field("MIN_VALUE", "float", float_min_value),
    ],
};

fn double_max_value(_: &mut dyn Invoker, _: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::Double(f64::MAX))
}

fn double_min_value(_: &mut dyn Invoker, _: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::Double(f64::from_bits(1)))
}

fn double_positive_infinity(_: &mut dyn Invoker, _: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::Double(f64::INFINITY))
}

fn double_negative_infinity(_: &mut dyn Invoker, _: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::Double(f64::NEG_INFINITY))
}

fn double_nan(_: &mut dyn Invoker, _: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::Double(f64::NAN))
}

pub static DOUBLE: NativeClass = NativeClass {
    name: "Double",
    superclass: Some("Number"),
    interfaces: &["Comparable"],
    is_interface: false,
    members: &[
        NativeMember::method("compareTo", &["Double"], "int", compare_to),
        NativeMember::method("isNaN", &[], "boolean", this_is_nan),
        NativeMember::static_method("valueOf", &["double"], "Double", value_of_double),
        NativeMember::static_method("parseDouble", &["String"], "double", parse_double),
        NativeMember::static_method("isNaN", &["double"], "boolean", decimal_is_nan),
        NativeMember::static_method("isInfinite", &["double"], "boolean", decimal_is_infinite),
        NativeMember::static_method("compare", &["double", "double"], "int", decimal_compare),
        NativeMember::static_field("MAX_VALUE", "double", double_max_value),
        NativeMember::static_field("MIN_VALUE", "double", double_min_value),
        NativeMember::static_field("POSITIVE_INFINITY", "double", double_positive_infinity),
        NativeMember::static_field("NEGATIVE_INFINITY", "double", double_negative_infinity),
        NativeMember::static_field("NaN", "double", double_nan),
    ],
};

// ── String ──

fn utf16(value: &Value) -> Result<Vec<u16>, ScriptError> {
    Ok(string_of(value)?.encode_utf16().collect())
}

fn from_utf16(units: &[u16]) -> Value {
    Value::string(&String::from_utf16_lossy(units))
}

fn out_of_bounds(index: i32, length: usize) -> ScriptError {
    ScriptError::IndexOutOfBounds(format!("index {}, length {}", index, length))
}

fn find_units(haystack: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

fn string_new(_: &mut dyn Invoker, _: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::string(""))
}

fn string_length(_: &mut dyn Invoker, this: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::Int(string_of(this)?.encode_utf16().count() as i32))
}

fn string_char_at(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let units = utf16(this)?;
    let index = int_arg(args, 0)?;
    if index < 0 || index as usize >= units.len() {
        return Err(out_of_bounds(index, units.len()));
    }
    Ok(Value::Char(units[index as usize]))
}

fn string_is_empty(_: &mut dyn Invoker, this: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::Bool(string_of(this)?.is_empty()))
}

fn substring(units: &[u16], begin: i32, end: i32) -> NativeResult {
    if begin < 0 || end as usize > units.len() || begin > end {
        return Err(ScriptError::IndexOutOfBounds(format!(
            "begin {}, end {}, length {}",
            begin,
            end,
            units.len()
        )));
    }
    Ok(from_utf16(&units[begin as usize..end as usize]))
}

fn string_substring(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let units = utf16(this)?;
    substring(&units, int_arg(args, 0)?, units.len() as i32)
}

fn string_substring_range(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let units = utf16(this)?;
    substring(&units, int_arg(args, 0)?, int_arg(args, 1)?)
}

fn string_index_of(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let found = find_units(&utf16(this)?, &utf16(arg(args, 0))?, 0);
    Ok(Value::Int(found.map(|i| i as i32).unwrap_or(-1)))
}

fn string_index_of_from(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let from = int_arg(args, 1)?.max(0) as usize;
    let found = find_units(&utf16(this)?, &utf16(arg(args, 0))?, from);
    Ok(Value::Int(found.map(|i| i as i32).unwrap_or(-1)))
}

fn string_last_index_of(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let units = utf16(this)?;
    let needle = utf16(arg(args, 0))?;
    let found = if needle.is_empty() {
        Some(units.len())
    } else if needle.len() > units.len() {
        None
    } else {
        units.windows(needle.len()).rposition(|w| w == needle.as_slice())
    };
    Ok(Value::Int(found.map(|i| i as i32).unwrap_or(-1)))
}

fn string_contains(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Bool(string_of(this)?.contains(&*string_of(arg(args, 0))?)))
}

fn string_starts_with(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Bool(string_of(this)?.starts_with(&*string_of(arg(args, 0))?)))
}

fn string_ends_with(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Bool(string_of(this)?.ends_with(&*string_of(arg(args, 0))?)))
}

fn string_to_lower_case(_: &mut dyn Invoker, this: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::string(&string_of(this)?.to_lowercase()))
}

fn string_to_upper_case(_: &mut dyn Invoker, this: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::string(&string_of(this)?.to_uppercase()))
}

fn string_trim(_: &mut dyn Invoker, this: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::string(string_of(this)?.trim_matches(|c: char| c <= ' ')))
}

fn string_replace(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let target = string_of(arg(args, 0))?;
    let replacement = string_of(arg(args, 1))?;
    Ok(Value::string(&string_of(this)?.replace(&*target, &replacement)))
}

fn string_concat(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::string(&format!("{}{}", string_of(this)?, string_of(arg(args, 0))?)))
}

fn string_equals_ignore_case(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    match arg(args, 0) {
        Value::Str(other) => Ok(Value::Bool(string_of(this)?.to_lowercase() == other.to_lowercase())),
        _ => Ok(Value::Bool(false)),
    }
}

fn string_to_char_array(_: &mut dyn Invoker, this: &Value, _: &[Value]) -> NativeResult {
    let chars = utf16(this)?.into_iter().map(Value::Char).collect();
    Ok(Value::new_array("char[]".to_string(), chars))
}

fn string_value_of(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::string(&arg(args, 0).to_string()))
}

fn string_join(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    let delimiter = string_of(arg(args, 0))?;
    let parts: Vec<String> = match arg(args, 1) {
        Value::Set(_) => set_of(arg(args, 1))?.borrow().iter().map(|v| v.to_string()).collect(),
        other => list_of(other)?.borrow().iter().map(|v| v.to_string()).collect(),
    };
    Ok(Value::string(&parts.join(&delimiter)))
}

const CHAR_SEQUENCE_MEMBERS: &[NativeMember] = &[
    NativeMember::abstract_method("length", &[], "int", string_length),
    NativeMember::abstract_method("charAt", &["int"], "char", string_char_at),
];

pub static CHAR_SEQUENCE: NativeClass = NativeClass {
    name: "CharSequence",
    superclass: None,
    interfaces: &[],
    is_interface: true,
    members: CHAR_SEQUENCE_MEMBERS,
};

pub static STRING: NativeClass = NativeClass {
    name: "String",
    superclass: Some("Object"),
    interfaces: &["CharSequence", "Comparable"],
    is_interface: false,
    members: &[
        NativeMember::constructor(&[], string_new),
        NativeMember::method("length", &[], "int", string_length),
        NativeMember::method("charAt", &["int"], "char", string_char_at),
        NativeMember::method("isEmpty", &[], "boolean", string_is_empty),
        NativeMember::method("substring", &["int"], "String", string_substring),
        NativeMember::method("substring", &["int", "int"], "String", string_substring_range),
        NativeMember::method("indexOf", &["String"], "int", string_index_of),
        NativeMember::method("indexOf", &["String", "int"], "int", string_index_of_from),
        NativeMember::method("lastIndexOf", &["String"], "int", string_last_index_of),
        NativeMember::method("contains", &["CharSequence"], "boolean", string_contains),
        NativeMember::method("startsWith", &["String"], "boolean", string_starts_with),
        NativeMember::method("endsWith", &["String"], "boolean", string_ends_with),
        NativeMember::method("toLowerCase", &[], "String", string_to_lower_case),
        NativeMember::method("toUpperCase", &[], "String", string_to_upper_case),
        NativeMember::method("trim", &[], "String", string_trim),
        NativeMember::method("replace", &["CharSequence", "CharSequence"], "String", string_replace),
        NativeMember::method("concat", &["String"], "String", string_concat),
        NativeMember::method("equalsIgnoreCase", &["String"], "boolean", string_equals_ignore_case),
        NativeMember::method("compareTo", &["String"], "int", compare_to),
        NativeMember::method("toCharArray", &[], "char[]", string_to_char_array),
        NativeMember::static_method("valueOf", &["Object"], "String", string_value_of),
        NativeMember::static_method("join", &["CharSequence", "Iterable"], "String", string_join),
    ],
};

// ── Math ──

macro_rules! math_unary {
    ($($fn_name:ident => $op:expr;)*) => {
        $(
            fn $fn_name(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
                let op: fn(f64) -> f64 = $op;
                Ok(Value::Double(op(double_arg(args, 0)?)))
            }
        )*
    };
}

math_unary! {
    math_abs => f64::abs;
    math_acos => f64::acos;
    math_asin => f64::asin;
    math_atan => f64::atan;
    math_cbrt => f64::cbrt;
    math_ceil => f64::ceil;
    math_cos => f64::cos;
    math_cosh => f64::cosh;
    math_exp => f64::exp;
    math_expm1 => f64::exp_m1;
    math_floor => f64::floor;
    math_log => f64::ln;
    math_log10 => f64::log10;
    math_log1p => f64::ln_1p;
    math_sin => f64::sin;
    math_sinh => f64::sinh;
    math_sqrt => f64::sqrt;
    math_tan => f64::tan;
    math_tanh => f64::tanh;
    math_to_degrees => f64::to_degrees;
    math_to_radians => f64::to_radians;
    math_signum => |x| if x == 0.0 || x.is_nan() { x } else { x.signum() };
    math_rint => |x| {
        let rounded = x.round();
        if (x - x.trunc()).abs() == 0.5 {
            2.0 * (x / 2.0).round()
        } else {
            rounded
        }
    };
}

macro_rules! math_binary {
    ($($fn_name:ident => $op:expr;)*) => {
        $(
            fn $fn_name(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
                let op: fn(f64, f64) -> f64 = $op;
                Ok(Value::Double(op(double_arg(args, 0)?, double_arg(args, 1)?)))
            }
        )*
    };
}

math_binary! {
    math_atan2 => f64::atan2;
    math_hypot => f64::hypot;
    math_pow => f64::powf;
    math_max => |a, b| if a.is_nan() || b.is_nan() { f64::NAN } else { a.max(b) };
    math_min => |a, b| if a.is_nan() || b.is_nan() { f64::NAN } else { a.min(b) };
}

fn math_round(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Long((double_arg(args, 0)? + 0.5).floor() as i64))
}

fn math_pi(_: &mut dyn Invoker, _: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::Double(std::f64::consts::PI))
}

fn math_e(_: &mut dyn Invoker, _: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::Double(std::f64::consts::E))
}

pub static MATH: NativeClass = NativeClass {
    name: "Math",
    superclass: Some("Object"),
    interfaces: &[],
    is_interface: false,
    members: &[
        NativeMember::static_method("abs", &["double"], "double", math_abs),
        NativeMember::static_method("acos", &["double"], "double", math_acos),
        NativeMember::static_method("asin", &["double"], "double", math_asin),
        NativeMember::static_method("atan", &["double"], "double", math_atan),
        NativeMember::static_method("atan2", &["double", "double"], "double", math_atan2),
        NativeMember::static_method("cbrt", &["double"], "double", math_cbrt),
        NativeMember::static_method("ceil", &["double"], "double", math_ceil),
        NativeMember::static_method("cos", &["double"], "double", math_cos),
        NativeMember::static_method("cosh", &["double"], "double", math_cosh),
        NativeMember::static_method("exp", &["double"], "double", math_exp),
        NativeMember::static_method("expm1", &["double"], "double", math_expm1),
        NativeMember::static_method("floor", &["double"], "double", math_floor),
        NativeMember::static_method("hypot", &["double", "double"], "double", math_hypot),
        NativeMember::static_method("log", &["double"], "double", math_log),
        NativeMember::static_method("log10", &["double"], "double", math_log10),
        NativeMember::static_method("log1p", &["double"], "double", math_log1p),
        NativeMember::static_method("max", &["double", "double"], "double", math_max),
        NativeMember::static_method("min", &["double", "double"], "double", math_min),
        NativeMember::static_method("pow", &["double", "double"], "double", math_pow),
        NativeMember::static_method("rint", &["double"], "double", math_rint),
        NativeMember::static_method("round", &["double"], "long", math_round),
        NativeMember::static_method("signum", &["double"], "double", math_signum),
        NativeMember::static_method("sin", &["double"], "double", math_sin),
        NativeMember::static_method("sinh", &["double"], "double", math_sinh),
        NativeMember::static_method("sqrt", &["double"], "double", math_sqrt),
        NativeMember::static_method("tan", &["double"], "double", math_tan),
        NativeMember::static_method("tanh", &["double"], "double", math_tanh),
        NativeMember::static_method("toDegrees", &["double"], "double", math_to_degrees),
        NativeMember::static_method("toRadians", &["double"], "double", math_to_radians),
        NativeMember::static_field("PI", "double", math_pi),
        NativeMember::static_field("E", "double", math_e),
    ],
};

pub fn add_natives(catalog: &mut NativeCatalog) {
    for class in PRIMITIVE_CLASSES.iter() {
        catalog.add(class);
    }
    for class in [
        &OBJECT,
        &COMPARABLE,
        &NUMBER,
        &BOOLEAN,
        &BYTE,
        &SHORT,
        &CHARACTER,
        &INTEGER,
        &LONG,
        &FLOAT,
        &DOUBLE,
        &CHAR_SEQUENCE,
        &STRING,
        &MATH,
    ]
    .iter()
    {
        catalog.add(*class);
    }
}

pub fn declare(builder: &mut DefinitionBuilder) -> Result<(), DefinitionError> {
    for class in PRIMITIVE_CLASSES.iter() {
        builder.register(class.name, class.name)?;
    }
    builder
        .register("Object", "Object")?
        .register("def", "Object")?
        .register("Comparable", "Comparable")?
        .register("Number", "Number")?
        .register("CharSequence", "CharSequence")?
        .register("String", "String")?
        .register("Math", "Math")?;
    for (_, boxed, _) in BOXES.iter() {
        builder.register(boxed, boxed)?;
    }
    Ok(())
}

pub fn register(builder: &mut DefinitionBuilder) -> Result<(), DefinitionError> {
    builder
        .register_method("Object", "equals", false, "boolean", &["Object"])?
        .register_method("Object", "hashCode", false, "int", &[])?
        .register_method("Object", "toString", false, "String", &[])?
        .register_method("Comparable", "compareTo", false, "int", &["def"])?;

    for (primitive, _, method) in BOXES.iter().filter(|(p, _, _)| !matches!(*p, "boolean" | "char")) {
        builder.register_method("Number", method, false, primitive, &[])?;
    }

    builder
        .register_method("Boolean", "booleanValue", false, "boolean", &[])?
        .register_method("Boolean", "compareTo", false, "int", &["Boolean"])?
        .register_method("Boolean", "valueOf", true, "Boolean", &["boolean"])?
        .register_method("Boolean", "parseBoolean", true, "boolean", &["String"])?;

    builder
        .register_method("Character", "charValue", false, "char", &[])?
        .register_method("Character", "compareTo", false, "int", &["Character"])?
        .register_method("Character", "valueOf", true, "Character", &["char"])?;
    for name in &["isDigit", "isLetter", "isLetterOrDigit", "isWhitespace", "isUpperCase", "isLowerCase"] {
        builder.register_method("Character", name, true, "boolean", &["char"])?;
    }
    builder
        .register_method("Character", "toUpperCase", true, "char", &["char"])?
        .register_method("Character", "toLowerCase", true, "char", &["char"])?;

    for (primitive, boxed, _) in BOXES.iter().filter(|(p, _, _)| NUMERIC.contains(p) && *p != "char") {
        builder
            .register_method(boxed, "compareTo", false, "int", &[*boxed])?
            .register_method(boxed, "valueOf", true, boxed, &[*primitive])?;
    }

    builder
        .register_method("Integer", "parseInt", true, "int", &["String"])?
        .register_method("Integer", "parseInt", true, "int", &["String", "int"])?
        .register_method("Integer", "toString", true, "String", &["int"])?
        .register_method("Integer", "toHexString", true, "String", &["int"])?
        .register_method("Integer", "toBinaryString", true, "String", &["int"])?
        .register_method("Integer", "compare", true, "int", &["int", "int"])?
        .register_method("Integer", "max", true, "int", &["int", "int"])?
        .register_method("Integer", "min", true, "int", &["int", "int"])?
        .register_method("Integer", "sum", true, "int", &["int", "int"])?
        .register_field("Integer", "MAX_VALUE", true, "int")?
        .register_field("Integer", "MIN_VALUE", true, "int")?;

    builder
        .register_method("Long", "parseLong", true, "long", &["String"])?
        .register_method("Long", "toString", true, "String", &["long"])?
        .register_method("Long", "compare", true, "int", &["long", "long"])?
        .register_method("Long", "max", true, "long", &["long", "long"])?
        .register_method("Long", "min", true, "long", &["long", "long"])?
        .register_field("Long", "MAX_VALUE", true, "long")?
        .register_field("Long", "MIN_VALUE", true, "long")?;

    builder
        .register_method("Float", "isNaN", false, "boolean", &[])?
        .register_method("Float", "parseFloat", true, "float", &["String"])?
        .register_method("Float", "isNaN", true, "boolean", &["float"])?
        .register_method("Float", "isInfinite", true, "boolean", &["float"])?
        .register_method("Float", "compare", true, "int", &["float", "float"])?
        .register_field("Float", "MAX_VALUE", true, "float")?
        .register_field("Float", "MIN_VALUE", true, "float")?;

    builder
        .register_method("Double", "isNaN", false, "boolean", &[])?
        .register_method("Double", "parseDouble", true, "double", &["String"])?
        .register_method("Double", "isNaN", true, "boolean", &["double"])?
        .register_method("Double", "isInfinite", true, "boolean", &["double"])?
        .register_method("Double", "compare", true, "int", &["double", "double"])?;
    for field in &["MAX_VALUE", "MIN_VALUE", "POSITIVE_INFINITY", "NEGATIVE_INFINITY", "NaN"] {
        builder.register_field("Double", field, true, "double")?;
    }

    builder
        .register_method("CharSequence", "length", false, "int", &[])?
        .register_method("CharSequence", "charAt", false, "char", &["int"])?
        .register_constructor("String", &[])?
        .register_method("String", "isEmpty", false, "boolean", &[])?
        .register_method("String", "substring", false, "String", &["int"])?
        .register_method("String", "substring", false, "String", &["int", "int"])?
        .register_method("String", "indexOf", false, "int", &["String"])?
        .register_method("String", "indexOf", false, "int", &["String", "int"])?
        .register_method("String", "lastIndexOf", false, "int", &["String"])?
        .register_method("String", "contains", false, "boolean", &["CharSequence"])?
        .register_method("String", "startsWith", false, "boolean", &["String"])?
        .register_method("String", "endsWith", false, "boolean", &["String"])?
        .register_method("String", "toLowerCase", false, "String", &[])?
        .register_method("String", "toUpperCase", false, "String", &[])?
        .register_method("String", "trim", false, "String", &[])?
        .register_method("String", "replace", false, "String", &["CharSequence", "CharSequence"])?
        .register_method("String", "concat", false, "String", &["String"])?
        .register_method("String", "equalsIgnoreCase", false, "boolean", &["String"])?
        .register_method("String", "compareTo", false, "int", &["String"])?
        .register_method("String", "toCharArray", false, "char[]", &[])?
        .register_method("String", "valueOf", true, "String", &["def"])?
        .register_method("String", "join", true, "String", &["CharSequence", "Iterable"])?;

    for name in &[
        "abs", "acos", "asin", "atan", "cbrt", "ceil", "cos", "cosh", "exp", "expm1", "floor", "log", "log10",
        "log1p", "rint", "signum", "sin", "sinh", "sqrt", "tan", "tanh", "toDegrees", "toRadians",
    ] {
        builder.register_method("Math", name, true, "double", &["double"])?;
    }
    for name in &["atan2", "hypot", "max", "min", "pow"] {
        builder.register_method("Math", name, true, "double", &["double", "double"])?;
    }
    builder
        .register_method("Math", "round", true, "long", &["double"])?
        .register_field("Math", "PI", true, "double")?
        .register_field("Math", "E", true, "double")?;
    Ok(())
}

pub fn inherit(builder: &mut DefinitionBuilder) -> Result<(), DefinitionError> {
    builder
        .inherit("Comparable", &["Object"])?
        .inherit("CharSequence", &["Object"])?
        .inherit("Number", &["Object"])?
        .inherit("String", &["CharSequence", "Comparable", "Object"])?
        .inherit("Math", &["Object"])?
        .inherit("Boolean", &["Comparable", "Object"])?
        .inherit("Character", &["Comparable", "Object"])?;
    for (_, boxed, _) in BOXES.iter().filter(|(p, _, _)| !matches!(*p, "boolean" | "char")) {
        builder.inherit(boxed, &["Number", "Comparable", "Object"])?;
    }
    Ok(())
}

/// Primitive widening and narrowing, unboxing, and boxing from narrower
/// primitives.
pub fn add_casts(builder: &mut DefinitionBuilder) -> Result<(), DefinitionError> {
    for from in NUMERIC.iter() {
        for to in NUMERIC.iter().filter(|to| *to != from) {
            builder.add_cast(from, to, !widens(from, to))?;
        }
    }
    for (primitive, boxed, method) in BOXES.iter() {
        builder.add_transform(boxed, primitive, boxed, method, false, false, None, None)?;
        if !NUMERIC.contains(primitive) {
            continue;
        }
        for to in NUMERIC.iter().filter(|to| *to != primitive) {
            builder.add_transform(boxed, to, boxed, method, false, !widens(primitive, to), None, Some(*to))?;
        }
        for from in NUMERIC.iter().filter(|from| widens(from, primitive)) {
            builder.add_transform(from, boxed, boxed, "valueOf", true, false, Some(*primitive), None)?;
        }
    }
    for (primitive, _, method) in BOXES.iter().filter(|(p, _, _)| !matches!(*p, "boolean" | "char")) {
        builder.add_transform("Number", primitive, "Number", method, false, true, None, None)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compares_like_compare_to() {
        assert_eq!(natural_compare(&Value::Int(1), &Value::Int(2)).unwrap(), -1);
        assert_eq!(natural_compare(&Value::Double(2.5), &Value::Int(2)).unwrap(), 1);
        assert_eq!(natural_compare(&Value::string("abc"), &Value::string("abd")).unwrap(), -1);
        assert_eq!(natural_compare(&Value::string("ab"), &Value::string("abcd")).unwrap(), -2);
        assert!(natural_compare(&Value::string("a"), &Value::Int(1)).is_err());
    }

    #[test]
    fn substring_uses_utf16_indices() {
        let units: Vec<u16> = "h\u{e9}llo".encode_utf16().collect();
        assert_eq!(substring(&units, 1, 3).unwrap(), Value::string("\u{e9}l"));
        assert!(substring(&units, 3, 1).is_err());
    }

    #[test]
    fn widening_table() {
        assert!(widens("byte", "short"));
        assert!(widens("char", "int"));
        assert!(!widens("char", "short"));
        assert!(!widens("short", "char"));
        assert!(!widens("double", "float"));
    }
}
