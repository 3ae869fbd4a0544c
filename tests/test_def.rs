//! Tests for runtime dispatch on `def` receivers: method, field and
//! index lookups, array access and function references.

extern crate painless;

use painless::runner::def::{self, DynamicHandle};
use painless::runner::definition::Definition;
use painless::runner::ds::error::ScriptError;
use painless::runner::ds::native::Invoker;
use painless::runner::ds::value::Value;
use painless::runner::std_lib::default_definition;
use std::collections::HashMap;
use std::sync::Arc;

/// Invoker for lookups that never call back into script functions.
struct NoFunctions;

impl Invoker for NoFunctions {
    fn call_function(&mut self, _function: &Value, _args: &[Value]) -> Result<Value, ScriptError> {
        Err(ScriptError::UnsupportedOperation("no script functions here".to_string()))
    }
}

fn definition() -> Arc<Definition> {
    default_definition().unwrap()
}

fn list_of(items: &[i32]) -> Value {
    Value::new_list(items.iter().map(|i| Value::Int(*i)).collect())
}

fn map_of(entries: &[(&str, Value)]) -> Value {
    let mut map = HashMap::new();
    for (key, value) in entries {
        map.insert(Value::string(key), value.clone());
    }
    Value::new_map(map)
}

// ============================================================================
// Method lookup
// ============================================================================

#[test]
fn test_method_on_list() {
    let def = definition();
    let list = list_of(&[1, 2, 3]);
    let handle = def::lookup_method(&def, &list, "size", 0).unwrap();
    assert_eq!(handle.invoke(&mut NoFunctions, &list, &[]).unwrap(), Value::Int(3));
}

#[test]
fn test_method_is_found_on_supertype() {
    let def = definition();
    let list = list_of(&[4, 5]);
    let handle = def::lookup_method(&def, &list, "contains", 1).unwrap();
    let found = handle.invoke(&mut NoFunctions, &list, &[Value::Int(5)]).unwrap();
    assert_eq!(found, Value::Bool(true));
}

#[test]
fn test_method_arity_is_part_of_the_key() {
    let def = definition();
    let list = list_of(&[]);
    let err = def::lookup_method(&def, &list, "size", 2).unwrap_err();
    assert_eq!(
        err,
        ScriptError::IllegalArgument(
            "Unable to find dynamic method [size] with [2] arguments for class [ArrayList].".to_string()
        )
    );
}

#[test]
fn test_method_on_null_receiver() {
    let def = definition();
    match def::lookup_method(&def, &Value::Null, "size", 0) {
        Err(ScriptError::NullPointer(_)) => {}
        other => panic!("expected a null pointer error, got {:?}", other),
    }
}

#[test]
fn test_string_methods() {
    let def = definition();
    let s = Value::string("Painless");
    let handle = def::lookup_method(&def, &s, "toUpperCase", 0).unwrap();
    assert_eq!(handle.invoke(&mut NoFunctions, &s, &[]).unwrap(), Value::string("PAINLESS"));
}

// ============================================================================
// Field shortcuts
// ============================================================================

#[test]
fn test_map_getter_shortcut() {
    let def = definition();
    let map = map_of(&[("a", Value::Int(1))]);
    let handle = def::lookup_getter(&def, &map, "a").unwrap();
    assert_eq!(handle.invoke(&mut NoFunctions, &map, &[]).unwrap(), Value::Int(1));
}

#[test]
fn test_map_missing_key_reads_null() {
    let def = definition();
    let map = map_of(&[]);
    let handle = def::lookup_getter(&def, &map, "missing").unwrap();
    assert_eq!(handle.invoke(&mut NoFunctions, &map, &[]).unwrap(), Value::Null);
}

#[test]
fn test_map_setter_shortcut() {
    let def = definition();
    let map = map_of(&[]);
    let handle = def::lookup_setter(&def, &map, "b").unwrap();
    let stored = handle.invoke(&mut NoFunctions, &map, &[Value::Int(7)]).unwrap();
    assert_eq!(stored, Value::Int(7));
    let get = def::lookup_getter(&def, &map, "b").unwrap();
    assert_eq!(get.invoke(&mut NoFunctions, &map, &[]).unwrap(), Value::Int(7));
}

#[test]
fn test_list_numeric_shortcut() {
    let def = definition();
    let list = list_of(&[10, 20, 30]);
    let handle = def::lookup_getter(&def, &list, "1").unwrap();
    assert_eq!(handle.invoke(&mut NoFunctions, &list, &[]).unwrap(), Value::Int(20));
}

#[test]
fn test_list_shortcut_requires_a_number() {
    let def = definition();
    let list = list_of(&[]);
    let err = def::lookup_getter(&def, &list, "first").unwrap_err();
    assert_eq!(err, ScriptError::IllegalArgument("Illegal list shortcut value [first].".to_string()));
}

#[test]
fn test_array_length_field() {
    let def = definition();
    let array = Value::new_array("int[]".to_string(), vec![Value::Int(1), Value::Int(2)]);
    let handle = def::lookup_getter(&def, &array, "length").unwrap();
    assert!(matches!(handle, DynamicHandle::ArrayLength));
    assert_eq!(handle.invoke(&mut NoFunctions, &array, &[]).unwrap(), Value::Int(2));
}

#[test]
fn test_unknown_field() {
    let def = definition();
    let err = def::lookup_getter(&def, &Value::Int(3), "nope").unwrap_err();
    assert_eq!(
        err,
        ScriptError::IllegalArgument("Unable to find dynamic field [nope] for class [Integer].".to_string())
    );
}

// ============================================================================
// Index access
// ============================================================================

#[test]
fn test_index_on_map_and_list() {
    let def = definition();
    let map = map_of(&[("k", Value::string("v"))]);
    let load = def::lookup_array_load(&def, &map).unwrap();
    assert_eq!(
        load.invoke(&mut NoFunctions, &map, &[Value::string("k")]).unwrap(),
        Value::string("v")
    );

    let list = list_of(&[1, 2]);
    let store = def::lookup_array_store(&def, &list).unwrap();
    store.invoke(&mut NoFunctions, &list, &[Value::Int(0), Value::Int(9)]).unwrap();
    let load = def::lookup_array_load(&def, &list).unwrap();
    assert_eq!(load.invoke(&mut NoFunctions, &list, &[Value::Int(0)]).unwrap(), Value::Int(9));
}

#[test]
fn test_index_on_non_container() {
    let def = definition();
    let err = def::lookup_array_load(&def, &Value::string("abc")).unwrap_err();
    assert_eq!(
        err,
        ScriptError::IllegalArgument("Attempting to address a non-array type [String] as an array.".to_string())
    );
}

#[test]
fn test_array_bounds() {
    let array = Value::new_array("int[]".to_string(), vec![Value::Int(1), Value::Int(2)]);
    assert_eq!(def::array_load(&array, &Value::Int(1)).unwrap(), Value::Int(2));
    assert_eq!(
        def::array_load(&array, &Value::Int(2)).unwrap_err(),
        ScriptError::IndexOutOfBounds("Index 2 out of bounds for length 2".to_string())
    );
    assert!(def::array_load(&array, &Value::Int(-1)).is_err());
}

#[test]
fn test_array_store_widens_to_component() {
    let array = Value::new_array("long[]".to_string(), vec![Value::Long(0)]);
    def::array_store(&array, &Value::Int(0), Value::Int(5)).unwrap();
    assert_eq!(def::array_load(&array, &Value::Int(0)).unwrap(), Value::Long(5));
}

// ============================================================================
// Function references
// ============================================================================

#[test]
fn test_resolve_static_reference() {
    let def = definition();
    let member = def::resolve_reference(&def, "Integer", "parseInt", 1).unwrap();
    let parsed = member.call_unbound(&mut NoFunctions, &[Value::string("42")]).unwrap();
    assert_eq!(parsed, Value::Int(42));
}

#[test]
fn test_resolve_instance_reference_takes_receiver_first() {
    let def = definition();
    let member = def::resolve_reference(&def, "String", "length", 1).unwrap();
    let length = member.call_unbound(&mut NoFunctions, &[Value::string("four")]).unwrap();
    assert_eq!(length, Value::Int(4));
}

#[test]
fn test_resolve_unknown_reference() {
    let def = definition();
    assert!(def::resolve_reference(&def, "String", "explode", 1).is_none());
}
