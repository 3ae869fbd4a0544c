//! Tests for the analyzer's scope tracker.

extern crate painless;

use painless::runner::compiler::locals::{FrameKind, FunctionSignature, Locals, THIS};
use painless::runner::definition::Type;
use painless::runner::std_lib::default_definition;

fn types() -> (Type, Type, Type) {
    let def = default_definition().unwrap();
    let types = def.types();
    (types.def.clone(), types.int.clone(), types.string.clone())
}

fn locals() -> Locals {
    let (def, _, _) = types();
    Locals::new(def)
}

// ============================================================================
// Variables and blocks
// ============================================================================

#[test]
fn test_define_and_lookup() {
    let (_, int, _) = types();
    let mut locals = locals();
    let x = locals.define_variable("x", int.clone(), false).unwrap();
    let found = locals.get_variable("x").unwrap();
    assert_eq!(found, x);
    assert_eq!(found.typ, int);
}

#[test]
fn test_slots_are_not_reused_after_a_block() {
    let (_, int, _) = types();
    let mut locals = locals();
    let a = locals.define_variable("a", int.clone(), false).unwrap();
    locals.push_block();
    let b = locals.define_variable("b", int.clone(), false).unwrap();
    locals.pop_block();
    let c = locals.define_variable("c", int, false).unwrap();
    assert!(a.slot < b.slot);
    assert!(b.slot < c.slot);
    assert!(locals.get_variable("b").is_none());
}

#[test]
fn test_shadowing_is_rejected() {
    let (_, int, _) = types();
    let mut locals = locals();
    locals.define_variable("x", int.clone(), false).unwrap();
    locals.push_block();
    let err = locals.define_variable("x", int, false).unwrap_err();
    assert_eq!(err, "Variable [x] is already defined.");
}

#[test]
fn test_sibling_blocks_may_reuse_names() {
    let (_, int, _) = types();
    let mut locals = locals();
    locals.push_block();
    locals.define_variable("i", int.clone(), false).unwrap();
    locals.pop_block();
    locals.push_block();
    assert!(locals.define_variable("i", int, false).is_ok());
}

#[test]
fn test_reserved_names() {
    let (def, _, _) = types();
    let mut locals = locals();
    let err = locals.define_variable(THIS, def.clone(), false).unwrap_err();
    assert_eq!(err, "Variable [this] is reserved.");
    assert!(locals.define_variable("_score", def, false).is_err());
}

#[test]
fn test_implicit_bindings_skip_the_reserved_check() {
    let (def, _, _) = types();
    let mut locals = locals();
    let params = locals.add_variable("params", def, true).unwrap();
    assert!(params.readonly);
}

// ============================================================================
// Call frames
// ============================================================================

#[test]
fn test_function_frame_hides_main_variables() {
    let (_, int, string) = types();
    let mut locals = locals();
    locals.define_variable("outer", int.clone(), false).unwrap();
    locals.push_function(string.clone());
    assert!(locals.get_variable("outer").is_none());
    assert_eq!(locals.return_type(), Some(&string));
    assert_eq!(locals.frame_kind(), FrameKind::Function);

    let p = locals.define_variable("p", int, false).unwrap();
    assert_eq!(p.slot, 0);
    let frame = locals.pop_call();
    assert_eq!(frame.slot_count, 1);
    assert_eq!(locals.frame_kind(), FrameKind::Main);
}

#[test]
fn test_lambda_captures_outer_variable() {
    let (def, int, _) = types();
    let mut locals = locals();
    let outer = locals.define_variable("total", int, false).unwrap();
    locals.push_lambda(def.clone());
    locals.define_variable("x", def, false).unwrap();

    let inner = locals.get_variable("total").unwrap();
    assert!(inner.readonly);
    assert_ne!(inner.slot, outer.slot);
    // A second read reuses the capture.
    assert_eq!(locals.get_variable("total").unwrap().slot, inner.slot);

    let frame = locals.pop_call();
    assert_eq!(frame.captures.len(), 1);
    assert_eq!(frame.captures[0].outer.slot, outer.slot);
    assert_eq!(frame.captures[0].inner.slot, inner.slot);
}

#[test]
fn test_nested_lambdas_capture_through_each_level() {
    let (def, int, _) = types();
    let mut locals = locals();
    locals.define_variable("n", int, false).unwrap();
    locals.push_lambda(def.clone());
    locals.push_block();
    locals.push_lambda(def);
    assert!(locals.get_variable("n").is_some());
    let inner = locals.pop_call();
    let outer = locals.pop_call();
    assert_eq!(inner.captures.len(), 1);
    assert_eq!(outer.captures.len(), 1);
}

#[test]
fn test_pop_call_discards_open_blocks() {
    let (def, int, _) = types();
    let mut locals = locals();
    let depth = locals.depth();
    locals.push_lambda(def);
    locals.push_block();
    locals.define_variable("y", int, false).unwrap();
    locals.push_block();
    locals.pop_call();
    assert_eq!(locals.depth(), depth);
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn test_functions_are_keyed_by_name_and_arity() {
    let (def, int, _) = types();
    let mut locals = locals();
    let signature = |params: Vec<Type>, index| FunctionSignature {
        name: "f".to_string(),
        ret: def.clone(),
        params,
        index,
    };
    locals.add_function(signature(vec![], 0)).unwrap();
    locals.add_function(signature(vec![int.clone()], 1)).unwrap();
    assert_eq!(locals.get_function("f", 1).unwrap().index, 1);
    assert_eq!(locals.functions_named("f").len(), 2);
    assert!(locals.get_function("f", 2).is_none());

    let err = locals.add_function(signature(vec![int], 2)).unwrap_err();
    assert_eq!(err, "Duplicate function [f] with [1] parameters.");
}
