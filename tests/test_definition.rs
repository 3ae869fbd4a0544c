//! Tests for the type registry: type resolution, subtyping, casts and
//! the builder's configuration errors.

extern crate painless;

#[macro_use]
extern crate lazy_static;

use painless::runner::definition::{CastKind, Definition, DefinitionBuilder, MethodKey, Sort};
use painless::runner::ds::error::{DefinitionError, ScriptError};
use painless::runner::ds::native::{Invoker, NativeCatalog, NativeClass, NativeMember};
use painless::runner::ds::value::Value;
use painless::runner::std_lib::{default_definition, NATIVES};
use std::sync::Arc;

fn definition() -> Arc<Definition> {
    default_definition().expect("default whitelist should build")
}

// ============================================================================
// Type resolution
// ============================================================================

#[test]
fn test_primitive_types_resolve() {
    let def = definition();
    let int = def.get_type("int").unwrap();
    assert_eq!(int.sort, Sort::Int);
    assert_eq!(int.dimensions, 0);
    assert!(int.sort.is_primitive());
}

#[test]
fn test_array_types_are_synthesized() {
    let def = definition();
    let matrix = def.get_type("int[][]").unwrap();
    assert_eq!(matrix.dimensions, 2);
    assert!(matrix.is_array());
    let row = def.element_type(&matrix).unwrap();
    assert_eq!(row.name, "int[]");
    assert_eq!(def.element_type(&row).unwrap().name, "int");
}

#[test]
fn test_unknown_type_is_rejected() {
    let def = definition();
    assert!(def.get_type("Thread").is_err());
    assert!(!def.is_type("Thread"));
    assert!(def.is_type("ArrayList"));
}

#[test]
fn test_common_types() {
    let def = definition();
    let types = def.types();
    assert!(types.def.is_def());
    assert_eq!(types.string.name, "String");
    assert_eq!(types.boolean.sort, Sort::Bool);
}

#[test]
fn test_boxing_round_trip() {
    let def = definition();
    let int = def.get_type("int").unwrap();
    let boxed = def.boxed(&int);
    assert_eq!(boxed.name, "Integer");
    assert_eq!(def.unboxed(&boxed), int);
}

// ============================================================================
// Subtyping
// ============================================================================

#[test]
fn test_collection_hierarchy() {
    let def = definition();
    let array_list = def.get_type("ArrayList").unwrap();
    let list = def.get_type("List").unwrap();
    let collection = def.get_type("Collection").unwrap();
    let map = def.get_type("Map").unwrap();
    assert!(def.is_assignable(&array_list, &list));
    assert!(def.is_assignable(&array_list, &collection));
    assert!(!def.is_assignable(&list, &array_list));
    assert!(!def.is_assignable(&array_list, &map));
}

#[test]
fn test_everything_is_assignable_to_def() {
    let def = definition();
    let dynamic = def.types().def.clone();
    for name in &["int", "String", "List", "int[]"] {
        let typ = def.get_type(name).unwrap();
        assert!(def.is_assignable(&typ, &dynamic), "{} should be assignable to def", name);
    }
}

#[test]
fn test_primitives_are_not_subtypes() {
    let def = definition();
    let int = def.get_type("int").unwrap();
    let object = def.get_type("Object").unwrap();
    assert!(!def.is_assignable(&int, &object));
}

// ============================================================================
// Casts
// ============================================================================

#[test]
fn test_widening_is_implicit() {
    let def = definition();
    let int = def.get_type("int").unwrap();
    let long = def.get_type("long").unwrap();
    let cast = def.transform(&int, &long, false).unwrap();
    assert_eq!(cast.kind, CastKind::Numeric);
}

#[test]
fn test_narrowing_requires_explicit_cast() {
    let def = definition();
    let long = def.get_type("long").unwrap();
    let int = def.get_type("int").unwrap();
    assert!(def.transform(&long, &int, false).is_none());
    assert!(def.transform(&long, &int, true).is_some());
}

#[test]
fn test_identity_cast_is_noop() {
    let def = definition();
    let string = def.types().string.clone();
    assert!(def.transform(&string, &string, false).unwrap().is_noop());
}

#[test]
fn test_downcast_from_def_is_checked() {
    let def = definition();
    let dynamic = def.types().def.clone();
    let list = def.get_type("List").unwrap();
    let cast = def.transform(&dynamic, &list, false).unwrap();
    assert_eq!(cast.kind, CastKind::Checked);
}

#[test]
fn test_reference_downcast_needs_explicit() {
    let def = definition();
    let list = def.get_type("List").unwrap();
    let array_list = def.get_type("ArrayList").unwrap();
    assert!(def.transform(&list, &array_list, false).is_none());
    assert_eq!(def.transform(&list, &array_list, true).unwrap().kind, CastKind::Checked);
}

#[test]
fn test_unboxing_is_a_transform() {
    let def = definition();
    let integer = def.get_type("Integer").unwrap();
    let int = def.get_type("int").unwrap();
    match def.transform(&integer, &int, false).unwrap().kind {
        CastKind::Transform { method, .. } => assert_eq!(method.name, "intValue"),
        other => panic!("expected a transform, got {:?}", other),
    }
}

#[test]
fn test_unrelated_types_do_not_cast() {
    let def = definition();
    let string = def.types().string.clone();
    let int = def.get_type("int").unwrap();
    assert!(def.transform(&string, &int, true).is_none());
}

// ============================================================================
// Functional interfaces
// ============================================================================

#[test]
fn test_functional_method() {
    let def = definition();
    let function = def.get_type("Function").unwrap();
    let method = def.functional_method(&function).unwrap();
    assert_eq!(method.name, "apply");
    assert_eq!(method.arity(), 1);
}

#[test]
fn test_comparator_ignores_object_methods() {
    let def = definition();
    let comparator = def.get_type("Comparator").unwrap();
    assert_eq!(def.functional_method(&comparator).unwrap().name, "compare");
}

#[test]
fn test_concrete_classes_are_not_functional() {
    let def = definition();
    let list = def.get_type("ArrayList").unwrap();
    assert!(def.functional_method(&list).is_none());
}

// ============================================================================
// Builder errors
// ============================================================================

#[test]
fn test_duplicate_struct() {
    let mut builder = DefinitionBuilder::new(&NATIVES);
    builder.register("Object", "Object").unwrap();
    let err = builder.register("Object", "Object").unwrap_err();
    assert_eq!(err, DefinitionError::DuplicateStruct("Object".to_string()));
}

#[test]
fn test_invalid_struct_name() {
    let mut builder = DefinitionBuilder::new(&NATIVES);
    let err = builder.register("9lives", "Object").unwrap_err();
    assert_eq!(err, DefinitionError::InvalidName("9lives".to_string()));
}

#[test]
fn test_unknown_native_class() {
    let mut builder = DefinitionBuilder::new(&NATIVES);
    let err = builder.register("Socket", "java.net.Socket").unwrap_err();
    assert_eq!(err, DefinitionError::NativeNotFound("java.net.Socket".to_string()));
}

#[test]
fn test_member_of_unknown_owner() {
    let mut builder = DefinitionBuilder::new(&NATIVES);
    let err = builder.register_method("Nope", "size", false, "int", &[]).unwrap_err();
    assert_eq!(err, DefinitionError::UnknownOwner("Nope".to_string()));
}

/// A builder with a few primitives and classes already declared.
fn builder_with_basics() -> DefinitionBuilder {
    let mut builder = DefinitionBuilder::new(&NATIVES);
    builder
        .register("int", "int")
        .and_then(|b| b.register("long", "long"))
        .and_then(|b| b.register("double", "double"))
        .and_then(|b| b.register("Object", "Object"))
        .and_then(|b| b.register("String", "String"))
        .and_then(|b| b.register("Math", "Math"))
        .and_then(|b| b.register("ArrayList", "ArrayList"))
        .unwrap();
    builder
}

#[test]
fn test_duplicate_method() {
    let mut builder = builder_with_basics();
    builder.register_method("String", "length", false, "int", &[]).unwrap();
    let err = builder.register_method("String", "length", false, "int", &[]).unwrap_err();
    assert_eq!(
        err,
        DefinitionError::DuplicateMember {
            kind: "method",
            owner: "String".to_string(),
            name: "length".to_string(),
            arity: 0,
        }
    );
}

#[test]
fn test_static_and_instance_methods_share_keys() {
    let mut builder = builder_with_basics();
    builder.register_method("Math", "abs", true, "double", &["double"]).unwrap();
    let err = builder.register_method("Math", "abs", false, "double", &["double"]).unwrap_err();
    assert!(matches!(err, DefinitionError::DuplicateMember { kind: "method", arity: 1, .. }));
}

#[test]
fn test_duplicate_constructor() {
    let mut builder = builder_with_basics();
    builder.register_constructor("ArrayList", &[]).unwrap();
    let err = builder.register_constructor("ArrayList", &[]).unwrap_err();
    assert_eq!(
        err,
        DefinitionError::DuplicateMember {
            kind: "constructor",
            owner: "ArrayList".to_string(),
            name: "<init>".to_string(),
            arity: 0,
        }
    );
}

#[test]
fn test_method_cannot_take_the_constructor_key() {
    let mut builder = builder_with_basics();
    builder.register_constructor("ArrayList", &[]).unwrap();
    let err = builder.register_method("ArrayList", "<init>", false, "ArrayList", &[]).unwrap_err();
    assert_eq!(err, DefinitionError::InvalidName("<init>".to_string()));
}

#[test]
fn test_declared_return_must_fit_the_native_one() {
    let mut builder = builder_with_basics();
    let err = builder.register_method("String", "length", false, "String", &[]).unwrap_err();
    assert_eq!(
        err,
        DefinitionError::GenericMismatch {
            owner: "String".to_string(),
            member: "length".to_string(),
            declared: "String".to_string(),
            native: "int".to_string(),
        }
    );
}

#[test]
fn test_duplicate_cast() {
    let mut builder = builder_with_basics();
    builder.add_cast("int", "long", false).unwrap();
    builder.add_cast("int", "long", true).unwrap();
    let err = builder.add_cast("int", "long", false).unwrap_err();
    assert_eq!(
        err,
        DefinitionError::DuplicateCast {
            from: "int".to_string(),
            to: "long".to_string(),
            explicit: false,
        }
    );
}

// ============================================================================
// Native lookup order
// ============================================================================

fn describe(_: &mut dyn Invoker, _: &Value, _: &[Value]) -> Result<Value, ScriptError> {
    Ok(Value::Null)
}

static ROOT_MEMBERS: [NativeMember; 1] = [NativeMember::method("describe", &[], "Object", describe)];
static BASE_MEMBERS: [NativeMember; 1] = [NativeMember::method("describe", &[], "Object", describe)];
static LABELED_MEMBERS: [NativeMember; 1] = [NativeMember::default_method("label", &[], "Object", describe)];
static BASE_LABEL: [NativeMember; 2] = [
    NativeMember::method("describe", &[], "Object", describe),
    NativeMember::method("label", &[], "Object", describe),
];

static ROOT: NativeClass = NativeClass {
    name: "Object",
    superclass: None,
    interfaces: &[],
    is_interface: false,
    members: &ROOT_MEMBERS,
};

static LABELED: NativeClass = NativeClass {
    name: "Labeled",
    superclass: None,
    interfaces: &[],
    is_interface: true,
    members: &LABELED_MEMBERS,
};

static BASE: NativeClass = NativeClass {
    name: "Base",
    superclass: Some("Object"),
    interfaces: &[],
    is_interface: false,
    members: &BASE_MEMBERS,
};

static MIDDLE: NativeClass = NativeClass {
    name: "Middle",
    superclass: Some("Base"),
    interfaces: &[],
    is_interface: false,
    members: &BASE_LABEL,
};

static LEAF: NativeClass = NativeClass {
    name: "Leaf",
    superclass: Some("Middle"),
    interfaces: &["Labeled"],
    is_interface: false,
    members: &[],
};

/// Classes every definition needs, taken from the shared catalogue.
const BORROWED: [&str; 10] = [
    "void", "boolean", "byte", "short", "char", "int", "long", "float", "double", "String",
];

lazy_static! {
    static ref SMALL_CATALOG: NativeCatalog = {
        let mut catalog = NativeCatalog::new();
        for name in BORROWED.iter() {
            catalog.add(NATIVES.get(name).unwrap());
        }
        for class in [&ROOT, &LABELED, &BASE, &MIDDLE, &LEAF].iter() {
            catalog.add(*class);
        }
        catalog
    };
}

fn small_definition() -> Definition {
    let mut builder = DefinitionBuilder::new(&SMALL_CATALOG);
    for name in BORROWED.iter().chain(&["Object", "Labeled", "Base", "Middle", "Leaf"]) {
        builder.register(name, name).unwrap();
    }
    builder.register("def", "Object").unwrap();
    builder
        .register_method("Leaf", "describe", false, "Object", &[])
        .and_then(|b| b.register_method("Leaf", "label", false, "Object", &[]))
        .unwrap();
    builder.build().unwrap()
}

fn leaf_method(def: &Definition, name: &str) -> &'static NativeMember {
    def.struct_by_name("Leaf").unwrap().methods[&MethodKey::new(name, 0)].native
}

#[test]
fn test_catalog_hierarchy_order() {
    assert_eq!(
        SMALL_CATALOG.hierarchy("Leaf"),
        vec!["Leaf", "Labeled", "Middle", "Base", "Object"]
    );
}

#[test]
fn test_nearest_superclass_member_wins() {
    let def = small_definition();
    let found = leaf_method(&def, "describe");
    assert!(std::ptr::eq(found, &BASE_LABEL[0]));
    assert!(!std::ptr::eq(found, &BASE_MEMBERS[0]));
    assert!(!std::ptr::eq(found, &ROOT_MEMBERS[0]));
}

#[test]
fn test_interfaces_are_searched_before_the_superclass() {
    let def = small_definition();
    let found = leaf_method(&def, "label");
    assert!(std::ptr::eq(found, &LABELED_MEMBERS[0]));
    assert!(found.is_default);
}
