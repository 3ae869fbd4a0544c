//! Functional interfaces.
//!
//! The abstract method of each interface forwards to the function value
//! it is called on. Default methods wrap the receiver in a bound native.

use std::rc::Rc;

use crate::runner::def::conversion::{bool_value, int_value};
use crate::runner::definition::DefinitionBuilder;
use crate::runner::ds::error::{DefinitionError, ScriptError};
use crate::runner::ds::native::{Invoker, NativeCatalog, NativeClass, NativeMember};
use crate::runner::ds::value::{FunctionTarget, FunctionValue, Value};
use crate::runner::std_lib::arg;
use crate::runner::std_lib::lang::natural_compare;

type NativeResult = Result<Value, ScriptError>;

fn call_self(invoker: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    invoker.call_function(this, args)
}

fn bind(interface: &str, member: &'static NativeMember, receiver: &Value) -> Value {
    Value::Function(Rc::new(FunctionValue {
        interface: Some(interface.to_string()),
        target: FunctionTarget::Bound {
            member,
            receiver: receiver.clone(),
        },
    }))
}

fn negated_test(invoker: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Bool(!bool_value(&invoker.call_function(this, args)?)?))
}

static NEGATED_TEST: NativeMember = NativeMember::method("test", &["Object"], "boolean", negated_test);

fn predicate_negate(_: &mut dyn Invoker, this: &Value, _: &[Value]) -> NativeResult {
    Ok(bind("Predicate", &NEGATED_TEST, this))
}

fn reversed_compare(invoker: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let swapped = [arg(args, 1).clone(), arg(args, 0).clone()];
    Ok(Value::Int(int_value(&invoker.call_function(this, &swapped)?)?))
}

static REVERSED_COMPARE: NativeMember =
    NativeMember::method("compare", &["Object", "Object"], "int", reversed_compare);

fn comparator_reversed(_: &mut dyn Invoker, this: &Value, _: &[Value]) -> NativeResult {
    Ok(bind("Comparator", &REVERSED_COMPARE, this))
}

fn natural_order_compare(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    natural_compare(arg(args, 0), arg(args, 1)).map(Value::Int)
}

static NATURAL_ORDER: NativeMember =
    NativeMember::static_method("compare", &["Object", "Object"], "int", natural_order_compare);

fn comparator_natural_order(_: &mut dyn Invoker, _: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::Function(Rc::new(FunctionValue {
        interface: Some("Comparator".to_string()),
        target: FunctionTarget::Native(&NATURAL_ORDER),
    })))
}

fn comparator_equals(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Bool(this.same(arg(args, 0))))
}

macro_rules! interface {
    ($ident:ident, $name:literal, [$($parent:literal),*], [$($member:expr),* $(,)?]) => {
        pub static $ident: NativeClass = NativeClass {
            name: $name,
            superclass: None,
            interfaces: &[$($parent),*],
            is_interface: true,
            members: &[$($member),*],
        };
    };
}

interface!(FUNCTION, "Function", [], [
    NativeMember::abstract_method("apply", &["Object"], "Object", call_self),
]);

interface!(BI_FUNCTION, "BiFunction", [], [
    NativeMember::abstract_method("apply", &["Object", "Object"], "Object", call_self),
]);

interface!(UNARY_OPERATOR, "UnaryOperator", ["Function"], []);

interface!(CONSUMER, "Consumer", [], [
    NativeMember::abstract_method("accept", &["Object"], "void", call_self),
]);

interface!(BI_CONSUMER, "BiConsumer", [], [
    NativeMember::abstract_method("accept", &["Object", "Object"], "void", call_self),
]);

interface!(PREDICATE, "Predicate", [], [
    NativeMember::abstract_method("test", &["Object"], "boolean", call_self),
    NativeMember::default_method("negate", &[], "Predicate", predicate_negate),
]);

interface!(SUPPLIER, "Supplier", [], [
    NativeMember::abstract_method("get", &[], "Object", call_self),
]);

interface!(COMPARATOR, "Comparator", [], [
    NativeMember::abstract_method("compare", &["Object", "Object"], "int", call_self),
    NativeMember::abstract_method("equals", &["Object"], "boolean", comparator_equals),
    NativeMember::default_method("reversed", &[], "Comparator", comparator_reversed),
    NativeMember::static_method("naturalOrder", &[], "Comparator", comparator_natural_order),
]);

pub fn add_natives(catalog: &mut NativeCatalog) {
    for class in [
        &FUNCTION,
        &BI_FUNCTION,
        &UNARY_OPERATOR,
        &CONSUMER,
        &BI_CONSUMER,
        &PREDICATE,
        &SUPPLIER,
        &COMPARATOR,
    ]
    .iter()
    {
        catalog.add(*class);
    }
}

pub fn declare(builder: &mut DefinitionBuilder) -> Result<(), DefinitionError> {
    for name in &[
        "Function",
        "BiFunction",
        "UnaryOperator",
        "Consumer",
        "BiConsumer",
        "Predicate",
        "Supplier",
        "Comparator",
    ] {
        builder.register(name, name)?;
    }
    Ok(())
}

pub fn register(builder: &mut DefinitionBuilder) -> Result<(), DefinitionError> {
    builder
        .register_method("Function", "apply", false, "def", &["def"])?
        .register_method("BiFunction", "apply", false, "def", &["def", "def"])?
        .register_method("Consumer", "accept", false, "void", &["def"])?
        .register_method("BiConsumer", "accept", false, "void", &["def", "def"])?
        .register_method("Predicate", "test", false, "boolean", &["def"])?
        .register_method("Predicate", "negate", false, "Predicate", &[])?
        .register_method("Supplier", "get", false, "def", &[])?
        .register_method("Comparator", "compare", false, "int", &["def", "def"])?
        .register_method("Comparator", "equals", false, "boolean", &["Object"])?
        .register_method("Comparator", "reversed", false, "Comparator", &[])?
        .register_method("Comparator", "naturalOrder", true, "Comparator", &[])?;
    Ok(())
}

pub fn inherit(builder: &mut DefinitionBuilder) -> Result<(), DefinitionError> {
    builder
        .inherit("Function", &["Object"])?
        .inherit("BiFunction", &["Object"])?
        .inherit("UnaryOperator", &["Function", "Object"])?
        .inherit("Consumer", &["Object"])?
        .inherit("BiConsumer", &["Object"])?
        .inherit("Predicate", &["Object"])?
        .inherit("Supplier", &["Object"])?
        .inherit("Comparator", &["Object"])?;
    Ok(())
}
