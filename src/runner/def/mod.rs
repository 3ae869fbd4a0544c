//! Dynamic dispatch for `def` values.
//!
//! Given a receiver value and an operation, resolves the whitelisted
//! implementation by walking the receiver's native class hierarchy
//! against the registry's runtime class index. Resolution yields a
//! [`DynamicHandle`] that call sites cache per receiver class.

pub mod conversion;
pub mod operators;

use std::rc::Rc;

use tracing::trace;

use crate::runner::def::conversion::{implicit, int_value};
use crate::runner::def::operators::OperandKind;
use crate::runner::definition::{Accessor, Definition, MethodKey, RuntimeClass};
use crate::runner::ds::error::ScriptError;
use crate::runner::ds::native::{Invoker, MemberKind, NativeMember, CONSTRUCTOR_NAME};
use crate::runner::ds::value::{FunctionTarget, FunctionValue, Value};

/// A resolved dynamic operation.
#[derive(Debug, Clone)]
pub enum DynamicHandle {
    Method(&'static NativeMember),
    /// Call of an untyped function value.
    Function,
    Getter(&'static NativeMember),
    Setter(&'static NativeMember),
    ArrayLength,
    MapGet { get: &'static NativeMember, key: Value },
    MapPut { put: &'static NativeMember, key: Value },
    ListGet { get: &'static NativeMember, index: i32 },
    ListSet { set: &'static NativeMember, index: i32 },
    ArrayLoad,
    ArrayStore,
    IndexLoad(&'static NativeMember),
    IndexStore(&'static NativeMember),
}

impl DynamicHandle {
    /// Runs the operation. Stores take the stored value as their last
    /// argument and return it.
    pub fn invoke(&self, invoker: &mut dyn Invoker, receiver: &Value, args: &[Value]) -> Result<Value, ScriptError> {
        let arg = |i: usize| args.get(i).cloned().unwrap_or(Value::Null);
        match self {
            DynamicHandle::Method(member) => (member.invoke)(invoker, receiver, args),
            DynamicHandle::Function => invoker.call_function(receiver, args),
            DynamicHandle::Getter(member) => (member.invoke)(invoker, receiver, &[]),
            DynamicHandle::Setter(member) => {
                (member.invoke)(invoker, receiver, &[arg(0)])?;
                Ok(arg(0))
            }
            DynamicHandle::ArrayLength => match receiver {
                Value::Array(array) => Ok(Value::Int(array.elements.borrow().len() as i32)),
                other => Err(not_an_array(other)),
            },
            DynamicHandle::MapGet { get, key } => (get.invoke)(invoker, receiver, &[key.clone()]),
            DynamicHandle::MapPut { put, key } => {
                (put.invoke)(invoker, receiver, &[key.clone(), arg(0)])?;
                Ok(arg(0))
            }
            DynamicHandle::ListGet { get, index } => (get.invoke)(invoker, receiver, &[Value::Int(*index)]),
            DynamicHandle::ListSet { set, index } => {
                (set.invoke)(invoker, receiver, &[Value::Int(*index), arg(0)])?;
                Ok(arg(0))
            }
            DynamicHandle::ArrayLoad => array_load(receiver, &arg(0)),
            DynamicHandle::ArrayStore => {
                let value = arg(1);
                array_store(receiver, &arg(0), value)
            }
            DynamicHandle::IndexLoad(get) => (get.invoke)(invoker, receiver, &[arg(0)]),
            DynamicHandle::IndexStore(put) => {
                (put.invoke)(invoker, receiver, &[arg(0), arg(1)])?;
                Ok(arg(1))
            }
        }
    }
}

fn not_an_array(receiver: &Value) -> ScriptError {
    ScriptError::illegal(format!(
        "Attempting to address a non-array type [{}] as an array.",
        receiver.class_name()
    ))
}

fn null_receiver(operation: &str, name: &str) -> ScriptError {
    ScriptError::NullPointer(format!("cannot {} [{}] on a null receiver", operation, name))
}

/// Native classes consulted for `receiver`, nearest first.
pub fn hierarchy(definition: &Definition, receiver: &Value) -> Vec<&'static str> {
    let natives = definition.natives();
    match receiver {
        Value::Array(_) => natives.hierarchy("Object"),
        Value::Function(function) => match &function.interface {
            Some(iface) => natives.hierarchy(iface),
            None => natives.hierarchy("Object"),
        },
        other => natives.hierarchy(&other.class_name()),
    }
}

fn find_in_hierarchy<'d, T>(
    definition: &'d Definition,
    receiver: &Value,
    mut find: impl FnMut(&'d RuntimeClass) -> Option<T>,
) -> Option<T> {
    for class in hierarchy(definition, receiver) {
        if let Some(found) = definition.runtime_class(class).and_then(&mut find) {
            trace!(class, receiver = %receiver.class_name(), "dynamic lookup matched");
            return Some(found);
        }
    }
    None
}

fn find_method(definition: &Definition, receiver: &Value, name: &str, arity: usize) -> Option<&'static NativeMember> {
    let key = MethodKey::new(name, arity);
    find_in_hierarchy(definition, receiver, |rc| rc.methods.get(&key).map(|m| m.native))
}

/// Resolves `receiver.name(arity args)`.
pub fn lookup_method(definition: &Definition, receiver: &Value, name: &str, arity: usize) -> Result<DynamicHandle, ScriptError> {
    if receiver.is_null() {
        return Err(null_receiver("invoke method", name));
    }
    if let Some(member) = find_method(definition, receiver, name, arity) {
        return Ok(DynamicHandle::Method(member));
    }
    if let Value::Function(function) = receiver {
        if function.interface.is_none() {
            return Ok(DynamicHandle::Function);
        }
    }
    Err(ScriptError::illegal(format!(
        "Unable to find dynamic method [{}] with [{}] arguments for class [{}].",
        name,
        arity,
        receiver.class_name()
    )))
}

fn list_index(name: &str) -> Result<i32, ScriptError> {
    name.parse::<i32>()
        .map_err(|_| ScriptError::illegal(format!("Illegal list shortcut value [{}].", name)))
}

fn required(definition: &Definition, receiver: &Value, name: &str, arity: usize) -> Result<&'static NativeMember, ScriptError> {
    find_method(definition, receiver, name, arity).ok_or_else(|| {
        ScriptError::illegal(format!(
            "Unable to find dynamic method [{}] with [{}] arguments for class [{}].",
            name,
            arity,
            receiver.class_name()
        ))
    })
}

/// Resolves a read of `receiver.name`.
pub fn lookup_getter(definition: &Definition, receiver: &Value, name: &str) -> Result<DynamicHandle, ScriptError> {
    if receiver.is_null() {
        return Err(null_receiver("read field", name));
    }
    let found = find_in_hierarchy(definition, receiver, |rc| {
        rc.getters.get(name).map(|accessor| match accessor {
            Accessor::Field(field) => field.native,
            Accessor::Method(method) => method.native,
        })
    });
    if let Some(member) = found {
        return Ok(DynamicHandle::Getter(member));
    }
    match receiver {
        Value::Array(_) if name == "length" => Ok(DynamicHandle::ArrayLength),
        Value::Map(_) => Ok(DynamicHandle::MapGet {
            get: required(definition, receiver, "get", 1)?,
            key: Value::string(name),
        }),
        Value::List(_) => Ok(DynamicHandle::ListGet {
            get: required(definition, receiver, "get", 1)?,
            index: list_index(name)?,
        }),
        other => Err(ScriptError::illegal(format!(
            "Unable to find dynamic field [{}] for class [{}].",
            name,
            other.class_name()
        ))),
    }
}

/// Resolves a write of `receiver.name`.
pub fn lookup_setter(definition: &Definition, receiver: &Value, name: &str) -> Result<DynamicHandle, ScriptError> {
    if receiver.is_null() {
        return Err(null_receiver("write field", name));
    }
    if let Some(member) = find_in_hierarchy(definition, receiver, |rc| rc.setters.get(name).map(|m| m.native)) {
        return Ok(DynamicHandle::Setter(member));
    }
    match receiver {
        Value::Map(_) => Ok(DynamicHandle::MapPut {
            put: required(definition, receiver, "put", 2)?,
            key: Value::string(name),
        }),
        Value::List(_) => Ok(DynamicHandle::ListSet {
            set: required(definition, receiver, "set", 2)?,
            index: list_index(name)?,
        }),
        other => Err(ScriptError::illegal(format!(
            "Unable to find dynamic field [{}] for class [{}].",
            name,
            other.class_name()
        ))),
    }
}

/// Resolves `receiver[index]` for arrays, maps and lists alike.
pub fn lookup_array_load(definition: &Definition, receiver: &Value) -> Result<DynamicHandle, ScriptError> {
    match receiver {
        Value::Null => Err(null_receiver("load index of", "null")),
        Value::Array(_) => Ok(DynamicHandle::ArrayLoad),
        Value::Map(_) | Value::List(_) => Ok(DynamicHandle::IndexLoad(required(definition, receiver, "get", 1)?)),
        other => Err(not_an_array(other)),
    }
}

/// Resolves `receiver[index] = value` for arrays, maps and lists alike.
pub fn lookup_array_store(definition: &Definition, receiver: &Value) -> Result<DynamicHandle, ScriptError> {
    match receiver {
        Value::Null => Err(null_receiver("store index of", "null")),
        Value::Array(_) => Ok(DynamicHandle::ArrayStore),
        Value::Map(_) => Ok(DynamicHandle::IndexStore(required(definition, receiver, "put", 2)?)),
        Value::List(_) => Ok(DynamicHandle::IndexStore(required(definition, receiver, "set", 2)?)),
        other => Err(not_an_array(other)),
    }
}

fn element_index(array_len: usize, index: &Value) -> Result<usize, ScriptError> {
    let i = int_value(index)?;
    if i < 0 || i as usize >= array_len {
        return Err(ScriptError::IndexOutOfBounds(format!(
            "Index {} out of bounds for length {}",
            i, array_len
        )));
    }
    Ok(i as usize)
}

pub fn array_load(receiver: &Value, index: &Value) -> Result<Value, ScriptError> {
    match receiver {
        Value::Array(array) => {
            let elements = array.elements.borrow();
            let i = element_index(elements.len(), index)?;
            Ok(elements[i].clone())
        }
        Value::Null => Err(null_receiver("load index of", "null")),
        other => Err(not_an_array(other)),
    }
}

/// Converts a value to the representation of a primitive array
/// component. Reference components keep the value as is.
pub fn coerce_element(component: &str, value: Value) -> Result<Value, ScriptError> {
    let kind = match component {
        "boolean" => OperandKind::Bool,
        "byte" => OperandKind::Byte,
        "short" => OperandKind::Short,
        "char" => OperandKind::Char,
        "int" => OperandKind::Int,
        "long" => OperandKind::Long,
        "float" => OperandKind::Float,
        "double" => OperandKind::Double,
        _ => return Ok(value),
    };
    implicit(&value, kind, false, component)
}

pub fn array_store(receiver: &Value, index: &Value, value: Value) -> Result<Value, ScriptError> {
    match receiver {
        Value::Array(array) => {
            let value = coerce_element(array.component_name(), value)?;
            let mut elements = array.elements.borrow_mut();
            let i = element_index(elements.len(), index)?;
            elements[i] = value.clone();
            Ok(value)
        }
        Value::Null => Err(null_receiver("store index of", "null")),
        other => Err(not_an_array(other)),
    }
}

/// Finds the implementation of `owner::method` for a call with `arity`
/// arguments: a static method first, then an instance method taking its
/// receiver from the first argument, and `new` for constructors.
pub fn resolve_reference(definition: &Definition, owner: &str, method: &str, arity: usize) -> Option<&'static NativeMember> {
    let target = definition.struct_by_name(owner)?;
    if method == "new" {
        return target
            .constructors
            .get(&MethodKey::new(CONSTRUCTOR_NAME, arity))
            .map(|m| m.native);
    }
    if let Some(found) = target.static_methods.get(&MethodKey::new(method, arity)) {
        return Some(found.native);
    }
    if arity == 0 {
        return None;
    }
    target
        .methods
        .get(&MethodKey::new(method, arity - 1))
        .map(|m| m.native)
}

/// Resolves a method reference for a functional interface target.
pub fn lookup_reference(
    definition: &Definition,
    interface: &str,
    owner: &str,
    method: &str,
) -> Result<&'static NativeMember, ScriptError> {
    let iface = definition
        .get_type(interface)
        .map_err(|e| ScriptError::illegal(e.to_string()))?;
    let functional = definition.functional_method(&iface).ok_or_else(|| {
        ScriptError::illegal(format!(
            "Cannot convert function reference [{}::{}] to [{}], not a functional interface",
            owner, method, interface
        ))
    })?;
    resolve_reference(definition, owner, method, functional.arity()).ok_or_else(|| {
        ScriptError::illegal(format!(
            "Unknown reference [{}::{}] matching [{}]",
            owner, method, interface
        ))
    })
}

pub fn reference_value(interface: Option<&str>, member: &'static NativeMember) -> Value {
    Value::Function(Rc::new(FunctionValue {
        interface: interface.map(|s| s.to_string()),
        target: FunctionTarget::Native(member),
    }))
}

/// Whether `member` is usable as the body of a function value.
pub fn is_invocable(member: &NativeMember) -> bool {
    !matches!(member.kind, MemberKind::Field | MemberKind::StaticField)
}
