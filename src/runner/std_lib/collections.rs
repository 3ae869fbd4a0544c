//! Lists, sets, maps and iteration.
//!
//! Values back every collection type with shared interior-mutable storage,
//! so the interface natives (`Collection`, `List`, `Map`) work on any
//! receiver of the matching shape. `keySet`, `values` and `subList` return
//! copies rather than live views.

use std::cell::{RefCell, RefMut};
use std::cmp::Ordering;

use crate::runner::def::conversion::{bool_value, int_arg, int_value};
use crate::runner::definition::DefinitionBuilder;
use crate::runner::ds::error::{DefinitionError, ScriptError};
use crate::runner::ds::native::{Invoker, NativeCatalog, NativeClass, NativeMember};
use crate::runner::ds::value::Value;
use crate::runner::std_lib::lang::natural_compare;
use crate::runner::std_lib::{arg, list_of, map_of};

type NativeResult = Result<Value, ScriptError>;

/// The elements an iteration over `value` visits, copied out so callbacks
/// may mutate the source.
pub fn items_of(value: &Value) -> Result<Vec<Value>, ScriptError> {
    match value {
        Value::List(list) => Ok(list.borrow().clone()),
        Value::Set(set) => Ok(set.borrow().iter().cloned().collect()),
        Value::Map(map) => Ok(map.borrow().keys().cloned().collect()),
        Value::Array(array) => Ok(array.elements.borrow().clone()),
        Value::Iterator(iterator) => {
            let state = iterator.borrow();
            Ok(state.items[state.position..].to_vec())
        }
        Value::Null => Err(ScriptError::NullPointer("cannot iterate over null".to_string())),
        other => Err(ScriptError::illegal(format!(
            "Cannot iterate over [{}]",
            other.class_name()
        ))),
    }
}

/// An iterator over a snapshot of `value`.
pub fn snapshot(value: &Value) -> NativeResult {
    match value {
        Value::Iterator(_) => Ok(value.clone()),
        other => Ok(Value::new_iterator(items_of(other)?)),
    }
}

fn out_of_bounds(index: i32, length: usize) -> ScriptError {
    ScriptError::IndexOutOfBounds(format!("Index {} out of bounds for length {}", index, length))
}

fn checked_index(index: i32, length: usize) -> Result<usize, ScriptError> {
    if index < 0 || index as usize >= length {
        Err(out_of_bounds(index, length))
    } else {
        Ok(index as usize)
    }
}

/// Write access to a collection. A collection that is already borrowed
/// is being read or written further up the call, which is reported
/// instead of panicking.
fn modify<T>(storage: &RefCell<T>) -> Result<RefMut<'_, T>, ScriptError> {
    storage
        .try_borrow_mut()
        .map_err(|_| ScriptError::IllegalState("concurrent modification".to_string()))
}

fn not_a_collection(value: &Value) -> ScriptError {
    match value {
        Value::Null => ScriptError::NullPointer("collection is null".to_string()),
        other => ScriptError::class_cast(&other.class_name(), "Collection"),
    }
}

// ── Iterable / Collection ──

fn iterable_iterator(_: &mut dyn Invoker, this: &Value, _: &[Value]) -> NativeResult {
    snapshot(this)
}

fn iterable_for_each(invoker: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let action = arg(args, 0);
    for item in items_of(this)? {
        invoker.call_function(action, &[item])?;
    }
    Ok(Value::Null)
}

fn collection_add(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let item = arg(args, 0).clone();
    match this {
        Value::List(list) => {
            modify(list)?.push(item);
            Ok(Value::Bool(true))
        }
        Value::Set(set) => Ok(Value::Bool(modify(set)?.insert(item))),
        other => Err(not_a_collection(other)),
    }
}

fn collection_add_all(invoker: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let mut changed = false;
    for item in items_of(arg(args, 0))? {
        changed |= bool_value(&collection_add(invoker, this, &[item])?)?;
    }
    Ok(Value::Bool(changed))
}

fn collection_clear(_: &mut dyn Invoker, this: &Value, _: &[Value]) -> NativeResult {
    match this {
        Value::List(list) => modify(list)?.clear(),
        Value::Set(set) => modify(set)?.clear(),
        Value::Map(map) => modify(map)?.clear(),
        other => return Err(not_a_collection(other)),
    }
    Ok(Value::Null)
}

fn collection_contains(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let item = arg(args, 0);
    match this {
        Value::List(list) => Ok(Value::Bool(list.borrow().contains(item))),
        Value::Set(set) => Ok(Value::Bool(set.borrow().contains(item))),
        other => Err(not_a_collection(other)),
    }
}

fn collection_size(_: &mut dyn Invoker, this: &Value, _: &[Value]) -> NativeResult {
    let size = match this {
        Value::List(list) => list.borrow().len(),
        Value::Set(set) => set.borrow().len(),
        Value::Map(map) => map.borrow().len(),
        other => return Err(not_a_collection(other)),
    };
    Ok(Value::Int(size as i32))
}

fn collection_is_empty(invoker: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Bool(int_value(&collection_size(invoker, this, args)?)? == 0))
}

fn collection_remove(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let item = arg(args, 0);
    match this {
        Value::List(list) => {
            let mut list = modify(list)?;
            match list.iter().position(|v| v == item) {
                Some(i) => {
                    list.remove(i);
                    Ok(Value::Bool(true))
                }
                None => Ok(Value::Bool(false)),
            }
        }
        Value::Set(set) => Ok(Value::Bool(modify(set)?.remove(item))),
        other => Err(not_a_collection(other)),
    }
}

fn collection_remove_if(invoker: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let filter = arg(args, 0);
    let mut doomed = vec![];
    for item in items_of(this)? {
        if bool_value(&invoker.call_function(filter, &[item.clone()])?)? {
            doomed.push(item);
        }
    }
    match this {
        Value::List(list) => modify(list)?.retain(|v| !doomed.contains(v)),
        Value::Set(set) => modify(set)?.retain(|v| !doomed.contains(v)),
        other => return Err(not_a_collection(other)),
    }
    Ok(Value::Bool(!doomed.is_empty()))
}

pub static ITERABLE: NativeClass = NativeClass {
    name: "Iterable",
    superclass: None,
    interfaces: &[],
    is_interface: true,
    members: &[
        NativeMember::abstract_method("iterator", &[], "Iterator", iterable_iterator),
        NativeMember::default_method("forEach", &["Consumer"], "void", iterable_for_each),
    ],
};

pub static COLLECTION: NativeClass = NativeClass {
    name: "Collection",
    superclass: None,
    interfaces: &["Iterable"],
    is_interface: true,
    members: &[
        NativeMember::abstract_method("add", &["Object"], "boolean", collection_add),
        NativeMember::abstract_method("addAll", &["Collection"], "boolean", collection_add_all),
        NativeMember::abstract_method("clear", &[], "void", collection_clear),
        NativeMember::abstract_method("contains", &["Object"], "boolean", collection_contains),
        NativeMember::abstract_method("isEmpty", &[], "boolean", collection_is_empty),
        NativeMember::abstract_method("remove", &["Object"], "boolean", collection_remove),
        NativeMember::abstract_method("size", &[], "int", collection_size),
        NativeMember::default_method("removeIf", &["Predicate"], "boolean", collection_remove_if),
    ],
};

// ── List ──

fn list_insert(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let list = list_of(this)?;
    let index = int_arg(args, 0)?;
    let mut list = modify(&list)?;
    if index < 0 || index as usize > list.len() {
        return Err(out_of_bounds(index, list.len()));
    }
    list.insert(index as usize, arg(args, 1).clone());
    Ok(Value::Null)
}

fn list_get(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let list = list_of(this)?;
    let list = list.borrow();
    let index = checked_index(int_arg(args, 0)?, list.len())?;
    Ok(list[index].clone())
}

fn list_set(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let list = list_of(this)?;
    let mut list = modify(&list)?;
    let index = checked_index(int_arg(args, 0)?, list.len())?;
    Ok(std::mem::replace(&mut list[index], arg(args, 1).clone()))
}

fn list_index_of(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let item = arg(args, 0);
    let found = list_of(this)?.borrow().iter().position(|v| v == item);
    Ok(Value::Int(found.map(|i| i as i32).unwrap_or(-1)))
}

fn list_last_index_of(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let item = arg(args, 0);
    let found = list_of(this)?.borrow().iter().rposition(|v| v == item);
    Ok(Value::Int(found.map(|i| i as i32).unwrap_or(-1)))
}

fn list_remove_at(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let list = list_of(this)?;
    let mut list = modify(&list)?;
    let index = checked_index(int_arg(args, 0)?, list.len())?;
    Ok(list.remove(index))
}

/// Sorts `items` with a comparator function, or by natural order when the
/// comparator is null. The first callback error aborts the sort.
pub fn sort_values(invoker: &mut dyn Invoker, items: &mut Vec<Value>, comparator: &Value) -> Result<(), ScriptError> {
    let mut failure = None;
    items.sort_by(|a, b| {
        if failure.is_some() {
            return Ordering::Equal;
        }
        let result = if comparator.is_null() {
            natural_compare(a, b)
        } else {
            invoker
                .call_function(comparator, &[a.clone(), b.clone()])
                .and_then(|v| int_value(&v))
        };
        match result {
            Ok(order) => order.cmp(&0),
            Err(e) => {
                failure = Some(e);
                Ordering::Equal
            }
        }
    });
    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Sorts a copy and writes it back, failing if the comparator changed the
/// list in the meantime.
fn list_sort(invoker: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let list = list_of(this)?;
    let before = list.borrow().clone();
    let mut items = before.clone();
    sort_values(invoker, &mut items, arg(args, 0))?;
    let mut current = modify(&list)?;
    let untouched = current.len() == before.len() && current.iter().zip(before.iter()).all(|(a, b)| a.same(b));
    if !untouched {
        return Err(ScriptError::IllegalState("list was modified while sorting".to_string()));
    }
    *current = items;
    Ok(Value::Null)
}

fn list_sub_list(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let list = list_of(this)?;
    let list = list.borrow();
    let from = int_arg(args, 0)?;
    let to = int_arg(args, 1)?;
    if from < 0 || to as usize > list.len() || from > to {
        return Err(ScriptError::IndexOutOfBounds(format!(
            "fromIndex {}, toIndex {}, size {}",
            from,
            to,
            list.len()
        )));
    }
    Ok(Value::new_list(list[from as usize..to as usize].to_vec()))
}

pub static LIST: NativeClass = NativeClass {
    name: "List",
    superclass: None,
    interfaces: &["Collection"],
    is_interface: true,
    members: &[
        NativeMember::abstract_method("add", &["int", "Object"], "void", list_insert),
        NativeMember::abstract_method("get", &["int"], "Object", list_get),
        NativeMember::abstract_method("set", &["int", "Object"], "Object", list_set),
        NativeMember::abstract_method("indexOf", &["Object"], "int", list_index_of),
        NativeMember::abstract_method("lastIndexOf", &["Object"], "int", list_last_index_of),
        NativeMember::abstract_method("remove", &["int"], "Object", list_remove_at),
        NativeMember::abstract_method("subList", &["int", "int"], "List", list_sub_list),
        NativeMember::default_method("sort", &["Comparator"], "void", list_sort),
    ],
};

fn array_list_new(_: &mut dyn Invoker, _: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::new_list(vec![]))
}

fn array_list_copy(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::new_list(items_of(arg(args, 0))?))
}

pub static ARRAY_LIST: NativeClass = NativeClass {
    name: "ArrayList",
    superclass: Some("Object"),
    interfaces: &["List"],
    is_interface: false,
    members: &[
        NativeMember::constructor(&[], array_list_new),
        NativeMember::constructor(&["Collection"], array_list_copy),
    ],
};

// ── Set ──

pub static SET: NativeClass = NativeClass {
    name: "Set",
    superclass: None,
    interfaces: &["Collection"],
    is_interface: true,
    members: &[],
};

fn hash_set_new(_: &mut dyn Invoker, _: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::new_set(vec![]))
}

fn hash_set_copy(_: &mut dyn Invoker, _: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::new_set(items_of(arg(args, 0))?))
}

pub static HASH_SET: NativeClass = NativeClass {
    name: "HashSet",
    superclass: Some("Object"),
    interfaces: &["Set"],
    is_interface: false,
    members: &[
        NativeMember::constructor(&[], hash_set_new),
        NativeMember::constructor(&["Collection"], hash_set_copy),
    ],
};

// ── Map ──

fn map_get(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    Ok(map_of(this)?.borrow().get(arg(args, 0)).cloned().unwrap_or(Value::Null))
}

fn map_put(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let map = map_of(this)?;
    let (key, value) = (arg(args, 0).clone(), arg(args, 1).clone());
    let previous = modify(&map)?.insert(key, value);
    Ok(previous.unwrap_or(Value::Null))
}

fn map_contains_key(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    Ok(Value::Bool(map_of(this)?.borrow().contains_key(arg(args, 0))))
}

fn map_contains_value(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let value = arg(args, 0);
    Ok(Value::Bool(map_of(this)?.borrow().values().any(|v| v == value)))
}

fn map_remove(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let map = map_of(this)?;
    let previous = modify(&map)?.remove(arg(args, 0));
    Ok(previous.unwrap_or(Value::Null))
}

fn map_key_set(_: &mut dyn Invoker, this: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::new_set(map_of(this)?.borrow().keys().cloned()))
}

fn map_values(_: &mut dyn Invoker, this: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::new_list(map_of(this)?.borrow().values().cloned().collect()))
}

fn map_get_or_default(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let found = map_of(this)?.borrow().get(arg(args, 0)).cloned();
    Ok(found.unwrap_or_else(|| arg(args, 1).clone()))
}

fn map_put_all(_: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let entries: Vec<(Value, Value)> = map_of(arg(args, 0))?
        .borrow()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let map = map_of(this)?;
    modify(&map)?.extend(entries);
    Ok(Value::Null)
}

fn map_for_each(invoker: &mut dyn Invoker, this: &Value, args: &[Value]) -> NativeResult {
    let action = arg(args, 0);
    let entries: Vec<(Value, Value)> = map_of(this)?
        .borrow()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    for (key, value) in entries {
        invoker.call_function(action, &[key, value])?;
    }
    Ok(Value::Null)
}

pub static MAP: NativeClass = NativeClass {
    name: "Map",
    superclass: None,
    interfaces: &[],
    is_interface: true,
    members: &[
        NativeMember::abstract_method("get", &["Object"], "Object", map_get),
        NativeMember::abstract_method("put", &["Object", "Object"], "Object", map_put),
        NativeMember::abstract_method("containsKey", &["Object"], "boolean", map_contains_key),
        NativeMember::abstract_method("containsValue", &["Object"], "boolean", map_contains_value),
        NativeMember::abstract_method("remove", &["Object"], "Object", map_remove),
        NativeMember::abstract_method("size", &[], "int", collection_size),
        NativeMember::abstract_method("isEmpty", &[], "boolean", collection_is_empty),
        NativeMember::abstract_method("clear", &[], "void", collection_clear),
        NativeMember::abstract_method("keySet", &[], "Set", map_key_set),
        NativeMember::abstract_method("values", &[], "Collection", map_values),
        NativeMember::default_method("getOrDefault", &["Object", "Object"], "Object", map_get_or_default),
        NativeMember::abstract_method("putAll", &["Map"], "void", map_put_all),
        NativeMember::default_method("forEach", &["BiConsumer"], "void", map_for_each),
    ],
};

fn hash_map_new(_: &mut dyn Invoker, _: &Value, _: &[Value]) -> NativeResult {
    Ok(Value::new_map(vec![]))
}

pub static HASH_MAP: NativeClass = NativeClass {
    name: "HashMap",
    superclass: Some("Object"),
    interfaces: &["Map"],
    is_interface: false,
    members: &[NativeMember::constructor(&[], hash_map_new)],
};

// ── Iterator ──

fn iterator_has_next(_: &mut dyn Invoker, this: &Value, _: &[Value]) -> NativeResult {
    match this {
        Value::Iterator(state) => Ok(Value::Bool(state.borrow().has_next())),
        other => Err(ScriptError::class_cast(&other.class_name(), "Iterator")),
    }
}

fn iterator_next(_: &mut dyn Invoker, this: &Value, _: &[Value]) -> NativeResult {
    match this {
        Value::Iterator(state) => state
            .borrow_mut()
            .next()
            .ok_or_else(|| ScriptError::IllegalState("no more elements".to_string())),
        other => Err(ScriptError::class_cast(&other.class_name(), "Iterator")),
    }
}

pub static ITERATOR: NativeClass = NativeClass {
    name: "Iterator",
    superclass: None,
    interfaces: &[],
    is_interface: true,
    members: &[
        NativeMember::abstract_method("hasNext", &[], "boolean", iterator_has_next),
        NativeMember::abstract_method("next", &[], "Object", iterator_next),
    ],
};

/// Runtime class of iterator values. Not whitelisted itself; dispatch
/// reaches `Iterator` through it.
pub static SNAPSHOT_ITERATOR: NativeClass = NativeClass {
    name: "SnapshotIterator",
    superclass: Some("Object"),
    interfaces: &["Iterator"],
    is_interface: false,
    members: &[],
};

pub fn add_natives(catalog: &mut NativeCatalog) {
    for class in [
        &ITERABLE,
        &COLLECTION,
        &LIST,
        &ARRAY_LIST,
        &SET,
        &HASH_SET,
        &MAP,
        &HASH_MAP,
        &ITERATOR,
        &SNAPSHOT_ITERATOR,
    ]
    .iter()
    {
        catalog.add(*class);
    }
}

pub fn declare(builder: &mut DefinitionBuilder) -> Result<(), DefinitionError> {
    builder
        .register("Iterable", "Iterable")?
        .register("Collection", "Collection")?
        .register("List", "List")?
        .register("ArrayList", "ArrayList")?
        .register("Set", "Set")?
        .register("HashSet", "HashSet")?
        .register("Map", "Map")?
        .register("HashMap", "HashMap")?
        .register("Iterator", "Iterator")?;
    Ok(())
}

pub fn register(builder: &mut DefinitionBuilder) -> Result<(), DefinitionError> {
    builder
        .register_method("Iterable", "iterator", false, "Iterator", &[])?
        .register_method("Iterable", "forEach", false, "void", &["Consumer"])?;

    builder
        .register_method("Collection", "add", false, "boolean", &["def"])?
        .register_method("Collection", "addAll", false, "boolean", &["Collection"])?
        .register_method("Collection", "clear", false, "void", &[])?
        .register_method("Collection", "contains", false, "boolean", &["def"])?
        .register_method("Collection", "isEmpty", false, "boolean", &[])?
        .register_method("Collection", "remove", false, "boolean", &["def"])?
        .register_method("Collection", "size", false, "int", &[])?
        .register_method("Collection", "removeIf", false, "boolean", &["Predicate"])?;

    builder
        .register_method("List", "add", false, "void", &["int", "def"])?
        .register_method("List", "get", false, "def", &["int"])?
        .register_method("List", "set", false, "def", &["int", "def"])?
        .register_method("List", "indexOf", false, "int", &["def"])?
        .register_method("List", "lastIndexOf", false, "int", &["def"])?
        .register_method("List", "remove", false, "def", &["int"])?
        .register_method("List", "subList", false, "List", &["int", "int"])?
        .register_method("List", "sort", false, "void", &["Comparator"])?
        .register_constructor("ArrayList", &[])?
        .register_constructor("ArrayList", &["Collection"])?;

    builder
        .register_constructor("HashSet", &[])?
        .register_constructor("HashSet", &["Collection"])?;

    builder
        .register_method("Map", "get", false, "def", &["def"])?
        .register_method("Map", "put", false, "def", &["def", "def"])?
        .register_method("Map", "containsKey", false, "boolean", &["def"])?
        .register_method("Map", "containsValue", false, "boolean", &["def"])?
        .register_method("Map", "remove", false, "def", &["def"])?
        .register_method("Map", "size", false, "int", &[])?
        .register_method("Map", "isEmpty", false, "boolean", &[])?
        .register_method("Map", "clear", false, "void", &[])?
        .register_method("Map", "keySet", false, "Set", &[])?
        .register_method("Map", "values", false, "Collection", &[])?
        .register_method("Map", "getOrDefault", false, "def", &["def", "def"])?
        .register_method("Map", "putAll", false, "void", &["Map"])?
        .register_method("Map", "forEach", false, "void", &["BiConsumer"])?
        .register_constructor("HashMap", &[])?;

    builder
        .register_method("Iterator", "hasNext", false, "boolean", &[])?
        .register_method("Iterator", "next", false, "def", &[])?;
    Ok(())
}

pub fn inherit(builder: &mut DefinitionBuilder) -> Result<(), DefinitionError> {
    builder
        .inherit("Iterable", &["Object"])?
        .inherit("Collection", &["Iterable", "Object"])?
        .inherit("List", &["Collection", "Iterable", "Object"])?
        .inherit("ArrayList", &["List", "Collection", "Iterable", "Object"])?
        .inherit("Set", &["Collection", "Iterable", "Object"])?
        .inherit("HashSet", &["Set", "Collection", "Iterable", "Object"])?
        .inherit("Map", &["Object"])?
        .inherit("HashMap", &["Map", "Object"])?
        .inherit("Iterator", &["Object"])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Natural;

    impl Invoker for Natural {
        fn call_function(&mut self, _: &Value, args: &[Value]) -> Result<Value, ScriptError> {
            natural_compare(&args[1], &args[0]).map(Value::Int)
        }
    }

    #[test]
    fn sorts_with_and_without_comparator() {
        let mut items = vec![Value::Int(3), Value::Int(1), Value::Int(2)];
        sort_values(&mut Natural, &mut items, &Value::Null).unwrap();
        assert_eq!(items, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);

        let reversed = Value::string("reversed");
        sort_values(&mut Natural, &mut items, &reversed).unwrap();
        assert_eq!(items, vec![Value::Int(3), Value::Int(2), Value::Int(1)]);
    }

    #[test]
    fn iteration_works_on_a_snapshot() {
        let list = Value::new_list(vec![Value::Int(1)]);
        let iterator = snapshot(&list).unwrap();
        if let Value::List(inner) = &list {
            inner.borrow_mut().push(Value::Int(2));
        }
        assert_eq!(items_of(&iterator).unwrap(), vec![Value::Int(1)]);
    }
}
