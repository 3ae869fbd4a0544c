//! The type registry.
//!
//! A [`Definition`] is the closed catalogue of every type, member and
//! conversion a script may use. It is assembled once by a
//! [`DefinitionBuilder`], then frozen and shared (it is `Send + Sync`)
//! between any number of concurrent compilations and running scripts.
//!
//! Method tables are flattened at `inherit` time, so static member lookup
//! on a [`Struct`] never walks a hierarchy. The dynamic runtime instead
//! uses the per-native-class [`RuntimeClass`] index.

pub mod builder;
mod runtime_class;
pub mod types;

use std::collections::HashMap;

use crate::runner::ds::error::DefinitionError;
use crate::runner::ds::native::NativeCatalog;

pub use builder::DefinitionBuilder;
pub use types::{
    Accessor, Cast, CastKind, Field, Method, MethodKey, RuntimeClass, Sort, Struct, StructId, Type,
};
use types::CastKey;

/// Frequently used types, resolved once at build time.
#[derive(Debug, Clone)]
pub struct CommonTypes {
    pub void: Type,
    pub boolean: Type,
    pub byte: Type,
    pub short: Type,
    pub char: Type,
    pub int: Type,
    pub long: Type,
    pub float: Type,
    pub double: Type,
    pub object: Type,
    pub def: Type,
    pub string: Type,
}

pub struct Definition {
    natives: &'static NativeCatalog,
    structs: Vec<Struct>,
    names: HashMap<String, StructId>,
    by_native: HashMap<&'static str, StructId>,
    casts: HashMap<CastKey, Cast>,
    runtime: Vec<RuntimeClass>,
    common: CommonTypes,
}

pub(crate) fn sort_for(name: &str) -> Sort {
    match name {
        "void" => Sort::Void,
        "boolean" => Sort::Bool,
        "byte" => Sort::Byte,
        "short" => Sort::Short,
        "char" => Sort::Char,
        "int" => Sort::Int,
        "long" => Sort::Long,
        "float" => Sort::Float,
        "double" => Sort::Double,
        "Boolean" => Sort::BoolObj,
        "Byte" => Sort::ByteObj,
        "Short" => Sort::ShortObj,
        "Character" => Sort::CharObj,
        "Integer" => Sort::IntObj,
        "Long" => Sort::LongObj,
        "Float" => Sort::FloatObj,
        "Double" => Sort::DoubleObj,
        "Number" => Sort::Number,
        "String" => Sort::String,
        "def" => Sort::Def,
        _ => Sort::Object,
    }
}

/// Splits `Name[][]` into its base name and dimension count.
pub(crate) fn split_type_name(name: &str) -> Result<(&str, usize), DefinitionError> {
    let base_end = name.find('[').unwrap_or_else(|| name.len());
    let (base, mut rest) = name.split_at(base_end);
    if base.is_empty() {
        return Err(DefinitionError::MalformedType(name.to_string()));
    }
    let mut dimensions = 0;
    while !rest.is_empty() {
        if !rest.starts_with("[]") {
            return Err(DefinitionError::MalformedType(name.to_string()));
        }
        rest = &rest[2..];
        dimensions += 1;
    }
    Ok((base, dimensions))
}

pub(crate) fn make_type(structs: &[Struct], names: &HashMap<String, StructId>, name: &str) -> Result<Type, DefinitionError> {
    let (base, dimensions) = split_type_name(name)?;
    let struct_id = *names
        .get(base)
        .ok_or_else(|| DefinitionError::UnknownType(name.to_string()))?;
    let base_struct = &structs[struct_id];
    if dimensions > 0 {
        if base_struct.name == "void" {
            return Err(DefinitionError::MalformedType(name.to_string()));
        }
        let native = if base_struct.name == "def" {
            format!("Object{}", &name[base.len()..])
        } else {
            format!("{}{}", base_struct.native.name, &name[base.len()..])
        };
        Ok(Type {
            name: name.to_string(),
            dimensions,
            struct_id,
            sort: Sort::Array,
            native,
        })
    } else {
        Ok(Type {
            name: base.to_string(),
            dimensions: 0,
            struct_id,
            sort: sort_for(base),
            native: base_struct.native.name.to_string(),
        })
    }
}

impl Definition {
    pub fn natives(&self) -> &'static NativeCatalog {
        self.natives
    }

    pub fn types(&self) -> &CommonTypes {
        &self.common
    }

    /// Looks up or synthesizes a type from its textual name, array
    /// brackets included.
    pub fn get_type(&self, name: &str) -> Result<Type, DefinitionError> {
        make_type(&self.structs, &self.names, name)
    }

    pub fn resolve(&self, name: &str) -> Result<Type, DefinitionError> {
        self.get_type(name)
    }

    pub fn is_type(&self, name: &str) -> bool {
        self.get_type(name).is_ok()
    }

    pub fn get_struct(&self, id: StructId) -> &Struct {
        &self.structs[id]
    }

    pub fn struct_by_name(&self, name: &str) -> Option<&Struct> {
        self.names.get(name).map(|id| &self.structs[*id])
    }

    /// Struct used for member lookup on a value of `typ`. Arrays only
    /// expose what `Object` does.
    pub fn struct_of(&self, typ: &Type) -> &Struct {
        if typ.is_array() {
            if let Some(object) = self.struct_by_name("Object") {
                return object;
            }
        }
        &self.structs[typ.struct_id]
    }

    pub fn runtime_class(&self, native_name: &str) -> Option<&RuntimeClass> {
        self.by_native.get(native_name).map(|id| &self.runtime[*id])
    }

    pub fn struct_for_native(&self, native_name: &str) -> Option<&Struct> {
        self.by_native.get(native_name).map(|id| &self.structs[*id])
    }

    pub fn element_type(&self, array: &Type) -> Result<Type, DefinitionError> {
        if !array.is_array() {
            return Err(DefinitionError::Illegal(format!("[{}] is not an array type", array.name)));
        }
        self.get_type(&array.name[..array.name.len() - 2])
    }

    pub fn boxed(&self, typ: &Type) -> Type {
        let name = match typ.sort {
            Sort::Bool => "Boolean",
            Sort::Byte => "Byte",
            Sort::Short => "Short",
            Sort::Char => "Character",
            Sort::Int => "Integer",
            Sort::Long => "Long",
            Sort::Float => "Float",
            Sort::Double => "Double",
            _ => return typ.clone(),
        };
        self.get_type(name).unwrap_or_else(|_| typ.clone())
    }

    pub fn unboxed(&self, typ: &Type) -> Type {
        let name = match typ.sort {
            Sort::BoolObj => "boolean",
            Sort::ByteObj => "byte",
            Sort::ShortObj => "short",
            Sort::CharObj => "char",
            Sort::IntObj => "int",
            Sort::LongObj => "long",
            Sort::FloatObj => "float",
            Sort::DoubleObj => "double",
            _ => return typ.clone(),
        };
        self.get_type(name).unwrap_or_else(|_| typ.clone())
    }

    /// Static subtyping: a value of `from` may be used as `to` with no
    /// conversion.
    pub fn is_assignable(&self, from: &Type, to: &Type) -> bool {
        if from == to || to.is_def() {
            return true;
        }
        if from.is_def() || from.sort.is_primitive() || to.sort.is_primitive() {
            return false;
        }
        if to.name == "Object" {
            return true;
        }
        if from.is_array() || to.is_array() {
            return false;
        }
        self.structs[from.struct_id].supers.iter().any(|s| *s == to.name)
    }

    /// The conversion from `from` to `to`, or `None` when it is illegal.
    /// Identity yields a no-op cast. An explicit query also accepts every
    /// implicit conversion.
    pub fn transform(&self, from: &Type, to: &Type, explicit: bool) -> Option<Cast> {
        if from == to {
            return Some(self.noop(from, to, explicit));
        }
        let key = |explicit| CastKey {
            from: from.name.clone(),
            to: to.name.clone(),
            explicit,
        };
        if explicit {
            if let Some(cast) = self.casts.get(&key(true)) {
                return Some(cast.clone());
            }
        }
        if let Some(cast) = self.casts.get(&key(false)) {
            return Some(cast.clone());
        }

        if from.sort.is_primitive() {
            // Boxing is free at run time; the box must still be assignable.
            if from.is_void() {
                return None;
            }
            let boxed = self.boxed(from);
            if to.is_def() || (boxed != *from && to.is_reference() && self.is_assignable(&boxed, to)) {
                return Some(self.noop(from, to, explicit));
            }
            return None;
        }
        if to.sort.is_primitive() {
            return None;
        }
        if self.is_assignable(from, to) {
            return Some(self.noop(from, to, explicit));
        }
        if from.is_def() || (explicit && self.is_assignable(to, from)) {
            return Some(Cast {
                from: from.clone(),
                to: to.clone(),
                explicit,
                kind: CastKind::Checked,
            });
        }
        None
    }

    fn noop(&self, from: &Type, to: &Type, explicit: bool) -> Cast {
        Cast {
            from: from.clone(),
            to: to.clone(),
            explicit,
            kind: CastKind::Upcast,
        }
    }

    /// The single abstract method of a functional interface.
    pub fn functional_method(&self, typ: &Type) -> Option<&Method> {
        if typ.is_array() || typ.is_def() {
            return None;
        }
        self.structs[typ.struct_id].functional_method.as_ref()
    }

    pub fn struct_count(&self) -> usize {
        self.structs.len()
    }
}

impl std::fmt::Debug for Definition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Definition({} structs, {} casts)",
            self.structs.len(),
            self.casts.len()
        )
    }
}
