//! Single-threaded assembly of a [`Definition`].

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::runner::definition::types::{Cast, CastKey, CastKind, Field, Method, MethodKey, Struct, StructId, Type};
use crate::runner::definition::{make_type, runtime_class, CommonTypes, Definition};
use crate::runner::ds::error::DefinitionError;
use crate::runner::ds::native::{MemberKind, NativeCatalog, CONSTRUCTOR_NAME};

/// Mutable registry under construction. Every operation validates its
/// input against the native catalogue and fails with a
/// [`DefinitionError`]; [`DefinitionBuilder::build`] freezes the result.
pub struct DefinitionBuilder {
    natives: &'static NativeCatalog,
    structs: Vec<Struct>,
    names: HashMap<String, StructId>,
    by_native: HashMap<&'static str, StructId>,
    casts: HashMap<CastKey, Cast>,
}

impl fmt::Debug for DefinitionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefinitionBuilder")
            .field("structs", &self.names.keys().collect::<Vec<_>>())
            .field("casts", &self.casts.len())
            .finish()
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl DefinitionBuilder {
    pub fn new(natives: &'static NativeCatalog) -> Self {
        DefinitionBuilder {
            natives,
            structs: vec![],
            names: HashMap::new(),
            by_native: HashMap::new(),
            casts: HashMap::new(),
        }
    }

    pub fn get_type(&self, name: &str) -> Result<Type, DefinitionError> {
        make_type(&self.structs, &self.names, name)
    }

    fn struct_id(&self, owner: &str) -> Result<StructId, DefinitionError> {
        self.names
            .get(owner)
            .copied()
            .ok_or_else(|| DefinitionError::UnknownOwner(owner.to_string()))
    }

    /// Adds a struct named `name` backed by the native class `native`.
    pub fn register(&mut self, name: &str, native: &str) -> Result<&mut Self, DefinitionError> {
        if !is_valid_name(name) {
            return Err(DefinitionError::InvalidName(name.to_string()));
        }
        if self.names.contains_key(name) {
            return Err(DefinitionError::DuplicateStruct(name.to_string()));
        }
        let native_class = self
            .natives
            .get(native)
            .ok_or_else(|| DefinitionError::NativeNotFound(native.to_string()))?;
        let id = self.structs.len();
        // `def` shares its native class with `Object`.
        if name != "def" {
            if let Some(existing) = self.by_native.get(native_class.name) {
                return Err(DefinitionError::DuplicateNative {
                    native: native.to_string(),
                    existing: self.structs[*existing].name.clone(),
                });
            }
            self.by_native.insert(native_class.name, id);
        }
        self.structs.push(Struct::new(name, native_class));
        self.names.insert(name.to_string(), id);
        Ok(self)
    }

    fn types(&self, names: &[&str]) -> Result<Vec<Type>, DefinitionError> {
        names.iter().map(|n| self.get_type(n)).collect()
    }

    /// Declared types may narrow the native ones but never widen them.
    fn check_compatible(&self, owner: &str, member: &str, declared: &Type, native: &str) -> Result<(), DefinitionError> {
        let compatible = if declared.is_def() {
            !crate::runner::ds::native::PRIMITIVES.contains(&native)
        } else {
            self.natives.is_assignable(&declared.native, native)
        };
        if compatible {
            Ok(())
        } else {
            Err(DefinitionError::GenericMismatch {
                owner: owner.to_string(),
                member: member.to_string(),
                declared: declared.name.clone(),
                native: native.to_string(),
            })
        }
    }

    fn check_key_free(&self, id: StructId, kind: &'static str, key: &MethodKey) -> Result<(), DefinitionError> {
        let owner = &self.structs[id];
        if owner.constructors.contains_key(key)
            || owner.methods.contains_key(key)
            || owner.static_methods.contains_key(key)
        {
            return Err(DefinitionError::DuplicateMember {
                kind,
                owner: owner.name.clone(),
                name: key.name.clone(),
                arity: key.arity,
            });
        }
        Ok(())
    }

    pub fn register_constructor(&mut self, owner: &str, args: &[&str]) -> Result<&mut Self, DefinitionError> {
        let id = self.struct_id(owner)?;
        let key = MethodKey::new(CONSTRUCTOR_NAME, args.len());
        self.check_key_free(id, "constructor", &key)?;
        let native_name = self.structs[id].native.name;
        let native = self
            .natives
            .find_member(native_name, MemberKind::Constructor, CONSTRUCTOR_NAME, args.len())
            .ok_or_else(|| DefinitionError::MemberNotFound {
                kind: "constructor",
                native: native_name.to_string(),
                name: CONSTRUCTOR_NAME.to_string(),
                arity: args.len(),
            })?;
        let arg_types = self.types(args)?;
        for (declared, native_param) in arg_types.iter().zip(native.params.iter()) {
            self.check_compatible(owner, CONSTRUCTOR_NAME, declared, native_param)?;
        }
        let ret = self.get_type(owner)?;
        let method = Method {
            name: CONSTRUCTOR_NAME.to_string(),
            owner: owner.to_string(),
            ret,
            args: arg_types,
            native,
        };
        self.structs[id].constructors.insert(key, method);
        Ok(self)
    }

    pub fn register_method(
        &mut self,
        owner: &str,
        name: &str,
        is_static: bool,
        ret: &str,
        args: &[&str],
    ) -> Result<&mut Self, DefinitionError> {
        let id = self.struct_id(owner)?;
        if !is_valid_name(name) {
            return Err(DefinitionError::InvalidName(name.to_string()));
        }
        let key = MethodKey::new(name, args.len());
        self.check_key_free(id, "method", &key)?;
        let kind = if is_static {
            MemberKind::StaticMethod
        } else {
            MemberKind::Method
        };
        let native_name = self.structs[id].native.name;
        let native = self
            .natives
            .find_member(native_name, kind, name, args.len())
            .ok_or_else(|| DefinitionError::MemberNotFound {
                kind: if is_static { "static method" } else { "method" },
                native: native_name.to_string(),
                name: name.to_string(),
                arity: args.len(),
            })?;
        let ret_type = self.get_type(ret)?;
        self.check_compatible(owner, name, &ret_type, native.ret)?;
        let arg_types = self.types(args)?;
        for (declared, native_param) in arg_types.iter().zip(native.params.iter()) {
            self.check_compatible(owner, name, declared, native_param)?;
        }
        let method = Method {
            name: name.to_string(),
            owner: owner.to_string(),
            ret: ret_type,
            args: arg_types,
            native,
        };
        let target = &mut self.structs[id];
        if is_static {
            target.static_methods.insert(key, method);
        } else {
            target.methods.insert(key, method);
        }
        Ok(self)
    }

    pub fn register_field(&mut self, owner: &str, name: &str, is_static: bool, typ: &str) -> Result<&mut Self, DefinitionError> {
        let id = self.struct_id(owner)?;
        let exists = if is_static {
            self.structs[id].static_members.contains_key(name)
        } else {
            self.structs[id].members.contains_key(name)
        };
        if exists {
            return Err(DefinitionError::DuplicateMember {
                kind: "field",
                owner: owner.to_string(),
                name: name.to_string(),
                arity: 0,
            });
        }
        let kind = if is_static {
            MemberKind::StaticField
        } else {
            MemberKind::Field
        };
        let native_name = self.structs[id].native.name;
        let native = self
            .natives
            .find_member(native_name, kind, name, 0)
            .ok_or_else(|| DefinitionError::MemberNotFound {
                kind: "field",
                native: native_name.to_string(),
                name: name.to_string(),
                arity: 0,
            })?;
        let field_type = self.get_type(typ)?;
        self.check_compatible(owner, name, &field_type, native.ret)?;
        let field = Field {
            name: name.to_string(),
            owner: owner.to_string(),
            typ: field_type,
            native,
        };
        let target = &mut self.structs[id];
        if is_static {
            target.static_members.insert(name.to_string(), field);
        } else {
            target.members.insert(name.to_string(), field);
        }
        Ok(self)
    }

    /// Copies instance methods and fields of each parent into `child`
    /// where the child does not already define them, and records the
    /// parents (and their ancestors) as supertypes.
    pub fn inherit(&mut self, child: &str, parents: &[&str]) -> Result<&mut Self, DefinitionError> {
        let child_id = self.struct_id(child)?;
        for parent in parents {
            let parent_id = self.struct_id(parent)?;
            if parent_id == child_id {
                return Err(DefinitionError::Illegal(format!("struct [{}] cannot inherit itself", child)));
            }
            let methods: Vec<(MethodKey, Method)> = self.structs[parent_id]
                .methods
                .iter()
                .map(|(k, m)| (k.clone(), m.clone()))
                .collect();
            let fields: Vec<(String, Field)> = self.structs[parent_id]
                .members
                .iter()
                .map(|(k, f)| (k.clone(), f.clone()))
                .collect();
            let mut supers = vec![parent.to_string()];
            supers.extend(self.structs[parent_id].supers.iter().cloned());

            let target = &mut self.structs[child_id];
            for (key, method) in methods {
                if !target.static_methods.contains_key(&key) {
                    target.methods.entry(key).or_insert(method);
                }
            }
            for (name, field) in fields {
                target.members.entry(name).or_insert(field);
            }
            for s in supers {
                if !target.supers.contains(&s) {
                    target.supers.push(s);
                }
            }
        }
        Ok(self)
    }

    fn insert_cast(&mut self, cast: Cast) -> Result<&mut Self, DefinitionError> {
        let key = CastKey {
            from: cast.from.name.clone(),
            to: cast.to.name.clone(),
            explicit: cast.explicit,
        };
        if self.casts.contains_key(&key) {
            return Err(DefinitionError::DuplicateCast {
                from: key.from,
                to: key.to,
                explicit: key.explicit,
            });
        }
        self.casts.insert(key, cast);
        Ok(self)
    }

    /// A conversion with no method: numeric between primitives, checked
    /// or widening between references.
    pub fn add_cast(&mut self, from: &str, to: &str, explicit: bool) -> Result<&mut Self, DefinitionError> {
        let from_type = self.get_type(from)?;
        let to_type = self.get_type(to)?;
        let kind = if from_type.sort.is_numeric() && to_type.sort.is_numeric() {
            CastKind::Numeric
        } else if from_type.is_reference() && to_type.is_reference() {
            if self.natives.is_assignable(&from_type.native, &to_type.native) {
                CastKind::Upcast
            } else {
                CastKind::Checked
            }
        } else {
            return Err(DefinitionError::Illegal(format!(
                "cast from [{}] to [{}] needs a transform",
                from, to
            )));
        };
        self.insert_cast(Cast {
            from: from_type,
            to: to_type,
            explicit,
            kind,
        })
    }

    /// A conversion through a whitelisted method of `owner`: a static
    /// method taking the value, or an instance method called on it.
    #[allow(clippy::too_many_arguments)]
    pub fn add_transform(
        &mut self,
        from: &str,
        to: &str,
        owner: &str,
        method: &str,
        is_static: bool,
        explicit: bool,
        upcast: Option<&str>,
        downcast: Option<&str>,
    ) -> Result<&mut Self, DefinitionError> {
        let id = self.struct_id(owner)?;
        let found = if is_static {
            self.structs[id].static_methods.get(&MethodKey::new(method, 1))
        } else {
            self.structs[id].methods.get(&MethodKey::new(method, 0))
        };
        let found = found.cloned().ok_or_else(|| DefinitionError::MemberNotFound {
            kind: if is_static { "static method" } else { "method" },
            native: owner.to_string(),
            name: method.to_string(),
            arity: if is_static { 1 } else { 0 },
        })?;
        let from_type = self.get_type(from)?;
        let to_type = self.get_type(to)?;
        let upcast = upcast.map(|t| self.get_type(t)).transpose()?;
        let downcast = downcast.map(|t| self.get_type(t)).transpose()?;
        self.insert_cast(Cast {
            from: from_type,
            to: to_type,
            explicit,
            kind: CastKind::Transform {
                method: found,
                upcast,
                downcast,
            },
        })
    }

    fn common_types(&self) -> Result<CommonTypes, DefinitionError> {
        Ok(CommonTypes {
            void: self.get_type("void")?,
            boolean: self.get_type("boolean")?,
            byte: self.get_type("byte")?,
            short: self.get_type("short")?,
            char: self.get_type("char")?,
            int: self.get_type("int")?,
            long: self.get_type("long")?,
            float: self.get_type("float")?,
            double: self.get_type("double")?,
            object: self.get_type("Object")?,
            def: self.get_type("def")?,
            string: self.get_type("String")?,
        })
    }

    /// Freezes the registry. Computes functional methods and the runtime
    /// class index.
    pub fn build(mut self) -> Result<Definition, DefinitionError> {
        let common = self.common_types()?;
        let root_keys: Vec<MethodKey> = self
            .names
            .get("Object")
            .map(|id| self.structs[*id].methods.keys().cloned().collect())
            .unwrap_or_default();
        for s in self.structs.iter_mut() {
            if !s.native.is_interface {
                continue;
            }
            let mut abstracts = s
                .methods
                .values()
                .filter(|m| m.native.is_abstract && !m.native.is_default && !root_keys.contains(&m.key()));
            if let (Some(only), None) = (abstracts.next(), abstracts.next()) {
                s.functional_method = Some(only.clone());
            }
        }
        let runtime = self.structs.iter().map(runtime_class::build).collect();
        debug!(
            structs = self.structs.len(),
            casts = self.casts.len(),
            "definition built"
        );
        Ok(Definition {
            natives: self.natives,
            structs: self.structs,
            names: self.names,
            by_native: self.by_native,
            casts: self.casts,
            runtime,
            common,
        })
    }
}
