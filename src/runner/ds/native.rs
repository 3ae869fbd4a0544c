//! Native class catalogue.
//!
//! This is the host-side reflection surface the type registry binds
//! against: every native class is a static table of members, each member
//! a plain function pointer plus its native signature. Registration looks
//! members up here once; nothing is reflected at run time.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use crate::runner::ds::error::ScriptError;
use crate::runner::ds::value::Value;

/// Native entry point. Receives the receiver (`Value::Null` for static
/// members and constructors) and the already converted arguments.
pub type NativeFn = fn(&mut dyn Invoker, &Value, &[Value]) -> Result<Value, ScriptError>;

/// Callback surface the running script exposes to native code, used by
/// natives that take functional arguments.
pub trait Invoker {
    fn call_function(&mut self, function: &Value, args: &[Value]) -> Result<Value, ScriptError>;
}

pub const CONSTRUCTOR_NAME: &str = "<init>";

/// Names of the native primitive types. They have no class entry.
pub const PRIMITIVES: [&str; 9] = [
    "void", "boolean", "byte", "short", "char", "int", "long", "float", "double",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Constructor,
    Method,
    StaticMethod,
    Field,
    StaticField,
}

impl MemberKind {
    pub fn is_static(self) -> bool {
        matches!(self, MemberKind::StaticMethod | MemberKind::StaticField)
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MemberKind::Constructor => "constructor",
            MemberKind::Method => "method",
            MemberKind::StaticMethod => "static method",
            MemberKind::Field => "field",
            MemberKind::StaticField => "static field",
        };
        write!(f, "{}", s)
    }
}

pub struct NativeMember {
    pub kind: MemberKind,
    pub name: &'static str,
    /// Native parameter type names.
    pub params: &'static [&'static str],
    /// Native return (or field) type name.
    pub ret: &'static str,
    /// Invoked for calls; for fields this reads the value.
    pub invoke: NativeFn,
    pub is_abstract: bool,
    pub is_default: bool,
}

impl NativeMember {
    pub const fn constructor(params: &'static [&'static str], invoke: NativeFn) -> Self {
        NativeMember {
            kind: MemberKind::Constructor,
            name: CONSTRUCTOR_NAME,
            params,
            ret: "void",
            invoke,
            is_abstract: false,
            is_default: false,
        }
    }

    pub const fn method(
        name: &'static str,
        params: &'static [&'static str],
        ret: &'static str,
        invoke: NativeFn,
    ) -> Self {
        NativeMember {
            kind: MemberKind::Method,
            name,
            params,
            ret,
            invoke,
            is_abstract: false,
            is_default: false,
        }
    }

    /// An interface method implementations must provide.
    pub const fn abstract_method(
        name: &'static str,
        params: &'static [&'static str],
        ret: &'static str,
        invoke: NativeFn,
    ) -> Self {
        NativeMember {
            kind: MemberKind::Method,
            name,
            params,
            ret,
            invoke,
            is_abstract: true,
            is_default: false,
        }
    }

    /// An interface method with a body.
    pub const fn default_method(
        name: &'static str,
        params: &'static [&'static str],
        ret: &'static str,
        invoke: NativeFn,
    ) -> Self {
        NativeMember {
            kind: MemberKind::Method,
            name,
            params,
            ret,
            invoke,
            is_abstract: false,
            is_default: true,
        }
    }

    pub const fn static_method(
        name: &'static str,
        params: &'static [&'static str],
        ret: &'static str,
        invoke: NativeFn,
    ) -> Self {
        NativeMember {
            kind: MemberKind::StaticMethod,
            name,
            params,
            ret,
            invoke,
            is_abstract: false,
            is_default: false,
        }
    }

    pub const fn field(name: &'static str, ret: &'static str, getter: NativeFn) -> Self {
        NativeMember {
            kind: MemberKind::Field,
            name,
            params: &[],
            ret,
            invoke: getter,
            is_abstract: false,
            is_default: false,
        }
    }

    pub const fn static_field(name: &'static str, ret: &'static str, getter: NativeFn) -> Self {
        NativeMember {
            kind: MemberKind::StaticField,
            name,
            params: &[],
            ret,
            invoke: getter,
            is_abstract: false,
            is_default: false,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Calls the member as a function value would: static members and
    /// constructors take all arguments, instance members take their
    /// receiver from the first argument.
    pub fn call_unbound(&self, invoker: &mut dyn Invoker, args: &[Value]) -> Result<Value, ScriptError> {
        match self.kind {
            MemberKind::Method | MemberKind::Field => match args.split_first() {
                Some((receiver, rest)) => {
                    if receiver.is_null() {
                        return Err(ScriptError::NullPointer(format!(
                            "cannot invoke [{}] on a null receiver",
                            self.name
                        )));
                    }
                    (self.invoke)(invoker, receiver, rest)
                }
                None => Err(ScriptError::illegal(format!(
                    "missing receiver for [{}]",
                    self.name
                ))),
            },
            _ => (self.invoke)(invoker, &Value::Null, args),
        }
    }
}

impl fmt::Debug for NativeMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}({})",
            self.kind,
            self.ret,
            self.name,
            self.params.join(", ")
        )
    }
}

pub struct NativeClass {
    pub name: &'static str,
    pub superclass: Option<&'static str>,
    pub interfaces: &'static [&'static str],
    pub is_interface: bool,
    pub members: &'static [NativeMember],
}

impl fmt::Debug for NativeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeClass({})", self.name)
    }
}

/// Every native class the host makes available for whitelisting.
#[derive(Debug, Default)]
pub struct NativeCatalog {
    classes: HashMap<&'static str, &'static NativeClass>,
}

impl NativeCatalog {
    pub fn new() -> Self {
        NativeCatalog {
            classes: HashMap::new(),
        }
    }

    pub fn add(&mut self, class: &'static NativeClass) {
        self.classes.insert(class.name, class);
    }

    pub fn get(&self, name: &str) -> Option<&'static NativeClass> {
        self.classes.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name) || PRIMITIVES.contains(&name)
    }

    /// Lookup order for a class: the class, its interfaces breadth first
    /// (with their super-interfaces), then the superclass, and so on up.
    /// `Object` is always last. Array names resolve to `Object` only.
    pub fn hierarchy(&self, name: &str) -> Vec<&'static str> {
        let mut order = vec![];
        let mut seen = HashSet::new();
        let mut current = self.get(name);
        while let Some(class) = current {
            if seen.insert(class.name) {
                order.push(class.name);
            }
            let mut queue: VecDeque<&'static str> = class.interfaces.iter().copied().collect();
            while let Some(iface) = queue.pop_front() {
                if !seen.insert(iface) {
                    continue;
                }
                order.push(iface);
                if let Some(iface_class) = self.get(iface) {
                    queue.extend(iface_class.interfaces.iter().copied());
                }
            }
            current = class.superclass.and_then(|s| self.get(s));
        }
        if let Some(object) = self.get("Object") {
            if seen.insert(object.name) {
                order.push(object.name);
            }
        }
        order
    }

    /// Whether a value of native type `from` can be passed where `to` is
    /// expected.
    pub fn is_assignable(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }
        if PRIMITIVES.contains(&from) || PRIMITIVES.contains(&to) {
            return false;
        }
        if to == "Object" {
            return true;
        }
        if from.ends_with("[]") || to.ends_with("[]") {
            return false;
        }
        self.hierarchy(from).contains(&to)
    }

    /// Finds a member by kind, name and arity on `class`, searching the
    /// native ancestors for inherited instance members.
    pub fn find_member(
        &self,
        class: &str,
        kind: MemberKind,
        name: &str,
        arity: usize,
    ) -> Option<&'static NativeMember> {
        let matches = |m: &&'static NativeMember| m.kind == kind && m.name == name && m.arity() == arity;
        match kind {
            MemberKind::Constructor | MemberKind::StaticMethod | MemberKind::StaticField => {
                self.get(class)?.members.iter().find(matches)
            }
            MemberKind::Method | MemberKind::Field => self
                .hierarchy(class)
                .into_iter()
                .filter_map(|c| self.get(c))
                .find_map(|c| c.members.iter().find(matches)),
        }
    }
}
