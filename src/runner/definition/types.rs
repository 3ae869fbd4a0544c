use std::collections::HashMap;
use std::fmt;

use crate::runner::ds::native::{NativeClass, NativeMember};

pub type StructId = usize;

/// Coarse classification of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sort {
    Void,
    Bool,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    BoolObj,
    ByteObj,
    ShortObj,
    CharObj,
    IntObj,
    LongObj,
    FloatObj,
    DoubleObj,
    Number,
    String,
    Object,
    Array,
    Def,
}

impl Sort {
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            Sort::Void
                | Sort::Bool
                | Sort::Byte
                | Sort::Short
                | Sort::Char
                | Sort::Int
                | Sort::Long
                | Sort::Float
                | Sort::Double
        )
    }

    /// Primitive numeric, `char` included.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Sort::Byte | Sort::Short | Sort::Char | Sort::Int | Sort::Long | Sort::Float | Sort::Double
        )
    }

    pub fn is_boxed(self) -> bool {
        self.unboxed() != self
    }

    pub fn unboxed(self) -> Sort {
        match self {
            Sort::BoolObj => Sort::Bool,
            Sort::ByteObj => Sort::Byte,
            Sort::ShortObj => Sort::Short,
            Sort::CharObj => Sort::Char,
            Sort::IntObj => Sort::Int,
            Sort::LongObj => Sort::Long,
            Sort::FloatObj => Sort::Float,
            Sort::DoubleObj => Sort::Double,
            other => other,
        }
    }

    pub fn boxed(self) -> Sort {
        match self {
            Sort::Bool => Sort::BoolObj,
            Sort::Byte => Sort::ByteObj,
            Sort::Short => Sort::ShortObj,
            Sort::Char => Sort::CharObj,
            Sort::Int => Sort::IntObj,
            Sort::Long => Sort::LongObj,
            Sort::Float => Sort::FloatObj,
            Sort::Double => Sort::DoubleObj,
            other => other,
        }
    }

    /// Slot width.
    pub fn size(self) -> usize {
        match self {
            Sort::Void => 0,
            Sort::Long | Sort::Double => 2,
            _ => 1,
        }
    }

    pub fn is_decimal(self) -> bool {
        matches!(self, Sort::Float | Sort::Double)
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Type {
    /// Full name including any `[]` suffixes.
    pub name: String,
    pub dimensions: usize,
    /// Struct of the element type for arrays.
    pub struct_id: StructId,
    pub sort: Sort,
    /// Native class name (or native primitive name) backing the type.
    pub native: String,
}

impl Type {
    pub fn is_def(&self) -> bool {
        self.sort == Sort::Def
    }

    pub fn is_array(&self) -> bool {
        self.dimensions > 0
    }

    pub fn is_void(&self) -> bool {
        self.sort == Sort::Void
    }

    pub fn is_reference(&self) -> bool {
        !self.sort.is_primitive()
    }

    pub fn size(&self) -> usize {
        self.sort.size()
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self.name)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodKey {
    pub name: String,
    pub arity: usize,
}

impl MethodKey {
    pub fn new(name: &str, arity: usize) -> Self {
        MethodKey {
            name: name.to_string(),
            arity,
        }
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

/// A whitelisted method or constructor bound to its native implementation.
#[derive(Debug, Clone)]
pub struct Method {
    pub name: String,
    pub owner: String,
    pub ret: Type,
    pub args: Vec<Type>,
    pub native: &'static NativeMember,
}

impl Method {
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn key(&self) -> MethodKey {
        MethodKey::new(&self.name, self.args.len())
    }

    pub fn is_static(&self) -> bool {
        self.native.kind.is_static()
    }
}

impl PartialEq for Method {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.owner == other.owner
            && self.args == other.args
            && std::ptr::eq(self.native, other.native)
    }
}

/// A whitelisted field. Fields are read-only from scripts.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub owner: String,
    pub typ: Type,
    pub native: &'static NativeMember,
}

#[derive(Debug)]
pub struct Struct {
    pub name: String,
    pub native: &'static NativeClass,
    pub constructors: HashMap<MethodKey, Method>,
    pub static_methods: HashMap<MethodKey, Method>,
    pub methods: HashMap<MethodKey, Method>,
    pub static_members: HashMap<String, Field>,
    pub members: HashMap<String, Field>,
    /// Whitelisted ancestors, nearest first.
    pub supers: Vec<String>,
    /// The single abstract method, for functional interfaces.
    pub functional_method: Option<Method>,
}

impl Struct {
    pub fn new(name: &str, native: &'static NativeClass) -> Self {
        Struct {
            name: name.to_string(),
            native,
            constructors: HashMap::new(),
            static_methods: HashMap::new(),
            methods: HashMap::new(),
            static_members: HashMap::new(),
            members: HashMap::new(),
            supers: vec![],
            functional_method: None,
        }
    }
}

/// Conversion applied at a cast site.
#[derive(Debug, Clone, PartialEq)]
pub enum CastKind {
    /// Primitive numeric conversion.
    Numeric,
    /// Reference widening; nothing happens at run time.
    Upcast,
    /// Reference narrowing checked at run time.
    Checked,
    /// Conversion through a whitelisted method, with optional casts to
    /// the method's input type before and from its output type after.
    Transform {
        method: Method,
        upcast: Option<Type>,
        downcast: Option<Type>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cast {
    pub from: Type,
    pub to: Type,
    pub explicit: bool,
    pub kind: CastKind,
}

impl Cast {
    pub fn is_noop(&self) -> bool {
        self.kind == CastKind::Upcast
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CastKey {
    pub from: String,
    pub to: String,
    pub explicit: bool,
}

/// How the dynamic runtime reads or writes a named property.
#[derive(Debug, Clone)]
pub enum Accessor {
    Field(Field),
    Method(Method),
}

/// Per-struct index the dynamic runtime consults.
#[derive(Debug, Default)]
pub struct RuntimeClass {
    pub methods: HashMap<MethodKey, Method>,
    pub getters: HashMap<String, Accessor>,
    pub setters: HashMap<String, Method>,
}
