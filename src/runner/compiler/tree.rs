//! The typed tree: the analyzer's output and the emitter's input.
//!
//! Every expression carries its resolved type. Casts are explicit nodes
//! and folded constants have replaced the subtrees they came from.

use crate::runner::compiler::bytecode::{Bindings, Constant};
use crate::runner::def::operators::{OperandKind, Operation};
use crate::runner::definition::{Cast, Type};
use crate::runner::ds::native::NativeMember;

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub typ: Type,
}

impl Expr {
    pub fn new(kind: ExprKind, typ: Type) -> Self {
        Expr { kind, typ }
    }

    pub fn constant(&self) -> Option<&Constant> {
        match &self.kind {
            ExprKind::Constant(c) => Some(c),
            _ => None,
        }
    }

    /// Whether evaluating the expression leaves a value on the stack.
    pub fn pushes(&self) -> bool {
        !matches!(self.kind, ExprKind::Assign { read: false, .. })
    }
}

/// Something that can be read and, unless noted, written.
#[derive(Debug, Clone)]
pub enum Place {
    Local(usize),
    /// Access through whitelisted methods: bean accessors, or `get`/`put`
    /// and `get`/`set` on maps and lists with `key` as first argument.
    Shortcut {
        receiver: Box<Expr>,
        key: Option<Box<Expr>>,
        getter: Option<&'static NativeMember>,
        setter: Option<&'static NativeMember>,
    },
    /// `def` field, resolved per receiver class.
    Dynamic { receiver: Box<Expr>, name: String },
    /// Element of a statically typed array.
    Array { array: Box<Expr>, index: Box<Expr> },
    /// `def` brace access: arrays, maps and lists.
    Index { receiver: Box<Expr>, index: Box<Expr> },
}

impl Place {
    /// Values the place keeps on the stack ahead of the stored value.
    pub fn operands(&self) -> u32 {
        match self {
            Place::Local(_) => 0,
            Place::Shortcut { key: Some(_), .. } => 2,
            Place::Shortcut { key: None, .. } => 1,
            Place::Dynamic { .. } => 1,
            Place::Array { .. } | Place::Index { .. } => 2,
        }
    }
}

/// The arithmetic half of `x op= v`, `++x` and `x--`.
#[derive(Debug, Clone)]
pub struct Compound {
    pub operation: Operation,
    pub kind: OperandKind,
    pub checked: bool,
    /// Place type to operation type.
    pub promote: Option<Cast>,
    /// Operation type back to the place type.
    pub back: Option<Cast>,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Constant(Constant),
    Load(Place),
    Assign {
        place: Place,
        compound: Option<Compound>,
        value: Box<Expr>,
        /// Yields the value before the update.
        post: bool,
        /// The result is used.
        read: bool,
    },
    /// Field read; static when there is no receiver.
    Field {
        receiver: Option<Box<Expr>>,
        member: &'static NativeMember,
    },
    Binary {
        operation: Operation,
        kind: OperandKind,
        checked: bool,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Compare {
        operation: Operation,
        kind: OperandKind,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        operation: Operation,
        kind: OperandKind,
        checked: bool,
        operand: Box<Expr>,
    },
    Logical {
        and: bool,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Cast {
        operand: Box<Expr>,
        cast: Cast,
    },
    InstanceOf {
        operand: Box<Expr>,
        typ: Type,
    },
    Invoke {
        receiver: Box<Expr>,
        member: &'static NativeMember,
        args: Vec<Expr>,
    },
    InvokeStatic {
        member: &'static NativeMember,
        args: Vec<Expr>,
    },
    CallDynamic {
        receiver: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
    CallLocal {
        function: usize,
        args: Vec<Expr>,
    },
    ArrayLength(Box<Expr>),
    NewArray {
        typ: Type,
        sizes: Vec<Expr>,
    },
    NewArrayInit {
        typ: Type,
        values: Vec<Expr>,
    },
    NewList(Vec<Expr>),
    NewMap(Vec<(Expr, Expr)>),
    Lambda {
        function: usize,
        interface: Option<String>,
        /// Enclosing slots copied into the function value.
        captures: Vec<usize>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guard {
    pub slot: usize,
    pub cost: u32,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Block(Vec<Stmt>),
    Expression(Expr),
    Declare {
        slot: usize,
        value: Expr,
    },
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    /// A missing test loops forever.
    While {
        test: Option<Expr>,
        body: Box<Stmt>,
        guard: Option<Guard>,
    },
    DoWhile {
        body: Box<Stmt>,
        test: Option<Expr>,
        guard: Option<Guard>,
    },
    For {
        init: Vec<Stmt>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
        guard: Option<Guard>,
    },
    ForEach {
        iterable: Expr,
        iterator_slot: usize,
        slot: usize,
        /// Element type to variable type.
        cast: Option<Cast>,
        body: Box<Stmt>,
        guard: Option<Guard>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub body: Vec<Stmt>,
    pub slot_count: usize,
    pub capture_slots: Vec<usize>,
    pub param_slots: Vec<usize>,
    pub param_casts: Vec<Option<Cast>>,
    pub loop_slot: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct TypedProgram {
    pub functions: Vec<Function>,
    pub main: usize,
    pub bindings: Bindings,
}
