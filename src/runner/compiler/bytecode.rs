//! The compiled program.
//!
//! Everything here is `Send + Sync`: a [`Program`] is built once and then
//! executed concurrently. Values that need interior reference counting
//! (strings, function values) are kept as [`Constant`]s and materialized
//! per invocation.

use std::fmt;
use std::rc::Rc;

use crate::runner::definition::{Cast, Type};
use crate::runner::ds::native::NativeMember;
use crate::runner::ds::value::{FunctionTarget, FunctionValue, Value};

#[derive(Debug, Clone)]
pub enum Constant {
    Null,
    Bool(bool),
    Byte(i8),
    Short(i16),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    /// A method reference resolved against its target interface.
    Reference {
        interface: Option<String>,
        member: &'static NativeMember,
    },
    /// `Owner::method` bound to `def`; the arity is only known per call.
    Deferred { owner: String, method: String },
    /// `this::name`, a user function without captures.
    Local {
        function: usize,
        interface: Option<String>,
    },
}

impl PartialEq for Constant {
    fn eq(&self, other: &Self) -> bool {
        use Constant::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Byte(a), Byte(b)) => a == b,
            (Short(a), Short(b)) => a == b,
            (Char(a), Char(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Long(a), Long(b)) => a == b,
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            (Double(a), Double(b)) => a.to_bits() == b.to_bits(),
            (Str(a), Str(b)) => a == b,
            (
                Reference {
                    interface: ia,
                    member: ma,
                },
                Reference {
                    interface: ib,
                    member: mb,
                },
            ) => ia == ib && std::ptr::eq(*ma, *mb),
            (
                Deferred {
                    owner: oa,
                    method: ma,
                },
                Deferred {
                    owner: ob,
                    method: mb,
                },
            ) => oa == ob && ma == mb,
            (
                Local {
                    function: fa,
                    interface: ia,
                },
                Local {
                    function: fb,
                    interface: ib,
                },
            ) => fa == fb && ia == ib,
            _ => false,
        }
    }
}

impl Constant {
    /// The constant form of a folded value. Only primitives and strings
    /// fold.
    pub fn from_value(value: &Value) -> Option<Constant> {
        Some(match value {
            Value::Null => Constant::Null,
            Value::Bool(b) => Constant::Bool(*b),
            Value::Byte(v) => Constant::Byte(*v),
            Value::Short(v) => Constant::Short(*v),
            Value::Char(v) => Constant::Char(*v),
            Value::Int(v) => Constant::Int(*v),
            Value::Long(v) => Constant::Long(*v),
            Value::Float(v) => Constant::Float(*v),
            Value::Double(v) => Constant::Double(*v),
            Value::Str(s) => Constant::Str(s.to_string()),
            _ => return None,
        })
    }

    pub fn to_value(&self) -> Value {
        match self {
            Constant::Null => Value::Null,
            Constant::Bool(b) => Value::Bool(*b),
            Constant::Byte(v) => Value::Byte(*v),
            Constant::Short(v) => Value::Short(*v),
            Constant::Char(v) => Value::Char(*v),
            Constant::Int(v) => Value::Int(*v),
            Constant::Long(v) => Value::Long(*v),
            Constant::Float(v) => Value::Float(*v),
            Constant::Double(v) => Value::Double(*v),
            Constant::Str(s) => Value::string(s),
            Constant::Reference { interface, member } => function(interface, FunctionTarget::Native(*member)),
            Constant::Deferred { owner, method } => function(
                &None,
                FunctionTarget::Deferred {
                    owner: owner.clone(),
                    method: method.clone(),
                },
            ),
            Constant::Local { function: index, interface } => function(
                interface,
                FunctionTarget::Script {
                    function: *index,
                    captures: vec![],
                },
            ),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Constant::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

fn function(interface: &Option<String>, target: FunctionTarget) -> Value {
    Value::Function(Rc::new(FunctionValue {
        interface: interface.clone(),
        target,
    }))
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Str(s) => write!(f, "{:?}", s),
            Constant::Reference { member, .. } => write!(f, "&{:?}", member),
            Constant::Deferred { owner, method } => write!(f, "{}::{}", owner, method),
            Constant::Local { function, .. } => write!(f, "this::#{}", function),
            other => write!(f, "{}", other.to_value()),
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    /// Push constant `a`.
    Const,
    Pop,
    /// Duplicate the top `a` values.
    Dup,
    /// Copy the top value below the `a` values under it.
    DupX,
    Load,
    Store,
    Jump,
    JumpIfTrue,
    JumpIfFalse,
    /// `a` is the operation, `b` the operand kind with the checked flag in
    /// bit 8.
    Binary,
    Compare,
    Unary,
    Cast,
    InstanceOf,
    /// Instance member `a` with `b` arguments above the receiver.
    Invoke,
    InvokeStatic,
    /// Dynamic call through site `a` with `b` arguments.
    CallDynamic,
    LoadDynamic,
    StoreDynamic,
    LoadIndex,
    StoreIndex,
    ArrayLoad,
    ArrayStore,
    ArrayLength,
    /// Array type `a` with `b` sized dimensions.
    NewArray,
    NewArrayInit,
    NewList,
    NewMap,
    /// Function `a` implementing interface name `b`.
    Lambda,
    CallLocal,
    IterStart,
    /// Push the next element or jump to `a` when exhausted.
    IterNext,
    /// Charge `b` against the counter in slot `a`.
    LoopGuard,
    Return,
}

pub const CHECKED_FLAG: u32 = 1 << 8;
pub const NO_NAME: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: OpCode,
    pub a: u32,
    pub b: u32,
}

impl Instruction {
    pub fn new(op: OpCode, a: u32, b: u32) -> Self {
        Instruction { op, a, b }
    }
}

/// A dynamic call site. Index sites have an empty name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub name: String,
    pub arity: usize,
}

#[derive(Debug, Clone)]
pub struct FunctionChunk {
    pub name: String,
    pub code: Vec<Instruction>,
    pub slot_count: usize,
    /// Slots receiving captured values, ahead of the arguments.
    pub capture_slots: Vec<usize>,
    pub param_slots: Vec<usize>,
    /// Conversion applied to each argument on entry, as an index into the
    /// cast table.
    pub param_casts: Vec<Option<u32>>,
    pub loop_slot: Option<usize>,
}

impl FunctionChunk {
    pub fn arity(&self) -> usize {
        self.param_slots.len()
    }
}

/// Slots of the implicit bindings of the main function.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    pub params: usize,
    pub doc: usize,
    pub value: usize,
    pub score: Option<usize>,
    pub ctx: Option<usize>,
    /// Extra inputs, read from `params` by name.
    pub inputs: Vec<(String, usize)>,
}

#[derive(Debug, Clone)]
pub struct Program {
    pub constants: Vec<Constant>,
    pub members: Vec<&'static NativeMember>,
    pub casts: Vec<Cast>,
    pub types: Vec<Type>,
    pub names: Vec<String>,
    pub sites: Vec<Site>,
    pub functions: Vec<FunctionChunk>,
    pub main: usize,
    pub bindings: Bindings,
}

impl Program {
    /// Human readable listing, one instruction per line.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        for (index, function) in self.functions.iter().enumerate() {
            let marker = if index == self.main { " (main)" } else { "" };
            out.push_str(&format!(
                "function #{} {}{}: {} params, {} captures, {} slots\n",
                index,
                function.name,
                marker,
                function.param_slots.len(),
                function.capture_slots.len(),
                function.slot_count
            ));
            for (pc, ins) in function.code.iter().enumerate() {
                out.push_str(&format!("  {:04} {}\n", pc, self.describe(ins)));
            }
        }
        out
    }

    fn describe(&self, ins: &Instruction) -> String {
        let op = format!("{:?}", ins.op);
        let a = ins.a as usize;
        match ins.op {
            OpCode::Const => format!("{:<14}{}", op, self.constants[a]),
            OpCode::Pop
            | OpCode::ArrayLoad
            | OpCode::ArrayStore
            | OpCode::ArrayLength
            | OpCode::IterStart
            | OpCode::Return => op,
            OpCode::Binary | OpCode::Unary => {
                let checked = if ins.b & CHECKED_FLAG != 0 { " checked" } else { "" };
                format!("{:<14}{} {}{}", op, operation(ins.a), kind(ins.b & 0xff), checked)
            }
            OpCode::Compare => format!("{:<14}{} {}", op, operation(ins.a), kind(ins.b)),
            OpCode::Cast => {
                let cast = &self.casts[a];
                format!("{:<14}{} -> {}", op, cast.from, cast.to)
            }
            OpCode::InstanceOf | OpCode::NewArray | OpCode::NewArrayInit => {
                format!("{:<14}{} {}", op, self.types[a], ins.b)
            }
            OpCode::Invoke | OpCode::InvokeStatic => format!("{:<14}{:?}", op, self.members[a]),
            OpCode::CallDynamic | OpCode::LoadDynamic | OpCode::StoreDynamic => {
                format!("{:<14}{}/{} site {}", op, self.sites[a].name, self.sites[a].arity, a)
            }
            OpCode::LoadIndex | OpCode::StoreIndex => format!("{:<14}site {}", op, a),
            OpCode::Lambda => {
                let iface = self.names.get(ins.b as usize).map(|s| s.as_str()).unwrap_or("def");
                format!("{:<14}#{} as {}", op, a, iface)
            }
            OpCode::CallLocal => format!("{:<14}#{} argc {}", op, a, ins.b),
            OpCode::LoopGuard => format!("{:<14}slot {} cost {}", op, a, ins.b),
            _ => format!("{:<14}{}", op, a),
        }
    }
}

fn operation(a: u32) -> String {
    crate::runner::def::operators::Operation::from_operand(a)
        .map(|o| o.symbol().to_string())
        .unwrap_or_else(|| "?".to_string())
}

fn kind(b: u32) -> &'static str {
    crate::runner::def::operators::OperandKind::from_operand(b)
        .map(|k| k.name())
        .unwrap_or("?")
}
