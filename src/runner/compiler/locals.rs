//! Scope tracking for the analyzer.
//!
//! Frames form a stack that reads as a singly linked chain: a lookup walks
//! from the innermost frame outwards. `Main`, `Function` and `Lambda` are
//! call frames and own slot allocation; `Block` frames borrow their
//! call frame's slots. Slots are never reused within a call frame.

use std::collections::HashMap;

use crate::runner::definition::{MethodKey, Type};

pub const THIS: &str = "this";
pub const PARAMS: &str = "params";
pub const SCORER: &str = "#scorer";
pub const DOC: &str = "doc";
pub const VALUE: &str = "_value";
pub const SCORE: &str = "_score";
pub const CTX: &str = "ctx";
pub const LOOP: &str = "#loop";

pub const RESERVED: [&str; 8] = [THIS, PARAMS, SCORER, DOC, VALUE, SCORE, CTX, LOOP];

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub typ: Type,
    pub slot: usize,
    pub readonly: bool,
}

/// A value copied from an enclosing frame when a lambda is created.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    /// The binding in the enclosing frame.
    pub outer: Variable,
    /// The read-only copy inside the lambda.
    pub inner: Variable,
}

#[derive(Debug, Clone)]
pub struct FunctionSignature {
    pub name: String,
    pub ret: Type,
    pub params: Vec<Type>,
    /// Index of the compiled function in the program.
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Main,
    Function,
    Lambda,
    Block,
}

impl FrameKind {
    fn is_call(self) -> bool {
        self != FrameKind::Block
    }
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    variables: Vec<Variable>,
    captures: Vec<Capture>,
    next_slot: usize,
    return_type: Option<Type>,
}

impl Frame {
    fn new(kind: FrameKind, return_type: Option<Type>) -> Self {
        Frame {
            kind,
            variables: vec![],
            captures: vec![],
            next_slot: 0,
            return_type,
        }
    }

    fn find(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().rev().find(|v| v.name == name)
    }
}

/// What a finished call frame leaves behind.
#[derive(Debug)]
pub struct CallFrame {
    pub slot_count: usize,
    pub captures: Vec<Capture>,
}

#[derive(Debug)]
pub struct Locals {
    frames: Vec<Frame>,
    functions: HashMap<MethodKey, FunctionSignature>,
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Locals {
    /// Starts with the main frame of a script returning `return_type`.
    pub fn new(return_type: Type) -> Self {
        Locals {
            frames: vec![Frame::new(FrameKind::Main, Some(return_type))],
            functions: HashMap::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn top(&self) -> usize {
        self.frames.len() - 1
    }

    fn call_frame_of(&self, index: usize) -> usize {
        let mut i = index;
        while !self.frames[i].kind.is_call() && i > 0 {
            i -= 1;
        }
        i
    }

    fn allocate(&mut self, index: usize, typ: &Type) -> usize {
        let call = self.call_frame_of(index);
        let slot = self.frames[call].next_slot;
        self.frames[call].next_slot += typ.size().max(1);
        slot
    }

    pub fn push_block(&mut self) {
        self.frames.push(Frame::new(FrameKind::Block, None));
    }

    pub fn pop_block(&mut self) {
        if self.frames.len() > 1 && self.frames[self.top()].kind == FrameKind::Block {
            self.frames.pop();
        }
    }

    pub fn push_function(&mut self, return_type: Type) {
        self.frames.push(Frame::new(FrameKind::Function, Some(return_type)));
    }

    pub fn push_lambda(&mut self, return_type: Type) {
        self.frames.push(Frame::new(FrameKind::Lambda, Some(return_type)));
    }

    /// Closes the innermost call frame along with any blocks left open in it.
    pub fn pop_call(&mut self) -> CallFrame {
        while self.frames.len() > 1 && !self.frames[self.top()].kind.is_call() {
            self.frames.pop();
        }
        match self.frames.pop() {
            Some(frame) => CallFrame {
                slot_count: frame.next_slot,
                captures: frame.captures,
            },
            None => CallFrame {
                slot_count: 0,
                captures: vec![],
            },
        }
    }

    /// Slots used so far by the main frame.
    pub fn main_slot_count(&self) -> usize {
        self.frames.first().map(|f| f.next_slot).unwrap_or(0)
    }

    pub fn return_type(&self) -> Option<&Type> {
        self.frames[self.call_frame_of(self.top())].return_type.as_ref()
    }

    pub fn frame_kind(&self) -> FrameKind {
        self.frames[self.call_frame_of(self.top())].kind
    }

    /// Declares a user variable in the innermost frame.
    pub fn define_variable(&mut self, name: &str, typ: Type, readonly: bool) -> Result<Variable, String> {
        if RESERVED.contains(&name) {
            return Err(format!("Variable [{}] is reserved.", name));
        }
        if !is_identifier(name) {
            return Err(format!("Variable name [{}] is not a valid identifier.", name));
        }
        self.add_variable(name, typ, readonly)
    }

    /// Declares a variable without the reserved name check, for the
    /// implicit bindings.
    pub fn add_variable(&mut self, name: &str, typ: Type, readonly: bool) -> Result<Variable, String> {
        if self.is_visible(name) {
            return Err(format!("Variable [{}] is already defined.", name));
        }
        let top = self.top();
        let slot = self.allocate(top, &typ);
        let variable = Variable {
            name: name.to_string(),
            typ,
            slot,
            readonly,
        };
        self.frames[top].variables.push(variable.clone());
        Ok(variable)
    }

    /// Allocates an unnamed slot in the current call frame.
    pub fn temporary(&mut self, typ: &Type) -> usize {
        let top = self.top();
        self.allocate(top, typ)
    }

    fn is_visible(&self, name: &str) -> bool {
        let mut i = self.top();
        loop {
            if self.frames[i].find(name).is_some() {
                return true;
            }
            if self.frames[i].kind.is_call() || i == 0 {
                return false;
            }
            i -= 1;
        }
    }

    /// Resolves a variable. Crossing a lambda frame records a capture;
    /// crossing a function frame ends the search.
    pub fn get_variable(&mut self, name: &str) -> Option<Variable> {
        let top = self.top();
        self.lookup(name, top)
    }

    fn lookup(&mut self, name: &str, from: usize) -> Option<Variable> {
        let mut i = from;
        loop {
            if let Some(v) = self.frames[i].find(name) {
                return Some(v.clone());
            }
            match self.frames[i].kind {
                FrameKind::Block if i > 0 => i -= 1,
                FrameKind::Lambda if i > 0 => {
                    let outer = self.lookup(name, i - 1)?;
                    let slot = self.allocate(i, &outer.typ);
                    let inner = Variable {
                        name: outer.name.clone(),
                        typ: outer.typ.clone(),
                        slot,
                        readonly: true,
                    };
                    self.frames[i].variables.push(inner.clone());
                    self.frames[i].captures.push(Capture {
                        outer,
                        inner: inner.clone(),
                    });
                    return Some(inner);
                }
                _ => return None,
            }
        }
    }

    pub fn add_function(&mut self, signature: FunctionSignature) -> Result<(), String> {
        let key = MethodKey::new(&signature.name, signature.params.len());
        if self.functions.contains_key(&key) {
            return Err(format!(
                "Duplicate function [{}] with [{}] parameters.",
                signature.name,
                signature.params.len()
            ));
        }
        self.functions.insert(key, signature);
        Ok(())
    }

    pub fn get_function(&self, name: &str, arity: usize) -> Option<&FunctionSignature> {
        self.functions.get(&MethodKey::new(name, arity))
    }

    /// Every function named `name`, whatever its arity.
    pub fn functions_named(&self, name: &str) -> Vec<&FunctionSignature> {
        self.functions.values().filter(|f| f.name == name).collect()
    }
}
