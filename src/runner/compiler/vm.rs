//! Stack-based bytecode virtual machine.
//!
//! A [`Vm`] is the per-invocation half of a script: it owns the
//! materialized constants and the dynamic call-site caches, borrows the
//! shared program and registry, and is dropped when the invocation ends.
//! Calls recurse on the Rust stack, bounded by [`MAX_CALL_DEPTH`].

use std::rc::Rc;

use tracing::trace;

use crate::runner::compiler::bytecode::{FunctionChunk, OpCode, Program, Site, CHECKED_FLAG};
use crate::runner::def::conversion::{bool_value, convert_numeric, int_value};
use crate::runner::def::operators::{self, OperandKind, Operation};
use crate::runner::def::{self, DynamicHandle};
use crate::runner::definition::{Cast, CastKind, Definition, Type};
use crate::runner::ds::error::ScriptError;
use crate::runner::ds::native::Invoker;
use crate::runner::ds::value::{FunctionTarget, FunctionValue, Value};
use crate::runner::std_lib::collections::snapshot;

pub const MAX_CALL_DEPTH: usize = 200;

/// Receiver classes remembered per dynamic call site.
const CACHE_SIZE: usize = 5;

enum SiteCache {
    Entries(Vec<(String, DynamicHandle)>),
    Megamorphic,
}

pub struct Vm<'p> {
    program: &'p Program,
    definition: &'p Definition,
    constants: Vec<Value>,
    caches: Vec<SiteCache>,
    depth: usize,
}

fn default_element(component: &str) -> Value {
    match component {
        "boolean" => Value::Bool(false),
        "byte" => Value::Byte(0),
        "short" => Value::Short(0),
        "char" => Value::Char(0),
        "int" => Value::Int(0),
        "long" => Value::Long(0),
        "float" => Value::Float(0.0),
        "double" => Value::Double(0.0),
        _ => Value::Null,
    }
}

/// `new T[a][b]...`: sized dimensions are filled, the rest stay null.
fn new_array(type_name: &str, sizes: &[i32]) -> Result<Value, ScriptError> {
    let (size, rest) = match sizes.split_first() {
        Some(split) => split,
        None => return Ok(Value::Null),
    };
    if *size < 0 {
        return Err(ScriptError::illegal(format!("Negative array size [{}].", size)));
    }
    let component = &type_name[..type_name.len().saturating_sub(2)];
    let mut elements = Vec::with_capacity(*size as usize);
    for _ in 0..*size {
        elements.push(if rest.is_empty() {
            default_element(component)
        } else {
            new_array(component, rest)?
        });
    }
    Ok(Value::new_array(type_name.to_string(), elements))
}

/// Runtime `instanceof`. Null is an instance of nothing.
pub fn instance_of(definition: &Definition, value: &Value, typ: &Type) -> bool {
    if value.is_null() {
        return false;
    }
    if typ.is_def() || typ.name == "Object" {
        return true;
    }
    if typ.is_array() {
        return matches!(value, Value::Array(array) if array.type_name == typ.name);
    }
    if typ.sort.is_primitive() {
        return value.class_name() == definition.boxed(typ).native;
    }
    let natives = definition.natives();
    match value {
        Value::Array(_) => false,
        Value::Function(function) => match &function.interface {
            Some(interface) => natives.is_assignable(interface, &typ.native),
            None => definition.functional_method(typ).is_some(),
        },
        other => natives.is_assignable(&other.class_name(), &typ.native),
    }
}

fn pop(stack: &mut Vec<Value>) -> Value {
    stack.pop().unwrap_or(Value::Null)
}

fn pop_n(stack: &mut Vec<Value>, n: usize) -> Vec<Value> {
    let at = stack.len().saturating_sub(n);
    stack.split_off(at)
}

impl<'p> Vm<'p> {
    pub fn new(program: &'p Program, definition: &'p Definition) -> Self {
        Vm {
            program,
            definition,
            constants: program.constants.iter().map(|c| c.to_value()).collect(),
            caches: program.sites.iter().map(|_| SiteCache::Entries(vec![])).collect(),
            depth: 0,
        }
    }

    /// Runs the main function with the given slots pre-filled.
    pub fn run_main(&mut self, inputs: Vec<(usize, Value)>) -> Result<Value, ScriptError> {
        let program = self.program;
        let chunk = program
            .functions
            .get(program.main)
            .ok_or_else(|| ScriptError::IllegalState("program has no main function".to_string()))?;
        let mut locals = vec![Value::Null; chunk.slot_count];
        for (slot, value) in inputs {
            if let Some(local) = locals.get_mut(slot) {
                *local = value;
            }
        }
        self.enter(chunk, locals)
    }

    /// Calls function `index` with `values`: captures first, then the
    /// arguments. `convert` applies the parameter conversions, needed when
    /// the caller is untyped.
    fn run_function(&mut self, index: usize, values: Vec<Value>, convert: bool) -> Result<Value, ScriptError> {
        let program = self.program;
        let chunk = program
            .functions
            .get(index)
            .ok_or_else(|| ScriptError::IllegalState(format!("no function #{}", index)))?;
        let captured = chunk.capture_slots.len();
        if values.len() != captured + chunk.arity() {
            return Err(ScriptError::illegal(format!(
                "Cannot call [{}] with [{}] arguments, expected [{}].",
                chunk.name,
                values.len().saturating_sub(captured),
                chunk.arity()
            )));
        }
        let mut locals = vec![Value::Null; chunk.slot_count];
        let mut values = values.into_iter();
        for slot in &chunk.capture_slots {
            locals[*slot] = values.next().unwrap_or(Value::Null);
        }
        for (i, slot) in chunk.param_slots.iter().enumerate() {
            let mut value = values.next().unwrap_or(Value::Null);
            if convert {
                if let Some(Some(cast)) = chunk.param_casts.get(i) {
                    value = self.apply_cast(&program.casts[*cast as usize], value)?;
                }
            }
            locals[*slot] = value;
        }
        self.enter(chunk, locals)
    }

    fn enter(&mut self, chunk: &'p FunctionChunk, locals: Vec<Value>) -> Result<Value, ScriptError> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(ScriptError::StackOverflow(MAX_CALL_DEPTH));
        }
        self.depth += 1;
        let result = self.execute(chunk, locals);
        self.depth -= 1;
        result
    }

    fn apply_cast(&mut self, cast: &Cast, value: Value) -> Result<Value, ScriptError> {
        match &cast.kind {
            CastKind::Upcast => Ok(value),
            CastKind::Numeric => convert_numeric(&value, OperandKind::from_sort(cast.to.sort)),
            CastKind::Checked => {
                if value.is_null() || instance_of(self.definition, &value, &cast.to) {
                    Ok(value)
                } else {
                    Err(ScriptError::class_cast(&value.class_name(), &cast.to.name))
                }
            }
            CastKind::Transform {
                method,
                upcast,
                downcast,
            } => {
                let mut value = value;
                if let Some(up) = upcast {
                    if up.sort.is_numeric() {
                        value = convert_numeric(&value, OperandKind::from_sort(up.sort))?;
                    }
                }
                value = if method.is_static() {
                    (method.native.invoke)(self, &Value::Null, &[value])?
                } else {
                    if value.is_null() {
                        return Err(ScriptError::NullPointer(format!(
                            "cannot cast null to [{}]",
                            cast.to.name
                        )));
                    }
                    (method.native.invoke)(self, &value, &[])?
                };
                if let Some(down) = downcast {
                    if down.sort.is_numeric() {
                        value = convert_numeric(&value, OperandKind::from_sort(down.sort))?;
                    }
                }
                Ok(value)
            }
        }
    }

    /// Resolves a dynamic operation through the site's cache.
    fn dynamic(
        &mut self,
        site: usize,
        receiver: &Value,
        resolve: fn(&Definition, &Value, &Site) -> Result<DynamicHandle, ScriptError>,
    ) -> Result<DynamicHandle, ScriptError> {
        let class = receiver.class_name();
        if let Some(SiteCache::Entries(entries)) = self.caches.get(site) {
            if let Some((_, handle)) = entries.iter().find(|(c, _)| *c == class) {
                return Ok(handle.clone());
            }
        }
        let program = self.program;
        let info = program
            .sites
            .get(site)
            .ok_or_else(|| ScriptError::IllegalState(format!("no call site #{}", site)))?;
        let handle = resolve(self.definition, receiver, info)?;
        trace!(site, class = %class, name = %info.name, "call site cache miss");
        if let Some(cache) = self.caches.get_mut(site) {
            let full = match cache {
                SiteCache::Entries(entries) if entries.len() < CACHE_SIZE => {
                    entries.push((class, handle.clone()));
                    false
                }
                SiteCache::Entries(_) => true,
                SiteCache::Megamorphic => false,
            };
            if full {
                trace!(site, "call site is megamorphic");
                *cache = SiteCache::Megamorphic;
            }
        }
        Ok(handle)
    }

    fn execute(&mut self, chunk: &'p FunctionChunk, mut locals: Vec<Value>) -> Result<Value, ScriptError> {
        let program = self.program;
        let code = &chunk.code;
        let mut stack: Vec<Value> = Vec::with_capacity(16);
        let mut ip = 0;

        while ip < code.len() {
            let instr = code[ip];
            let (a, b) = (instr.a as usize, instr.b as usize);
            ip += 1;

            match instr.op {
                // ── Stack & locals ───────────────────────────
                OpCode::Const => stack.push(self.constants[a].clone()),
                OpCode::Pop => {
                    stack.pop();
                }
                OpCode::Dup => {
                    let from = stack.len().saturating_sub(a);
                    for i in from..stack.len() {
                        let value = stack[i].clone();
                        stack.push(value);
                    }
                }
                OpCode::DupX => {
                    let top = stack.last().cloned().unwrap_or(Value::Null);
                    let at = stack.len().saturating_sub(1 + a);
                    stack.insert(at, top);
                }
                OpCode::Load => stack.push(locals[a].clone()),
                OpCode::Store => locals[a] = pop(&mut stack),

                // ── Control flow ─────────────────────────────
                OpCode::Jump => ip = a,
                OpCode::JumpIfTrue => {
                    if bool_value(&pop(&mut stack))? {
                        ip = a;
                    }
                }
                OpCode::JumpIfFalse => {
                    if !bool_value(&pop(&mut stack))? {
                        ip = a;
                    }
                }
                OpCode::LoopGuard => {
                    let left = int_value(&locals[a])? - b as i32;
                    if left < 0 {
                        return Err(ScriptError::LoopLimit);
                    }
                    locals[a] = Value::Int(left);
                }
                OpCode::Return => return Ok(pop(&mut stack)),

                // ── Operators ────────────────────────────────
                OpCode::Binary | OpCode::Compare | OpCode::Unary => {
                    let operation = Operation::from_operand(instr.a)
                        .ok_or_else(|| ScriptError::IllegalState(format!("bad operation {}", a)))?;
                    let kind = OperandKind::from_operand(instr.b & !CHECKED_FLAG)
                        .ok_or_else(|| ScriptError::IllegalState(format!("bad operand kind {}", b)))?;
                    let checked = instr.b & CHECKED_FLAG != 0;
                    let result = match instr.op {
                        OpCode::Unary => operators::unary(operation, kind, checked, &pop(&mut stack))?,
                        op => {
                            let right = pop(&mut stack);
                            let left = pop(&mut stack);
                            if op == OpCode::Compare {
                                Value::Bool(operators::compare(operation, kind, &left, &right)?)
                            } else {
                                operators::binary(operation, kind, checked, &left, &right)?
                            }
                        }
                    };
                    stack.push(result);
                }
                OpCode::Cast => {
                    let value = pop(&mut stack);
                    stack.push(self.apply_cast(&program.casts[a], value)?);
                }
                OpCode::InstanceOf => {
                    let value = pop(&mut stack);
                    stack.push(Value::Bool(instance_of(self.definition, &value, &program.types[a])));
                }

                // ── Calls ────────────────────────────────────
                OpCode::Invoke => {
                    let args = pop_n(&mut stack, b);
                    let receiver = pop(&mut stack);
                    let member = program.members[a];
                    if receiver.is_null() {
                        return Err(ScriptError::NullPointer(format!(
                            "cannot invoke [{}] on a null receiver",
                            member.name
                        )));
                    }
                    stack.push((member.invoke)(self, &receiver, &args)?);
                }
                OpCode::InvokeStatic => {
                    let args = pop_n(&mut stack, b);
                    let member = program.members[a];
                    stack.push((member.invoke)(self, &Value::Null, &args)?);
                }
                OpCode::CallDynamic => {
                    let args = pop_n(&mut stack, b);
                    let receiver = pop(&mut stack);
                    let handle = self.dynamic(a, &receiver, |d, r, s| def::lookup_method(d, r, &s.name, s.arity))?;
                    stack.push(handle.invoke(self, &receiver, &args)?);
                }
                OpCode::CallLocal => {
                    let args = pop_n(&mut stack, b);
                    stack.push(self.run_function(a, args, false)?);
                }
                OpCode::Lambda => {
                    let captured = program.functions.get(a).map(|f| f.capture_slots.len()).unwrap_or(0);
                    let captures = pop_n(&mut stack, captured);
                    stack.push(Value::Function(Rc::new(FunctionValue {
                        interface: program.names.get(b).cloned(),
                        target: FunctionTarget::Script { function: a, captures },
                    })));
                }

                // ── Fields & elements ────────────────────────
                OpCode::LoadDynamic => {
                    let receiver = pop(&mut stack);
                    let handle = self.dynamic(a, &receiver, |d, r, s| def::lookup_getter(d, r, &s.name))?;
                    stack.push(handle.invoke(self, &receiver, &[])?);
                }
                OpCode::StoreDynamic => {
                    let value = pop(&mut stack);
                    let receiver = pop(&mut stack);
                    let handle = self.dynamic(a, &receiver, |d, r, s| def::lookup_setter(d, r, &s.name))?;
                    handle.invoke(self, &receiver, &[value])?;
                }
                OpCode::LoadIndex => {
                    let index = pop(&mut stack);
                    let receiver = pop(&mut stack);
                    let handle = self.dynamic(a, &receiver, |d, r, _| def::lookup_array_load(d, r))?;
                    stack.push(handle.invoke(self, &receiver, &[index])?);
                }
                OpCode::StoreIndex => {
                    let value = pop(&mut stack);
                    let index = pop(&mut stack);
                    let receiver = pop(&mut stack);
                    let handle = self.dynamic(a, &receiver, |d, r, _| def::lookup_array_store(d, r))?;
                    handle.invoke(self, &receiver, &[index, value])?;
                }
                OpCode::ArrayLoad => {
                    let index = pop(&mut stack);
                    let array = pop(&mut stack);
                    stack.push(def::array_load(&array, &index)?);
                }
                OpCode::ArrayStore => {
                    let value = pop(&mut stack);
                    let index = pop(&mut stack);
                    let array = pop(&mut stack);
                    def::array_store(&array, &index, value)?;
                }
                OpCode::ArrayLength => match pop(&mut stack) {
                    Value::Array(array) => stack.push(Value::Int(array.elements.borrow().len() as i32)),
                    Value::Null => {
                        return Err(ScriptError::NullPointer("cannot read [length] of a null array".to_string()))
                    }
                    other => return Err(ScriptError::class_cast(&other.class_name(), "array")),
                },

                // ── Allocation ───────────────────────────────
                OpCode::NewArray => {
                    let sizes = pop_n(&mut stack, b)
                        .iter()
                        .map(int_value)
                        .collect::<Result<Vec<_>, _>>()?;
                    stack.push(new_array(&program.types[a].name, &sizes)?);
                }
                OpCode::NewArrayInit => {
                    let values = pop_n(&mut stack, b);
                    stack.push(Value::new_array(program.types[a].name.clone(), values));
                }
                OpCode::NewList => {
                    let values = pop_n(&mut stack, a);
                    stack.push(Value::new_list(values));
                }
                OpCode::NewMap => {
                    let flat = pop_n(&mut stack, a * 2);
                    let entries = flat.chunks(2).filter_map(|pair| match pair {
                        [key, value] => Some((key.clone(), value.clone())),
                        _ => None,
                    });
                    stack.push(Value::new_map(entries));
                }

                // ── Iteration ────────────────────────────────
                OpCode::IterStart => {
                    let iterable = pop(&mut stack);
                    stack.push(snapshot(&iterable)?);
                }
                OpCode::IterNext => {
                    let next = match pop(&mut stack) {
                        Value::Iterator(state) => state.borrow_mut().next(),
                        other => return Err(ScriptError::class_cast(&other.class_name(), "Iterator")),
                    };
                    match next {
                        Some(item) => stack.push(item),
                        None => ip = a,
                    }
                }
            }
        }
        Ok(Value::Null)
    }
}

impl<'p> Invoker for Vm<'p> {
    fn call_function(&mut self, function: &Value, args: &[Value]) -> Result<Value, ScriptError> {
        let function = match function {
            Value::Function(function) => function.clone(),
            Value::Null => return Err(ScriptError::NullPointer("cannot call a null function".to_string())),
            other => {
                return Err(ScriptError::illegal(format!(
                    "Cannot call [{}] as a function.",
                    other.class_name()
                )))
            }
        };
        match &function.target {
            FunctionTarget::Script { function, captures } => {
                let mut values = Vec::with_capacity(captures.len() + args.len());
                values.extend(captures.iter().cloned());
                values.extend(args.iter().cloned());
                self.run_function(*function, values, true)
            }
            FunctionTarget::Native(member) => member.call_unbound(self, args),
            FunctionTarget::Deferred { owner, method } => {
                let member = def::resolve_reference(self.definition, owner, method, args.len()).ok_or_else(|| {
                    ScriptError::illegal(format!(
                        "Unknown reference [{}::{}] with [{}] arguments.",
                        owner,
                        method,
                        args.len()
                    ))
                })?;
                member.call_unbound(self, args)
            }
            FunctionTarget::Bound { member, receiver } => (member.invoke)(self, receiver, args),
        }
    }
}
