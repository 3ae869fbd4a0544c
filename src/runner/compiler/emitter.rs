//! Lowers the typed tree to stack bytecode.
//!
//! Every expression leaves exactly one value on the stack, except an
//! assignment whose result is unused. Conditions are threaded through
//! jump labels so `&&`, `||` and `!` never materialize intermediate
//! booleans.

use tracing::debug;

use crate::runner::compiler::bytecode::{
    Constant, FunctionChunk, Instruction, OpCode, Program, Site, CHECKED_FLAG, NO_NAME,
};
use crate::runner::compiler::tree::{Compound, Expr, ExprKind, Function, Guard, Place, Stmt, TypedProgram};
use crate::runner::def::operators::{OperandKind, Operation};
use crate::runner::definition::{Cast, Type};
use crate::runner::ds::native::NativeMember;

/// Pending jumps to a position not yet known.
#[derive(Default)]
struct Label {
    jumps: Vec<usize>,
}

#[derive(Default)]
struct LoopLabels {
    breaks: Label,
    continues: Label,
}

#[derive(Default)]
struct Tables {
    constants: Vec<Constant>,
    members: Vec<&'static NativeMember>,
    casts: Vec<Cast>,
    types: Vec<Type>,
    names: Vec<String>,
    sites: Vec<Site>,
}

fn intern<T: PartialEq>(table: &mut Vec<T>, item: T) -> u32 {
    match table.iter().position(|existing| *existing == item) {
        Some(index) => index as u32,
        None => {
            table.push(item);
            (table.len() - 1) as u32
        }
    }
}

struct Emitter<'t> {
    tables: &'t mut Tables,
    code: Vec<Instruction>,
    loops: Vec<LoopLabels>,
}

/// Emits every function of `typed`. Each function with a loop counter
/// starts by loading `max_loop_counter` into it.
pub fn emit(typed: TypedProgram, max_loop_counter: u32) -> Program {
    let mut tables = Tables::default();
    let mut functions = Vec::with_capacity(typed.functions.len());
    for function in typed.functions {
        functions.push(emit_function(&mut tables, function, max_loop_counter));
    }
    debug!(
        functions = functions.len(),
        constants = tables.constants.len(),
        sites = tables.sites.len(),
        "bytecode emitted"
    );
    Program {
        constants: tables.constants,
        members: tables.members,
        casts: tables.casts,
        types: tables.types,
        names: tables.names,
        sites: tables.sites,
        functions,
        main: typed.main,
        bindings: typed.bindings,
    }
}

fn emit_function(tables: &mut Tables, function: Function, max_loop_counter: u32) -> FunctionChunk {
    let mut emitter = Emitter {
        tables,
        code: vec![],
        loops: vec![],
    };
    if let Some(slot) = function.loop_slot {
        emitter.constant(Constant::Int(max_loop_counter.min(i32::MAX as u32) as i32));
        emitter.op(OpCode::Store, slot as u32, 0);
    }
    for stmt in &function.body {
        emitter.statement(stmt);
    }
    emitter.constant(Constant::Null);
    emitter.op(OpCode::Return, 0, 0);

    let param_casts = function
        .param_casts
        .into_iter()
        .map(|cast| cast.map(|c| intern(&mut emitter.tables.casts, c)))
        .collect();
    FunctionChunk {
        name: function.name,
        code: emitter.code,
        slot_count: function.slot_count,
        capture_slots: function.capture_slots,
        param_slots: function.param_slots,
        param_casts,
        loop_slot: function.loop_slot,
    }
}

impl<'t> Emitter<'t> {
    fn op(&mut self, op: OpCode, a: u32, b: u32) {
        self.code.push(Instruction::new(op, a, b));
    }

    fn pc(&self) -> usize {
        self.code.len()
    }

    fn jump(&mut self, op: OpCode, label: &mut Label) {
        label.jumps.push(self.pc());
        self.op(op, 0, 0);
    }

    fn jump_to(&mut self, op: OpCode, target: usize) {
        self.op(op, target as u32, 0);
    }

    fn patch(&mut self, label: Label, target: usize) {
        for at in label.jumps {
            self.code[at].a = target as u32;
        }
    }

    fn bind(&mut self, label: Label) {
        let here = self.pc();
        self.patch(label, here);
    }

    fn constant(&mut self, constant: Constant) {
        let index = intern(&mut self.tables.constants, constant);
        self.op(OpCode::Const, index, 0);
    }

    fn member(&mut self, member: &'static NativeMember) -> u32 {
        match self.tables.members.iter().position(|m| std::ptr::eq(*m, member)) {
            Some(index) => index as u32,
            None => {
                self.tables.members.push(member);
                (self.tables.members.len() - 1) as u32
            }
        }
    }

    fn cast(&mut self, cast: &Cast) {
        let index = intern(&mut self.tables.casts, cast.clone());
        self.op(OpCode::Cast, index, 0);
    }

    fn typ(&mut self, typ: &Type) -> u32 {
        intern(&mut self.tables.types, typ.clone())
    }

    /// Dynamic sites are never shared: each keeps its own cache.
    fn site(&mut self, name: &str, arity: usize) -> u32 {
        self.tables.sites.push(Site {
            name: name.to_string(),
            arity,
        });
        (self.tables.sites.len() - 1) as u32
    }

    fn guard(&mut self, guard: &Option<Guard>) {
        if let Some(guard) = guard {
            self.op(OpCode::LoopGuard, guard.slot as u32, guard.cost);
        }
    }

    // ── Statements ────────────────────────────────────────────

    fn statement(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(stmts) => {
                for stmt in stmts {
                    self.statement(stmt);
                }
            }
            Stmt::Expression(expr) => {
                self.expression(expr);
                if expr.pushes() {
                    self.op(OpCode::Pop, 0, 0);
                }
            }
            Stmt::Declare { slot, value } => {
                self.expression(value);
                self.op(OpCode::Store, *slot as u32, 0);
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                let mut otherwise = Label::default();
                self.condition(test, false, &mut otherwise);
                self.statement(consequent);
                match alternate {
                    Some(alternate) => {
                        let mut end = Label::default();
                        self.jump(OpCode::Jump, &mut end);
                        self.bind(otherwise);
                        self.statement(alternate);
                        self.bind(end);
                    }
                    None => self.bind(otherwise),
                }
            }
            Stmt::While { test, body, guard } => {
                let start = self.pc();
                let mut end = Label::default();
                if let Some(test) = test {
                    self.condition(test, false, &mut end);
                }
                self.guard(guard);
                self.loop_body(body, start);
                self.jump_to(OpCode::Jump, start);
                self.finish_loop(end);
            }
            Stmt::DoWhile { body, test, guard } => {
                let start = self.pc();
                self.loops.push(LoopLabels::default());
                self.statement(body);
                let labels = self.loops.pop().unwrap_or_default();
                self.bind(labels.continues);
                self.guard(guard);
                match test {
                    Some(test) => {
                        let mut again = Label::default();
                        self.condition(test, true, &mut again);
                        self.patch(again, start);
                    }
                    None => self.jump_to(OpCode::Jump, start),
                }
                self.bind(labels.breaks);
            }
            Stmt::For {
                init,
                test,
                update,
                body,
                guard,
            } => {
                for stmt in init {
                    self.statement(stmt);
                }
                let start = self.pc();
                let mut end = Label::default();
                if let Some(test) = test {
                    self.condition(test, false, &mut end);
                }
                self.guard(guard);
                self.loops.push(LoopLabels::default());
                self.statement(body);
                let labels = self.loops.pop().unwrap_or_default();
                self.bind(labels.continues);
                if let Some(update) = update {
                    self.expression(update);
                    if update.pushes() {
                        self.op(OpCode::Pop, 0, 0);
                    }
                }
                self.jump_to(OpCode::Jump, start);
                self.bind(end);
                self.bind(labels.breaks);
            }
            Stmt::ForEach {
                iterable,
                iterator_slot,
                slot,
                cast,
                body,
                guard,
            } => {
                self.expression(iterable);
                self.op(OpCode::IterStart, 0, 0);
                self.op(OpCode::Store, *iterator_slot as u32, 0);
                let start = self.pc();
                let mut end = Label::default();
                self.op(OpCode::Load, *iterator_slot as u32, 0);
                self.jump(OpCode::IterNext, &mut end);
                if let Some(cast) = cast {
                    self.cast(cast);
                }
                self.op(OpCode::Store, *slot as u32, 0);
                self.guard(guard);
                self.loop_body(body, start);
                self.jump_to(OpCode::Jump, start);
                self.finish_loop(end);
            }
            Stmt::Return(value) => {
                match value {
                    Some(value) => self.expression(value),
                    None => self.constant(Constant::Null),
                }
                self.op(OpCode::Return, 0, 0);
            }
            Stmt::Break => {
                let mut labels = self.loops.pop().unwrap_or_default();
                self.jump(OpCode::Jump, &mut labels.breaks);
                self.loops.push(labels);
            }
            Stmt::Continue => {
                let mut labels = self.loops.pop().unwrap_or_default();
                self.jump(OpCode::Jump, &mut labels.continues);
                self.loops.push(labels);
            }
        }
    }

    /// Body of a loop whose `continue` goes back to `start`. Its breaks
    /// are kept for [`Emitter::finish_loop`].
    fn loop_body(&mut self, body: &Stmt, start: usize) {
        self.loops.push(LoopLabels::default());
        self.statement(body);
        let labels = self.loops.pop().unwrap_or_default();
        self.patch(labels.continues, start);
        self.loops.push(LoopLabels {
            breaks: labels.breaks,
            continues: Label::default(),
        });
    }

    fn finish_loop(&mut self, end: Label) {
        let labels = self.loops.pop().unwrap_or_default();
        self.bind(end);
        self.bind(labels.breaks);
    }

    // ── Expressions ───────────────────────────────────────────

    /// Jumps to `target` when `expr` evaluates to `when`; falls through
    /// otherwise.
    fn condition(&mut self, expr: &Expr, when: bool, target: &mut Label) {
        match &expr.kind {
            ExprKind::Constant(Constant::Bool(value)) => {
                if *value == when {
                    self.jump(OpCode::Jump, target);
                }
            }
            ExprKind::Logical { and, left, right } => {
                // `a && b` is false as soon as `a` is; `a || b` true as soon as `a` is.
                let short = !*and;
                if when == short {
                    self.condition(left, when, target);
                    self.condition(right, when, target);
                } else {
                    let mut skip = Label::default();
                    self.condition(left, short, &mut skip);
                    self.condition(right, when, target);
                    self.bind(skip);
                }
            }
            ExprKind::Unary {
                operation: Operation::Not,
                kind: OperandKind::Bool,
                operand,
                ..
            } => self.condition(operand, !when, target),
            _ => {
                self.expression(expr);
                let op = if when { OpCode::JumpIfTrue } else { OpCode::JumpIfFalse };
                self.jump(op, target);
            }
        }
    }

    fn expressions(&mut self, exprs: &[Expr]) {
        for expr in exprs {
            self.expression(expr);
        }
    }

    fn expression(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Constant(constant) => self.constant(constant.clone()),
            ExprKind::Load(place) => {
                self.place_operands(place);
                self.load(place);
            }
            ExprKind::Assign {
                place,
                compound,
                value,
                post,
                read,
            } => self.assign(place, compound.as_ref(), value, *post, *read),
            ExprKind::Field { receiver, member } => {
                let index = self.member(member);
                match receiver {
                    Some(receiver) => {
                        self.expression(receiver);
                        self.op(OpCode::Invoke, index, 0);
                    }
                    None => self.op(OpCode::InvokeStatic, index, 0),
                }
            }
            ExprKind::Binary {
                operation,
                kind,
                checked,
                left,
                right,
            } => {
                self.expression(left);
                self.expression(right);
                self.binary(*operation, *kind, *checked);
            }
            ExprKind::Compare {
                operation,
                kind,
                left,
                right,
            } => {
                self.expression(left);
                self.expression(right);
                self.op(OpCode::Compare, operation.as_operand(), kind.as_operand());
            }
            ExprKind::Unary {
                operation,
                kind,
                checked,
                operand,
            } => {
                self.expression(operand);
                let flags = if *checked { CHECKED_FLAG } else { 0 };
                self.op(OpCode::Unary, operation.as_operand(), kind.as_operand() | flags);
            }
            ExprKind::Logical { .. } => {
                let mut otherwise = Label::default();
                let mut end = Label::default();
                self.condition(expr, false, &mut otherwise);
                self.constant(Constant::Bool(true));
                self.jump(OpCode::Jump, &mut end);
                self.bind(otherwise);
                self.constant(Constant::Bool(false));
                self.bind(end);
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let mut otherwise = Label::default();
                let mut end = Label::default();
                self.condition(test, false, &mut otherwise);
                self.expression(consequent);
                self.jump(OpCode::Jump, &mut end);
                self.bind(otherwise);
                self.expression(alternate);
                self.bind(end);
            }
            ExprKind::Cast { operand, cast } => {
                self.expression(operand);
                self.cast(cast);
            }
            ExprKind::InstanceOf { operand, typ } => {
                self.expression(operand);
                let index = self.typ(typ);
                self.op(OpCode::InstanceOf, index, 0);
            }
            ExprKind::Invoke { receiver, member, args } => {
                self.expression(receiver);
                self.expressions(args);
                let index = self.member(member);
                self.op(OpCode::Invoke, index, args.len() as u32);
            }
            ExprKind::InvokeStatic { member, args } => {
                self.expressions(args);
                let index = self.member(member);
                self.op(OpCode::InvokeStatic, index, args.len() as u32);
            }
            ExprKind::CallDynamic { receiver, name, args } => {
                self.expression(receiver);
                self.expressions(args);
                let site = self.site(name, args.len());
                self.op(OpCode::CallDynamic, site, args.len() as u32);
            }
            ExprKind::CallLocal { function, args } => {
                self.expressions(args);
                self.op(OpCode::CallLocal, *function as u32, args.len() as u32);
            }
            ExprKind::ArrayLength(array) => {
                self.expression(array);
                self.op(OpCode::ArrayLength, 0, 0);
            }
            ExprKind::NewArray { typ, sizes } => {
                self.expressions(sizes);
                let index = self.typ(typ);
                self.op(OpCode::NewArray, index, sizes.len() as u32);
            }
            ExprKind::NewArrayInit { typ, values } => {
                self.expressions(values);
                let index = self.typ(typ);
                self.op(OpCode::NewArrayInit, index, values.len() as u32);
            }
            ExprKind::NewList(values) => {
                self.expressions(values);
                self.op(OpCode::NewList, values.len() as u32, 0);
            }
            ExprKind::NewMap(entries) => {
                for (key, value) in entries {
                    self.expression(key);
                    self.expression(value);
                }
                self.op(OpCode::NewMap, entries.len() as u32, 0);
            }
            ExprKind::Lambda {
                function,
                interface,
                captures,
            } => {
                for slot in captures {
                    self.op(OpCode::Load, *slot as u32, 0);
                }
                let name = match interface {
                    Some(name) => intern(&mut self.tables.names, name.clone()),
                    None => NO_NAME,
                };
                self.op(OpCode::Lambda, *function as u32, name);
            }
        }
    }

    fn binary(&mut self, operation: Operation, kind: OperandKind, checked: bool) {
        let flags = if checked { CHECKED_FLAG } else { 0 };
        self.op(OpCode::Binary, operation.as_operand(), kind.as_operand() | flags);
    }

    // ── Places ────────────────────────────────────────────────

    /// Pushes what the place needs below the value: receiver, key, index.
    fn place_operands(&mut self, place: &Place) {
        match place {
            Place::Local(_) => {}
            Place::Shortcut { receiver, key, .. } => {
                self.expression(receiver);
                if let Some(key) = key {
                    self.expression(key);
                }
            }
            Place::Dynamic { receiver, .. } => self.expression(receiver),
            Place::Array { array: receiver, index } | Place::Index { receiver, index } => {
                self.expression(receiver);
                self.expression(index);
            }
        }
    }

    /// Consumes the place operands and pushes the current value.
    fn load(&mut self, place: &Place) {
        match place {
            Place::Local(slot) => self.op(OpCode::Load, *slot as u32, 0),
            Place::Shortcut { key, getter, .. } => {
                if let Some(getter) = getter {
                    let index = self.member(getter);
                    self.op(OpCode::Invoke, index, key.is_some() as u32);
                }
            }
            Place::Dynamic { name, .. } => {
                let site = self.site(name, 0);
                self.op(OpCode::LoadDynamic, site, 0);
            }
            Place::Array { .. } => self.op(OpCode::ArrayLoad, 0, 0),
            Place::Index { .. } => {
                let site = self.site("", 1);
                self.op(OpCode::LoadIndex, site, 0);
            }
        }
    }

    /// Consumes the place operands and the value above them.
    fn store(&mut self, place: &Place) {
        match place {
            Place::Local(slot) => self.op(OpCode::Store, *slot as u32, 0),
            Place::Shortcut { key, setter, .. } => {
                if let Some(setter) = setter {
                    let index = self.member(setter);
                    self.op(OpCode::Invoke, index, 1 + key.is_some() as u32);
                    self.op(OpCode::Pop, 0, 0);
                }
            }
            Place::Dynamic { name, .. } => {
                let site = self.site(name, 1);
                self.op(OpCode::StoreDynamic, site, 0);
            }
            Place::Array { .. } => self.op(OpCode::ArrayStore, 0, 0),
            Place::Index { .. } => {
                let site = self.site("", 2);
                self.op(OpCode::StoreIndex, site, 0);
            }
        }
    }

    fn assign(&mut self, place: &Place, compound: Option<&Compound>, value: &Expr, post: bool, read: bool) {
        let operands = place.operands();
        self.place_operands(place);
        match compound {
            None => {
                self.expression(value);
                if read {
                    self.op(OpCode::DupX, operands, 0);
                }
            }
            Some(compound) => {
                if operands > 0 {
                    self.op(OpCode::Dup, operands, 0);
                }
                self.load(place);
                if post && read {
                    self.op(OpCode::DupX, operands, 0);
                }
                if let Some(promote) = &compound.promote {
                    self.cast(promote);
                }
                self.expression(value);
                self.binary(compound.operation, compound.kind, compound.checked);
                if let Some(back) = &compound.back {
                    self.cast(back);
                }
                if !post && read {
                    self.op(OpCode::DupX, operands, 0);
                }
            }
        }
        self.store(place);
    }
}
