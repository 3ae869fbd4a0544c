//! Semantic analysis: resolves names and types over the parsed tree and
//! produces the typed tree the emitter consumes.
//!
//! Statements are checked here (reachability, loop escapes, missing
//! returns); expressions live in the sibling modules.

mod caster;
mod expression;
mod lambda;
mod link;

use tracing::debug;

use crate::parser::ast::{
    BlockData, DeclType, DeclarationData, ExpressionType, ForInit, FunctionData, HasMeta, LinkType, Meta,
    SourceData, StatementType,
};
use crate::runner::compiler::bytecode::{Bindings, Constant};
use crate::runner::compiler::locals::{self, Locals};
use crate::runner::compiler::tree::{Expr, ExprKind, Function, Guard, Stmt, TypedProgram};
use crate::runner::compiler::CompilerSettings;
use crate::runner::definition::{Cast, Definition, Sort, Type};
use crate::runner::ds::error::CompileError;

/// What a statement does to control flow.
#[derive(Debug, Default, Clone, Copy)]
struct Flow {
    /// Always returns from the function.
    method_escape: bool,
    /// Always leaves the current iteration.
    loop_escape: bool,
    /// Never falls through to the next statement.
    all_escape: bool,
    any_continue: bool,
    any_break: bool,
    /// Statements charged against the loop counter.
    count: u32,
}

impl Flow {
    fn simple() -> Self {
        Flow {
            count: 1,
            ..Default::default()
        }
    }
}

pub struct Analyzer<'a> {
    definition: &'a Definition,
    settings: &'a CompilerSettings,
    source: &'a str,
    locals: Locals,
    functions: Vec<Option<Function>>,
    /// Loops enclosing the current statement within the current call frame.
    loops: usize,
}

/// Analyzes a parsed script. `inputs` are extra read-only bindings
/// declared in the main frame.
pub fn analyze(
    definition: &Definition,
    settings: &CompilerSettings,
    source: &str,
    data: &SourceData,
    inputs: &[String],
) -> Result<TypedProgram, CompileError> {
    let mut analyzer = Analyzer {
        definition,
        settings,
        source,
        locals: Locals::new(definition.types().def.clone()),
        functions: vec![],
        loops: 0,
    };
    let program = analyzer.analyze_source(data, inputs)?;
    debug!(functions = program.functions.len(), "analysis complete");
    Ok(program)
}

fn is_statement_expression(expression: &ExpressionType) -> bool {
    match expression {
        ExpressionType::Assignment { .. }
        | ExpressionType::Update { .. }
        | ExpressionType::CallLocal { .. }
        | ExpressionType::NewObject { .. } => true,
        ExpressionType::Chain { head, links, .. } => match links.last() {
            Some(LinkType::Call { .. }) => true,
            Some(_) => false,
            None => is_statement_expression(head),
        },
        _ => false,
    }
}

impl<'a> Analyzer<'a> {
    pub(crate) fn error(&self, meta: &Meta, message: impl Into<String>) -> CompileError {
        CompileError::semantic(self.source, meta.start_index, message)
    }

    /// Source text of a node, for messages.
    pub(crate) fn text(&self, meta: &Meta) -> &str {
        self.source.get(meta.start_index..meta.end_index).unwrap_or("")
    }

    pub(crate) fn checked(&self) -> bool {
        !self.settings.numeric_overflow
    }

    fn guarded(&self) -> bool {
        self.settings.max_loop_counter > 0
    }

    pub(crate) fn resolve_type(&self, decl: &DeclType) -> Result<Type, CompileError> {
        self.definition
            .get_type(&decl.canonical())
            .map_err(|_| self.error(&decl.meta, format!("Unknown type [{}].", decl.canonical())))
    }

    fn define(&mut self, meta: &Meta, name: &str, typ: Type, readonly: bool) -> Result<usize, CompileError> {
        self.locals
            .define_variable(name, typ, readonly)
            .map(|v| v.slot)
            .map_err(|message| self.error(meta, message))
    }

    fn seed(&mut self, name: &str, typ: &str, readonly: bool) -> Result<usize, CompileError> {
        let typ = self
            .definition
            .get_type(typ)
            .map_err(|e| CompileError::semantic(self.source, 0, e.to_string()))?;
        self.locals
            .add_variable(name, typ, readonly)
            .map(|v| v.slot)
            .map_err(|message| CompileError::semantic(self.source, 0, message))
    }

    fn seed_loop_counter(&mut self) -> Result<Option<usize>, CompileError> {
        if self.guarded() {
            Ok(Some(self.seed(locals::LOOP, "int", false)?))
        } else {
            Ok(None)
        }
    }

    /// Slot of the loop counter visible from the current frame.
    fn guard(&mut self, flow: &Flow) -> Option<Guard> {
        if !self.guarded() {
            return None;
        }
        let slot = self.locals.get_variable(locals::LOOP)?.slot;
        Some(Guard {
            slot,
            cost: flow.count.max(1),
        })
    }

    fn analyze_source(&mut self, data: &SourceData, inputs: &[String]) -> Result<TypedProgram, CompileError> {
        self.seed(locals::THIS, "Object", true)?;
        let params = self.seed(locals::PARAMS, "Map", true)?;
        self.seed(locals::SCORER, "def", true)?;
        let doc = self.seed(locals::DOC, "Map", true)?;
        let value = self.seed(locals::VALUE, "def", true)?;
        let score = if data.uses_score {
            Some(self.seed(locals::SCORE, "double", true)?)
        } else {
            None
        };
        let ctx = if data.uses_ctx {
            Some(self.seed(locals::CTX, "Map", true)?)
        } else {
            None
        };
        let loop_slot = self.seed_loop_counter()?;
        let mut bindings = Bindings {
            params,
            doc,
            value,
            score,
            ctx,
            inputs: vec![],
        };
        let def = self.definition.types().def.clone();
        for name in inputs {
            let slot = self.define(&Meta::default(), name, def.clone(), true)?;
            bindings.inputs.push((name.clone(), slot));
        }

        for (index, function) in data.functions.iter().enumerate() {
            let ret = self.resolve_type(&function.return_type)?;
            let mut params = vec![];
            for parameter in &function.parameters {
                match &parameter.typ {
                    Some(decl) => params.push(self.resolve_type(decl)?),
                    None => params.push(def.clone()),
                }
            }
            self.locals
                .add_function(locals::FunctionSignature {
                    name: function.name.clone(),
                    ret,
                    params,
                    index,
                })
                .map_err(|message| self.error(&function.meta, message))?;
            self.functions.push(None);
        }
        for (index, function) in data.functions.iter().enumerate() {
            let compiled = self.analyze_function(function)?;
            self.functions[index] = Some(compiled);
        }

        let body = self.analyze_main(&data.statements)?;
        let main = self.functions.len();
        self.functions.push(Some(Function {
            name: "main".to_string(),
            body,
            slot_count: self.locals.main_slot_count(),
            capture_slots: vec![],
            param_slots: vec![],
            param_casts: vec![],
            loop_slot,
        }));

        let source = self.source;
        let functions = std::mem::take(&mut self.functions)
            .into_iter()
            .enumerate()
            .map(|(i, f)| f.ok_or_else(|| CompileError::semantic(source, 0, format!("function #{} was never analyzed", i))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TypedProgram {
            functions,
            main,
            bindings,
        })
    }

    fn analyze_function(&mut self, function: &FunctionData) -> Result<Function, CompileError> {
        let signature = self
            .locals
            .get_function(&function.name, function.parameters.len())
            .cloned()
            .ok_or_else(|| self.error(&function.meta, format!("Unknown function [{}].", function.name)))?;
        debug!(name = %function.name, "analyzing function");
        self.locals.push_function(signature.ret.clone());
        let saved_loops = std::mem::replace(&mut self.loops, 0);

        let mut param_slots = vec![];
        let mut param_casts = vec![];
        for (parameter, typ) in function.parameters.iter().zip(signature.params.iter()) {
            param_slots.push(self.define(&parameter.meta, &parameter.name, typ.clone(), false)?);
            param_casts.push(self.entry_cast(&parameter.meta, typ)?);
        }
        let loop_slot = self.seed_loop_counter()?;
        let (body, flow) = self.analyze_statements(&function.body.statements, false)?;
        if !signature.ret.is_void() && !flow.method_escape {
            return Err(self.error(
                &function.meta,
                format!("Not all paths provide a return value for function [{}].", function.name),
            ));
        }

        self.loops = saved_loops;
        let frame = self.locals.pop_call();
        Ok(Function {
            name: function.name.clone(),
            body,
            slot_count: frame.slot_count,
            capture_slots: vec![],
            param_slots,
            param_casts,
            loop_slot,
        })
    }

    /// The conversion applied to an untyped argument entering a typed
    /// parameter.
    fn entry_cast(&self, meta: &Meta, typ: &Type) -> Result<Option<Cast>, CompileError> {
        if typ.is_def() {
            return Ok(None);
        }
        let def = &self.definition.types().def;
        match self.definition.transform(def, typ, false) {
            Some(cast) if cast.is_noop() => Ok(None),
            Some(cast) => Ok(Some(cast)),
            None => Err(self.error(meta, format!("Cannot cast from [def] to [{}].", typ))),
        }
    }

    /// The main body: the last expression statement is the result.
    fn analyze_main(&mut self, statements: &[StatementType]) -> Result<Vec<Stmt>, CompileError> {
        let (body, _) = self.analyze_statements(statements, true)?;
        Ok(body)
    }

    fn analyze_statements(&mut self, statements: &[StatementType], main: bool) -> Result<(Vec<Stmt>, Flow), CompileError> {
        let mut out = vec![];
        let mut flow = Flow::default();
        let last = statements.len().saturating_sub(1);
        for (i, statement) in statements.iter().enumerate() {
            if flow.all_escape {
                return Err(self.error(statement.get_meta(), "Unreachable statement."));
            }
            let (stmt, next) = if main && i == last {
                self.analyze_last(statement)?
            } else {
                self.analyze_statement(statement)?
            };
            flow = Flow {
                method_escape: next.method_escape,
                loop_escape: next.loop_escape,
                all_escape: next.all_escape,
                any_continue: flow.any_continue || next.any_continue,
                any_break: flow.any_break || next.any_break,
                count: flow.count + next.count,
            };
            out.push(stmt);
        }
        Ok((out, flow))
    }

    /// Last statement of the main body: a trailing expression becomes the
    /// return value.
    fn analyze_last(&mut self, statement: &StatementType) -> Result<(Stmt, Flow), CompileError> {
        match statement {
            StatementType::Expression { expression, .. } => {
                let expr = self.expression(expression, None)?;
                if expr.typ.is_void() {
                    return Ok((Stmt::Expression(expr), Flow::simple()));
                }
                let def = self.definition.types().def.clone();
                let value = self.cast(expr, &def, false, expression.get_meta())?;
                Ok((
                    Stmt::Return(Some(value)),
                    Flow {
                        method_escape: true,
                        loop_escape: true,
                        all_escape: true,
                        count: 1,
                        ..Default::default()
                    },
                ))
            }
            other => self.analyze_statement(other),
        }
    }

    fn analyze_block(&mut self, block: &BlockData) -> Result<(Stmt, Flow), CompileError> {
        self.locals.push_block();
        let result = self.analyze_statements(&block.statements, false);
        self.locals.pop_block();
        let (body, flow) = result?;
        Ok((Stmt::Block(body), flow))
    }

    /// A statement in its own scope, as the body of an `if` or a loop.
    fn analyze_scoped(&mut self, statement: &StatementType) -> Result<(Stmt, Flow), CompileError> {
        self.locals.push_block();
        let result = self.analyze_statement(statement);
        self.locals.pop_block();
        result
    }

    fn analyze_loop_body(&mut self, statement: &StatementType) -> Result<(Stmt, Flow), CompileError> {
        self.loops += 1;
        let result = self.analyze_scoped(statement);
        self.loops -= 1;
        result
    }

    fn condition(&mut self, test: &ExpressionType) -> Result<Expr, CompileError> {
        let boolean = self.definition.types().boolean.clone();
        self.expression_as(test, &boolean, false)
    }

    fn analyze_statement(&mut self, statement: &StatementType) -> Result<(Stmt, Flow), CompileError> {
        match statement {
            StatementType::Block(block) => self.analyze_block(block),
            StatementType::Empty { .. } => Ok((Stmt::Block(vec![]), Flow::default())),
            StatementType::Declaration(declaration) => {
                let stmts = self.analyze_declaration(declaration)?;
                Ok((Stmt::Block(stmts), Flow::simple()))
            }
            StatementType::Expression { meta, expression } => {
                if !is_statement_expression(expression) {
                    return Err(self.error(meta, "Not a statement."));
                }
                let mut expr = self.expression(expression, None)?;
                if let ExprKind::Assign { read, .. } = &mut expr.kind {
                    *read = false;
                }
                Ok((Stmt::Expression(expr), Flow::simple()))
            }
            StatementType::If {
                meta,
                test,
                consequent,
                alternate,
            } => {
                let test = self.condition(test)?;
                if test.constant().is_some() || consequent.is_empty() {
                    return Err(self.error(meta, "Extraneous if statement."));
                }
                let (consequent, then_flow) = self.analyze_scoped(consequent)?;
                match alternate {
                    None => Ok((
                        Stmt::If {
                            test,
                            consequent: Box::new(consequent),
                            alternate: None,
                        },
                        Flow {
                            any_continue: then_flow.any_continue,
                            any_break: then_flow.any_break,
                            count: 1,
                            ..Default::default()
                        },
                    )),
                    Some(alternate) => {
                        let (alternate, else_flow) = self.analyze_scoped(alternate)?;
                        Ok((
                            Stmt::If {
                                test,
                                consequent: Box::new(consequent),
                                alternate: Some(Box::new(alternate)),
                            },
                            Flow {
                                method_escape: then_flow.method_escape && else_flow.method_escape,
                                loop_escape: then_flow.loop_escape && else_flow.loop_escape,
                                all_escape: then_flow.all_escape && else_flow.all_escape,
                                any_continue: then_flow.any_continue || else_flow.any_continue,
                                any_break: then_flow.any_break || else_flow.any_break,
                                count: 1,
                            },
                        ))
                    }
                }
            }
            StatementType::While { meta, test, body } => {
                let test = self.condition(test)?;
                let continuous = match test.constant().and_then(Constant::as_bool) {
                    Some(false) => return Err(self.error(meta, "Extraneous while loop.")),
                    Some(true) => {
                        if body.is_empty() {
                            return Err(self.error(meta, "While loop has no escape."));
                        }
                        true
                    }
                    None => false,
                };
                let (body, flow) = self.analyze_loop_body(body)?;
                let guard = self.guard(&flow);
                Ok((
                    Stmt::While {
                        test: if continuous { None } else { Some(test) },
                        body: Box::new(body),
                        guard,
                    },
                    loop_flow(continuous, &flow),
                ))
            }
            StatementType::DoWhile { meta, body, test } => {
                self.loops += 1;
                let result = self.analyze_block(body);
                self.loops -= 1;
                let (body_stmt, flow) = result?;
                let test = self.condition(test)?;
                let continuous = match test.constant().and_then(Constant::as_bool) {
                    Some(false) => return Err(self.error(meta, "Extraneous do while loop.")),
                    Some(true) => {
                        if body.statements.is_empty() {
                            return Err(self.error(meta, "Do while loop has no escape."));
                        }
                        true
                    }
                    None => false,
                };
                let guard = self.guard(&flow);
                Ok((
                    Stmt::DoWhile {
                        body: Box::new(body_stmt),
                        test: if continuous { None } else { Some(test) },
                        guard,
                    },
                    loop_flow(continuous, &flow),
                ))
            }
            StatementType::For {
                meta,
                init,
                test,
                update,
                body,
            } => {
                self.locals.push_block();
                let result = self.analyze_for(meta, init, test, update, body);
                self.locals.pop_block();
                result
            }
            StatementType::ForEach {
                meta,
                typ,
                name,
                iterable,
                body,
            } => {
                self.locals.push_block();
                let result = self.analyze_for_each(meta, typ, name, iterable, body);
                self.locals.pop_block();
                result
            }
            StatementType::Return { meta, argument } => {
                let stmt = self.analyze_return(meta, argument)?;
                Ok((
                    stmt,
                    Flow {
                        method_escape: true,
                        loop_escape: true,
                        all_escape: true,
                        count: 1,
                        ..Default::default()
                    },
                ))
            }
            StatementType::Break { meta } => {
                if self.loops == 0 {
                    return Err(self.error(meta, "Break statement outside of a loop."));
                }
                Ok((
                    Stmt::Break,
                    Flow {
                        loop_escape: true,
                        all_escape: true,
                        any_break: true,
                        count: 1,
                        ..Default::default()
                    },
                ))
            }
            StatementType::Continue { meta } => {
                if self.loops == 0 {
                    return Err(self.error(meta, "Continue statement outside of a loop."));
                }
                Ok((
                    Stmt::Continue,
                    Flow {
                        loop_escape: true,
                        all_escape: true,
                        any_continue: true,
                        count: 1,
                        ..Default::default()
                    },
                ))
            }
        }
    }

    fn analyze_declaration(&mut self, declaration: &DeclarationData) -> Result<Vec<Stmt>, CompileError> {
        let typ = self.resolve_type(&declaration.typ)?;
        if typ.is_void() {
            return Err(self.error(&declaration.meta, "Cannot declare a variable of type [void]."));
        }
        let mut stmts = vec![];
        for declarator in &declaration.declarators {
            let value = match &declarator.initializer {
                Some(initializer) => self.expression_as(initializer, &typ, false)?,
                None => Expr::new(ExprKind::Constant(default_value(&typ)), typ.clone()),
            };
            let slot = self.define(&declarator.meta, &declarator.name, typ.clone(), false)?;
            stmts.push(Stmt::Declare { slot, value });
        }
        Ok(stmts)
    }

    fn analyze_for(
        &mut self,
        meta: &Meta,
        init: &Option<ForInit>,
        test: &Option<ExpressionType>,
        update: &Option<ExpressionType>,
        body: &StatementType,
    ) -> Result<(Stmt, Flow), CompileError> {
        let init = match init {
            Some(ForInit::Declaration(declaration)) => self.analyze_declaration(declaration)?,
            Some(ForInit::Expression(expression)) => {
                let mut expr = self.expression(expression, None)?;
                if let ExprKind::Assign { read, .. } = &mut expr.kind {
                    *read = false;
                }
                vec![Stmt::Expression(expr)]
            }
            None => vec![],
        };
        let (test, continuous) = match test {
            Some(test) => {
                let test = self.condition(test)?;
                match test.constant().and_then(Constant::as_bool) {
                    Some(false) => return Err(self.error(meta, "Extraneous for loop.")),
                    Some(true) => (None, true),
                    None => (Some(test), false),
                }
            }
            None => (None, true),
        };
        if continuous && body.is_empty() {
            return Err(self.error(meta, "For loop has no escape."));
        }
        let update = match update {
            Some(update) => {
                let mut expr = self.expression(update, None)?;
                if let ExprKind::Assign { read, .. } = &mut expr.kind {
                    *read = false;
                }
                Some(expr)
            }
            None => None,
        };
        let (body, flow) = self.analyze_loop_body(body)?;
        let guard = self.guard(&flow);
        Ok((
            Stmt::For {
                init,
                test,
                update,
                body: Box::new(body),
                guard,
            },
            loop_flow(continuous, &flow),
        ))
    }

    fn analyze_for_each(
        &mut self,
        meta: &Meta,
        typ: &Option<DeclType>,
        name: &str,
        iterable: &ExpressionType,
        body: &StatementType,
    ) -> Result<(Stmt, Flow), CompileError> {
        let iterable = self.expression(iterable, None)?;
        let types = self.definition.types();
        let element = if iterable.typ.is_array() {
            self.definition
                .element_type(&iterable.typ)
                .map_err(|e| self.error(meta, e.to_string()))?
        } else if iterable.typ.is_def() || self.is_iterable(&iterable.typ) {
            types.def.clone()
        } else {
            return Err(self.error(meta, format!("Cannot iterate over type [{}].", iterable.typ)));
        };
        let variable_type = match typ {
            Some(decl) => self.resolve_type(decl)?,
            None => types.def.clone(),
        };
        let cast = if element == variable_type {
            None
        } else {
            match self.definition.transform(&element, &variable_type, false) {
                Some(cast) if cast.is_noop() => None,
                Some(cast) => Some(cast),
                None => {
                    return Err(self.error(
                        meta,
                        format!("Cannot cast from [{}] to [{}].", element, variable_type),
                    ))
                }
            }
        };
        let iterator_slot = self.locals.temporary(&types.def);
        let slot = self.define(meta, name, variable_type, false)?;
        let (body, flow) = self.analyze_loop_body(body)?;
        let guard = self.guard(&flow);
        Ok((
            Stmt::ForEach {
                iterable,
                iterator_slot,
                slot,
                cast,
                body: Box::new(body),
                guard,
            },
            Flow::simple(),
        ))
    }

    fn is_iterable(&self, typ: &Type) -> bool {
        match self.definition.get_type("Iterable") {
            Ok(iterable) => self.definition.is_assignable(typ, &iterable),
            Err(_) => false,
        }
    }

    fn analyze_return(&mut self, meta: &Meta, argument: &Option<ExpressionType>) -> Result<Stmt, CompileError> {
        let ret = match self.locals.return_type() {
            Some(ret) => ret.clone(),
            None => self.definition.types().def.clone(),
        };
        match argument {
            None if ret.is_void() || self.locals.frame_kind() == locals::FrameKind::Main => Ok(Stmt::Return(None)),
            None => Err(self.error(meta, "Must return a value from a non-void function.")),
            Some(_) if ret.is_void() => Err(self.error(meta, "Cannot return a value from a void function.")),
            Some(argument) => Ok(Stmt::Return(Some(self.expression_as(argument, &ret, false)?))),
        }
    }
}

/// Flow after a loop: one that cannot end normally escapes the method.
fn loop_flow(continuous: bool, body: &Flow) -> Flow {
    let escapes = continuous && !body.any_break;
    Flow {
        method_escape: escapes,
        all_escape: escapes,
        count: 1,
        ..Default::default()
    }
}

/// Zero value of an uninitialized local.
pub(crate) fn default_value(typ: &Type) -> Constant {
    match typ.sort {
        Sort::Bool => Constant::Bool(false),
        Sort::Byte => Constant::Byte(0),
        Sort::Short => Constant::Short(0),
        Sort::Char => Constant::Char(0),
        Sort::Int => Constant::Int(0),
        Sort::Long => Constant::Long(0),
        Sort::Float => Constant::Float(0.0),
        Sort::Double => Constant::Double(0.0),
        _ => Constant::Null,
    }
}
