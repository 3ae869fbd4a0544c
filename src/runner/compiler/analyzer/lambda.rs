//! Lambdas and function references.
//!
//! A lambda becomes a synthetic function of the program. Its captures are
//! passed ahead of the call arguments and copied when the function value
//! is created. With a functional interface as target, parameter and return
//! types come from the interface method; with `def` as target everything
//! is `def` and the value is bound to an interface only when called.

use tracing::trace;

use crate::parser::ast::{DeclType, LambdaBody, LambdaData, Meta};
use crate::runner::compiler::analyzer::caster::fold_message;
use crate::runner::compiler::analyzer::Analyzer;
use crate::runner::compiler::bytecode::Constant;
use crate::runner::compiler::tree::{Expr, ExprKind, Function, Stmt};
use crate::runner::def;
use crate::runner::definition::{Cast, Method, Type};
use crate::runner::ds::error::CompileError;
use crate::runner::ds::native::CONSTRUCTOR_NAME;

/// Body, parameter slots, parameter entry casts and loop counter slot.
type LambdaParts = (Vec<Stmt>, Vec<usize>, Vec<Option<Cast>>, Option<usize>);

/// What a lambda or reference is converted to.
enum Target {
    Interface(Type, Method),
    Untyped,
}

impl<'a> Analyzer<'a> {
    fn target(&self, meta: &Meta, expected: Option<&Type>, what: &str) -> Result<Target, CompileError> {
        match expected {
            None => Ok(Target::Untyped),
            Some(typ) if typ.is_def() || typ.name == "Object" => Ok(Target::Untyped),
            Some(typ) => match self.definition.functional_method(typ) {
                Some(method) => Ok(Target::Interface(typ.clone(), method.clone())),
                None => Err(self.error(
                    meta,
                    format!("Cannot convert {} to [{}], not a functional interface.", what, typ),
                )),
            },
        }
    }

    pub(crate) fn lambda(&mut self, data: &LambdaData, expected: Option<&Type>) -> Result<Expr, CompileError> {
        let def = self.definition.types().def.clone();
        let target = self.target(&data.meta, expected, "lambda")?;
        let (typ, interface, ret, defaults) = match &target {
            Target::Interface(typ, method) => {
                if method.arity() != data.parameters.len() {
                    return Err(self.error(
                        &data.meta,
                        format!(
                            "Incorrect number of parameters for [{}] in lambda: expected [{}], found [{}].",
                            typ,
                            method.arity(),
                            data.parameters.len()
                        ),
                    ));
                }
                (typ.clone(), Some(typ.name.clone()), method.ret.clone(), method.args.clone())
            }
            Target::Untyped => (def.clone(), None, def.clone(), vec![def.clone(); data.parameters.len()]),
        };

        self.locals.push_lambda(ret.clone());
        let saved_loops = std::mem::replace(&mut self.loops, 0);
        let result = self.lambda_body(data, &ret, &defaults);
        self.loops = saved_loops;
        let frame = self.locals.pop_call();
        let (body, param_slots, param_casts, loop_slot) = result?;

        let index = self.functions.len();
        trace!(index, captures = frame.captures.len(), "lambda compiled");
        self.functions.push(Some(Function {
            name: format!("lambda${}", index),
            body,
            slot_count: frame.slot_count,
            capture_slots: frame.captures.iter().map(|c| c.inner.slot).collect(),
            param_slots,
            param_casts,
            loop_slot,
        }));
        Ok(Expr::new(
            ExprKind::Lambda {
                function: index,
                interface,
                captures: frame.captures.iter().map(|c| c.outer.slot).collect(),
            },
            typ,
        ))
    }

    fn lambda_body(&mut self, data: &LambdaData, ret: &Type, defaults: &[Type]) -> Result<LambdaParts, CompileError> {
        let mut param_slots = vec![];
        let mut param_casts = vec![];
        for (parameter, default) in data.parameters.iter().zip(defaults.iter()) {
            let typ = match &parameter.typ {
                Some(decl) => self.resolve_type(decl)?,
                None => default.clone(),
            };
            param_casts.push(self.entry_cast(&parameter.meta, &typ)?);
            param_slots.push(self.define(&parameter.meta, &parameter.name, typ, false)?);
        }
        let loop_slot = self.seed_loop_counter()?;

        let body = match &data.body {
            LambdaBody::Expression(expression) => {
                let value = self.expression(expression, if ret.is_void() { None } else { Some(ret) })?;
                if ret.is_void() || value.typ.is_void() {
                    vec![Stmt::Expression(value)]
                } else {
                    vec![Stmt::Return(Some(self.cast(value, ret, false, &data.meta)?))]
                }
            }
            LambdaBody::Block(block) => {
                let (body, flow) = self.analyze_statements(&block.statements, false)?;
                if !ret.is_void() && !ret.is_def() && !flow.method_escape {
                    return Err(self.error(&data.meta, "Not all paths provide a return value for lambda."));
                }
                body
            }
        };
        Ok((body, param_slots, param_casts, loop_slot))
    }

    pub(crate) fn function_reference(
        &mut self,
        meta: &Meta,
        owner: &Option<DeclType>,
        method: &str,
        expected: Option<&Type>,
    ) -> Result<Expr, CompileError> {
        let text = match owner {
            Some(owner) => format!("{}::{}", owner, method),
            None => format!("this::{}", method),
        };
        let target = self.target(meta, expected, &format!("function reference [{}]", text))?;
        let def = self.definition.types().def.clone();

        let (constant, typ) = match (owner, target) {
            (None, Target::Interface(typ, functional)) => {
                let signature = self.locals.get_function(method, functional.arity()).ok_or_else(|| {
                    self.error(
                        meta,
                        format!("Unknown function [{}] with [{}] arguments.", method, functional.arity()),
                    )
                })?;
                (
                    Constant::Local {
                        function: signature.index,
                        interface: Some(typ.name.clone()),
                    },
                    typ,
                )
            }
            (None, Target::Untyped) => {
                let candidates = self.locals.functions_named(method);
                match candidates.as_slice() {
                    [only] => (
                        Constant::Local {
                            function: only.index,
                            interface: None,
                        },
                        def,
                    ),
                    [] => return Err(self.error(meta, format!("Unknown function [{}].", method))),
                    _ => {
                        return Err(self.error(
                            meta,
                            format!("Function reference [{}] is ambiguous without a target type.", text),
                        ))
                    }
                }
            }
            (Some(owner), Target::Interface(typ, _)) => {
                let owner = self.resolve_type(owner)?;
                let member = def::lookup_reference(self.definition, &typ.name, &owner.name, method)
                    .map_err(|e| self.error(meta, fold_message(e)))?;
                (
                    Constant::Reference {
                        interface: Some(typ.name.clone()),
                        member,
                    },
                    typ,
                )
            }
            (Some(owner), Target::Untyped) => {
                let owner = self.resolve_type(owner)?;
                let target = self.definition.struct_of(&owner);
                let known = if method == "new" {
                    target.constructors.keys().any(|k| k.name == CONSTRUCTOR_NAME)
                } else {
                    target.static_methods.keys().any(|k| k.name == method)
                        || target.methods.keys().any(|k| k.name == method)
                };
                if !known {
                    return Err(self.error(meta, format!("Unknown reference [{}].", text)));
                }
                (
                    Constant::Deferred {
                        owner: owner.name,
                        method: method.to_string(),
                    },
                    def,
                )
            }
        };
        Ok(Expr::new(ExprKind::Constant(constant), typ))
    }
}
