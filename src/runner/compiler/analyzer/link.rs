//! Chains: `a.b.c(x)[i]`, static anchors, and the places assignments
//! write to.
//!
//! Each link turns the access on its left into a new [`Access`]. The
//! parser never decides between reading and writing; the last access of a
//! chain is read by expressions and written by assignments.

use crate::parser::ast::{
    BinaryOperator, ExpressionType, HasMeta, LinkType, Meta, UpdateOperator,
};
use crate::runner::compiler::analyzer::expression::{binary_operation, is_checkable};
use crate::runner::compiler::analyzer::Analyzer;
use crate::runner::compiler::bytecode::Constant;
use crate::runner::compiler::tree::{Compound, Expr, ExprKind, Place};
use crate::runner::def::operators::{OperandKind, Operation};
use crate::runner::definition::{Method, MethodKey, Sort, Type};
use crate::runner::ds::error::CompileError;

pub(crate) enum Access {
    Value(Expr),
    Place { place: Place, typ: Type, readonly: bool },
    /// A type name used as the anchor of a static access.
    Static(Type),
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl<'a> Analyzer<'a> {
    pub(crate) fn chain(
        &mut self,
        meta: &Meta,
        head: &ExpressionType,
        links: &[LinkType],
        expected: Option<&Type>,
    ) -> Result<Expr, CompileError> {
        let access = self.resolve_chain(head, links, expected)?;
        self.read(access, meta)
    }

    fn read(&self, access: Access, meta: &Meta) -> Result<Expr, CompileError> {
        match access {
            Access::Value(expr) => Ok(expr),
            Access::Place {
                place: Place::Shortcut { getter: None, .. },
                ..
            } => Err(self.error(meta, format!("Cannot read from write-only field [{}].", self.text(meta)))),
            Access::Place { place, typ, .. } => Ok(Expr::new(ExprKind::Load(place), typ)),
            Access::Static(typ) => Err(self.error(meta, format!("Cannot use type [{}] as a value.", typ))),
        }
    }

    fn resolve_chain(&mut self, head: &ExpressionType, links: &[LinkType], expected: Option<&Type>) -> Result<Access, CompileError> {
        let mut access = self.resolve_head(head, if links.is_empty() { expected } else { None })?;
        let mut meta = *head.get_meta();
        for link in links {
            access = self.resolve_link(access, &meta, link)?;
            meta.end_index = link.get_meta().end_index;
        }
        Ok(access)
    }

    fn resolve_head(&mut self, head: &ExpressionType, expected: Option<&Type>) -> Result<Access, CompileError> {
        match head {
            ExpressionType::Variable { meta, name } => {
                if let Some(variable) = self.locals.get_variable(name) {
                    return Ok(Access::Place {
                        place: Place::Local(variable.slot),
                        typ: variable.typ,
                        readonly: variable.readonly,
                    });
                }
                match self.definition.get_type(name) {
                    Ok(typ) => Ok(Access::Static(typ)),
                    Err(_) => Err(self.error(meta, format!("Variable [{}] is not defined.", name))),
                }
            }
            other => Ok(Access::Value(self.expression(other, expected)?)),
        }
    }

    /// Reference receivers only: primitives are boxed first.
    fn receiver(&self, access: Access, meta: &Meta) -> Result<Expr, CompileError> {
        let expr = self.read(access, meta)?;
        if expr.typ.sort.is_primitive() {
            if expr.typ.is_void() {
                return Err(self.error(meta, "Cannot access a member of a void value."));
            }
            let boxed = self.definition.boxed(&expr.typ);
            return self.cast(expr, &boxed, false, meta);
        }
        Ok(expr)
    }

    fn resolve_link(&mut self, access: Access, left: &Meta, link: &LinkType) -> Result<Access, CompileError> {
        match link {
            LinkType::Field { meta, name } => self.field(access, left, meta, name),
            LinkType::Call { meta, name, arguments } => self.call(access, left, meta, name, arguments),
            LinkType::Brace { meta, index } => self.brace(access, left, meta, index),
        }
    }

    fn field(&mut self, access: Access, left: &Meta, meta: &Meta, name: &str) -> Result<Access, CompileError> {
        if let Access::Static(typ) = &access {
            let field = self
                .definition
                .struct_of(typ)
                .static_members
                .get(name)
                .cloned()
                .ok_or_else(|| self.error(meta, format!("Unknown static field [{}] for type [{}].", name, typ)))?;
            return Ok(Access::Value(Expr::new(
                ExprKind::Field {
                    receiver: None,
                    member: field.native,
                },
                field.typ,
            )));
        }

        let receiver = self.receiver(access, left)?;
        let typ = receiver.typ.clone();
        let def = self.definition.types().def.clone();
        if typ.is_def() {
            return Ok(Access::Place {
                place: Place::Dynamic {
                    receiver: Box::new(receiver),
                    name: name.to_string(),
                },
                typ: def,
                readonly: false,
            });
        }
        if typ.is_array() {
            if name == "length" {
                return Ok(Access::Value(Expr::new(
                    ExprKind::ArrayLength(Box::new(receiver)),
                    self.definition.types().int.clone(),
                )));
            }
            return Err(self.error(meta, format!("Unknown field [{}] for type [{}].", name, typ)));
        }

        let owner = self.definition.struct_of(&typ);
        if let Some(field) = owner.members.get(name).cloned() {
            return Ok(Access::Value(Expr::new(
                ExprKind::Field {
                    receiver: Some(Box::new(receiver)),
                    member: field.native,
                },
                field.typ,
            )));
        }

        let cap = capitalize(name);
        let getter = owner
            .methods
            .get(&MethodKey::new(&format!("get{}", cap), 0))
            .or_else(|| {
                owner
                    .methods
                    .get(&MethodKey::new(&format!("is{}", cap), 0))
                    .filter(|m| m.ret.sort == Sort::Bool)
            })
            .cloned();
        let setter = owner.methods.get(&MethodKey::new(&format!("set{}", cap), 1)).cloned();
        if getter.is_some() || setter.is_some() {
            let field_type = match (&getter, &setter) {
                (Some(get), _) => get.ret.clone(),
                (None, Some(set)) => set.args[0].clone(),
                (None, None) => def,
            };
            return Ok(Access::Place {
                place: Place::Shortcut {
                    receiver: Box::new(receiver),
                    key: None,
                    getter: getter.map(|m| m.native),
                    setter: setter.map(|m| m.native),
                },
                typ: field_type,
                readonly: false,
            });
        }

        if self.is_named(&typ, "Map") {
            let key = Expr::new(
                ExprKind::Constant(Constant::Str(name.to_string())),
                self.definition.types().string.clone(),
            );
            return self.collection_shortcut(receiver, key, "get", "put", meta);
        }
        if self.is_named(&typ, "List") {
            if let Ok(index) = name.parse::<i32>() {
                let key = Expr::new(ExprKind::Constant(Constant::Int(index)), self.definition.types().int.clone());
                return self.collection_shortcut(receiver, key, "get", "set", meta);
            }
            return Err(self.error(meta, format!("Illegal list shortcut value [{}].", name)));
        }
        Err(self.error(meta, format!("Unknown field [{}] for type [{}].", name, typ)))
    }

    fn is_named(&self, typ: &Type, name: &str) -> bool {
        match self.definition.get_type(name) {
            Ok(target) => self.definition.is_assignable(typ, &target),
            Err(_) => false,
        }
    }

    /// `map.key`, `map[key]`, `list.0` and `list[i]` through the
    /// collection's whitelisted accessors.
    fn collection_shortcut(
        &mut self,
        receiver: Expr,
        key: Expr,
        get: &str,
        set: &str,
        meta: &Meta,
    ) -> Result<Access, CompileError> {
        let owner = self.definition.struct_of(&receiver.typ);
        let getter: Method = owner
            .methods
            .get(&MethodKey::new(get, 1))
            .cloned()
            .ok_or_else(|| self.error(meta, format!("Illegal map/list shortcut for type [{}].", receiver.typ)))?;
        let setter = owner.methods.get(&MethodKey::new(set, 2)).cloned();
        let key = self.cast(key, &getter.args[0], false, meta)?;
        Ok(Access::Place {
            place: Place::Shortcut {
                receiver: Box::new(receiver),
                key: Some(Box::new(key)),
                getter: Some(getter.native),
                setter: setter.map(|m| m.native),
            },
            typ: getter.ret,
            readonly: false,
        })
    }

    fn call(
        &mut self,
        access: Access,
        left: &Meta,
        meta: &Meta,
        name: &str,
        arguments: &[ExpressionType],
    ) -> Result<Access, CompileError> {
        let unknown = |typ: &Type| {
            format!(
                "Unknown call [{}] with [{}] arguments on type [{}].",
                name,
                arguments.len(),
                typ
            )
        };
        if let Access::Static(typ) = &access {
            let method = self
                .definition
                .struct_of(typ)
                .static_methods
                .get(&MethodKey::new(name, arguments.len()))
                .cloned()
                .ok_or_else(|| self.error(meta, unknown(typ)))?;
            let args = self.arguments(meta, arguments, &method.args)?;
            return Ok(Access::Value(Expr::new(
                ExprKind::InvokeStatic {
                    member: method.native,
                    args,
                },
                method.ret,
            )));
        }

        let receiver = self.receiver(access, left)?;
        if receiver.typ.is_def() {
            let def = self.definition.types().def.clone();
            let args = arguments
                .iter()
                .map(|argument| self.expression_as(argument, &def, false))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Access::Value(Expr::new(
                ExprKind::CallDynamic {
                    receiver: Box::new(receiver),
                    name: name.to_string(),
                    args,
                },
                def,
            )));
        }
        let method = self
            .definition
            .struct_of(&receiver.typ)
            .methods
            .get(&MethodKey::new(name, arguments.len()))
            .cloned()
            .ok_or_else(|| self.error(meta, unknown(&receiver.typ)))?;
        let args = self.arguments(meta, arguments, &method.args)?;
        Ok(Access::Value(Expr::new(
            ExprKind::Invoke {
                receiver: Box::new(receiver),
                member: method.native,
                args,
            },
            method.ret,
        )))
    }

    fn brace(&mut self, access: Access, left: &Meta, meta: &Meta, index: &ExpressionType) -> Result<Access, CompileError> {
        let receiver = self.receiver(access, left)?;
        let typ = receiver.typ.clone();
        if typ.is_def() {
            let def = self.definition.types().def.clone();
            let index = self.expression_as(index, &def, false)?;
            return Ok(Access::Place {
                place: Place::Index {
                    receiver: Box::new(receiver),
                    index: Box::new(index),
                },
                typ: def,
                readonly: false,
            });
        }
        if typ.is_array() {
            let element = self
                .definition
                .element_type(&typ)
                .map_err(|e| self.error(meta, e.to_string()))?;
            let int = self.definition.types().int.clone();
            let index = self.expression_as(index, &int, false)?;
            return Ok(Access::Place {
                place: Place::Array {
                    array: Box::new(receiver),
                    index: Box::new(index),
                },
                typ: element,
                readonly: false,
            });
        }
        if self.is_named(&typ, "Map") {
            let key = self.expression(index, None)?;
            return self.collection_shortcut(receiver, key, "get", "put", meta);
        }
        if self.is_named(&typ, "List") {
            let key = self.expression(index, None)?;
            return self.collection_shortcut(receiver, key, "get", "set", meta);
        }
        Err(self.error(meta, format!("Illegal array access on type [{}].", typ)))
    }

    // ── Assignment ────────────────────────────────────────────

    fn place(&mut self, target: &ExpressionType) -> Result<(Place, Type), CompileError> {
        let meta = target.get_meta();
        let access = match target {
            ExpressionType::Variable { .. } => self.resolve_head(target, None)?,
            ExpressionType::Chain { head, links, .. } => self.resolve_chain(head, links, None)?,
            _ => return Err(self.error(meta, "Left-hand side cannot be assigned a value.")),
        };
        match access {
            Access::Place { readonly: true, .. } => {
                Err(self.error(meta, format!("Variable [{}] is read-only.", self.text(meta))))
            }
            Access::Place {
                place: Place::Shortcut { setter: None, .. },
                ..
            } => Err(self.error(meta, format!("Cannot write to read-only field [{}].", self.text(meta)))),
            Access::Place { place, typ, .. } => Ok((place, typ)),
            Access::Value(_) | Access::Static(_) => {
                Err(self.error(meta, "Left-hand side cannot be assigned a value."))
            }
        }
    }

    fn compound(
        &self,
        meta: &Meta,
        operation: Operation,
        typ: &Type,
        promoted: &Type,
    ) -> Result<Compound, CompileError> {
        Ok(Compound {
            operation,
            kind: OperandKind::from_sort(promoted.sort),
            checked: is_checkable(operation) && self.checked(),
            promote: if promoted.sort == Sort::String {
                None
            } else {
                self.cast_between(typ, promoted, false, meta)?
            },
            back: self.cast_between(promoted, typ, true, meta)?,
        })
    }

    pub(crate) fn assignment(
        &mut self,
        meta: &Meta,
        target: &ExpressionType,
        operator: Option<BinaryOperator>,
        value: &ExpressionType,
    ) -> Result<Expr, CompileError> {
        let (place, typ) = self.place(target)?;
        if let Place::Shortcut { getter: None, .. } = &place {
            if operator.is_some() {
                return Err(self.error(meta, format!("Cannot read from write-only field [{}].", self.text(target.get_meta()))));
            }
        }
        let operator = match operator {
            None => {
                let value = self.expression_as(value, &typ, false)?;
                return Ok(Expr::new(
                    ExprKind::Assign {
                        place,
                        compound: None,
                        value: Box::new(value),
                        post: false,
                        read: true,
                    },
                    typ,
                ));
            }
            Some(operator) => operator,
        };

        let operation = binary_operation(operator);
        let value = self.expression(value, None)?;
        let illegal = || {
            self.error(
                meta,
                format!(
                    "Cannot apply [{}=] to types [{}] and [{}].",
                    operator.symbol(),
                    typ,
                    value.typ
                ),
            )
        };
        let (promoted, value_type) = if operation.is_shift() {
            let lhs = self.promote_numeric(&typ, false).ok_or_else(illegal)?;
            let rhs = self.promote_numeric(&value.typ, false).ok_or_else(illegal)?;
            if lhs.is_def() || rhs.is_def() {
                let def = self.definition.types().def.clone();
                (def.clone(), def)
            } else {
                (lhs, rhs)
            }
        } else {
            let promoted = match operation {
                Operation::Add => self.promote_add(&typ, &value.typ),
                Operation::BwAnd | Operation::Xor | Operation::BwOr => self.promote_xor(&typ, &value.typ),
                _ => self.promote_binary(&typ, &value.typ, true),
            }
            .ok_or_else(illegal)?;
            let value_type = if promoted.sort == Sort::String {
                value.typ.clone()
            } else {
                promoted.clone()
            };
            (promoted, value_type)
        };
        let value = self.cast(value, &value_type, false, meta)?;
        let compound = self.compound(meta, operation, &typ, &promoted)?;
        Ok(Expr::new(
            ExprKind::Assign {
                place,
                compound: Some(compound),
                value: Box::new(value),
                post: false,
                read: true,
            },
            typ,
        ))
    }

    pub(crate) fn update(
        &mut self,
        meta: &Meta,
        operator: UpdateOperator,
        prefix: bool,
        target: &ExpressionType,
    ) -> Result<Expr, CompileError> {
        let (place, typ) = self.place(target)?;
        if let Place::Shortcut { getter: None, .. } = &place {
            return Err(self.error(meta, format!("Cannot read from write-only field [{}].", self.text(target.get_meta()))));
        }
        let operation = match operator {
            UpdateOperator::Increment => Operation::Add,
            UpdateOperator::Decrement => Operation::Sub,
        };
        let promoted = self.promote_numeric(&typ, true).ok_or_else(|| {
            let symbol = if operation == Operation::Add { "++" } else { "--" };
            self.error(meta, format!("Cannot apply [{}] to type [{}].", symbol, typ))
        })?;
        let one = self.cast(self.one(), &promoted, false, meta)?;
        let compound = self.compound(meta, operation, &typ, &promoted)?;
        Ok(Expr::new(
            ExprKind::Assign {
                place,
                compound: Some(compound),
                value: Box::new(one),
                post: !prefix,
                read: true,
            },
            typ,
        ))
    }
}
