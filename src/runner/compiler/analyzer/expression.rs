//! Operators, literals and allocation expressions.

use crate::parser::ast::{
    BinaryOperator, ComparisonOperator, ExpressionType, HasMeta, LiteralType, LogicalOperator, Meta,
    UnaryOperator,
};
use crate::runner::compiler::analyzer::caster::{fold_message, foldable};
use crate::runner::compiler::analyzer::Analyzer;
use crate::runner::compiler::bytecode::Constant;
use crate::runner::compiler::tree::{Expr, ExprKind};
use crate::runner::def::operators::{self, OperandKind, Operation};
use crate::runner::definition::{MethodKey, Sort, Type};
use crate::runner::ds::error::CompileError;
use crate::runner::ds::native::CONSTRUCTOR_NAME;

pub(crate) fn binary_operation(operator: BinaryOperator) -> Operation {
    match operator {
        BinaryOperator::Multiply => Operation::Mul,
        BinaryOperator::Divide => Operation::Div,
        BinaryOperator::Remainder => Operation::Rem,
        BinaryOperator::Add => Operation::Add,
        BinaryOperator::Subtract => Operation::Sub,
        BinaryOperator::ShiftLeft => Operation::Lsh,
        BinaryOperator::ShiftRight => Operation::Rsh,
        BinaryOperator::UnsignedShiftRight => Operation::Ush,
        BinaryOperator::BitwiseAnd => Operation::BwAnd,
        BinaryOperator::BitwiseXor => Operation::Xor,
        BinaryOperator::BitwiseOr => Operation::BwOr,
    }
}

/// Operations that honour the overflow setting.
pub(crate) fn is_checkable(operation: Operation) -> bool {
    matches!(
        operation,
        Operation::Mul | Operation::Div | Operation::Rem | Operation::Add | Operation::Sub | Operation::Neg
    )
}

fn comparison_operation(operator: ComparisonOperator) -> Operation {
    match operator {
        ComparisonOperator::Equal => Operation::Eq,
        ComparisonOperator::NotEqual => Operation::Ne,
        ComparisonOperator::StrictEqual => Operation::RefEq,
        ComparisonOperator::StrictNotEqual => Operation::RefNe,
        ComparisonOperator::LessThan => Operation::Lt,
        ComparisonOperator::LessThanEqual => Operation::Lte,
        ComparisonOperator::GreaterThan => Operation::Gt,
        ComparisonOperator::GreaterThanEqual => Operation::Gte,
    }
}

fn both_constant<'e>(left: &'e Expr, right: &'e Expr) -> Option<(&'e Constant, &'e Constant)> {
    match (left.constant(), right.constant()) {
        (Some(l), Some(r)) if foldable(l) && foldable(r) => Some((l, r)),
        _ => None,
    }
}

impl<'a> Analyzer<'a> {
    /// Analyzes an expression. `expected` is the type the context wants,
    /// used to give lambdas and function references a target.
    pub(crate) fn expression(&mut self, expression: &ExpressionType, expected: Option<&Type>) -> Result<Expr, CompileError> {
        match expression {
            ExpressionType::Literal(data) => Ok(self.literal(&data.value)),
            ExpressionType::Variable { meta, .. } => self.chain(meta, expression, &[], expected),
            ExpressionType::Chain { meta, head, links } => self.chain(meta, head, links, expected),
            ExpressionType::CallLocal { meta, name, arguments } => self.call_local(meta, name, arguments),
            ExpressionType::NewObject { meta, typ, arguments } => self.new_object(meta, typ, arguments),
            ExpressionType::NewArray { meta, typ, sizes } => {
                let typ = self.resolve_type(typ)?;
                let int = self.definition.types().int.clone();
                let sizes = sizes
                    .iter()
                    .map(|size| self.expression_as(size, &int, false))
                    .collect::<Result<Vec<_>, _>>()?;
                if sizes.is_empty() || sizes.len() > typ.dimensions {
                    return Err(self.error(meta, format!("Cannot create array of type [{}].", typ)));
                }
                Ok(Expr::new(ExprKind::NewArray { typ: typ.clone(), sizes }, typ))
            }
            ExpressionType::NewInitializedArray { meta, typ, values } => {
                let typ = self.resolve_type(typ)?;
                let element = self
                    .definition
                    .element_type(&typ)
                    .map_err(|e| self.error(meta, e.to_string()))?;
                let values = values
                    .iter()
                    .map(|value| self.expression_as(value, &element, false))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::new(ExprKind::NewArrayInit { typ: typ.clone(), values }, typ))
            }
            ExpressionType::ListInitializer { meta, values } => {
                let list = self.named_type(meta, "ArrayList")?;
                let def = self.definition.types().def.clone();
                let values = values
                    .iter()
                    .map(|value| self.expression_as(value, &def, false))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::new(ExprKind::NewList(values), list))
            }
            ExpressionType::MapInitializer { meta, entries } => {
                let map = self.named_type(meta, "HashMap")?;
                let def = self.definition.types().def.clone();
                let mut pairs = vec![];
                for (key, value) in entries {
                    let key = self.expression_as(key, &def, false)?;
                    let value = self.expression_as(value, &def, false)?;
                    pairs.push((key, value));
                }
                Ok(Expr::new(ExprKind::NewMap(pairs), map))
            }
            ExpressionType::FunctionReference { meta, owner, method } => {
                self.function_reference(meta, owner, method, expected)
            }
            ExpressionType::Lambda(data) => self.lambda(data, expected),
            ExpressionType::Unary { meta, operator, argument } => self.unary(meta, *operator, argument),
            ExpressionType::Binary {
                meta,
                operator,
                left,
                right,
            } => self.binary(meta, *operator, left, right),
            ExpressionType::Logical {
                operator, left, right, ..
            } => self.logical(*operator, left, right),
            ExpressionType::Comparison {
                meta,
                operator,
                left,
                right,
            } => self.comparison(meta, *operator, left, right),
            ExpressionType::InstanceOf { argument, typ, .. } => {
                let operand = self.expression(argument, None)?;
                let typ = self.resolve_type(typ)?;
                Ok(Expr::new(
                    ExprKind::InstanceOf {
                        operand: Box::new(operand),
                        typ,
                    },
                    self.definition.types().boolean.clone(),
                ))
            }
            ExpressionType::Cast { typ, argument, .. } => {
                let typ = self.resolve_type(typ)?;
                self.expression_as(argument, &typ, true)
            }
            ExpressionType::Conditional {
                meta,
                test,
                consequent,
                alternate,
            } => {
                let boolean = self.definition.types().boolean.clone();
                let test = self.expression_as(test, &boolean, false)?;
                let consequent = self.expression(consequent, expected)?;
                let alternate = self.expression(alternate, expected)?;
                let typ = self.promote_conditional(&consequent, &alternate).ok_or_else(|| {
                    self.error(
                        meta,
                        format!(
                            "Cannot apply [?:] to types [{}] and [{}].",
                            consequent.typ, alternate.typ
                        ),
                    )
                })?;
                let consequent = self.cast(consequent, &typ, false, meta)?;
                let alternate = self.cast(alternate, &typ, false, meta)?;
                if let Some(b) = test.constant().and_then(Constant::as_bool) {
                    return Ok(if b { consequent } else { alternate });
                }
                Ok(Expr::new(
                    ExprKind::Conditional {
                        test: Box::new(test),
                        consequent: Box::new(consequent),
                        alternate: Box::new(alternate),
                    },
                    typ,
                ))
            }
            ExpressionType::Assignment {
                meta,
                target,
                operator,
                value,
            } => self.assignment(meta, target, *operator, value),
            ExpressionType::Update {
                meta,
                operator,
                prefix,
                target,
            } => self.update(meta, *operator, *prefix, target),
        }
    }

    fn named_type(&self, meta: &Meta, name: &str) -> Result<Type, CompileError> {
        self.definition
            .get_type(name)
            .map_err(|_| self.error(meta, format!("Unknown type [{}].", name)))
    }

    fn literal(&self, literal: &LiteralType) -> Expr {
        let types = self.definition.types();
        let (constant, typ) = match literal {
            LiteralType::NullLiteral => (Constant::Null, &types.object),
            LiteralType::BooleanLiteral(b) => (Constant::Bool(*b), &types.boolean),
            LiteralType::IntLiteral(v) => (Constant::Int(*v), &types.int),
            LiteralType::LongLiteral(v) => (Constant::Long(*v), &types.long),
            LiteralType::FloatLiteral(v) => (Constant::Float(*v), &types.float),
            LiteralType::DoubleLiteral(v) => (Constant::Double(*v), &types.double),
            LiteralType::StringLiteral(s) => (Constant::Str(s.clone()), &types.string),
        };
        Expr::new(ExprKind::Constant(constant), typ.clone())
    }

    /// Casts each argument to its parameter type.
    pub(crate) fn arguments(&mut self, meta: &Meta, arguments: &[ExpressionType], params: &[Type]) -> Result<Vec<Expr>, CompileError> {
        if arguments.len() != params.len() {
            return Err(self.error(
                meta,
                format!("Expected [{}] arguments, found [{}].", params.len(), arguments.len()),
            ));
        }
        arguments
            .iter()
            .zip(params.iter())
            .map(|(argument, param)| self.expression_as(argument, param, false))
            .collect()
    }

    fn call_local(&mut self, meta: &Meta, name: &str, arguments: &[ExpressionType]) -> Result<Expr, CompileError> {
        let signature = self
            .locals
            .get_function(name, arguments.len())
            .cloned()
            .ok_or_else(|| {
                self.error(
                    meta,
                    format!("Unknown call [{}] with [{}] arguments.", name, arguments.len()),
                )
            })?;
        let args = self.arguments(meta, arguments, &signature.params)?;
        Ok(Expr::new(
            ExprKind::CallLocal {
                function: signature.index,
                args,
            },
            signature.ret,
        ))
    }

    fn new_object(&mut self, meta: &Meta, name: &str, arguments: &[ExpressionType]) -> Result<Expr, CompileError> {
        let typ = self.named_type(meta, name)?;
        let constructor = self
            .definition
            .struct_of(&typ)
            .constructors
            .get(&MethodKey::new(CONSTRUCTOR_NAME, arguments.len()))
            .cloned()
            .ok_or_else(|| {
                self.error(
                    meta,
                    format!("Unknown new call on type [{}] with [{}] arguments.", name, arguments.len()),
                )
            })?;
        let args = self.arguments(meta, arguments, &constructor.args)?;
        Ok(Expr::new(
            ExprKind::InvokeStatic {
                member: constructor.native,
                args,
            },
            typ,
        ))
    }

    fn fold_binary(&self, meta: &Meta, operation: Operation, kind: OperandKind, checked: bool, left: &Expr, right: &Expr, typ: &Type) -> Result<Option<Expr>, CompileError> {
        let (l, r) = match both_constant(left, right) {
            Some(pair) => pair,
            None => return Ok(None),
        };
        let value = operators::binary(operation, kind, checked, &l.to_value(), &r.to_value())
            .map_err(|e| self.error(meta, fold_message(e)))?;
        Ok(Constant::from_value(&value).map(|c| Expr::new(ExprKind::Constant(c), typ.clone())))
    }

    fn binary(&mut self, meta: &Meta, operator: BinaryOperator, left: &ExpressionType, right: &ExpressionType) -> Result<Expr, CompileError> {
        let operation = binary_operation(operator);
        let left = self.expression(left, None)?;
        let right = self.expression(right, None)?;
        let illegal = || {
            self.error(
                meta,
                format!(
                    "Cannot apply [{}] to types [{}] and [{}].",
                    operator.symbol(),
                    left.typ,
                    right.typ
                ),
            )
        };

        let (typ, left, right) = if operation.is_shift() {
            let lhs = self.promote_numeric(&left.typ, false).ok_or_else(illegal)?;
            let rhs = self.promote_numeric(&right.typ, false).ok_or_else(illegal)?;
            let (lhs, rhs) = if lhs.is_def() || rhs.is_def() {
                let def = self.definition.types().def.clone();
                (def.clone(), def)
            } else {
                (lhs, rhs)
            };
            let left = self.cast(left, &lhs, false, meta)?;
            let right = self.cast(right, &rhs, false, meta)?;
            (lhs, left, right)
        } else {
            let promoted = match operation {
                Operation::Add => self.promote_add(&left.typ, &right.typ),
                Operation::BwAnd | Operation::Xor | Operation::BwOr => self.promote_xor(&left.typ, &right.typ),
                _ => self.promote_binary(&left.typ, &right.typ, true),
            }
            .ok_or_else(illegal)?;
            if promoted.sort == Sort::String {
                (promoted, left, right)
            } else {
                let left = self.cast(left, &promoted, false, meta)?;
                let right = self.cast(right, &promoted, false, meta)?;
                (promoted, left, right)
            }
        };

        let kind = OperandKind::from_sort(typ.sort);
        let checked = is_checkable(operation) && self.checked();
        if let Some(folded) = self.fold_binary(meta, operation, kind, checked, &left, &right, &typ)? {
            return Ok(folded);
        }
        Ok(Expr::new(
            ExprKind::Binary {
                operation,
                kind,
                checked,
                left: Box::new(left),
                right: Box::new(right),
            },
            typ,
        ))
    }

    fn comparison(&mut self, meta: &Meta, operator: ComparisonOperator, left: &ExpressionType, right: &ExpressionType) -> Result<Expr, CompileError> {
        let operation = comparison_operation(operator);
        let left = self.expression(left, None)?;
        let right = self.expression(right, None)?;
        let promoted = match operation {
            Operation::Eq | Operation::Ne | Operation::RefEq | Operation::RefNe => {
                self.promote_equality(&left.typ, &right.typ)
            }
            _ => self.promote_binary(&left.typ, &right.typ, true),
        }
        .ok_or_else(|| {
            self.error(
                meta,
                format!(
                    "Cannot apply [{}] to types [{}] and [{}].",
                    operation.symbol(),
                    left.typ,
                    right.typ
                ),
            )
        })?;
        let left = self.cast(left, &promoted, false, meta)?;
        let right = self.cast(right, &promoted, false, meta)?;
        let kind = OperandKind::from_sort(promoted.sort);
        let boolean = self.definition.types().boolean.clone();
        if let Some((l, r)) = both_constant(&left, &right) {
            let result = operators::compare(operation, kind, &l.to_value(), &r.to_value())
                .map_err(|e| self.error(meta, fold_message(e)))?;
            return Ok(Expr::new(ExprKind::Constant(Constant::Bool(result)), boolean));
        }
        Ok(Expr::new(
            ExprKind::Compare {
                operation,
                kind,
                left: Box::new(left),
                right: Box::new(right),
            },
            boolean,
        ))
    }

    fn logical(&mut self, operator: LogicalOperator, left: &ExpressionType, right: &ExpressionType) -> Result<Expr, CompileError> {
        let boolean = self.definition.types().boolean.clone();
        let left = self.expression_as(left, &boolean, false)?;
        let right = self.expression_as(right, &boolean, false)?;
        let and = operator == LogicalOperator::And;
        if let (Some(l), Some(r)) = (
            left.constant().and_then(Constant::as_bool),
            right.constant().and_then(Constant::as_bool),
        ) {
            let value = if and { l && r } else { l || r };
            return Ok(Expr::new(ExprKind::Constant(Constant::Bool(value)), boolean));
        }
        Ok(Expr::new(
            ExprKind::Logical {
                and,
                left: Box::new(left),
                right: Box::new(right),
            },
            boolean,
        ))
    }

    fn unary(&mut self, meta: &Meta, operator: UnaryOperator, argument: &ExpressionType) -> Result<Expr, CompileError> {
        let (operation, symbol) = match operator {
            UnaryOperator::Not => (Operation::Not, "!"),
            UnaryOperator::BitwiseNot => (Operation::BwNot, "~"),
            UnaryOperator::Plus => (Operation::Plus, "+"),
            UnaryOperator::Minus => (Operation::Neg, "-"),
        };
        let operand = self.expression(argument, None)?;
        let typ = match operation {
            Operation::Not => Some(self.definition.types().boolean.clone()),
            Operation::BwNot => self.promote_numeric(&operand.typ, false),
            _ => self.promote_numeric(&operand.typ, true),
        }
        .ok_or_else(|| self.error(meta, format!("Cannot apply [{}] to type [{}].", symbol, operand.typ)))?;
        let operand = self.cast(operand, &typ, false, argument.get_meta())?;
        let kind = OperandKind::from_sort(typ.sort);
        let checked = operation == Operation::Neg && self.checked();

        if let Some(constant) = operand.constant().filter(|c| foldable(c)) {
            let value = operators::unary(operation, kind, checked, &constant.to_value())
                .map_err(|e| self.error(meta, fold_message(e)))?;
            if let Some(folded) = Constant::from_value(&value) {
                return Ok(Expr::new(ExprKind::Constant(folded), typ));
            }
        }
        Ok(Expr::new(
            ExprKind::Unary {
                operation,
                kind,
                checked,
                operand: Box::new(operand),
            },
            typ,
        ))
    }

    /// The constant `1` used by `++` and `--`.
    pub(crate) fn one(&self) -> Expr {
        Expr::new(
            ExprKind::Constant(Constant::Int(1)),
            self.definition.types().int.clone(),
        )
    }
}
