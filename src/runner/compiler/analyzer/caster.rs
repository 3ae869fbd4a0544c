//! Casts and operand promotion.

use crate::parser::ast::{ExpressionType, HasMeta, Meta};
use crate::runner::compiler::analyzer::Analyzer;
use crate::runner::compiler::bytecode::Constant;
use crate::runner::compiler::tree::{Expr, ExprKind};
use crate::runner::def::conversion::convert_numeric;
use crate::runner::def::operators::OperandKind;
use crate::runner::definition::{Cast, CastKind, Sort, Type};
use crate::runner::ds::error::{CompileError, ScriptError};

/// Constants the operator kernels can fold.
pub(crate) fn foldable(constant: &Constant) -> bool {
    !matches!(
        constant,
        Constant::Reference { .. } | Constant::Deferred { .. } | Constant::Local { .. }
    )
}

/// The text of a runtime error raised while folding.
pub(crate) fn fold_message(error: ScriptError) -> String {
    match error {
        ScriptError::IllegalArgument(message) | ScriptError::Arithmetic(message) => message,
        other => other.to_string(),
    }
}

fn narrow_constant(value: i32, to: Sort) -> Option<Constant> {
    match to {
        Sort::Byte if value >= i8::MIN as i32 && value <= i8::MAX as i32 => Some(Constant::Byte(value as i8)),
        Sort::Short if value >= i16::MIN as i32 && value <= i16::MAX as i32 => Some(Constant::Short(value as i16)),
        Sort::Char if value >= 0 && value <= u16::MAX as i32 => Some(Constant::Char(value as u16)),
        _ => None,
    }
}

impl<'a> Analyzer<'a> {
    /// Analyzes `expression` where a value of type `to` is required.
    pub(crate) fn expression_as(
        &mut self,
        expression: &ExpressionType,
        to: &Type,
        explicit: bool,
    ) -> Result<Expr, CompileError> {
        let expr = self.expression(expression, Some(to))?;
        self.cast(expr, to, explicit, expression.get_meta())
    }

    pub(crate) fn cast(&self, expr: Expr, to: &Type, explicit: bool, meta: &Meta) -> Result<Expr, CompileError> {
        if expr.typ == *to {
            return Ok(expr);
        }
        if let Some(Constant::Null) = expr.constant() {
            if to.sort.is_primitive() {
                return Err(self.error(meta, format!("Cannot cast null to a primitive type [{}].", to)));
            }
            return Ok(Expr::new(expr.kind, to.clone()));
        }
        if let Some(Constant::Int(value)) = expr.constant() {
            if !explicit && expr.typ.sort == Sort::Int {
                if let Some(narrowed) = narrow_constant(*value, to.sort) {
                    return Ok(Expr::new(ExprKind::Constant(narrowed), to.clone()));
                }
            }
        }

        let cast = self.definition.transform(&expr.typ, to, explicit).ok_or_else(|| {
            self.error(meta, format!("Cannot cast from [{}] to [{}].", expr.typ, to))
        })?;
        if cast.is_noop() {
            return Ok(Expr::new(expr.kind, to.clone()));
        }
        if cast.kind == CastKind::Numeric {
            if let Some(constant) = expr.constant() {
                let folded = convert_numeric(&constant.to_value(), OperandKind::from_sort(to.sort))
                    .map_err(|e| self.error(meta, fold_message(e)))?;
                if let Some(constant) = Constant::from_value(&folded) {
                    return Ok(Expr::new(ExprKind::Constant(constant), to.clone()));
                }
            }
        }
        Ok(Expr::new(
            ExprKind::Cast {
                operand: Box::new(expr),
                cast,
            },
            to.clone(),
        ))
    }

    /// The conversion between two types as a standalone step, `None` when
    /// nothing happens at run time.
    pub(crate) fn cast_between(&self, from: &Type, to: &Type, explicit: bool, meta: &Meta) -> Result<Option<Cast>, CompileError> {
        if from == to {
            return Ok(None);
        }
        match self.definition.transform(from, to, explicit) {
            Some(cast) if cast.is_noop() => Ok(None),
            Some(cast) => Ok(Some(cast)),
            None => Err(self.error(meta, format!("Cannot cast from [{}] to [{}].", from, to))),
        }
    }

    fn numeric_sort(&self, typ: &Type) -> Option<Sort> {
        let sort = typ.sort.unboxed();
        if sort.is_numeric() {
            Some(sort)
        } else {
            None
        }
    }

    fn type_of_sort(&self, sort: Sort) -> Type {
        let types = self.definition.types();
        match sort {
            Sort::Bool => types.boolean.clone(),
            Sort::Long => types.long.clone(),
            Sort::Float => types.float.clone(),
            Sort::Double => types.double.clone(),
            _ => types.int.clone(),
        }
    }

    /// Unary numeric promotion: sub-int kinds widen to `int`.
    pub(crate) fn promote_numeric(&self, from: &Type, decimal: bool) -> Option<Type> {
        if from.is_def() {
            return Some(from.clone());
        }
        let sort = self.numeric_sort(from)?;
        if sort.is_decimal() && !decimal {
            return None;
        }
        Some(self.type_of_sort(sort))
    }

    /// Binary numeric promotion: double > float > long > int.
    pub(crate) fn promote_binary(&self, left: &Type, right: &Type, decimal: bool) -> Option<Type> {
        if left.is_def() || right.is_def() {
            return Some(self.definition.types().def.clone());
        }
        let l = self.numeric_sort(left)?;
        let r = self.numeric_sort(right)?;
        if l.is_decimal() || r.is_decimal() {
            if !decimal {
                return None;
            }
            if l == Sort::Double || r == Sort::Double {
                return Some(self.type_of_sort(Sort::Double));
            }
            return Some(self.type_of_sort(Sort::Float));
        }
        if l == Sort::Long || r == Sort::Long {
            return Some(self.type_of_sort(Sort::Long));
        }
        Some(self.type_of_sort(Sort::Int))
    }

    /// `+` concatenates as soon as either side is a string.
    pub(crate) fn promote_add(&self, left: &Type, right: &Type) -> Option<Type> {
        if left.sort == Sort::String || right.sort == Sort::String {
            return Some(self.definition.types().string.clone());
        }
        self.promote_binary(left, right, true)
    }

    /// `& ^ |` work on booleans as well as integral kinds.
    pub(crate) fn promote_xor(&self, left: &Type, right: &Type) -> Option<Type> {
        if left.is_def() || right.is_def() {
            return Some(self.definition.types().def.clone());
        }
        if left.sort.unboxed() == Sort::Bool && right.sort.unboxed() == Sort::Bool {
            return Some(self.type_of_sort(Sort::Bool));
        }
        self.promote_binary(left, right, false)
    }

    pub(crate) fn promote_equality(&self, left: &Type, right: &Type) -> Option<Type> {
        let types = self.definition.types();
        if left.is_def() || right.is_def() {
            return Some(types.def.clone());
        }
        if left.sort.is_primitive() || right.sort.is_primitive() {
            if left.sort.unboxed() == Sort::Bool && right.sort.unboxed() == Sort::Bool {
                return Some(types.boolean.clone());
            }
            if let Some(numeric) = self.promote_binary(left, right, true) {
                return Some(numeric);
            }
        }
        if left.is_void() || right.is_void() {
            return None;
        }
        Some(types.object.clone())
    }

    /// Type of `test ? left : right`. A null branch takes the type of the
    /// other one, boxed when it is primitive.
    pub(crate) fn promote_conditional(&self, left: &Expr, right: &Expr) -> Option<Type> {
        let types = self.definition.types();
        let is_null = |e: &Expr| matches!(e.constant(), Some(Constant::Null));
        if left.typ == right.typ {
            return Some(left.typ.clone());
        }
        if left.typ.is_def() || right.typ.is_def() {
            return Some(types.def.clone());
        }
        if is_null(left) {
            return Some(self.definition.boxed(&right.typ));
        }
        if is_null(right) {
            return Some(self.definition.boxed(&left.typ));
        }
        if left.typ.sort.is_primitive() || right.typ.sort.is_primitive() {
            if left.typ.sort.unboxed() == Sort::Bool && right.typ.sort.unboxed() == Sort::Bool {
                return Some(types.boolean.clone());
            }
            if let Some(numeric) = self.promote_binary(&left.typ, &right.typ, true) {
                return Some(numeric);
            }
            return Some(types.def.clone());
        }
        if self.definition.is_assignable(&left.typ, &right.typ) {
            return Some(right.typ.clone());
        }
        if self.definition.is_assignable(&right.typ, &left.typ) {
            return Some(left.typ.clone());
        }
        Some(types.object.clone())
    }
}
