//! Operator kernels.
//!
//! One typed kernel per operator family serves three callers: the VM's
//! statically typed instructions, constant folding in the analyzer, and the
//! `def` operators below, which only add runtime promotion in front of it.
//! Operators are hand written fast paths; they never go through the
//! whitelist.

use std::cmp::Ordering;
use std::fmt;

use crate::runner::definition::Sort;
use crate::runner::ds::error::ScriptError;
use crate::runner::ds::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Lsh,
    Rsh,
    Ush,
    BwAnd,
    Xor,
    BwOr,
    Eq,
    Ne,
    RefEq,
    RefNe,
    Lt,
    Lte,
    Gt,
    Gte,
    BwNot,
    Neg,
    Plus,
    Not,
}

const OPERATIONS: [Operation; 23] = [
    Operation::Mul,
    Operation::Div,
    Operation::Rem,
    Operation::Add,
    Operation::Sub,
    Operation::Lsh,
    Operation::Rsh,
    Operation::Ush,
    Operation::BwAnd,
    Operation::Xor,
    Operation::BwOr,
    Operation::Eq,
    Operation::Ne,
    Operation::RefEq,
    Operation::RefNe,
    Operation::Lt,
    Operation::Lte,
    Operation::Gt,
    Operation::Gte,
    Operation::BwNot,
    Operation::Neg,
    Operation::Plus,
    Operation::Not,
];

impl Operation {
    pub fn symbol(self) -> &'static str {
        match self {
            Operation::Mul => "*",
            Operation::Div => "/",
            Operation::Rem => "%",
            Operation::Add => "+",
            Operation::Sub => "-",
            Operation::Lsh => "<<",
            Operation::Rsh => ">>",
            Operation::Ush => ">>>",
            Operation::BwAnd => "&",
            Operation::Xor => "^",
            Operation::BwOr => "|",
            Operation::Eq => "==",
            Operation::Ne => "!=",
            Operation::RefEq => "===",
            Operation::RefNe => "!==",
            Operation::Lt => "<",
            Operation::Lte => "<=",
            Operation::Gt => ">",
            Operation::Gte => ">=",
            Operation::BwNot => "~",
            Operation::Neg => "-",
            Operation::Plus => "+",
            Operation::Not => "!",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Operation::Eq
                | Operation::Ne
                | Operation::RefEq
                | Operation::RefNe
                | Operation::Lt
                | Operation::Lte
                | Operation::Gt
                | Operation::Gte
        )
    }

    pub fn is_shift(self) -> bool {
        matches!(self, Operation::Lsh | Operation::Rsh | Operation::Ush)
    }

    pub fn as_operand(self) -> u32 {
        self as u32
    }

    pub fn from_operand(operand: u32) -> Option<Operation> {
        OPERATIONS.get(operand as usize).copied()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// The representation an operator works in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandKind {
    Bool,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    String,
    Object,
    Def,
}

const KINDS: [OperandKind; 11] = [
    OperandKind::Bool,
    OperandKind::Byte,
    OperandKind::Short,
    OperandKind::Char,
    OperandKind::Int,
    OperandKind::Long,
    OperandKind::Float,
    OperandKind::Double,
    OperandKind::String,
    OperandKind::Object,
    OperandKind::Def,
];

impl OperandKind {
    pub fn from_sort(sort: Sort) -> OperandKind {
        match sort.unboxed() {
            Sort::Bool => OperandKind::Bool,
            Sort::Byte => OperandKind::Byte,
            Sort::Short => OperandKind::Short,
            Sort::Char => OperandKind::Char,
            Sort::Int => OperandKind::Int,
            Sort::Long => OperandKind::Long,
            Sort::Float => OperandKind::Float,
            Sort::Double => OperandKind::Double,
            Sort::String => OperandKind::String,
            Sort::Def => OperandKind::Def,
            _ => OperandKind::Object,
        }
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            OperandKind::Byte | OperandKind::Short | OperandKind::Char | OperandKind::Int | OperandKind::Long
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integral() || matches!(self, OperandKind::Float | OperandKind::Double)
    }

    pub fn name(self) -> &'static str {
        match self {
            OperandKind::Bool => "boolean",
            OperandKind::Byte => "byte",
            OperandKind::Short => "short",
            OperandKind::Char => "char",
            OperandKind::Int => "int",
            OperandKind::Long => "long",
            OperandKind::Float => "float",
            OperandKind::Double => "double",
            OperandKind::String => "String",
            OperandKind::Object => "Object",
            OperandKind::Def => "def",
        }
    }

    pub fn as_operand(self) -> u32 {
        self as u32
    }

    pub fn from_operand(operand: u32) -> Option<OperandKind> {
        KINDS.get(operand as usize).copied()
    }
}

fn illegal(op: Operation, value: &Value) -> ScriptError {
    if value.is_null() {
        ScriptError::NullPointer(format!("cannot apply [{}] to a null value", op))
    } else {
        ScriptError::Arithmetic(format!("cannot apply [{}] to type [{}]", op, value.class_name()))
    }
}

fn illegal_kind(op: Operation, kind: OperandKind) -> ScriptError {
    ScriptError::Arithmetic(format!("cannot apply [{}] to type [{}]", op, kind.name()))
}

fn overflow(kind: OperandKind) -> ScriptError {
    ScriptError::Arithmetic(format!("{} overflow", kind.name()))
}

fn divide_by_zero() -> ScriptError {
    ScriptError::Arithmetic("/ by zero".to_string())
}

pub(crate) fn as_int(value: &Value) -> Option<i32> {
    match value {
        Value::Byte(v) => Some(*v as i32),
        Value::Short(v) => Some(*v as i32),
        Value::Char(v) => Some(*v as i32),
        Value::Int(v) => Some(*v),
        _ => None,
    }
}

pub(crate) fn as_long(value: &Value) -> Option<i64> {
    match value {
        Value::Long(v) => Some(*v),
        other => as_int(other).map(|v| v as i64),
    }
}

pub(crate) fn as_float(value: &Value) -> Option<f32> {
    match value {
        Value::Float(v) => Some(*v),
        other => as_long(other).map(|v| v as f32),
    }
}

pub(crate) fn as_double(value: &Value) -> Option<f64> {
    match value {
        Value::Double(v) => Some(*v),
        Value::Float(v) => Some(*v as f64),
        other => as_long(other).map(|v| v as f64),
    }
}

fn operands<T>(op: Operation, left: &Value, right: &Value, get: fn(&Value) -> Option<T>) -> Result<(T, T), ScriptError> {
    let l = get(left).ok_or_else(|| illegal(op, left))?;
    let r = get(right).ok_or_else(|| illegal(op, right))?;
    Ok((l, r))
}

fn checked_float(checked: bool, result: f64, left: f64, right: f64, kind: OperandKind) -> Result<f64, ScriptError> {
    if checked && result.is_infinite() && left.is_finite() && right.is_finite() {
        Err(overflow(kind))
    } else {
        Ok(result)
    }
}

fn int_binary(op: Operation, checked: bool, l: i32, r: i32) -> Result<i32, ScriptError> {
    let kind = OperandKind::Int;
    let value = match op {
        Operation::Add if checked => l.checked_add(r).ok_or_else(|| overflow(kind))?,
        Operation::Add => l.wrapping_add(r),
        Operation::Sub if checked => l.checked_sub(r).ok_or_else(|| overflow(kind))?,
        Operation::Sub => l.wrapping_sub(r),
        Operation::Mul if checked => l.checked_mul(r).ok_or_else(|| overflow(kind))?,
        Operation::Mul => l.wrapping_mul(r),
        Operation::Div => {
            if r == 0 {
                return Err(divide_by_zero());
            }
            if checked {
                l.checked_div(r).ok_or_else(|| overflow(kind))?
            } else {
                l.wrapping_div(r)
            }
        }
        Operation::Rem => {
            if r == 0 {
                return Err(divide_by_zero());
            }
            l.wrapping_rem(r)
        }
        Operation::Lsh => l.wrapping_shl(r as u32),
        Operation::Rsh => l.wrapping_shr(r as u32),
        Operation::Ush => (l as u32).wrapping_shr(r as u32) as i32,
        Operation::BwAnd => l & r,
        Operation::Xor => l ^ r,
        Operation::BwOr => l | r,
        _ => return Err(illegal_kind(op, kind)),
    };
    Ok(value)
}

fn long_binary(op: Operation, checked: bool, l: i64, r: i64) -> Result<i64, ScriptError> {
    let kind = OperandKind::Long;
    let value = match op {
        Operation::Add if checked => l.checked_add(r).ok_or_else(|| overflow(kind))?,
        Operation::Add => l.wrapping_add(r),
        Operation::Sub if checked => l.checked_sub(r).ok_or_else(|| overflow(kind))?,
        Operation::Sub => l.wrapping_sub(r),
        Operation::Mul if checked => l.checked_mul(r).ok_or_else(|| overflow(kind))?,
        Operation::Mul => l.wrapping_mul(r),
        Operation::Div => {
            if r == 0 {
                return Err(divide_by_zero());
            }
            if checked {
                l.checked_div(r).ok_or_else(|| overflow(kind))?
            } else {
                l.wrapping_div(r)
            }
        }
        Operation::Rem => {
            if r == 0 {
                return Err(divide_by_zero());
            }
            l.wrapping_rem(r)
        }
        Operation::Lsh => l.wrapping_shl(r as u32),
        Operation::Rsh => l.wrapping_shr(r as u32),
        Operation::Ush => (l as u64).wrapping_shr(r as u32) as i64,
        Operation::BwAnd => l & r,
        Operation::Xor => l ^ r,
        Operation::BwOr => l | r,
        _ => return Err(illegal_kind(op, kind)),
    };
    Ok(value)
}

fn double_binary(op: Operation, checked: bool, l: f64, r: f64, kind: OperandKind) -> Result<f64, ScriptError> {
    let value = match op {
        Operation::Add => l + r,
        Operation::Sub => l - r,
        Operation::Mul => l * r,
        Operation::Div => l / r,
        Operation::Rem => l % r,
        _ => return Err(illegal_kind(op, kind)),
    };
    checked_float(checked, value, l, r, kind)
}

/// Binary arithmetic, bitwise and shift operators on operands already
/// converted to `kind`. Shift counts are read as `int` or `long`.
pub fn binary(op: Operation, kind: OperandKind, checked: bool, left: &Value, right: &Value) -> Result<Value, ScriptError> {
    match kind {
        OperandKind::Byte | OperandKind::Short | OperandKind::Char | OperandKind::Int => {
            if op.is_shift() {
                let l = as_int(left).ok_or_else(|| illegal(op, left))?;
                let r = as_long(right).ok_or_else(|| illegal(op, right))?;
                return Ok(Value::Int(int_binary(op, checked, l, r as i32)?));
            }
            let (l, r) = operands(op, left, right, as_int)?;
            Ok(Value::Int(int_binary(op, checked, l, r)?))
        }
        OperandKind::Long => {
            if op.is_shift() {
                let l = as_long(left).ok_or_else(|| illegal(op, left))?;
                let r = as_long(right).ok_or_else(|| illegal(op, right))?;
                return Ok(Value::Long(long_binary(op, checked, l, r)?));
            }
            let (l, r) = operands(op, left, right, as_long)?;
            Ok(Value::Long(long_binary(op, checked, l, r)?))
        }
        OperandKind::Float => {
            let (l, r) = operands(op, left, right, as_float)?;
            let result = double_binary(op, false, l as f64, r as f64, kind)? as f32;
            if checked && result.is_infinite() && l.is_finite() && r.is_finite() {
                return Err(overflow(kind));
            }
            Ok(Value::Float(result))
        }
        OperandKind::Double => {
            let (l, r) = operands(op, left, right, as_double)?;
            Ok(Value::Double(double_binary(op, checked, l, r, kind)?))
        }
        OperandKind::Bool => match (left, right) {
            (Value::Bool(l), Value::Bool(r)) => match op {
                Operation::BwAnd => Ok(Value::Bool(*l & *r)),
                Operation::Xor => Ok(Value::Bool(*l ^ *r)),
                Operation::BwOr => Ok(Value::Bool(*l | *r)),
                _ => Err(illegal_kind(op, kind)),
            },
            (Value::Bool(_), other) | (other, _) => Err(illegal(op, other)),
        },
        OperandKind::String if op == Operation::Add => Ok(Value::from(format!("{}{}", left, right))),
        OperandKind::Def => match op {
            Operation::Mul => mul(left, right),
            Operation::Div => div(left, right),
            Operation::Rem => rem(left, right),
            Operation::Add => add(left, right),
            Operation::Sub => sub(left, right),
            Operation::Lsh => lsh(left, right),
            Operation::Rsh => rsh(left, right),
            Operation::Ush => ush(left, right),
            Operation::BwAnd => and(left, right),
            Operation::Xor => xor(left, right),
            Operation::BwOr => or(left, right),
            _ => Err(illegal_kind(op, kind)),
        },
        _ => Err(illegal_kind(op, kind)),
    }
}

fn numeric_order(kind: OperandKind, op: Operation, left: &Value, right: &Value) -> Result<Option<Ordering>, ScriptError> {
    Ok(match kind {
        OperandKind::Byte | OperandKind::Short | OperandKind::Char | OperandKind::Int => {
            let (l, r) = operands(op, left, right, as_int)?;
            Some(l.cmp(&r))
        }
        OperandKind::Long => {
            let (l, r) = operands(op, left, right, as_long)?;
            Some(l.cmp(&r))
        }
        OperandKind::Float => {
            let (l, r) = operands(op, left, right, as_float)?;
            l.partial_cmp(&r)
        }
        OperandKind::Double => {
            let (l, r) = operands(op, left, right, as_double)?;
            l.partial_cmp(&r)
        }
        _ => return Err(illegal_kind(op, kind)),
    })
}

/// Comparison operators on operands converted to `kind`.
pub fn compare(op: Operation, kind: OperandKind, left: &Value, right: &Value) -> Result<bool, ScriptError> {
    match kind {
        OperandKind::Def => match op {
            Operation::Eq => eq(left, right),
            Operation::Ne => eq(left, right).map(|b| !b),
            Operation::RefEq => Ok(left.same(right)),
            Operation::RefNe => Ok(!left.same(right)),
            Operation::Lt => lt(left, right),
            Operation::Lte => lte(left, right),
            Operation::Gt => gt(left, right),
            Operation::Gte => gte(left, right),
            _ => Err(illegal_kind(op, kind)),
        },
        OperandKind::Bool | OperandKind::String | OperandKind::Object => match op {
            Operation::Eq => Ok(left == right),
            Operation::Ne => Ok(left != right),
            Operation::RefEq => Ok(left.same(right)),
            Operation::RefNe => Ok(!left.same(right)),
            _ => Err(illegal_kind(op, kind)),
        },
        _ => {
            let order = numeric_order(kind, op, left, right)?;
            Ok(match op {
                Operation::Eq | Operation::RefEq => order == Some(Ordering::Equal),
                Operation::Ne | Operation::RefNe => order != Some(Ordering::Equal),
                Operation::Lt => order == Some(Ordering::Less),
                Operation::Lte => matches!(order, Some(Ordering::Less) | Some(Ordering::Equal)),
                Operation::Gt => order == Some(Ordering::Greater),
                Operation::Gte => matches!(order, Some(Ordering::Greater) | Some(Ordering::Equal)),
                _ => return Err(illegal_kind(op, kind)),
            })
        }
    }
}

/// Unary operators on an operand converted to `kind`. Only integral
/// negation is overflow checked.
pub fn unary(op: Operation, kind: OperandKind, checked: bool, value: &Value) -> Result<Value, ScriptError> {
    match (op, kind) {
        (Operation::Not, OperandKind::Bool) => match value {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            other => Err(illegal(op, other)),
        },
        (_, OperandKind::Def) => match op {
            Operation::BwNot => not(value),
            Operation::Neg => neg(value),
            Operation::Plus => plus(value),
            Operation::Not => match value {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                other => Err(illegal(op, other)),
            },
            _ => Err(illegal_kind(op, kind)),
        },
        (Operation::Neg, OperandKind::Long) => {
            let v = as_long(value).ok_or_else(|| illegal(op, value))?;
            if checked {
                v.checked_neg().map(Value::Long).ok_or_else(|| overflow(kind))
            } else {
                Ok(Value::Long(v.wrapping_neg()))
            }
        }
        (Operation::Neg, OperandKind::Float) => {
            as_float(value).map(|v| Value::Float(-v)).ok_or_else(|| illegal(op, value))
        }
        (Operation::Neg, OperandKind::Double) => {
            as_double(value).map(|v| Value::Double(-v)).ok_or_else(|| illegal(op, value))
        }
        (Operation::Neg, k) if k.is_integral() => {
            let v = as_int(value).ok_or_else(|| illegal(op, value))?;
            if checked {
                v.checked_neg().map(Value::Int).ok_or_else(|| overflow(OperandKind::Int))
            } else {
                Ok(Value::Int(v.wrapping_neg()))
            }
        }
        (Operation::BwNot, OperandKind::Long) => {
            as_long(value).map(|v| Value::Long(!v)).ok_or_else(|| illegal(op, value))
        }
        (Operation::BwNot, k) if k.is_integral() => {
            as_int(value).map(|v| Value::Int(!v)).ok_or_else(|| illegal(op, value))
        }
        (Operation::Plus, OperandKind::Long) => as_long(value).map(Value::Long).ok_or_else(|| illegal(op, value)),
        (Operation::Plus, OperandKind::Float) => as_float(value).map(Value::Float).ok_or_else(|| illegal(op, value)),
        (Operation::Plus, OperandKind::Double) => as_double(value).map(Value::Double).ok_or_else(|| illegal(op, value)),
        (Operation::Plus, k) if k.is_integral() => as_int(value).map(Value::Int).ok_or_else(|| illegal(op, value)),
        _ => Err(illegal_kind(op, kind)),
    }
}

// ── Runtime promotion ─────────────────────────────────────────

/// Kind of a single numeric operand after unary promotion.
fn promote_value(op: Operation, value: &Value) -> Result<OperandKind, ScriptError> {
    match value {
        Value::Byte(_) | Value::Short(_) | Value::Char(_) | Value::Int(_) => Ok(OperandKind::Int),
        Value::Long(_) => Ok(OperandKind::Long),
        Value::Float(_) => Ok(OperandKind::Float),
        Value::Double(_) => Ok(OperandKind::Double),
        other => Err(illegal(op, other)),
    }
}

/// double > float > long > int.
fn promote_pair(op: Operation, left: &Value, right: &Value) -> Result<OperandKind, ScriptError> {
    let l = promote_value(op, left)?;
    let r = promote_value(op, right)?;
    Ok(if l == OperandKind::Double || r == OperandKind::Double {
        OperandKind::Double
    } else if l == OperandKind::Float || r == OperandKind::Float {
        OperandKind::Float
    } else if l == OperandKind::Long || r == OperandKind::Long {
        OperandKind::Long
    } else {
        OperandKind::Int
    })
}

fn arithmetic(op: Operation, left: &Value, right: &Value) -> Result<Value, ScriptError> {
    let kind = promote_pair(op, left, right)?;
    binary(op, kind, false, left, right)
}

fn bitwise(op: Operation, left: &Value, right: &Value) -> Result<Value, ScriptError> {
    if let (Value::Bool(_), Value::Bool(_)) = (left, right) {
        return binary(op, OperandKind::Bool, false, left, right);
    }
    match promote_pair(op, left, right)? {
        OperandKind::Float | OperandKind::Double => {
            let culprit = if matches!(left, Value::Float(_) | Value::Double(_)) { left } else { right };
            Err(illegal(op, culprit))
        }
        kind => binary(op, kind, false, left, right),
    }
}

fn shift(op: Operation, left: &Value, right: &Value) -> Result<Value, ScriptError> {
    let kind = promote_value(op, left)?;
    if !kind.is_integral() {
        return Err(illegal(op, left));
    }
    if !promote_value(op, right)?.is_integral() {
        return Err(illegal(op, right));
    }
    binary(op, kind, false, left, right)
}

pub fn add(left: &Value, right: &Value) -> Result<Value, ScriptError> {
    if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) {
        return binary(Operation::Add, OperandKind::String, false, left, right);
    }
    arithmetic(Operation::Add, left, right)
}

pub fn sub(left: &Value, right: &Value) -> Result<Value, ScriptError> {
    arithmetic(Operation::Sub, left, right)
}

pub fn mul(left: &Value, right: &Value) -> Result<Value, ScriptError> {
    arithmetic(Operation::Mul, left, right)
}

pub fn div(left: &Value, right: &Value) -> Result<Value, ScriptError> {
    arithmetic(Operation::Div, left, right)
}

pub fn rem(left: &Value, right: &Value) -> Result<Value, ScriptError> {
    arithmetic(Operation::Rem, left, right)
}

pub fn and(left: &Value, right: &Value) -> Result<Value, ScriptError> {
    bitwise(Operation::BwAnd, left, right)
}

pub fn or(left: &Value, right: &Value) -> Result<Value, ScriptError> {
    bitwise(Operation::BwOr, left, right)
}

pub fn xor(left: &Value, right: &Value) -> Result<Value, ScriptError> {
    bitwise(Operation::Xor, left, right)
}

pub fn lsh(left: &Value, right: &Value) -> Result<Value, ScriptError> {
    shift(Operation::Lsh, left, right)
}

pub fn rsh(left: &Value, right: &Value) -> Result<Value, ScriptError> {
    shift(Operation::Rsh, left, right)
}

pub fn ush(left: &Value, right: &Value) -> Result<Value, ScriptError> {
    shift(Operation::Ush, left, right)
}

/// Null equals only null; numbers (and chars) compare numerically;
/// everything else uses `equals`.
pub fn eq(left: &Value, right: &Value) -> Result<bool, ScriptError> {
    match (left, right) {
        (Value::Null, Value::Null) => Ok(true),
        (Value::Null, _) | (_, Value::Null) => Ok(false),
        (l, r) if l.is_numeric() && r.is_numeric() => {
            let kind = promote_pair(Operation::Eq, l, r)?;
            compare(Operation::Eq, kind, l, r)
        }
        (l, r) => Ok(l == r),
    }
}

fn order(op: Operation, left: &Value, right: &Value) -> Result<bool, ScriptError> {
    let kind = promote_pair(op, left, right)?;
    compare(op, kind, left, right)
}

pub fn lt(left: &Value, right: &Value) -> Result<bool, ScriptError> {
    order(Operation::Lt, left, right)
}

pub fn lte(left: &Value, right: &Value) -> Result<bool, ScriptError> {
    order(Operation::Lte, left, right)
}

pub fn gt(left: &Value, right: &Value) -> Result<bool, ScriptError> {
    order(Operation::Gt, left, right)
}

pub fn gte(left: &Value, right: &Value) -> Result<bool, ScriptError> {
    order(Operation::Gte, left, right)
}

/// Bitwise complement.
pub fn not(value: &Value) -> Result<Value, ScriptError> {
    let kind = promote_value(Operation::BwNot, value)?;
    unary(Operation::BwNot, kind, false, value)
}

pub fn neg(value: &Value) -> Result<Value, ScriptError> {
    let kind = promote_value(Operation::Neg, value)?;
    unary(Operation::Neg, kind, false, value)
}

pub fn plus(value: &Value) -> Result<Value, ScriptError> {
    let kind = promote_value(Operation::Plus, value)?;
    unary(Operation::Plus, kind, false, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotes_along_the_ladder() {
        assert_eq!(add(&Value::Int(1), &Value::Long(2)).unwrap(), Value::Long(3));
        assert_eq!(add(&Value::Long(1), &Value::Float(0.5)).unwrap(), Value::Float(1.5));
        assert_eq!(mul(&Value::Float(2.0), &Value::Double(1.5)).unwrap(), Value::Double(3.0));
        assert_eq!(sub(&Value::Byte(5), &Value::Short(2)).unwrap(), Value::Int(3));
    }

    #[test]
    fn chars_are_unsigned_integrals() {
        assert_eq!(add(&Value::Char(65), &Value::Int(1)).unwrap(), Value::Int(66));
        assert_eq!(add(&Value::Char(65), &Value::string("b")).unwrap(), Value::string("Ab"));
    }

    #[test]
    fn string_concatenation_wins() {
        assert_eq!(add(&Value::string("a"), &Value::Int(1)).unwrap(), Value::string("a1"));
        assert_eq!(add(&Value::Null, &Value::string("x")).unwrap(), Value::string("nullx"));
        assert_eq!(add(&Value::Double(1.0), &Value::string("")).unwrap(), Value::string("1.0"));
    }

    #[test]
    fn null_equality() {
        assert!(eq(&Value::Null, &Value::Null).unwrap());
        assert!(!eq(&Value::Null, &Value::Int(0)).unwrap());
        assert!(eq(&Value::Int(1), &Value::Long(1)).unwrap());
        assert!(lt(&Value::Null, &Value::Int(1)).is_err());
    }

    #[test]
    fn integer_division_by_zero() {
        assert!(matches!(div(&Value::Int(1), &Value::Int(0)), Err(ScriptError::Arithmetic(_))));
        assert_eq!(div(&Value::Double(1.0), &Value::Int(0)).unwrap(), Value::Double(f64::INFINITY));
    }

    #[test]
    fn checked_kernel_reports_overflow() {
        let max = Value::Int(i32::MAX);
        assert_eq!(binary(Operation::Add, OperandKind::Int, false, &max, &Value::Int(1)).unwrap(), Value::Int(i32::MIN));
        assert!(binary(Operation::Add, OperandKind::Int, true, &max, &Value::Int(1)).is_err());
        assert!(unary(Operation::Neg, OperandKind::Int, true, &Value::Int(i32::MIN)).is_err());
        assert_eq!(unary(Operation::Neg, OperandKind::Double, true, &Value::Double(f64::MAX)).unwrap(), Value::Double(-f64::MAX));
    }

    #[test]
    fn bitwise_not_rejects_decimals() {
        assert_eq!(not(&Value::Int(0)).unwrap(), Value::Int(-1));
        assert!(matches!(not(&Value::Double(1.0)), Err(ScriptError::Arithmetic(_))));
        assert!(and(&Value::Double(1.0), &Value::Int(1)).is_err());
        assert_eq!(xor(&Value::Bool(true), &Value::Bool(true)).unwrap(), Value::Bool(false));
    }

    #[test]
    fn shifts_use_left_operand_width() {
        assert_eq!(lsh(&Value::Int(1), &Value::Long(33)).unwrap(), Value::Int(2));
        assert_eq!(ush(&Value::Int(-1), &Value::Int(28)).unwrap(), Value::Int(15));
        assert_eq!(rsh(&Value::Long(-16), &Value::Int(2)).unwrap(), Value::Long(-4));
    }
}
