//! Binary and unary operator dispatch.
//!
//! Dispatch is keyed on the operand tag pair with widening-first
//! normalization: mixed numeric operands are brought to the wider of the
//! two tags along `bool -> int -> uint -> float` before the operation
//! runs, so `a op b` and `b op a` always produce the same result tag.
//!
//! String pairs support `+` (concatenation) and `==`/`!=`; every other
//! combination of composite or external operands is an unsupported
//! operator error. Integer arithmetic wraps; integer division and modulo
//! by zero are runtime errors, float division follows IEEE.

use crate::errors::{
    division_by_zero, modulo_by_zero, unsupported_operator, unsupported_unary, Error,
};
use crate::value::{PoolRef, Type, Value};

/// Binary operators of the expression grammar, assignment forms excluded.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Shl,
    Shr,
    Xor,
    BitAnd,
}

impl BinaryOp {
    pub fn from_symbol(symbol: &str) -> Option<BinaryOp> {
        Some(match symbol {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "&&" => BinaryOp::And,
            "||" => BinaryOp::Or,
            "<<" => BinaryOp::Shl,
            ">>" => BinaryOp::Shr,
            "^" => BinaryOp::Xor,
            "&" => BinaryOp::BitAnd,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Xor => "^",
            BinaryOp::BitAnd => "&",
        }
    }
}

/// Unary operators evaluated through value dispatch. `++`, `--` and `&`
/// operate on lvalues and are handled by the evaluator directly.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

/// Mutating operator symbols mapped to their base operation (`None` for
/// plain assignment).
pub(crate) fn assign_base_op(symbol: &str) -> Option<Option<BinaryOp>> {
    match symbol {
        "=" => Some(None),
        "+=" => Some(Some(BinaryOp::Add)),
        "-=" => Some(Some(BinaryOp::Sub)),
        "*=" => Some(Some(BinaryOp::Mul)),
        "/=" => Some(Some(BinaryOp::Div)),
        _ => None,
    }
}

/// Widening rank along `bool -> int -> uint -> float`.
fn rank(t: Type) -> u8 {
    match t {
        Type::Bool => 0,
        Type::Int => 1,
        Type::Uint => 2,
        Type::Real => 3,
        _ => 0,
    }
}

/// Evaluate `lhs op rhs`, allocating the result from `pool`.
pub(crate) fn evaluate_binary(
    pool: &PoolRef,
    lhs: &Value,
    op: BinaryOp,
    rhs: &Value,
) -> Result<Value, Error> {
    let (lt, rt) = (lhs.type_of(), rhs.type_of());
    match (lt, rt) {
        (Type::Str, Type::Str) => string_binary(pool, lhs, op, rhs),
        _ if lt.is_scalar() && rt.is_scalar() => scalar_binary(pool, lhs, op, rhs),
        _ => Err(unsupported_operator(op.symbol(), lt.name(), rt.name())),
    }
}

fn string_binary(pool: &PoolRef, lhs: &Value, op: BinaryOp, rhs: &Value) -> Result<Value, Error> {
    let (Value::Str(a), Value::Str(b)) = (lhs, rhs) else {
        return Err(unsupported_operator(op.symbol(), "str", "str"));
    };
    match op {
        BinaryOp::Add => Ok(Value::string(a.borrow().concat(&b.borrow()))),
        BinaryOp::Eq => Value::boolean(pool, a.borrow().as_str() == b.borrow().as_str()),
        BinaryOp::Ne => Value::boolean(pool, a.borrow().as_str() != b.borrow().as_str()),
        _ => Err(unsupported_operator(op.symbol(), "str", "str")),
    }
}

fn scalar_binary(pool: &PoolRef, lhs: &Value, op: BinaryOp, rhs: &Value) -> Result<Value, Error> {
    let (lt, rt) = (lhs.type_of(), rhs.type_of());
    let target = if rank(lt) >= rank(rt) { lt } else { rt };

    match op {
        BinaryOp::And | BinaryOp::Or => {
            if lt != Type::Bool || rt != Type::Bool {
                return Err(unsupported_operator(op.symbol(), lt.name(), rt.name()));
            }
            let (a, b) = (lhs.as_bool()?, rhs.as_bool()?);
            let result = match op {
                BinaryOp::And => a && b,
                _ => a || b,
            };
            Value::boolean(pool, result)
        }

        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            comparison(pool, lhs, op, rhs, target)
        }

        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::Xor | BinaryOp::BitAnd | BinaryOp::Mod => {
            integer_binary(pool, lhs, op, rhs, target)
        }

        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            arithmetic(pool, lhs, op, rhs, target)
        }
    }
}

fn comparison(
    pool: &PoolRef,
    lhs: &Value,
    op: BinaryOp,
    rhs: &Value,
    target: Type,
) -> Result<Value, Error> {
    let result = match target {
        Type::Bool => {
            let (a, b) = (lhs.scalar_to_bool()?, rhs.scalar_to_bool()?);
            match op {
                BinaryOp::Eq => a == b,
                BinaryOp::Ne => a != b,
                _ => {
                    return Err(unsupported_operator(op.symbol(), "bool", "bool"));
                }
            }
        }
        Type::Int => {
            let (a, b) = (lhs.scalar_to_i32()?, rhs.scalar_to_i32()?);
            compare(a, b, op)
        }
        Type::Uint => {
            let (a, b) = (lhs.scalar_to_u32()?, rhs.scalar_to_u32()?);
            compare(a, b, op)
        }
        Type::Real => {
            let (a, b) = (lhs.scalar_to_f32()?, rhs.scalar_to_f32()?);
            match op {
                BinaryOp::Eq => a == b,
                BinaryOp::Ne => a != b,
                BinaryOp::Lt => a < b,
                BinaryOp::Le => a <= b,
                BinaryOp::Gt => a > b,
                _ => a >= b,
            }
        }
        other => {
            return Err(unsupported_operator(
                op.symbol(),
                lhs.type_of().name(),
                other.name(),
            ));
        }
    };
    Value::boolean(pool, result)
}

fn compare<T: PartialOrd>(a: T, b: T, op: BinaryOp) -> bool {
    match op {
        BinaryOp::Eq => a == b,
        BinaryOp::Ne => a != b,
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        _ => a >= b,
    }
}

/// Bit operations and `%` accept only `int` and `uint` operands.
fn integer_binary(
    pool: &PoolRef,
    lhs: &Value,
    op: BinaryOp,
    rhs: &Value,
    target: Type,
) -> Result<Value, Error> {
    let (lt, rt) = (lhs.type_of(), rhs.type_of());
    if !matches!(lt, Type::Int | Type::Uint) || !matches!(rt, Type::Int | Type::Uint) {
        return Err(unsupported_operator(op.symbol(), lt.name(), rt.name()));
    }
    match target {
        Type::Int => {
            let (a, b) = (lhs.scalar_to_i32()?, rhs.scalar_to_i32()?);
            let result = match op {
                BinaryOp::Shl => a.wrapping_shl(b as u32),
                BinaryOp::Shr => a.wrapping_shr(b as u32),
                BinaryOp::Xor => a ^ b,
                BinaryOp::BitAnd => a & b,
                _ => {
                    if b == 0 {
                        return Err(modulo_by_zero());
                    }
                    a.wrapping_rem(b)
                }
            };
            Value::int(pool, result)
        }
        _ => {
            let (a, b) = (lhs.scalar_to_u32()?, rhs.scalar_to_u32()?);
            let result = match op {
                BinaryOp::Shl => a.wrapping_shl(b),
                BinaryOp::Shr => a.wrapping_shr(b),
                BinaryOp::Xor => a ^ b,
                BinaryOp::BitAnd => a & b,
                _ => {
                    if b == 0 {
                        return Err(modulo_by_zero());
                    }
                    a % b
                }
            };
            Value::uint(pool, result)
        }
    }
}

fn arithmetic(
    pool: &PoolRef,
    lhs: &Value,
    op: BinaryOp,
    rhs: &Value,
    target: Type,
) -> Result<Value, Error> {
    match target {
        Type::Int => {
            let (a, b) = (lhs.scalar_to_i32()?, rhs.scalar_to_i32()?);
            let result = match op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Sub => a.wrapping_sub(b),
                BinaryOp::Mul => a.wrapping_mul(b),
                _ => {
                    if b == 0 {
                        return Err(division_by_zero());
                    }
                    a.wrapping_div(b)
                }
            };
            Value::int(pool, result)
        }
        Type::Uint => {
            let (a, b) = (lhs.scalar_to_u32()?, rhs.scalar_to_u32()?);
            let result = match op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Sub => a.wrapping_sub(b),
                BinaryOp::Mul => a.wrapping_mul(b),
                _ => {
                    if b == 0 {
                        return Err(division_by_zero());
                    }
                    a / b
                }
            };
            Value::uint(pool, result)
        }
        Type::Real => {
            let (a, b) = (lhs.scalar_to_f32()?, rhs.scalar_to_f32()?);
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                _ => a / b,
            };
            Value::real(pool, result)
        }
        other => Err(unsupported_operator(
            op.symbol(),
            other.name(),
            other.name(),
        )),
    }
}

/// Evaluate a dispatching unary operator.
pub(crate) fn evaluate_unary(pool: &PoolRef, op: UnaryOp, value: &Value) -> Result<Value, Error> {
    match (op, value.type_of()) {
        (UnaryOp::Neg, Type::Int) => Value::int(pool, value.as_int()?.wrapping_neg()),
        (UnaryOp::Neg, Type::Uint) => Value::uint(pool, value.as_uint()?.wrapping_neg()),
        (UnaryOp::Neg, Type::Real) => Value::real(pool, -value.as_real()?),
        (UnaryOp::Not, Type::Bool) => Value::boolean(pool, !value.as_bool()?),
        (op, t) => Err(unsupported_unary(op.symbol(), t.name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ListValue, StrValue};

    fn pool() -> PoolRef {
        PoolRef::new(4096)
    }

    #[test]
    fn test_int_arithmetic() {
        let p = pool();
        let a = Value::int(&p, 10).unwrap();
        let b = Value::int(&p, 3).unwrap();
        assert_eq!(
            evaluate_binary(&p, &a, BinaryOp::Add, &b).unwrap().as_int().unwrap(),
            13
        );
        assert_eq!(
            evaluate_binary(&p, &a, BinaryOp::Div, &b).unwrap().as_int().unwrap(),
            3
        );
        assert_eq!(
            evaluate_binary(&p, &a, BinaryOp::Mod, &b).unwrap().as_int().unwrap(),
            1
        );
    }

    #[test]
    fn test_division_by_zero() {
        let p = pool();
        let a = Value::int(&p, 1).unwrap();
        let z = Value::int(&p, 0).unwrap();
        let err = evaluate_binary(&p, &a, BinaryOp::Div, &z).unwrap_err();
        assert_eq!(err.kind, crate::errors::ErrorKind::DivisionByZero);
        let err = evaluate_binary(&p, &a, BinaryOp::Mod, &z).unwrap_err();
        assert_eq!(err.kind, crate::errors::ErrorKind::DivisionByZero);
    }

    #[test]
    fn test_widening_result_tags_commute() {
        let p = pool();
        let i = Value::int(&p, 2).unwrap();
        let u = Value::uint(&p, 3).unwrap();
        let r = Value::real(&p, 1.5).unwrap();
        let b = Value::boolean(&p, true).unwrap();

        for (x, y) in [(&i, &u), (&i, &r), (&u, &r), (&b, &i)] {
            for op in [BinaryOp::Add, BinaryOp::Mul] {
                let xy = evaluate_binary(&p, x, op, y).unwrap();
                let yx = evaluate_binary(&p, y, op, x).unwrap();
                assert_eq!(xy.type_of(), yx.type_of());
            }
            for op in [BinaryOp::Eq, BinaryOp::Ne] {
                let xy = evaluate_binary(&p, x, op, y).unwrap();
                let yx = evaluate_binary(&p, y, op, x).unwrap();
                assert_eq!(xy.type_of(), yx.type_of());
                assert_eq!(xy.type_of(), Type::Bool);
            }
        }
    }

    #[test]
    fn test_mixed_int_real_widens_to_real() {
        let p = pool();
        let i = Value::int(&p, 3).unwrap();
        let r = Value::real(&p, 0.5).unwrap();
        let sum = evaluate_binary(&p, &i, BinaryOp::Add, &r).unwrap();
        assert_eq!(sum.type_of(), Type::Real);
        assert_eq!(sum.as_real().unwrap(), 3.5);
    }

    #[test]
    fn test_bool_logic() {
        let p = pool();
        let t = Value::boolean(&p, true).unwrap();
        let f = Value::boolean(&p, false).unwrap();
        assert!(!evaluate_binary(&p, &t, BinaryOp::And, &f).unwrap().as_bool().unwrap());
        assert!(evaluate_binary(&p, &t, BinaryOp::Or, &f).unwrap().as_bool().unwrap());
        assert!(evaluate_binary(&p, &t, BinaryOp::Eq, &t).unwrap().as_bool().unwrap());
    }

    #[test]
    fn test_logic_rejects_non_bool() {
        let p = pool();
        let t = Value::boolean(&p, true).unwrap();
        let one = Value::int(&p, 1).unwrap();
        let err = evaluate_binary(&p, &t, BinaryOp::And, &one).unwrap_err();
        assert_eq!(err.kind, crate::errors::ErrorKind::UnsupportedOperator);
    }

    #[test]
    fn test_bit_ops_reject_real() {
        let p = pool();
        let r = Value::real(&p, 1.0).unwrap();
        let i = Value::int(&p, 1).unwrap();
        let err = evaluate_binary(&p, &r, BinaryOp::BitAnd, &i).unwrap_err();
        assert_eq!(err.kind, crate::errors::ErrorKind::UnsupportedOperator);
        let err = evaluate_binary(&p, &i, BinaryOp::Shl, &r).unwrap_err();
        assert_eq!(err.kind, crate::errors::ErrorKind::UnsupportedOperator);
    }

    #[test]
    fn test_shifts_and_bits() {
        let p = pool();
        let a = Value::int(&p, 3).unwrap();
        let b = Value::int(&p, 2).unwrap();
        assert_eq!(
            evaluate_binary(&p, &a, BinaryOp::Shl, &b).unwrap().as_int().unwrap(),
            12
        );
        assert_eq!(
            evaluate_binary(&p, &a, BinaryOp::BitAnd, &b).unwrap().as_int().unwrap(),
            2
        );
        assert_eq!(
            evaluate_binary(&p, &a, BinaryOp::Xor, &b).unwrap().as_int().unwrap(),
            1
        );
    }

    #[test]
    fn test_string_concat_and_compare() {
        let p = pool();
        let a = Value::string(StrValue::new("foo"));
        let b = Value::string(StrValue::new("bar"));
        let cat = evaluate_binary(&p, &a, BinaryOp::Add, &b).unwrap();
        assert_eq!(cat.display_value().unwrap(), "foobar");
        assert!(!evaluate_binary(&p, &a, BinaryOp::Eq, &b).unwrap().as_bool().unwrap());
        assert!(evaluate_binary(&p, &a, BinaryOp::Ne, &b).unwrap().as_bool().unwrap());
    }

    #[test]
    fn test_unsupported_pairs() {
        let p = pool();
        let s = Value::string(StrValue::new("x"));
        let i = Value::int(&p, 1).unwrap();
        let l = Value::list(ListValue::new(vec![]));
        assert_eq!(
            evaluate_binary(&p, &s, BinaryOp::Add, &i).unwrap_err().kind,
            crate::errors::ErrorKind::UnsupportedOperator
        );
        assert_eq!(
            evaluate_binary(&p, &l, BinaryOp::Add, &l).unwrap_err().kind,
            crate::errors::ErrorKind::UnsupportedOperator
        );
        assert_eq!(
            evaluate_binary(&p, &s, BinaryOp::Lt, &s).unwrap_err().kind,
            crate::errors::ErrorKind::UnsupportedOperator
        );
    }

    #[test]
    fn test_unary() {
        let p = pool();
        let i = Value::int(&p, 4).unwrap();
        assert_eq!(
            evaluate_unary(&p, UnaryOp::Neg, &i).unwrap().as_int().unwrap(),
            -4
        );
        let t = Value::boolean(&p, true).unwrap();
        assert!(!evaluate_unary(&p, UnaryOp::Not, &t).unwrap().as_bool().unwrap());
        let s = Value::string(StrValue::new("x"));
        assert_eq!(
            evaluate_unary(&p, UnaryOp::Neg, &s).unwrap_err().kind,
            crate::errors::ErrorKind::UnsupportedOperator
        );
    }

    #[test]
    fn test_wrapping_arithmetic() {
        let p = pool();
        let max = Value::int(&p, i32::MAX).unwrap();
        let one = Value::int(&p, 1).unwrap();
        let wrapped = evaluate_binary(&p, &max, BinaryOp::Add, &one).unwrap();
        assert_eq!(wrapped.as_int().unwrap(), i32::MIN);
    }
}
