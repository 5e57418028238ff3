use std::cmp::Ordering;

use smol_str::{SmolStr, format_smolstr};

use crate::{
    error::EvalError,
    member::{Member, Root, Segment},
    operator::{BinaryOp, Method},
    value::Value,
};

use super::{Binary, Expr, MethodCall};

impl Expr {
    /// Replace every subtree that does not read the model with its value.
    pub fn partial_eval(&self) -> Result<Expr, EvalError> {
        fold(self)
    }
}

fn fold(expr: &Expr) -> Result<Expr, EvalError> {
    let folded = match expr {
        Expr::Constant(_) => expr.clone(),
        Expr::Captured(captured) => Expr::Constant(captured.read()),
        Expr::Member(member) => match member.root {
            Root::Model => expr.clone(),
            Root::Object(ref object) => match fold(object)? {
                Expr::Constant(value) => Expr::Constant(read_path(value, &member.segments)?),
                object => Expr::Member(Member {
                    root: Root::Object(Box::new(object)),
                    segments: member.segments.clone(),
                }),
            },
        },
        Expr::Unary(operand) => match fold(operand)? {
            constant @ Expr::Constant(_) => constant,
            operand => Expr::Unary(Box::new(operand)),
        },
        Expr::Binary(binary) => {
            let lhs = fold(&binary.lhs)?;
            let rhs = fold(&binary.rhs)?;
            match (lhs, rhs) {
                (Expr::Constant(lhs), Expr::Constant(rhs)) => {
                    Expr::Constant(apply(binary.op, lhs, rhs)?)
                }
                (lhs, rhs) => Expr::Binary(Box::new(Binary {
                    lhs,
                    op: binary.op,
                    rhs,
                })),
            }
        }
        Expr::MethodCall(call) => {
            let receiver = call.receiver.as_ref().map(fold).transpose()?;
            let args = call.args.iter().map(fold).collect::<Result<Vec<_>, _>>()?;
            let constant = receiver.iter().chain(args.iter()).all(is_constant);
            let call = MethodCall {
                receiver,
                name: call.name.clone(),
                args,
            };
            if constant {
                Expr::Constant(invoke(&call)?)
            } else {
                Expr::MethodCall(Box::new(call))
            }
        }
        Expr::NewArray(elements) => {
            let elements = elements.iter().map(fold).collect::<Result<Vec<_>, _>>()?;
            if elements.iter().all(is_constant) {
                Expr::Constant(Value::List(
                    elements.into_iter().filter_map(into_constant).collect(),
                ))
            } else {
                Expr::NewArray(elements)
            }
        }
    };
    Ok(folded)
}

fn is_constant(expr: &Expr) -> bool {
    matches!(expr, Expr::Constant(_))
}

fn into_constant(expr: Expr) -> Option<Value> {
    match expr {
        Expr::Constant(value) => Some(value),
        _ => None,
    }
}

fn read_path(mut current: Value, segments: &[Segment]) -> Result<Value, EvalError> {
    let mut path = String::new();
    for segment in segments {
        match segment {
            Segment::Field(name) => {
                if !path.is_empty() {
                    path.push('.');
                }
                path.push_str(name);
                current = match current {
                    Value::Null => return Err(EvalError::NullReference(SmolStr::new(&path))),
                    Value::Record(mut fields) => fields
                        .swap_remove(name)
                        .ok_or_else(|| EvalError::UnknownField(SmolStr::new(&path)))?,
                    _ => return Err(EvalError::UnknownField(SmolStr::new(&path))),
                };
            }
            Segment::Unwrap => {
                if current.is_null() {
                    return Err(EvalError::MissingValue(SmolStr::new(&path)));
                }
            }
        }
    }
    Ok(current)
}

fn apply(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    let mismatch = |lhs: &Value, rhs: &Value| EvalError::TypeMismatch {
        op: op.symbol(),
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    };

    match op {
        BinaryOp::And | BinaryOp::Or => match (&lhs, &rhs) {
            (Value::Bool(l), Value::Bool(r)) if op == BinaryOp::And => Ok(Value::Bool(*l && *r)),
            (Value::Bool(l), Value::Bool(r)) => Ok(Value::Bool(*l || *r)),
            _ => Err(mismatch(&lhs, &rhs)),
        },
        BinaryOp::Eq => Ok(Value::Bool(equals(&lhs, &rhs))),
        BinaryOp::NotEq => Ok(Value::Bool(!equals(&lhs, &rhs))),
        BinaryOp::Gt | BinaryOp::Gte | BinaryOp::Lt | BinaryOp::Lte => {
            // lifted comparisons are false as soon as a side is null
            if lhs.is_null() || rhs.is_null() {
                return Ok(Value::Bool(false));
            }
            let ordering = compare(&lhs, &rhs).ok_or_else(|| mismatch(&lhs, &rhs))?;
            Ok(Value::Bool(match op {
                BinaryOp::Gt => ordering == Ordering::Greater,
                BinaryOp::Gte => ordering != Ordering::Less,
                BinaryOp::Lt => ordering == Ordering::Less,
                _ => ordering != Ordering::Greater,
            }))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            if lhs.is_null() || rhs.is_null() {
                return Ok(Value::Null);
            }
            if op == BinaryOp::Add {
                if let (Some(l), Some(r)) = (lhs.as_text(), rhs.as_text()) {
                    return Ok(Value::String(format_smolstr!("{l}{r}")));
                }
            }
            arithmetic(op, &lhs, &rhs).ok_or_else(|| mismatch(&lhs, &rhs))?
        }
    }
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Option<Result<Value, EvalError>> {
    if let (Some(l), Some(r)) = (lhs.as_integer(), rhs.as_integer()) {
        let result = match op {
            BinaryOp::Add => l.checked_add(r),
            BinaryOp::Sub => l.checked_sub(r),
            BinaryOp::Mul => l.checked_mul(r),
            _ if r == 0 => return Some(Err(EvalError::DivideByZero)),
            _ => l.checked_div(r),
        };
        let narrowed = result.and_then(|n| narrow(lhs, rhs, n));
        return Some(narrowed.ok_or(EvalError::Overflow(op.symbol())));
    }

    let (l, r) = (lhs.as_float()?, rhs.as_float()?);
    let result = match op {
        BinaryOp::Add => l + r,
        BinaryOp::Sub => l - r,
        BinaryOp::Mul => l * r,
        _ => l / r,
    };
    Some(Ok(match (lhs, rhs) {
        (Value::F32(_), Value::F32(_)) => Value::F32(result as f32),
        _ => Value::F64(result),
    }))
}

// same integer type keeps its type, mixed widths widen to i64
fn narrow(lhs: &Value, rhs: &Value, n: i128) -> Option<Value> {
    if std::mem::discriminant(lhs) != std::mem::discriminant(rhs) {
        return i64::try_from(n).ok().map(Value::I64);
    }
    match lhs {
        Value::I8(_) => i8::try_from(n).ok().map(Value::I8),
        Value::I16(_) => i16::try_from(n).ok().map(Value::I16),
        Value::I32(_) => i32::try_from(n).ok().map(Value::I32),
        Value::I64(_) => i64::try_from(n).ok().map(Value::I64),
        Value::U8(_) => u8::try_from(n).ok().map(Value::U8),
        Value::U16(_) => u16::try_from(n).ok().map(Value::U16),
        Value::U32(_) => u32::try_from(n).ok().map(Value::U32),
        Value::U64(_) => u64::try_from(n).ok().map(Value::U64),
        _ => None,
    }
}

pub(crate) fn equals(lhs: &Value, rhs: &Value) -> bool {
    if let (Some(l), Some(r)) = (lhs.as_integer(), rhs.as_integer()) {
        return l == r;
    }
    if let (Some(l), Some(r)) = (lhs.as_float(), rhs.as_float()) {
        return l == r;
    }
    if let (Some(l), Some(r)) = (lhs.as_text(), rhs.as_text()) {
        return l == r;
    }
    lhs == rhs
}

fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    if let (Some(l), Some(r)) = (lhs.as_integer(), rhs.as_integer()) {
        return Some(l.cmp(&r));
    }
    if let (Some(l), Some(r)) = (lhs.as_float(), rhs.as_float()) {
        return l.partial_cmp(&r);
    }
    if let (Some(l), Some(r)) = (lhs.as_text(), rhs.as_text()) {
        return Some(l.cmp(&r));
    }
    match (lhs, rhs) {
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        #[cfg(feature = "chrono")]
        (Value::Date(l), Value::Date(r)) => Some(l.cmp(r)),
        #[cfg(feature = "chrono")]
        (Value::DateTime(l), Value::DateTime(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

fn invoke(call: &MethodCall) -> Result<Value, EvalError> {
    let not_evaluable = || EvalError::NotEvaluable(call.name.clone());
    let method = call.method().ok_or_else(not_evaluable)?;
    let (receiver, args) = call.split().ok_or_else(not_evaluable)?;
    let (Expr::Constant(receiver), [Expr::Constant(arg)]) = (receiver, args) else {
        return Err(not_evaluable());
    };
    if receiver.is_null() {
        return Err(EvalError::NullReference(call.name.clone()));
    }

    let text = |op: fn(&str, &str) -> bool| match (receiver.as_text(), arg.as_text()) {
        (Some(l), Some(r)) => Ok(Value::Bool(op(&l, &r))),
        _ => Err(EvalError::TypeMismatch {
            op: method.name(),
            lhs: receiver.type_name(),
            rhs: arg.type_name(),
        }),
    };
    let contains = |list: &Value, item: &Value| match list {
        Value::List(items) => Ok(items.iter().any(|candidate| equals(candidate, item))),
        other => Err(EvalError::TypeMismatch {
            op: method.name(),
            lhs: receiver.type_name(),
            rhs: other.type_name(),
        }),
    };

    match method {
        Method::StartsWith => text(|l, r| l.starts_with(r)),
        Method::EndsWith => text(|l, r| l.ends_with(r)),
        Method::Contains if matches!(receiver, Value::List(_)) => {
            contains(receiver, arg).map(Value::Bool)
        }
        Method::Contains => text(|l, r| l.contains(r)),
        Method::Equals => Ok(Value::Bool(equals(receiver, arg))),
        Method::In => contains(arg, receiver).map(Value::Bool),
        Method::NotIn => contains(arg, receiver).map(|found| Value::Bool(!found)),
        Method::Like | Method::NotLike => Err(not_evaluable()),
    }
}

#[cfg(test)]
mod tests {
    use crate::{captured, field, null, val};

    use super::*;

    #[test]
    fn test_captured_folds_to_constant() {
        let name = "null";
        let expr = field("Name")
            .ne(captured("name", move || Value::String(name.into())))
            .partial_eval()
            .unwrap();
        assert_eq!(field("Name").ne("null"), expr);
    }

    #[test]
    fn test_model_member_is_kept() {
        let expr = field("a.Age").unwrap_value().gt(1).partial_eval().unwrap();
        assert_eq!(field("a.Age").unwrap_value().gt(1), expr);
    }

    #[test]
    fn test_captured_record_member() {
        let test = captured("test", || Value::record([("Age", Some(1))]));
        let expr = field("a.Age")
            .unwrap_value()
            .ne(test.member("Age").unwrap_value())
            .partial_eval()
            .unwrap();
        assert_eq!(field("a.Age").unwrap_value().ne(Value::I32(1)), expr);
    }

    #[test]
    fn test_null_dereference_propagates() {
        let test = captured("test", || Value::Null);
        let err = field("Age").eq(test.member("Age")).partial_eval().unwrap_err();
        assert_eq!(EvalError::NullReference("Age".into()), err);
    }

    #[test]
    fn test_unwrap_of_absent_value() {
        let test = captured("test", || Value::record([("Age", None::<i32>)]));
        let err = field("Age")
            .eq(test.member("Age").unwrap_value())
            .partial_eval()
            .unwrap_err();
        assert_eq!(EvalError::MissingValue("Age".into()), err);
    }

    #[test]
    fn test_arithmetic_folding() {
        let expr = field("Id").gt(val(2).add(3).mul(2)).partial_eval().unwrap();
        assert_eq!(field("Id").gt(Value::I32(10)), expr);

        let expr = val(1i64).add(2i32).partial_eval().unwrap();
        assert_eq!(val(3i64), expr);

        let err = val(1).div(0).partial_eval().unwrap_err();
        assert_eq!(EvalError::DivideByZero, err);

        let err = val(i32::MAX).add(1).partial_eval().unwrap_err();
        assert_eq!(EvalError::Overflow("+"), err);
    }

    #[test]
    fn test_constant_null_comparison_stays_for_compiler() {
        let expr = field("Name").eq(null()).partial_eval().unwrap();
        assert_eq!(field("Name").eq(null()), expr);
        let expr = null().eq(null()).partial_eval().unwrap();
        assert_eq!(val(true), expr);
    }

    #[test]
    fn test_array_folds_to_list() {
        let expr = Expr::array([val(1), Expr::unary(val(2))])
            .partial_eval()
            .unwrap();
        assert_eq!(val(vec![1, 2]), expr);

        let expr = Expr::array([val(1), field("Id")]).partial_eval().unwrap();
        assert_eq!(Expr::array([val(1), field("Id")]), expr);
    }

    #[test]
    fn test_constant_method_calls() {
        assert_eq!(
            val(true),
            val("test").starts_with("te").partial_eval().unwrap()
        );
        assert_eq!(val(false), val(3).is_in([1, 2]).partial_eval().unwrap());
        assert_eq!(val(true), val(3).not_in([1, 2]).partial_eval().unwrap());
        assert!(matches!(
            val("a").like("a%").partial_eval(),
            Err(EvalError::NotEvaluable(_))
        ));
    }

    #[test]
    fn test_string_concat() {
        let expr = field("Name")
            .eq(val("a").add(captured("b", || Value::Char('b'))))
            .partial_eval()
            .unwrap();
        assert_eq!(field("Name").eq("ab"), expr);
    }
}
