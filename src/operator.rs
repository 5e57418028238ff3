use qwhere_derive::{BinaryOperator, MethodOperator};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BinaryOperator)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    #[binary(method = "ne")]
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Gt => ">",
            BinaryOp::Gte => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::Lte => "<=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }

    /// Operator used once one side of the comparison is `NULL`.
    pub fn null_symbol(self) -> Result<&'static str> {
        match self {
            BinaryOp::Eq => Ok("IS NULL"),
            BinaryOp::NotEq => Ok("IS NOT NULL"),
            other => Err(Error::unsupported(smol_str::format_smolstr!(
                "`{}` against NULL",
                other.symbol()
            ))),
        }
    }

    /// Boolean connectives are always emitted as their own group.
    pub const fn is_grouping(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub const fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, MethodOperator)]
pub enum Method {
    StartsWith,
    EndsWith,
    Contains,
    Like,
    NotLike,
    #[method(rename = "is_in")]
    In,
    NotIn,
    Equals,
}

impl Method {
    /// `LIKE` pattern wrapped around the argument, split at the argument.
    pub(crate) const fn wildcards(self) -> Option<(&'static str, &'static str)> {
        match self {
            Method::StartsWith => Some(("''", "'%'")),
            Method::EndsWith => Some(("'%'", "''")),
            Method::Contains => Some(("'%'", "'%'")),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols() {
        assert_eq!("<>", BinaryOp::NotEq.symbol());
        assert_eq!(">=", BinaryOp::Gte.symbol());
        assert_eq!("AND", BinaryOp::And.symbol());
    }

    #[test]
    fn test_null_symbol() {
        assert_eq!(Ok("IS NULL"), BinaryOp::Eq.null_symbol());
        assert_eq!(Ok("IS NOT NULL"), BinaryOp::NotEq.null_symbol());
        assert!(matches!(
            BinaryOp::Gt.null_symbol(),
            Err(Error::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_method_names() {
        assert_eq!("StartsWith", Method::StartsWith.name());
        assert_eq!(Some(Method::NotIn), Method::from_name("NotIn"));
        assert_eq!(None, Method::from_name("Trim"));
    }
}
