//! The predicate tree handed to the compiler.
//!
//! Trees are plain data. A front-end can build them directly or through the
//! fluent combinators generated on [`Expr`] for every [`BinaryOp`] and
//! [`Method`]:
//!
//! ```
//! use qwhere::{field, captured, Value};
//!
//! let limit = 2;
//! let predicate = field("Name")
//!     .starts_with("test")
//!     .and(field("Id").gt(captured("limit", move || Value::I32(limit))));
//! # let _ = predicate;
//! ```

use std::{fmt, sync::Arc};

use smol_str::SmolStr;

use crate::{
    member::{Member, Segment},
    operator::{BinaryOp, Method},
    value::{IntoValue, Value},
};

pub(crate) mod eval;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Binary(Box<Binary>),
    Member(Member),
    /// A literal, `Value::Null` is the distinguished null.
    Constant(Value),
    Captured(Captured),
    MethodCall(Box<MethodCall>),
    /// Conversion or boxing wrapper, compiles to its operand.
    Unary(Box<Expr>),
    NewArray(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binary {
    pub(crate) lhs: Expr,
    pub(crate) op: BinaryOp,
    pub(crate) rhs: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    /// `None` for the extension form, where the first argument is the receiver.
    pub(crate) receiver: Option<Expr>,
    pub(crate) name: SmolStr,
    pub(crate) args: Vec<Expr>,
}

impl MethodCall {
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn method(&self) -> Option<Method> {
        Method::from_name(&self.name)
    }

    /// Receiver and remaining arguments, normalizing the extension form.
    pub(crate) fn split(&self) -> Option<(&Expr, &[Expr])> {
        match self.receiver {
            Some(ref receiver) => Some((receiver, self.args.as_slice())),
            None => self.args.split_first(),
        }
    }
}

/// A read of a variable that lives outside the predicate.
#[derive(Clone)]
pub struct Captured {
    name: SmolStr,
    read: Arc<dyn Fn() -> Value + Send + Sync>,
}

impl Captured {
    pub fn new<N, F>(name: N, read: F) -> Self
    where
        N: Into<SmolStr>,
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            read: Arc::new(read),
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn read(&self) -> Value {
        (self.read)()
    }
}

impl fmt::Debug for Captured {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Captured").field(&self.name).finish()
    }
}

impl PartialEq for Captured {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.read, &other.read)
    }
}

pub trait IntoExpr {
    fn into_expr(self) -> Expr;
}

impl IntoExpr for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

impl IntoExpr for Member {
    fn into_expr(self) -> Expr {
        Expr::Member(self)
    }
}

impl IntoExpr for Captured {
    fn into_expr(self) -> Expr {
        Expr::Captured(self)
    }
}

impl<T> IntoExpr for T
where
    T: IntoValue,
{
    fn into_expr(self) -> Expr {
        Expr::Constant(self.into_value())
    }
}

impl Expr {
    pub fn binary<L, R>(lhs: L, op: BinaryOp, rhs: R) -> Self
    where
        L: IntoExpr,
        R: IntoExpr,
    {
        Expr::Binary(Box::new(Binary {
            lhs: lhs.into_expr(),
            op,
            rhs: rhs.into_expr(),
        }))
    }

    /// Call `name` on `receiver`, names outside [`Method`] fail at compile time.
    pub fn call<R, N, A>(receiver: R, name: N, args: A) -> Self
    where
        R: IntoExpr,
        N: Into<SmolStr>,
        A: IntoIterator<Item = Expr>,
    {
        Expr::MethodCall(Box::new(MethodCall {
            receiver: Some(receiver.into_expr()),
            name: name.into(),
            args: args.into_iter().collect(),
        }))
    }

    pub fn static_call<N, A>(name: N, args: A) -> Self
    where
        N: Into<SmolStr>,
        A: IntoIterator<Item = Expr>,
    {
        Expr::MethodCall(Box::new(MethodCall {
            receiver: None,
            name: name.into(),
            args: args.into_iter().collect(),
        }))
    }

    pub fn unary<T: IntoExpr>(operand: T) -> Self {
        Expr::Unary(Box::new(operand.into_expr()))
    }

    pub fn array<I>(elements: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoExpr,
    {
        Expr::NewArray(elements.into_iter().map(IntoExpr::into_expr).collect())
    }

    /// Property read, extends a member path or reads from an object value.
    pub fn member<T: Into<SmolStr>>(self, name: T) -> Self {
        match self {
            Expr::Member(member) => Expr::Member(member.field(name)),
            other => Expr::Member(Member::of(other).field(name)),
        }
    }

    /// Optional unwrap, dropped when the path is rendered.
    pub fn unwrap_value(self) -> Self {
        match self {
            Expr::Member(member) => Expr::Member(member.unwrap_value()),
            other => Expr::Member(Member {
                root: crate::member::Root::Object(Box::new(other)),
                segments: vec![Segment::Unwrap],
            }),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Expr::Constant(Value::Null))
    }
}
