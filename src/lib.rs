mod builder;
mod col;
mod compile;
mod dialect;
mod error;
mod expr;
mod fragments;
mod member;
mod operator;
mod options;
mod select;
mod sql;
mod template;
mod value;
mod writer;

pub use builder::WhereBuilder;
pub use builder::WhereClause;

pub use col::ColumnSchema;
pub use col::TableSchema;

pub use compile::Compiled;
pub use compile::Compiler;

pub use dialect::Access;
pub use dialect::Dialect;
pub use dialect::HasDialect;
pub use dialect::MySql;
pub use dialect::Oracle;
pub use dialect::Postgres;
pub use dialect::SqlServer;
pub use dialect::Sqlite;

pub use error::Error;
pub use error::EvalError;
pub use error::Result;

pub use expr::Binary;
pub use expr::Captured;
pub use expr::Expr;
pub use expr::IntoExpr;
pub use expr::MethodCall;

pub use member::IntoMember;
pub use member::Member;
pub use member::Segment;

pub use operator::BinaryOp;
pub use operator::Method;

pub use options::ConnectionOptions;

pub use select::NestedQuery;
pub use select::Select;

pub use sql::Bound;
pub use sql::NamedParameters;
pub use sql::ParamNames;
pub use sql::Parameter;
pub use sql::ParameterFactory;
pub use sql::inline;

pub use value::Array;
pub use value::IntoValue;
pub use value::IntoValues;
pub use value::Value;

/// A field of the filtered model, `a.b` reads field `b` through alias `a`.
pub fn field<T: IntoMember>(path: T) -> Expr {
    Expr::Member(path.into_member())
}

pub fn val<T: IntoValue>(value: T) -> Expr {
    Expr::Constant(value.into_value())
}

pub fn null() -> Expr {
    Expr::Constant(Value::Null)
}

/// A variable read when the predicate is compiled.
pub fn captured<N, F>(name: N, read: F) -> Expr
where
    N: Into<smol_str::SmolStr>,
    F: Fn() -> Value + Send + Sync + 'static,
{
    Expr::Captured(Captured::new(name, read))
}
