#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    SqlServer,
    Access,
    MySql,
    Oracle,
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Whether member paths render as lower-cased, quoted identifiers.
    pub const fn quotes_identifiers(self) -> bool {
        matches!(self, Dialect::Postgres | Dialect::Oracle)
    }

    /// Token spliced around the argument of a generated `LIKE` pattern.
    pub const fn like_concat(self) -> &'static str {
        match self {
            Dialect::Postgres | Dialect::Oracle | Dialect::MySql | Dialect::Sqlite => "||",
            Dialect::SqlServer | Dialect::Access => "+",
        }
    }
}

pub trait HasDialect {
    const DIALECT: Dialect;
}

pub struct Postgres;

impl HasDialect for Postgres {
    const DIALECT: Dialect = Dialect::Postgres;
}

pub struct MySql;

impl HasDialect for MySql {
    const DIALECT: Dialect = Dialect::MySql;
}

pub struct Sqlite;

impl HasDialect for Sqlite {
    const DIALECT: Dialect = Dialect::Sqlite;
}

pub struct Oracle;

impl HasDialect for Oracle {
    const DIALECT: Dialect = Dialect::Oracle;
}

pub struct SqlServer;

impl HasDialect for SqlServer {
    const DIALECT: Dialect = Dialect::SqlServer;
}

pub struct Access;

impl HasDialect for Access {
    const DIALECT: Dialect = Dialect::Access;
}

#[cfg(feature = "postgres")]
impl HasDialect for sqlx::Postgres {
    const DIALECT: Dialect = Dialect::Postgres;
}

#[cfg(feature = "mysql")]
impl HasDialect for sqlx::MySql {
    const DIALECT: Dialect = Dialect::MySql;
}

#[cfg(feature = "sqlite")]
impl HasDialect for sqlx::Sqlite {
    const DIALECT: Dialect = Dialect::Sqlite;
}
