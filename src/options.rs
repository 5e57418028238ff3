use smol_str::SmolStr;

use crate::{
    dialect::{Dialect, HasDialect},
    sql::{NamedParameters, ParamNames},
};

/// What a statement needs to know about the connection it will run on.
#[derive(Debug, Clone)]
pub struct ConnectionOptions<F = NamedParameters> {
    pub(crate) dialect: Dialect,
    pub(crate) marker: SmolStr,
    pub(crate) prefix: SmolStr,
    pub(crate) factory: F,
}

impl ConnectionOptions {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            marker: SmolStr::new_static("@"),
            prefix: SmolStr::new_static("p"),
            factory: NamedParameters,
        }
    }

    pub fn of<D: HasDialect>() -> Self {
        Self::new(D::DIALECT)
    }
}

impl<F> ConnectionOptions<F> {
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Token written before a parameter name, `@` by default.
    pub fn with_marker<T: Into<SmolStr>>(mut self, marker: T) -> Self {
        self.marker = marker.into();
        self
    }

    pub fn with_prefix<T: Into<SmolStr>>(mut self, prefix: T) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_factory<G>(self, factory: G) -> ConnectionOptions<G> {
        ConnectionOptions {
            dialect: self.dialect,
            marker: self.marker,
            prefix: self.prefix,
            factory,
        }
    }

    /// A fresh name sequence for one statement.
    pub fn names(&self) -> ParamNames {
        ParamNames::new(self.prefix.clone())
    }
}

#[cfg(test)]
mod tests {
    use crate::dialect::Sqlite;

    use super::*;

    #[test]
    fn test_defaults() {
        let options = ConnectionOptions::of::<Sqlite>();
        assert_eq!(Dialect::Sqlite, options.dialect());
        assert_eq!("@", options.marker());
        assert_eq!("p0", options.names().next_name());
    }

    #[test]
    fn test_overrides() {
        let options = ConnectionOptions::new(Dialect::Oracle)
            .with_marker(":")
            .with_prefix("arg")
            .with_factory(|name: SmolStr, _: crate::value::Value| name);
        assert_eq!(":", options.marker());
        assert_eq!("arg0", options.names().next_name());
    }
}
