use std::{
    fmt,
    ops::{Deref, DerefMut},
};

use smol_str::SmolStr;

use crate::{
    builder::WhereBuilder,
    col::{ColumnSchema, TableSchema},
    options::ConnectionOptions,
    sql::{NamedParameters, ParamNames, ParameterFactory},
    value::Array,
};

/// A query whose text can be spliced into another statement's filter.
pub trait NestedQuery {
    type Param;

    fn command_text(&mut self) -> String;

    /// Replaces the projected fields, `EXISTS` forms project `1`.
    fn set_fields(&mut self, fields: &str);

    fn take_parameters(&mut self) -> Vec<Self::Param>;

    /// The query selects no rows whatever its text says.
    fn is_always_empty(&self) -> bool;
}

/// `SELECT fields FROM table WHERE ...`, filtered through a [`WhereBuilder`].
pub struct Select<F: ParameterFactory = NamedParameters> {
    query: String,
    table: SmolStr,
    fields: Array<SmolStr>,
    filter: WhereBuilder<F>,
}

impl<F: ParameterFactory> Select<F> {
    pub fn table<T: Into<SmolStr>>(options: ConnectionOptions<F>, table: T) -> Self {
        let names = options.names();
        Self::with_names(options, names, table.into())
    }

    pub fn table_as<T: TableSchema>(options: ConnectionOptions<F>) -> Self {
        Self::table(options, T::table())
    }

    pub(crate) fn with_names(options: ConnectionOptions<F>, names: ParamNames, table: SmolStr) -> Self {
        Self {
            query: String::new(),
            table,
            fields: Array::None,
            filter: WhereBuilder::with_names(options, names),
        }
    }

    pub fn select<I>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<SmolStr>,
    {
        self.fields.reset();
        self.add_select(fields)
    }

    pub fn add_select<I>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<SmolStr>,
    {
        for field in fields {
            self.fields.append(Array::One(field.into()));
        }
        self
    }

    pub fn select_as<T: ColumnSchema>(&mut self) -> &mut Self {
        self.fields = T::columns();
        self
    }

    pub fn reset_select(&mut self) -> &mut Self {
        self.fields.reset();
        self
    }

    pub fn to_sql(&mut self) -> &str {
        let mut str = String::with_capacity(64);
        str.push_str("SELECT ");
        if self.fields.is_empty() {
            str.push('*');
        }
        for (index, field) in self.fields.iter().enumerate() {
            if index > 0 {
                str.push_str(", ");
            }
            str.push_str(field);
        }
        str.push_str(" FROM ");
        str.push_str(&self.table);
        let clause = self.filter.where_clause();
        if !clause.is_empty() {
            str.push(' ');
            str.push_str(&clause);
        }
        self.query = str;
        self.query.as_str()
    }

    pub fn into_filter(self) -> WhereBuilder<F> {
        self.filter
    }
}

impl<F> fmt::Debug for Select<F>
where
    F: ParameterFactory + fmt::Debug,
    F::Param: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Select")
            .field("table", &self.table)
            .field("fields", &self.fields)
            .field("filter", &self.filter)
            .finish()
    }
}

impl<F: ParameterFactory> Deref for Select<F> {
    type Target = WhereBuilder<F>;

    fn deref(&self) -> &Self::Target {
        &self.filter
    }
}

impl<F: ParameterFactory> DerefMut for Select<F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.filter
    }
}

impl<F: ParameterFactory> NestedQuery for Select<F> {
    type Param = F::Param;

    fn command_text(&mut self) -> String {
        self.to_sql().to_owned()
    }

    fn set_fields(&mut self, fields: &str) {
        self.fields = Array::One(SmolStr::new(fields));
    }

    fn take_parameters(&mut self) -> Vec<F::Param> {
        self.filter.take_parameters()
    }

    fn is_always_empty(&self) -> bool {
        self.filter.is_always_empty()
    }
}
