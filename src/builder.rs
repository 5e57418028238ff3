use smol_str::{SmolStr, format_smolstr};

use crate::{
    compile::{Compiled, Compiler},
    error::{Error, Result},
    expr::IntoExpr,
    fragments::Fragments,
    member::IntoMember,
    options::ConnectionOptions,
    select::{NestedQuery, Select},
    sql::{NamedParameters, ParamNames, ParameterFactory},
    template,
    value::{IntoValues, Value},
    writer::{FormatContext, FormatWriter},
};

/// The accumulated condition of a query, consumed by whatever executes it.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause<P> {
    /// AND-joined condition without the `WHERE` keyword, empty when unfiltered.
    pub condition: String,
    pub parameters: Vec<P>,
    /// Set by [`WhereBuilder::where_any_or_default`], the query selects no rows.
    pub always_empty: bool,
}

/// Collects filters into one `WHERE` clause and the parameters it binds.
#[derive(Debug, Clone)]
pub struct WhereBuilder<F: ParameterFactory = NamedParameters> {
    query: String,
    options: ConnectionOptions<F>,
    names: ParamNames,
    fragments: Fragments,
    parameters: Vec<F::Param>,
    always_empty: bool,
}

impl<F: ParameterFactory> WhereBuilder<F> {
    pub fn new(options: ConnectionOptions<F>) -> Self {
        let names = options.names();
        Self::with_names(options, names)
    }

    pub(crate) fn with_names(options: ConnectionOptions<F>, names: ParamNames) -> Self {
        Self {
            query: String::new(),
            options,
            names,
            fragments: Fragments::default(),
            parameters: Vec::new(),
            always_empty: false,
        }
    }

    /// A query over `table` sharing this builder's options and name sequence,
    /// for use with the `IN` and `EXISTS` filters.
    pub fn nested<T: Into<SmolStr>>(&self, table: T) -> Select<F>
    where
        F: Clone,
    {
        Select::with_names(self.options.clone(), self.names.clone(), table.into())
    }

    fn compiler(&self) -> Compiler {
        Compiler::new(self.options.dialect)
    }

    fn bind(&mut self, compiled: Compiled) -> Result<String> {
        let bound = compiled.bind(&self.options.marker, &self.names, &mut self.options.factory)?;
        self.parameters.extend(bound.parameters);
        Ok(bound.command_text)
    }

    fn column<M: IntoMember>(&self, field: M) -> Result<String> {
        let member = field.into_member();
        let mut text = String::new();
        member
            .format_writer(&mut FormatContext::new(&mut text, self.options.dialect))
            .map_err(|_| {
                Error::unsupported(format_smolstr!("`{}` is not a model field", member.path()))
            })?;
        Ok(text)
    }

    // where stuff

    /// Compiles `predicate` and appends it in bound form.
    ///
    /// A predicate that folds to `false` selects nothing, see
    /// [`is_always_empty`](Self::is_always_empty).
    pub fn where_expr<E: IntoExpr>(&mut self, predicate: E) -> Result<&mut Self> {
        let compiled = match self.compiler().compile(&predicate.into_expr()) {
            Err(Error::ContradictoryPredicate) => {
                self.never_matches("predicate is always false");
                return Ok(self);
            }
            compiled => compiled?,
        };
        let sql = self.bind(compiled)?;
        self.fragments.push(&sql);
        Ok(self)
    }

    /// Appends caller-authored sql as a single term.
    pub fn where_raw<T: AsRef<str>>(&mut self, sql: T) -> Result<&mut Self> {
        let sql = sql.as_ref().trim();
        if sql.is_empty() {
            return Err(Error::EmptyPredicate);
        }
        self.fragments.push(sql);
        Ok(self)
    }

    /// Appends a template with `{0}`, `{1}`, ... placeholders.
    ///
    /// A NULL value turns `= {i}` into `IS NULL` and `<> {i}` into
    /// `IS NOT NULL`, and drops any `[ ... ]` section that mentions it. Other
    /// values are bound as parameters. Nothing is appended when the rewrite
    /// leaves the template empty.
    pub fn where_fmt<V: IntoValues>(&mut self, template: &str, values: V) -> Result<&mut Self> {
        if template.trim().is_empty() {
            return Err(Error::EmptyPredicate);
        }
        let values = values.into_values();
        let Self {
            options,
            names,
            parameters,
            ..
        } = &mut *self;
        let rendered = template::render_raw(template, &values, |_, value| {
            let name = names.next_name();
            let placeholder = format_smolstr!("{}{name}", options.marker);
            parameters.push(options.factory.create(name, value.clone()));
            placeholder
        })?;
        if let Some(sql) = rendered {
            self.fragments.push(&sql);
        }
        Ok(self)
    }

    /// Runs `apply` only when `condition` holds.
    pub fn when<A>(&mut self, condition: bool, apply: A) -> Result<&mut Self>
    where
        A: FnOnce(&mut Self) -> Result<&mut Self>,
    {
        if condition {
            apply(self)?;
        }
        Ok(self)
    }

    /// `field = @p` for one value, `field = ANY(@p)` with the values bound as
    /// one array otherwise.
    pub fn where_any<M, V>(&mut self, field: M, values: V) -> Result<&mut Self>
    where
        M: IntoMember,
        V: IntoValues,
    {
        self.any(field, values.into_values(), "=", "ANY")
    }

    /// `field <> @p` for one value, `field <> ALL(@p)` otherwise.
    pub fn where_not_any<M, V>(&mut self, field: M, values: V) -> Result<&mut Self>
    where
        M: IntoMember,
        V: IntoValues,
    {
        self.any(field, values.into_values(), "<>", "ALL")
    }

    /// Like [`where_any`](Self::where_any), except that no values marks the
    /// whole query as selecting nothing instead of failing.
    pub fn where_any_or_default<M, V>(&mut self, field: M, values: V) -> Result<&mut Self>
    where
        M: IntoMember,
        V: IntoValues,
    {
        let values = values.into_values();
        if values.is_empty() {
            let member = field.into_member();
            tracing::warn!(field = %member.path(), "no candidate values, query selects nothing");
            self.always_empty = true;
            return Ok(self);
        }
        self.any(field, values, "=", "ANY")
    }

    fn any<M: IntoMember>(
        &mut self,
        field: M,
        mut values: Vec<Value>,
        op: &str,
        quantifier: &str,
    ) -> Result<&mut Self> {
        let member = field.into_member();
        if values.is_empty() {
            return Err(Error::EmptyCollection(member.path()));
        }
        let column = self.column(member)?;
        let (template, value) = match values.len() {
            1 => (format!("{column} {op} {{0}}"), values.remove(0)),
            _ => (format!("{column} {op} {quantifier}({{0}})"), Value::List(values)),
        };
        let sql = self.bind(Compiled {
            template,
            arguments: vec![value],
        })?;
        self.fragments.push(&sql);
        Ok(self)
    }

    pub fn where_in<M, Q>(&mut self, field: M, query: Q) -> Result<&mut Self>
    where
        M: IntoMember,
        Q: NestedQuery<Param = F::Param>,
    {
        let column = self.column(field)?;
        self.nested_query("IN", Some(column), query)
    }

    pub fn where_not_in<M, Q>(&mut self, field: M, query: Q) -> Result<&mut Self>
    where
        M: IntoMember,
        Q: NestedQuery<Param = F::Param>,
    {
        let column = self.column(field)?;
        self.nested_query("NOT IN", Some(column), query)
    }

    pub fn where_exists<Q>(&mut self, query: Q) -> Result<&mut Self>
    where
        Q: NestedQuery<Param = F::Param>,
    {
        self.nested_query("EXISTS", None, query)
    }

    pub fn where_not_exists<Q>(&mut self, query: Q) -> Result<&mut Self>
    where
        Q: NestedQuery<Param = F::Param>,
    {
        self.nested_query("NOT EXISTS", None, query)
    }

    fn nested_query<Q>(&mut self, keyword: &str, column: Option<String>, mut query: Q) -> Result<&mut Self>
    where
        Q: NestedQuery<Param = F::Param>,
    {
        if query.is_always_empty() {
            // NOT IN / NOT EXISTS over no rows always holds
            if !keyword.starts_with("NOT") {
                self.never_matches("nested query selects nothing");
            }
            return Ok(self);
        }
        if column.is_none() {
            query.set_fields("1");
        }
        let text = query.command_text();
        self.parameters.extend(query.take_parameters());
        let sql = match column {
            Some(column) => format!("{column} {keyword} ({text})"),
            None => format!("{keyword} ({text})"),
        };
        self.fragments.push(&sql);
        Ok(self)
    }

    /// Membership of 2 to 4 column key tuples, one OR-joined term of
    /// per-row equalities.
    pub fn where_keys<C, I, R, const N: usize>(&mut self, columns: [C; N], rows: I) -> Result<&mut Self>
    where
        C: IntoMember,
        I: IntoIterator<Item = R>,
        R: IntoValues,
    {
        if !(2..=4).contains(&N) {
            return Err(Error::unsupported(format_smolstr!("key tuples of {N} columns")));
        }
        let columns = columns
            .into_iter()
            .map(|column| self.column(column))
            .collect::<Result<Vec<_>>>()?;

        let mut groups = Vec::new();
        let mut arguments = Vec::new();
        for row in rows {
            let row = row.into_values();
            if row.len() != N {
                return Err(Error::ArgumentCountMismatch {
                    expected: N,
                    found: row.len(),
                });
            }
            let terms = columns
                .iter()
                .zip(row)
                .map(|(column, value)| {
                    if value.is_null() {
                        return format!("{column} IS NULL");
                    }
                    let term = format!("{column} = {{{}}}", arguments.len());
                    arguments.push(value);
                    term
                })
                .collect::<Vec<_>>();
            groups.push(format!("({})", terms.join(" AND ")));
        }
        if groups.is_empty() {
            return Err(Error::EmptyCollection(format_smolstr!(
                "{}",
                columns.join(", ")
            )));
        }

        let sql = self.bind(Compiled {
            template: groups.join(" OR "),
            arguments,
        })?;
        self.fragments.push(&sql);
        Ok(self)
    }

    /// Records a term no row satisfies. Inside an OR group it becomes a false
    /// alternative, otherwise the whole query selects nothing.
    fn never_matches(&mut self, reason: &str) {
        if self.fragments.is_collecting() {
            tracing::debug!(reason, "false alternative in or group");
            self.fragments.push("1 = 0");
        } else {
            tracing::warn!(reason, "query selects nothing");
            self.always_empty = true;
        }
    }

    /// Subsequent filters are OR-joined until [`end_or`](Self::end_or).
    pub fn start_or(&mut self) -> &mut Self {
        self.fragments.start_or();
        self
    }

    pub fn end_or(&mut self) -> &mut Self {
        self.fragments.end_or();
        self
    }

    // building the builder

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn is_always_empty(&self) -> bool {
        self.always_empty
    }

    pub fn params(&self) -> &[F::Param] {
        &self.parameters
    }

    pub fn dialect(&self) -> crate::dialect::Dialect {
        self.options.dialect
    }

    /// The AND-joined condition, without the `WHERE` keyword.
    pub fn to_sql(&mut self) -> &str {
        if self.fragments.has_pending_or() {
            tracing::warn!("rendering with an open or group");
        }
        let mut str = String::with_capacity(64);
        let mut context = FormatContext::new(&mut str, self.options.dialect);
        self.fragments
            .format_writer(&mut context)
            .expect("should not fail on a string writer");
        self.query = str;
        self.query.as_str()
    }

    /// `WHERE ...`, or nothing when no filter was added.
    pub fn where_clause(&mut self) -> String {
        let condition = self.to_sql();
        if condition.is_empty() {
            String::new()
        } else {
            format!("WHERE {condition}")
        }
    }

    pub(crate) fn take_parameters(&mut self) -> Vec<F::Param> {
        std::mem::take(&mut self.parameters)
    }

    pub fn build(mut self) -> WhereClause<F::Param> {
        self.to_sql();
        WhereClause {
            condition: self.query,
            parameters: self.parameters,
            always_empty: self.always_empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        dialect::{Dialect, Postgres},
        field,
        sql::Parameter,
    };

    use super::*;

    fn builder(dialect: Dialect) -> WhereBuilder {
        WhereBuilder::new(ConnectionOptions::new(dialect))
    }

    fn values(builder: &WhereBuilder) -> Vec<Value> {
        builder.params().iter().map(|p| p.value.clone()).collect()
    }

    #[test]
    fn test_where_expr_binds() {
        let mut b = WhereBuilder::new(ConnectionOptions::of::<Postgres>());
        b.where_expr(field("Name").starts_with("test").and(field("Id").gt(2)))
            .unwrap();
        assert_eq!(
            "(((\"Name\" LIKE ''||@p0||'%') AND \"Id\" > @p1))",
            b.to_sql()
        );
        assert_eq!(
            vec![Value::String("test".into()), Value::I32(2)],
            values(&b)
        );
        assert_eq!("p0", b.params()[0].name);
    }

    #[test]
    fn test_fragments_and_joined() {
        let mut b = builder(Dialect::MySql);
        b.where_expr(field("a").eq(1))
            .unwrap()
            .where_expr(field("b").eq(None::<i32>))
            .unwrap();
        assert_eq!("WHERE (a = @p0) AND (b IS NULL)", b.where_clause());
        assert_eq!(vec![Value::I32(1)], values(&b));
    }

    #[test]
    fn test_empty_renders_nothing() {
        let mut b = builder(Dialect::MySql);
        assert_eq!("", b.to_sql());
        assert_eq!("", b.where_clause());
        assert!(b.is_empty());
    }

    #[test]
    fn test_or_group() {
        let mut b = builder(Dialect::MySql);
        b.where_raw("x = 1").unwrap();
        b.start_or();
        b.where_raw("a").unwrap().where_raw("b").unwrap();
        b.end_or();
        assert_eq!("(x = 1) AND ((a) OR (b))", b.to_sql());
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut b = builder(Dialect::Postgres);
        b.where_expr(field("Id").gt(1)).unwrap();
        b.start_or();
        b.where_expr(field("Id").lt(5)).unwrap();
        let first = b.to_sql().to_owned();
        let params = b.params().to_vec();
        assert_eq!(first, b.to_sql());
        assert_eq!(params, b.params());
    }

    #[test]
    fn test_where_fmt() {
        let mut b = builder(Dialect::MySql);
        b.where_fmt("a = {0}[ AND b = {1}] AND c <> {2}", (1, None::<i32>, None::<&str>))
            .unwrap();
        assert_eq!("(a = @p0 AND c IS NOT NULL)", b.to_sql());
        assert_eq!(vec![Value::I32(1)], values(&b));
    }

    #[test]
    fn test_where_fmt_errors() {
        let mut b = builder(Dialect::MySql);
        assert!(matches!(
            b.where_fmt("a = {0} AND b = {1}", (1,)),
            Err(Error::ArgumentCountMismatch { .. })
        ));
        assert!(matches!(
            b.where_fmt("a = {0}", (1, 2)),
            Err(Error::MissingPlaceholder { index: 1 })
        ));
        assert!(matches!(b.where_fmt("  ", ()), Err(Error::EmptyPredicate)));
        assert!(b.is_empty());
    }

    #[test]
    fn test_where_fmt_dropped_entirely() {
        let mut b = builder(Dialect::MySql);
        b.where_fmt("[a = {0}]", (None::<i32>,)).unwrap();
        assert!(b.is_empty());
        assert!(b.params().is_empty());
    }

    #[test]
    fn test_when() {
        let mut b = builder(Dialect::MySql);
        b.when(false, |b| b.where_raw("skipped"))
            .unwrap()
            .when(true, |b| b.where_expr(field("a").eq(1)))
            .unwrap();
        assert_eq!("(a = @p0)", b.to_sql());
    }

    #[test]
    fn test_where_any() {
        let mut b = builder(Dialect::Postgres);
        b.where_any("Id", [1]).unwrap();
        b.where_any("Id", vec![1, 2]).unwrap();
        b.where_not_any("Id", [3]).unwrap();
        b.where_not_any("Id", [3, 4]).unwrap();
        assert_eq!(
            "(\"Id\" = @p0) AND (\"Id\" = ANY(@p1)) AND (\"Id\" <> @p2) AND (\"Id\" <> ALL(@p3))",
            b.to_sql()
        );
        assert_eq!(
            vec![
                Value::I32(1),
                Value::List(vec![Value::I32(1), Value::I32(2)]),
                Value::I32(3),
                Value::List(vec![Value::I32(3), Value::I32(4)]),
            ],
            values(&b)
        );
    }

    #[test]
    fn test_where_any_empty() {
        let mut b = builder(Dialect::Postgres);
        assert_eq!(
            Some(Error::EmptyCollection("Id".into())),
            b.where_any("Id", Vec::<i32>::new()).err()
        );

        b.where_any_or_default("Id", Vec::<i32>::new()).unwrap();
        assert!(b.is_always_empty());
        b.where_expr(field("Name").eq("x")).unwrap();
        let clause = b.build();
        assert!(clause.always_empty);
        assert_eq!("(\"Name\" = @p0)", clause.condition);
    }

    #[test]
    fn test_where_keys() {
        let mut b = builder(Dialect::MySql);
        b.where_keys(["a", "b"], vec![(1, "x"), (2, "y")]).unwrap();
        assert_eq!("((a = @p0 AND b = @p1) OR (a = @p2 AND b = @p3))", b.to_sql());
        assert_eq!(4, b.params().len());
    }

    #[test]
    fn test_where_keys_in_or_group() {
        let mut b = builder(Dialect::MySql);
        b.start_or();
        b.where_raw("z").unwrap();
        b.where_keys(["a", "b", "c"], [(1, None::<i32>, 3)]).unwrap();
        b.end_or();
        assert_eq!("((z) OR ((a = @p0 AND b IS NULL AND c = @p1)))", b.to_sql());
    }

    #[test]
    fn test_where_keys_errors() {
        let mut b = builder(Dialect::MySql);
        assert!(matches!(
            b.where_keys(["a", "b"], Vec::<(i32, i32)>::new()),
            Err(Error::EmptyCollection(_))
        ));
        assert_eq!(
            Some(Error::ArgumentCountMismatch {
                expected: 2,
                found: 3
            }),
            b.where_keys(["a", "b"], [(1, 2, 3)]).err()
        );
        assert!(matches!(
            b.where_keys(["a"], [(1,)]),
            Err(Error::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_where_in_nested() {
        let mut b = builder(Dialect::MySql);
        b.where_expr(field("Age").gt(18)).unwrap();
        let mut orders = b.nested("orders");
        orders.select(["user_id"]);
        orders.where_expr(field("Total").gt(100)).unwrap();
        b.where_in("Id", orders).unwrap();
        assert_eq!(
            "(Age > @p0) AND (Id IN (SELECT user_id FROM orders WHERE (Total > @p1)))",
            b.to_sql()
        );
        assert_eq!(vec![Value::I32(18), Value::I32(100)], values(&b));
    }

    #[test]
    fn test_where_exists_forces_constant_projection() {
        let mut b = builder(Dialect::MySql);
        let mut orders = b.nested("orders");
        orders.where_raw("orders.user_id = users.id").unwrap();
        b.where_not_exists(orders).unwrap();
        assert_eq!(
            "(NOT EXISTS (SELECT 1 FROM orders WHERE (orders.user_id = users.id)))",
            b.to_sql()
        );
    }

    fn empty_orders(b: &WhereBuilder) -> Select {
        let mut orders = b.nested("orders");
        orders.select(["user_id"]);
        orders.where_any_or_default("Status", Vec::<i32>::new()).unwrap();
        orders
    }

    #[test]
    fn test_where_in_empty_nested() {
        let mut b = builder(Dialect::Postgres);
        let orders = empty_orders(&b);
        b.where_in("Id", orders).unwrap();
        let clause = b.build();
        assert!(clause.always_empty);
        assert_eq!("", clause.condition);
    }

    #[test]
    fn test_where_exists_empty_nested() {
        let mut b = builder(Dialect::Postgres);
        let orders = empty_orders(&b);
        b.where_exists(orders).unwrap();
        assert!(b.is_always_empty());
    }

    #[test]
    fn test_where_not_in_empty_nested() {
        let mut b = builder(Dialect::Postgres);
        b.where_expr(field("Age").gt(18)).unwrap();
        let mut orders = empty_orders(&b);
        orders.where_expr(field("Total").gt(100)).unwrap();
        b.where_not_in("Id", orders).unwrap();
        let clause = b.build();
        assert!(!clause.always_empty);
        assert_eq!("(\"Age\" > @p0)", clause.condition);
        assert_eq!(1, clause.parameters.len());
    }

    #[test]
    fn test_where_not_exists_empty_nested() {
        let mut b = builder(Dialect::Postgres);
        let orders = empty_orders(&b);
        b.where_not_exists(orders).unwrap();
        assert!(b.is_empty());
        assert!(!b.is_always_empty());
    }

    #[test]
    fn test_empty_nested_in_or_group() {
        let mut b = builder(Dialect::MySql);
        b.start_or();
        b.where_raw("a").unwrap();
        let orders = empty_orders(&b);
        b.where_in("Id", orders).unwrap();
        b.end_or();
        assert!(!b.is_always_empty());
        assert_eq!("((a) OR (1 = 0))", b.to_sql());
    }

    #[test]
    fn test_constant_predicates() {
        let mut b = builder(Dialect::SqlServer);
        assert_eq!(
            Some(Error::EmptyPredicate),
            b.where_expr(crate::val(1).eq(1)).err()
        );
        assert!(b.params().is_empty());

        b.where_expr(crate::val(1).eq(2)).unwrap();
        assert!(b.is_always_empty());
        assert!(b.is_empty());
        assert!(b.params().is_empty());
    }

    #[test]
    fn test_where_fmt_huge_placeholder() {
        let mut b = builder(Dialect::MySql);
        assert_eq!(
            Some(Error::ArgumentCountMismatch {
                expected: usize::MAX,
                found: 1
            }),
            b.where_fmt("a = {18446744073709551615}", (1,)).err()
        );
    }

    #[test]
    fn test_custom_factory() {
        let options = ConnectionOptions::new(Dialect::Sqlite)
            .with_marker(":")
            .with_factory(|name: SmolStr, value: Value| Parameter { name, value });
        let mut b = WhereBuilder::new(options);
        b.where_expr(field("a").eq(1)).unwrap();
        let clause = b.build();
        assert_eq!("(a = :p0)", clause.condition);
        assert_eq!("p0", clause.parameters[0].name);
    }
}
