use std::{
    borrow::Cow,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use smol_str::{SmolStr, format_smolstr};

use crate::{
    compile::Compiled,
    error::{Error, Result},
    template,
    value::Value,
};

/// The default parameter handle, a name and the value bound to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: SmolStr,
    pub value: Value,
}

/// Turns a generated name and a raw value into whatever the driver binds.
pub trait ParameterFactory {
    type Param;

    fn create(&mut self, name: SmolStr, value: Value) -> Self::Param;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NamedParameters;

impl ParameterFactory for NamedParameters {
    type Param = Parameter;

    fn create(&mut self, name: SmolStr, value: Value) -> Parameter {
        Parameter { name, value }
    }
}

impl<P, F> ParameterFactory for F
where
    F: FnMut(SmolStr, Value) -> P,
{
    type Param = P;

    fn create(&mut self, name: SmolStr, value: Value) -> P {
        self(name, value)
    }
}

/// Sequential parameter names, `p0`, `p1`, ... Clones share the counter so a
/// statement and the queries nested in it never hand out the same name.
#[derive(Debug, Clone)]
pub struct ParamNames {
    prefix: SmolStr,
    next: Arc<AtomicUsize>,
}

impl ParamNames {
    pub fn new<T: Into<SmolStr>>(prefix: T) -> Self {
        Self {
            prefix: prefix.into(),
            next: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn next_name(&self) -> SmolStr {
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        format_smolstr!("{}{index}", self.prefix)
    }
}

impl Default for ParamNames {
    fn default() -> Self {
        Self::new("p")
    }
}

/// Command text with named placeholders and the parameters they refer to.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound<P> {
    pub command_text: String,
    pub parameters: Vec<P>,
}

impl Compiled {
    /// Substitutes every argument as sql literal text.
    pub fn to_inline(&self) -> Result<String> {
        template::substitute(&self.template, self.arguments.len(), |index| {
            inline(&self.arguments[index])
        })
    }

    /// Creates one parameter per argument and rewrites `{N}` to
    /// `{marker}{name}`.
    pub fn bind<F>(self, marker: &str, names: &ParamNames, factory: &mut F) -> Result<Bound<F::Param>>
    where
        F: ParameterFactory + ?Sized,
    {
        let Compiled {
            template,
            arguments,
        } = self;

        let mut placeholders = Vec::with_capacity(arguments.len());
        let mut parameters = Vec::with_capacity(arguments.len());
        for value in arguments {
            let name = names.next_name();
            placeholders.push(format!("{marker}{name}"));
            parameters.push(factory.create(name, value));
        }

        let command_text = template::substitute(&template, placeholders.len(), |index| {
            Ok(Cow::Borrowed(placeholders[index].as_str()))
        })?;
        tracing::trace!(
            command = %command_text,
            parameters = parameters.len(),
            "bound predicate"
        );
        Ok(Bound {
            command_text,
            parameters,
        })
    }
}

/// Sql literal text for `value`.
pub fn inline(value: &Value) -> Result<Cow<'_, str>> {
    let text = match value {
        Value::Null => Cow::Borrowed("NULL"),
        Value::Bool(true) => Cow::Borrowed("true"),
        Value::Bool(false) => Cow::Borrowed("false"),
        Value::I8(v) => Cow::Owned(v.to_string()),
        Value::I16(v) => Cow::Owned(v.to_string()),
        Value::I32(v) => Cow::Owned(v.to_string()),
        Value::I64(v) => Cow::Owned(v.to_string()),
        Value::U8(v) => Cow::Owned(v.to_string()),
        Value::U16(v) => Cow::Owned(v.to_string()),
        Value::U32(v) => Cow::Owned(v.to_string()),
        Value::U64(v) => Cow::Owned(v.to_string()),
        Value::F32(v) => finite(f64::from(*v))?,
        Value::F64(v) => finite(*v)?,
        Value::Char(c) => Cow::Owned(quote(c.encode_utf8(&mut [0; 4]))),
        Value::String(s) if is_keyword_fragment(s) => Cow::Owned(format!(" {s} ")),
        Value::String(s) => Cow::Owned(quote(s)),
        Value::List(items) => {
            if items.is_empty() {
                return Err(Error::EmptyCollection("inline list".into()));
            }
            let items = items.iter().map(inline).collect::<Result<Vec<_>>>()?;
            Cow::Owned(items.join(","))
        }
        Value::Record(_) => return Err(Error::unsupported("a record as a sql literal")),
        #[cfg(feature = "chrono")]
        Value::Date(date) => Cow::Owned(quote(&date.to_string())),
        #[cfg(feature = "chrono")]
        Value::DateTime(datetime) => Cow::Owned(quote(&datetime.to_string())),
        #[cfg(feature = "uuid")]
        Value::Uuid(uuid) => Cow::Owned(quote(&uuid.to_string())),
        #[cfg(feature = "json")]
        Value::Json(json) => Cow::Owned(quote(&json.to_string())),
    };
    Ok(text)
}

fn finite(value: f64) -> Result<Cow<'static, str>> {
    if !value.is_finite() {
        return Err(Error::unsupported(format_smolstr!(
            "`{value}` as a sql literal"
        )));
    }
    Ok(Cow::Owned(value.to_string()))
}

/// Strings that already carry their own sql keyword are spliced as is.
fn is_keyword_fragment(s: &str) -> bool {
    let lower = s.trim().to_lowercase();
    ["in(", "not in(", "like '", "not like"]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' {
            out.push('\'');
        }
        out.push(c);
    }
    out.push('\'');
    out
}
