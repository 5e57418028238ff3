use std::borrow::Cow;

use indexmap::IndexMap;
use smol_str::SmolStr;

/// A literal carried by a predicate tree or bound as a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Char(char),
    String(SmolStr),
    List(Vec<Value>),
    /// Captured object whose properties the evaluator can read.
    Record(IndexMap<SmolStr, Value>),
    #[cfg(feature = "chrono")]
    Date(chrono::NaiveDate),
    #[cfg(feature = "chrono")]
    DateTime(chrono::NaiveDateTime),
    #[cfg(feature = "uuid")]
    Uuid(uuid::Uuid),
    #[cfg(feature = "json")]
    Json(serde_json::Value),
}

impl Value {
    pub fn record<K, V, I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<SmolStr>,
        V: IntoValue,
    {
        Value::Record(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into_value()))
                .collect(),
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I8(_) | Value::I16(_) | Value::I32(_) | Value::I64(_) => "integer",
            Value::U8(_) | Value::U16(_) | Value::U32(_) | Value::U64(_) => "unsigned integer",
            Value::F32(_) | Value::F64(_) => "float",
            Value::Char(_) => "char",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Record(_) => "record",
            #[cfg(feature = "chrono")]
            Value::Date(_) => "date",
            #[cfg(feature = "chrono")]
            Value::DateTime(_) => "datetime",
            #[cfg(feature = "uuid")]
            Value::Uuid(_) => "uuid",
            #[cfg(feature = "json")]
            Value::Json(_) => "json",
        }
    }

    pub(crate) fn as_integer(&self) -> Option<i128> {
        match *self {
            Value::I8(v) => Some(v.into()),
            Value::I16(v) => Some(v.into()),
            Value::I32(v) => Some(v.into()),
            Value::I64(v) => Some(v.into()),
            Value::U8(v) => Some(v.into()),
            Value::U16(v) => Some(v.into()),
            Value::U32(v) => Some(v.into()),
            Value::U64(v) => Some(v.into()),
            _ => None,
        }
    }

    pub(crate) fn as_float(&self) -> Option<f64> {
        match *self {
            Value::F32(v) => Some(v.into()),
            Value::F64(v) => Some(v),
            _ => self.as_integer().map(|v| v as f64),
        }
    }

    pub(crate) fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Char(c) => Some(Cow::Owned(c.to_string())),
            _ => None,
        }
    }
}

pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Ordered values for a raw template, `{0}` is the first one.
pub trait IntoValues {
    fn into_values(self) -> Vec<Value>;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl<T> IntoValue for Option<T>
where
    T: IntoValue,
{
    fn into_value(self) -> Value {
        if let Some(value) = self {
            value.into_value()
        } else {
            Value::Null
        }
    }
}

macro_rules! impl_into_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl IntoValue for $ty {
                #[inline]
                fn into_value(self) -> Value {
                    Value::$variant(self)
                }
            }
        )*
    };
}

impl_into_value! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    char => Char,
    SmolStr => String,
}

#[cfg(feature = "chrono")]
impl_into_value! {
    chrono::NaiveDate => Date,
    chrono::NaiveDateTime => DateTime,
}

#[cfg(feature = "uuid")]
impl_into_value! {
    uuid::Uuid => Uuid,
}

#[cfg(feature = "json")]
impl_into_value! {
    serde_json::Value => Json,
}

impl IntoValue for &str {
    #[inline]
    fn into_value(self) -> Value {
        Value::String(SmolStr::new(self))
    }
}

impl IntoValue for &String {
    #[inline]
    fn into_value(self) -> Value {
        Value::String(SmolStr::new(self))
    }
}

impl IntoValue for String {
    #[inline]
    fn into_value(self) -> Value {
        Value::String(SmolStr::from(self))
    }
}

impl<T> IntoValue for Vec<T>
where
    T: IntoValue,
{
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T, const N: usize> IntoValue for [T; N]
where
    T: IntoValue,
{
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T> IntoValue for &[T]
where
    T: IntoValue + Clone,
{
    fn into_value(self) -> Value {
        Value::List(self.iter().cloned().map(IntoValue::into_value).collect())
    }
}

impl IntoValues for () {
    fn into_values(self) -> Vec<Value> {
        Vec::new()
    }
}

impl<T> IntoValues for Vec<T>
where
    T: IntoValue,
{
    fn into_values(self) -> Vec<Value> {
        self.into_iter().map(IntoValue::into_value).collect()
    }
}

impl<T, const N: usize> IntoValues for [T; N]
where
    T: IntoValue,
{
    fn into_values(self) -> Vec<Value> {
        self.into_iter().map(IntoValue::into_value).collect()
    }
}

macro_rules! impl_into_values_tuple {
    ($($name:ident),+) => {
        impl<$($name: IntoValue),+> IntoValues for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_values(self) -> Vec<Value> {
                let ($($name,)+) = self;
                vec![$($name.into_value()),+]
            }
        }
    };
}

impl_into_values_tuple!(A);
impl_into_values_tuple!(A, B);
impl_into_values_tuple!(A, B, C);
impl_into_values_tuple!(A, B, C, D);
impl_into_values_tuple!(A, B, C, D, E);
impl_into_values_tuple!(A, B, C, D, E, F);
impl_into_values_tuple!(A, B, C, D, E, F, G);
impl_into_values_tuple!(A, B, C, D, E, F, G, H);

// free when T is small, mirrors the single/many split of select lists
#[derive(Debug, Default, Clone, PartialEq)]
pub enum Array<T> {
    #[default]
    None,
    One(T),
    Many(Vec<T>),
}

impl<T> Array<T> {
    pub fn append(&mut self, other: Self) {
        let combined = match (std::mem::replace(self, Self::None), other) {
            (Self::None, cols) | (cols, Self::None) => cols,
            (Self::One(a), Self::One(b)) => Self::Many(vec![a, b]),
            (Self::One(a), Self::Many(mut b)) => {
                b.insert(0, a);
                Self::Many(b)
            }
            (Self::Many(mut a), Self::One(b)) => {
                a.push(b);
                Self::Many(a)
            }
            (Self::Many(mut a), Self::Many(mut b)) => {
                a.append(&mut b);
                Self::Many(a)
            }
        };
        *self = combined;
    }

    pub fn len(&self) -> usize {
        match self {
            Array::None => 0,
            Array::One(_) => 1,
            Array::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reset(&mut self) {
        *self = Self::None;
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            Array::None => <&[T]>::default().iter(),
            Array::One(one) => std::slice::from_ref(one).iter(),
            Array::Many(many) => many.iter(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_into_null() {
        let none: Option<i32> = None;
        assert_eq!(Value::Null, none.into_value());
        assert_eq!(Value::I32(3), Some(3).into_value());
    }

    #[test]
    fn test_tuple_values_keep_order() {
        let values = (1, "a", None::<bool>).into_values();
        assert_eq!(
            vec![Value::I32(1), Value::String("a".into()), Value::Null],
            values
        );
    }

    #[test]
    fn test_record_fields() {
        let value = Value::record([("Age", Some(4)), ("Rank", None)]);
        let Value::Record(fields) = value else {
            panic!("expected a record");
        };
        assert_eq!(Some(&Value::I32(4)), fields.get("Age"));
        assert_eq!(Some(&Value::Null), fields.get("Rank"));
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(Some(7), Value::U8(7).as_integer());
        assert_eq!(Some(2.5), Value::F32(2.5).as_float());
        assert_eq!(None, Value::String("x".into()).as_integer());
    }

    #[test]
    fn test_array_append() {
        let mut array = Array::One(1);
        array.append(Array::Many(vec![2, 3]));
        assert_eq!(Array::Many(vec![1, 2, 3]), array);
        assert_eq!(vec![1, 2, 3], array.iter().copied().collect::<Vec<_>>());
        array.reset();
        assert!(array.is_empty());
    }
}
