use std::sync::Arc;

use smol_str::SmolStr;

use crate::{
    expr::Expr,
    writer::{FormatContext, FormatWriter},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Field(SmolStr),
    /// Reading the value out of an optional, `a.b.Value` in a typed front-end.
    Unwrap,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Root {
    /// The filtered model, the only thing that renders as a column.
    Model,
    Object(Box<Expr>),
}

/// A dotted path to a field of the model or of a captured object.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub(crate) root: Root,
    pub(crate) segments: Vec<Segment>,
}

pub trait IntoMember {
    fn into_member(self) -> Member;
}

impl IntoMember for Member {
    fn into_member(self) -> Member {
        self
    }
}

impl IntoMember for &str {
    #[inline]
    fn into_member(self) -> Member {
        Member::new(self)
    }
}

impl IntoMember for &String {
    #[inline]
    fn into_member(self) -> Member {
        Member::new(self)
    }
}

impl IntoMember for String {
    #[inline]
    fn into_member(self) -> Member {
        Member::new(&self)
    }
}

impl IntoMember for SmolStr {
    #[inline]
    fn into_member(self) -> Member {
        Member::new(&self)
    }
}

impl IntoMember for Arc<str> {
    #[inline]
    fn into_member(self) -> Member {
        Member::new(&self)
    }
}

impl Member {
    /// Model field from a dotted path, `u.Name` is field `Name` of alias `u`.
    pub fn new(path: &str) -> Self {
        Self {
            root: Root::Model,
            segments: path
                .split('.')
                .filter(|part| !part.is_empty())
                .map(|part| Segment::Field(SmolStr::new(part)))
                .collect(),
        }
    }

    pub fn of(object: Expr) -> Self {
        Self {
            root: Root::Object(Box::new(object)),
            segments: Vec::new(),
        }
    }

    pub fn field<T: Into<SmolStr>>(mut self, name: T) -> Self {
        self.segments.push(Segment::Field(name.into()));
        self
    }

    pub fn unwrap_value(mut self) -> Self {
        self.segments.push(Segment::Unwrap);
        self
    }

    pub fn is_model(&self) -> bool {
        matches!(self.root, Root::Model)
    }

    /// Field names with the optional-unwrap chain collapsed.
    pub fn fields(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.resolved().into_iter()
    }

    pub fn path(&self) -> SmolStr {
        let mut path = String::new();
        for (index, part) in self.fields().enumerate() {
            if index > 0 {
                path.push('.');
            }
            path.push_str(part);
        }
        SmolStr::from(path)
    }

    fn resolved(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Field(name) => Some(name.as_str()),
                Segment::Unwrap => None,
            })
            .collect()
    }
}

impl FormatWriter for Member {
    fn format_writer<W: std::fmt::Write>(
        &self,
        context: &mut FormatContext<'_, W>,
    ) -> std::fmt::Result {
        if !self.is_model() {
            return Err(std::fmt::Error);
        }
        context.write_field(self.fields())
    }
}
