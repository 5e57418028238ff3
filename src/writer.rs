use std::{fmt::Write, ops::Deref};

use crate::dialect::Dialect;

pub(crate) trait FormatWriter {
    fn format_writer<W: Write>(&self, context: &mut FormatContext<'_, W>) -> std::fmt::Result;
}

pub(crate) struct FormatContext<'a, W: Write> {
    pub(crate) writer: &'a mut W,
    pub(crate) dialect: Dialect,
}

impl<'a, W: Write> FormatContext<'a, W> {
    pub fn new(writer: &'a mut W, dialect: Dialect) -> Self {
        Self { writer, dialect }
    }

    /// Writes a resolved field path, `a.b` or `a."b"` when the dialect quotes.
    pub(crate) fn write_field<'p, I>(&mut self, path: I) -> std::fmt::Result
    where
        I: IntoIterator<Item = &'p str>,
        I::IntoIter: ExactSizeIterator,
    {
        let parts = path.into_iter();
        let last = parts.len().saturating_sub(1);
        let quoted = self.dialect.quotes_identifiers();
        for (i, part) in parts.enumerate() {
            if i > 0 {
                self.writer.write_char('.')?;
            }
            match (quoted, i == last) {
                (true, true) => self.write_ident(part)?,
                (true, false) => {
                    for char in part.trim().chars().flat_map(char::to_lowercase) {
                        self.writer.write_char(char)?;
                    }
                }
                (false, _) => self.writer.write_str(part.trim())?,
            }
        }
        Ok(())
    }

    pub(crate) fn write_ident(&mut self, part: &str) -> std::fmt::Result {
        let part = part.trim();
        if part == "*" {
            return self.writer.write_char('*');
        }

        self.writer.write_char('"')?;
        // duplicate the quote if present
        let mut last = 0;
        for (index, char) in part.char_indices() {
            if char == '"' {
                if index != last {
                    self.writer.write_str(&part[last..index])?;
                }
                self.writer.write_str("\"\"")?;
                last = index + char.len_utf8();
            }
        }

        // write trailing slice
        if last < part.len() {
            self.writer.write_str(&part[last..])?;
        }

        self.writer.write_char('"')?;
        Ok(())
    }
}

impl<D> FormatWriter for D
where
    D: Deref,
    D::Target: FormatWriter,
{
    fn format_writer<W: std::fmt::Write>(
        &self,
        ctx: &mut FormatContext<'_, W>,
    ) -> std::fmt::Result {
        self.deref().format_writer(ctx)
    }
}
