use std::fmt::Write;

use crate::writer::{FormatContext, FormatWriter};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) enum OrState {
    #[default]
    Default,
    /// Fragments waiting to be OR-joined into a single AND term.
    CollectingOr(Vec<String>),
}

/// Parenthesized `WHERE` terms, AND-joined when written.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Fragments {
    items: Vec<String>,
    state: OrState,
}

impl Fragments {
    pub(crate) fn push(&mut self, sql: &str) {
        let term = format!("({sql})");
        tracing::debug!(fragment = %term, or = self.is_collecting(), "where fragment");
        match self.state {
            OrState::Default => self.items.push(term),
            OrState::CollectingOr(ref mut pending) => pending.push(term),
        }
    }

    /// Opens an OR group, a no-op when one is already open.
    pub(crate) fn start_or(&mut self) {
        if let OrState::Default = self.state {
            tracing::debug!("or group opened");
            self.state = OrState::CollectingOr(Vec::new());
        }
    }

    pub(crate) fn end_or(&mut self) {
        let OrState::CollectingOr(pending) = std::mem::take(&mut self.state) else {
            return;
        };
        tracing::debug!(terms = pending.len(), "or group closed");
        if !pending.is_empty() {
            self.push(&pending.join(" OR "));
        }
    }

    pub(crate) fn is_collecting(&self) -> bool {
        matches!(self.state, OrState::CollectingOr(_))
    }

    pub(crate) fn has_pending_or(&self) -> bool {
        matches!(self.state, OrState::CollectingOr(ref pending) if !pending.is_empty())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty() && !self.has_pending_or()
    }
}

impl FormatWriter for Fragments {
    fn format_writer<W: Write>(&self, context: &mut FormatContext<'_, W>) -> std::fmt::Result {
        for (index, item) in self.items.iter().enumerate() {
            if index > 0 {
                context.writer.write_str(" AND ")?;
            }
            context.writer.write_str(item)?;
        }

        // an open group renders as if it had been closed
        if let OrState::CollectingOr(ref pending) = self.state {
            if pending.is_empty() {
                return Ok(());
            }
            if !self.items.is_empty() {
                context.writer.write_str(" AND ")?;
            }
            context.writer.write_char('(')?;
            for (index, item) in pending.iter().enumerate() {
                if index > 0 {
                    context.writer.write_str(" OR ")?;
                }
                context.writer.write_str(item)?;
            }
            context.writer.write_char(')')?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{dialect::Dialect, tests::format_writer};

    use super::*;

    #[test]
    fn test_and_join() {
        let mut fragments = Fragments::default();
        fragments.push("a = 1");
        fragments.push("b = 2");
        assert_eq!("(a = 1) AND (b = 2)", format_writer(&fragments, Dialect::MySql));
    }

    #[test]
    fn test_or_flush() {
        let mut fragments = Fragments::default();
        fragments.start_or();
        fragments.push("a");
        fragments.push("b");
        assert!(fragments.is_collecting());
        fragments.end_or();
        assert!(!fragments.is_collecting());
        assert_eq!("((a) OR (b))", format_writer(&fragments, Dialect::MySql));
    }

    #[test]
    fn test_empty_or_group() {
        let mut fragments = Fragments::default();
        fragments.start_or();
        fragments.end_or();
        assert!(fragments.is_empty());
        assert!(!fragments.is_collecting());
    }

    #[test]
    fn test_pending_group_renders_closed() {
        let mut fragments = Fragments::default();
        fragments.push("x");
        fragments.start_or();
        fragments.push("a");
        fragments.push("b");
        assert!(fragments.has_pending_or());
        let text = format_writer(&fragments, Dialect::MySql);
        assert_eq!("(x) AND ((a) OR (b))", text);
        assert_eq!(text, format_writer(&fragments, Dialect::MySql));
        fragments.end_or();
        assert_eq!(text, format_writer(&fragments, Dialect::MySql));
    }
}
