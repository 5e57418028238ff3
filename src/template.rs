use std::borrow::Cow;

use smol_str::{SmolStr, format_smolstr};

use crate::{
    error::{Error, Result},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Text(&'a str),
    Placeholder(usize),
    Open,
    Close,
}

/// Splits sql into text, `{N}` placeholders and square brackets. Quoted
/// literals and identifiers are always text.
fn tokenize(sql: &str) -> Vec<Token<'_>> {
    // state
    enum State {
        Normal,
        Ident,
        Lit,
    }

    let bytes = sql.as_bytes();
    let mut tokens = Vec::new();
    let mut state = State::Normal;
    let mut span_start = 0;
    let mut index = 0;

    fn flush<'a>(tokens: &mut Vec<Token<'a>>, sql: &'a str, start: usize, end: usize) {
        if start < end {
            tokens.push(Token::Text(&sql[start..end]));
        }
    }

    while index < bytes.len() {
        let byte = bytes[index];
        match state {
            State::Normal => match byte {
                b'\'' => {
                    state = State::Lit;
                    index += 1;
                }
                b'"' => {
                    state = State::Ident;
                    index += 1;
                }
                b'{' => match placeholder_at(&sql[index..]) {
                    Some((placeholder, len)) => {
                        flush(&mut tokens, sql, span_start, index);
                        tokens.push(Token::Placeholder(placeholder));
                        index += len;
                        span_start = index;
                    }
                    None => index += 1,
                },
                b'[' | b']' => {
                    flush(&mut tokens, sql, span_start, index);
                    tokens.push(if byte == b'[' { Token::Open } else { Token::Close });
                    index += 1;
                    span_start = index;
                }
                _ => index += 1,
            },
            State::Ident | State::Lit => {
                let quote = if matches!(state, State::Lit) { b'\'' } else { b'"' };
                if byte == quote {
                    // doubled quote stays inside
                    if bytes.get(index + 1) == Some(&quote) {
                        index += 2;
                        continue;
                    }
                    state = State::Normal;
                }
                index += 1;
            }
        }
    }

    flush(&mut tokens, sql, span_start, bytes.len());
    tokens
}

/// `{digits}` at the start of `s`, with its byte length.
fn placeholder_at(s: &str) -> Option<(usize, usize)> {
    let close = s.find('}')?;
    let digits = &s[1..close];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((digits.parse().ok()?, close + 1))
}

/// Replaces each `{N}` of a compiled template, which must reference every
/// index below `count` exactly once.
pub(crate) fn substitute<'v, F>(template: &str, count: usize, mut replace: F) -> Result<String>
where
    F: FnMut(usize) -> Result<Cow<'v, str>>,
{
    let mut out = String::with_capacity(template.len() + count * 4);
    let mut seen = vec![false; count];
    let mut substitutions = 0;

    for token in tokenize(template) {
        match token {
            Token::Text(text) => out.push_str(text),
            Token::Open => out.push('['),
            Token::Close => out.push(']'),
            Token::Placeholder(index) => {
                match seen.get_mut(index) {
                    Some(slot) if !*slot => *slot = true,
                    Some(_) => {
                        return Err(Error::contract(format_smolstr!(
                            "placeholder {{{index}}} appears more than once"
                        )));
                    }
                    None => {
                        return Err(Error::contract(format_smolstr!(
                            "placeholder {{{index}}} has no argument, {count} available"
                        )));
                    }
                }
                substitutions += 1;
                out.push_str(&replace(index)?);
            }
        }
    }

    if substitutions != count {
        return Err(Error::contract(format_smolstr!(
            "{substitutions} placeholder(s) for {count} argument(s)"
        )));
    }
    Ok(out)
}

#[derive(Debug)]
enum Piece<'a> {
    Token(Token<'a>),
    /// `[ ... ]` around at least one placeholder.
    Section(&'a [Token<'a>]),
}

fn pieces<'a>(tokens: &'a [Token<'a>]) -> Vec<Piece<'a>> {
    let mut pieces = Vec::with_capacity(tokens.len());
    let mut index = 0;
    while index < tokens.len() {
        if tokens[index] == Token::Open {
            let rest = &tokens[index + 1..];
            let end = rest
                .iter()
                .position(|t| matches!(t, Token::Open | Token::Close))
                .filter(|&end| rest[end] == Token::Close);
            if let Some(end) = end {
                let inner = &rest[..end];
                if inner.iter().any(|t| matches!(t, Token::Placeholder(_))) {
                    pieces.push(Piece::Section(inner));
                    index += end + 2;
                    continue;
                }
            }
        }
        pieces.push(Piece::Token(tokens[index]));
        index += 1;
    }
    pieces
}

/// Renders a caller-authored template against `values`.
///
/// `bind` is called once per value that survives the null rewrite, in index
/// order, and returns the text that replaces its placeholders. Returns `None`
/// when nothing but whitespace is left.
pub(crate) fn render_raw<F>(template: &str, values: &[Value], mut bind: F) -> Result<Option<String>>
where
    F: FnMut(usize, &Value) -> SmolStr,
{
    let tokens = tokenize(template);

    let mut referenced = vec![false; values.len()];
    for token in &tokens {
        if let Token::Placeholder(index) = *token {
            match referenced.get_mut(index) {
                Some(slot) => *slot = true,
                None => {
                    return Err(Error::ArgumentCountMismatch {
                        expected: index.saturating_add(1),
                        found: values.len(),
                    });
                }
            }
        }
    }
    if let Some(index) = referenced.iter().position(|used| !used) {
        return Err(Error::MissingPlaceholder { index });
    }

    let pieces = pieces(&tokens);
    let kept = |inner: &[Token<'_>]| {
        inner.iter().all(|t| match *t {
            Token::Placeholder(index) => !values[index].is_null(),
            _ => true,
        })
    };

    let mut used = vec![false; values.len()];
    for piece in &pieces {
        let tokens: &[Token<'_>] = match *piece {
            Piece::Token(ref token) => std::slice::from_ref(token),
            Piece::Section(inner) if kept(inner) => inner,
            Piece::Section(_) => &[],
        };
        for token in tokens {
            if let Token::Placeholder(index) = *token {
                used[index] = !values[index].is_null();
            }
        }
    }

    let names: Vec<Option<SmolStr>> = values
        .iter()
        .enumerate()
        .map(|(index, value)| used[index].then(|| bind(index, value)))
        .collect();

    let mut out = String::with_capacity(template.len());
    let write = |out: &mut String, token: &Token<'_>| match *token {
        Token::Text(text) => out.push_str(text),
        Token::Open => out.push('['),
        Token::Close => out.push(']'),
        Token::Placeholder(index) => match names[index] {
            Some(ref name) => out.push_str(name),
            None => write_null(out),
        },
    };
    for piece in &pieces {
        match *piece {
            Piece::Token(ref token) => write(&mut out, token),
            Piece::Section(inner) if kept(inner) => {
                for token in inner {
                    write(&mut out, token);
                }
            }
            Piece::Section(_) => {}
        }
    }

    let trimmed = out.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Ok(Some(trimmed.to_owned()))
}

/// Null-safe rewrite of a comparison whose right side is `NULL`.
fn write_null(out: &mut String) {
    let trimmed = out.trim_end();
    let (rest, keyword) = if let Some(rest) = trimmed
        .strip_suffix("<>")
        .or_else(|| trimmed.strip_suffix("!="))
    {
        (rest, "IS NOT NULL")
    } else if let Some(rest) = trimmed
        .strip_suffix('=')
        .filter(|rest| !rest.ends_with(['<', '>', '!']))
    {
        (rest, "IS NULL")
    } else {
        out.push_str("NULL");
        return;
    };
    let len = rest.trim_end().len();
    out.truncate(len);
    out.push(' ');
    out.push_str(keyword);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(template: &str, values: &[Value]) -> Result<Option<String>> {
        render_raw(template, values, |index, _| format_smolstr!("@p{index}"))
    }

    #[test]
    fn test_tokenize_skips_literals() {
        let tokens = tokenize("a LIKE ''||{0}||'%' AND b = '{1}'");
        assert_eq!(
            vec![
                Token::Text("a LIKE ''||"),
                Token::Placeholder(0),
                Token::Text("||'%' AND b = '{1}'"),
            ],
            tokens
        );
    }

    #[test]
    fn test_tokenize_idents_and_brackets() {
        let tokens = tokenize("\"{0}\" = [x {1}]");
        assert_eq!(
            vec![
                Token::Text("\"{0}\" = "),
                Token::Open,
                Token::Text("x "),
                Token::Placeholder(1),
                Token::Close,
            ],
            tokens
        );
    }

    #[test]
    fn test_not_a_placeholder() {
        assert_eq!(vec![Token::Text("{a} {}")], tokenize("{a} {}"));
    }

    #[test]
    fn test_substitute() {
        let args = ["'test'", "2"];
        let sql = substitute("((\"Name\" LIKE ''||{0}||'%') AND \"Id\" > {1})", 2, |i| {
            Ok(Cow::Borrowed(args[i]))
        })
        .unwrap();
        assert_eq!("((\"Name\" LIKE ''||'test'||'%') AND \"Id\" > 2)", sql);
    }

    #[test]
    fn test_substitute_parity() {
        let replace = |_| Ok(Cow::Borrowed("x"));
        assert!(matches!(
            substitute("a = {0}", 2, replace),
            Err(Error::ContractViolation(_))
        ));
        assert!(matches!(
            substitute("a = {0} AND b = {1}", 1, replace),
            Err(Error::ContractViolation(_))
        ));
        assert!(matches!(
            substitute("a = {0} AND b = {0}", 2, replace),
            Err(Error::ContractViolation(_))
        ));
    }

    #[test]
    fn test_raw_binds() {
        let values = [Value::I32(1), Value::String("x".into())];
        let sql = names("a = {0} AND b = {1} AND c = {0}", &values).unwrap();
        assert_eq!(Some("a = @p0 AND b = @p1 AND c = @p0".to_owned()), sql);
    }

    #[test]
    fn test_raw_null_rewrites() {
        let values = [Value::Null, Value::Null, Value::Null];
        let sql = names("a = {0} AND b <> {1} AND coalesce(c, {2}) > 1", &values).unwrap();
        assert_eq!(
            Some("a IS NULL AND b IS NOT NULL AND coalesce(c, NULL) > 1".to_owned()),
            sql
        );
        let sql = names("a>={0}", &[Value::Null]).unwrap();
        assert_eq!(Some("a>=NULL".to_owned()), sql);
    }

    #[test]
    fn test_raw_optional_section() {
        let values = [Value::I32(1), Value::Null];
        let sql = names("a = {0} [AND b = {1}]", &values).unwrap();
        assert_eq!(Some("a = @p0".to_owned()), sql);

        let values = [Value::I32(1), Value::I32(2)];
        let sql = names("a = {0} [AND b = {1}]", &values).unwrap();
        assert_eq!(Some("a = @p0 AND b = @p1".to_owned()), sql);

        let sql = names("[b = {0}]", &[Value::Null]).unwrap();
        assert_eq!(None, sql);
    }

    #[test]
    fn test_raw_plain_brackets_are_text() {
        let sql = names("[dbo].[name] = {0}", &[Value::I32(1)]).unwrap();
        assert_eq!(Some("[dbo].[name] = @p0".to_owned()), sql);
    }

    #[test]
    fn test_raw_binds_only_used_values() {
        let mut bound = Vec::new();
        let values = [Value::I32(1), Value::Null, Value::I32(3)];
        let sql = render_raw("[a = {0} AND b = {1}] c = {2}", &values, |index, _| {
            bound.push(index);
            format_smolstr!("@p{index}")
        })
        .unwrap();
        assert_eq!(Some("c = @p2".to_owned()), sql);
        assert_eq!(vec![2], bound);
    }

    #[test]
    fn test_raw_count_errors() {
        assert_eq!(
            Err(Error::ArgumentCountMismatch {
                expected: 2,
                found: 1
            }),
            names("a = {0} AND b = {1}", &[Value::I32(1)])
        );
        assert_eq!(
            Err(Error::MissingPlaceholder { index: 1 }),
            names("a = {0}", &[Value::I32(1), Value::I32(2)])
        );
        assert_eq!(Err(Error::ArgumentCountMismatch { expected: 1, found: 0 }), names("a = {0}", &[]));
    }
}
