//! Identifier scanning shared by the validator and assignment memory

/// An identifier-shaped run of an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identifier<'a> {
    pub text: &'a str,
    /// Byte range within the scanned expression
    pub start: usize,
    pub end: usize,
    /// Immediately followed by `(` or `[`, i.e. used as a function name
    pub is_call: bool,
    /// Immediately preceded by a digit or `.`, as in `2x`
    pub follows_number: bool,
}

impl Identifier<'_> {
    pub fn is_single_letter(&self) -> bool {
        self.text.len() == 1
    }
}

fn starts_identifier(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn continues_identifier(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn continues_number(c: char) -> bool {
    c.is_ascii_digit() || c == '.'
}

/// Every identifier of `expression`, in order.
///
/// Number runs are skipped but do not swallow trailing letters, so `2x` yields `x`.
pub fn identifiers(expression: &str) -> Vec<Identifier<'_>> {
    let bytes = expression.as_bytes();
    let mut found = Vec::new();
    let mut chars = expression.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if starts_identifier(c) {
            let mut end = start + c.len_utf8();
            while let Some(&(i, next)) = chars.peek() {
                if !continues_identifier(next) {
                    break;
                }
                end = i + next.len_utf8();
                chars.next();
            }
            let follows_number =
                start > 0 && continues_number(char::from(bytes[start - 1]));
            let is_call = matches!(bytes.get(end), Some(b'(') | Some(b'['));
            found.push(Identifier {
                text: &expression[start..end],
                start,
                end,
                is_call,
                follows_number,
            });
        } else if continues_number(c) {
            while chars.peek().is_some_and(|&(_, next)| continues_number(next)) {
                chars.next();
            }
        }
    }

    found
}
