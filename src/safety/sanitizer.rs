//! Lexical masking of literals and comments.
//!
//! Every byte inside a single-quoted string, double-quoted identifier, blob
//! literal, line comment or block comment (delimiters included) is replaced
//! with a space. Line breaks are kept. The output has the same byte length
//! as the input, so offsets found in the masked text point at the same place
//! in the original.

use std::iter::Peekable;
use std::str::Chars;

/// SQL text with literals and comments masked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedStatement {
    text: String,
}

impl SanitizedStatement {
    /// Returns the masked text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Byte length, always equal to the source length.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Returns true if the source was empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Consumes the statement, returning the masked text.
    pub fn into_string(self) -> String {
        self.text
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    InSingleQuote,
    InDoubleQuote,
    InLineComment,
    InBlockComment,
}

/// Masks literals and comments in `sql`.
///
/// Total: never fails. An unterminated literal or comment runs to the end of
/// the input and everything after its opening delimiter is masked.
pub fn sanitize(sql: &str) -> SanitizedStatement {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut state = ScanState::Normal;
    let mut prev: Option<char> = None;

    while let Some(ch) = chars.next() {
        state = match state {
            ScanState::Normal => scan_normal(ch, prev, &mut chars, &mut out),
            ScanState::InSingleQuote => {
                scan_quoted(ScanState::InSingleQuote, '\'', ch, &mut chars, &mut out)
            }
            ScanState::InDoubleQuote => {
                scan_quoted(ScanState::InDoubleQuote, '"', ch, &mut chars, &mut out)
            }
            ScanState::InLineComment => {
                if ch == '\n' {
                    out.push('\n');
                    ScanState::Normal
                } else {
                    mask(&mut out, ch);
                    ScanState::InLineComment
                }
            }
            ScanState::InBlockComment => {
                if ch == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("  ");
                    ScanState::Normal
                } else {
                    mask(&mut out, ch);
                    ScanState::InBlockComment
                }
            }
        };
        prev = Some(ch);
    }

    SanitizedStatement { text: out }
}

fn scan_normal(
    ch: char,
    prev: Option<char>,
    chars: &mut Peekable<Chars<'_>>,
    out: &mut String,
) -> ScanState {
    match ch {
        '\'' => {
            out.push(' ');
            ScanState::InSingleQuote
        }
        '"' => {
            out.push(' ');
            ScanState::InDoubleQuote
        }
        '-' if chars.peek() == Some(&'-') => {
            chars.next();
            out.push_str("  ");
            ScanState::InLineComment
        }
        '/' if chars.peek() == Some(&'*') => {
            chars.next();
            out.push_str("  ");
            ScanState::InBlockComment
        }
        // Blob literal x'..': the prefix only counts at a word start.
        'x' | 'X' if chars.peek() == Some(&'\'') && !prev.is_some_and(is_word_char) => {
            chars.next();
            out.push_str("  ");
            ScanState::InSingleQuote
        }
        _ => {
            out.push(ch);
            ScanState::Normal
        }
    }
}

/// Scans one character inside a quoted run. A doubled delimiter is an
/// escaped delimiter and keeps the scanner inside the literal.
fn scan_quoted(
    state: ScanState,
    delimiter: char,
    ch: char,
    chars: &mut Peekable<Chars<'_>>,
    out: &mut String,
) -> ScanState {
    if ch != delimiter {
        mask(out, ch);
        return state;
    }
    if chars.peek() == Some(&delimiter) {
        chars.next();
        out.push_str("  ");
        return state;
    }
    out.push(' ');
    ScanState::Normal
}

fn mask(out: &mut String, ch: char) {
    if ch == '\n' || ch == '\r' {
        out.push(ch);
    } else {
        out.extend(std::iter::repeat(' ').take(ch.len_utf8()));
    }
}

pub(crate) fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}
