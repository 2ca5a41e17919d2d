//! The closed set of failures shared by the parser, the cursors, and the
//! segment splitter.
//!
//! Every error is fatal to the current parse; there is no recovery. Errors
//! carry the offending character (or "end of stream") and, where relevant,
//! the accepted alternatives, so that a consumer can report a stuck model
//! stream precisely.

use core::fmt;

use thiserror::Error;

/// What the parser actually saw when it expected something else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Found {
    /// A concrete character from the stream.
    Char(char),
    /// The source stream ended.
    EndOfStream,
}

impl From<Option<char>> for Found {
    fn from(c: Option<char>) -> Self {
        match c {
            Some(c) => Found::Char(c),
            None => Found::EndOfStream,
        }
    }
}

impl fmt::Display for Found {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Found::Char(c) => write!(f, "'{}'", format_char(*c)),
            Found::EndOfStream => f.write_str("end of stream"),
        }
    }
}

/// Errors produced while pulling values out of a chunked JSON stream.
///
/// The syntax errors are detected at the earliest offending byte.
/// `DoubleConsume`, `StaleHandle`, `AlreadyIterated`, and `DirtyReset` are
/// programmer errors: they signal misuse of the one-shot cursor/handle
/// protocol and are raised the first time the misuse is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A read was attempted after the stream had already ended.
    #[error("attempted to read past the end of the stream")]
    ReadPastEndOfStream,

    /// A character that cannot appear at the current position.
    #[error("unexpected character '{}'", format_char(*.0))]
    UnexpectedCharacter(char),

    /// One specific character was required.
    #[error("expected '{}', got {found}", format_char(*.expected))]
    ExpectedCharacter { expected: char, found: Found },

    /// One of a small set of characters was required.
    #[error("expected one of {}, got {found}", format_char_set(.expected))]
    ExpectedOneOf {
        expected: &'static [char],
        found: Found,
    },

    /// A number token violated the JSON grammar or overflowed a double.
    #[error("malformed number: {0}")]
    MalformedNumber(String),

    /// A backslash escape named a character outside the eight escapes.
    #[error("invalid escape character '{}'", format_char(*.0))]
    InvalidEscape(char),

    /// A `\uXXXX` escape could not be decoded.
    #[error("invalid unicode escape: {0}")]
    InvalidUnicodeEscape(String),

    /// The stream ended in the middle of an escape sequence.
    #[error("end of stream inside an escape sequence")]
    IncompleteEscape,

    /// A typed reader was invoked twice on the same unparsed handle.
    #[error("value handle was already consumed")]
    DoubleConsume,

    /// A handle was used after its cursor advanced past it.
    #[error("value handle is stale: the cursor has moved past it")]
    StaleHandle,

    /// A cursor was iterated after eager extraction, or extracted after
    /// iteration had begun.
    #[error("container cursor was already iterated")]
    AlreadyIterated,

    /// A second top-level value followed the completed document.
    #[error("input continues after the top-level value")]
    ValueAfterEnd,

    /// The segment splitter was reset while a marker prefix was pending.
    #[error("reset with a partially matched marker in the lookahead buffer")]
    DirtyReset,
}

/// Render a character the way it would appear inside a JSON string, so
/// error messages stay printable for control bytes and exotic whitespace.
pub(crate) fn format_char(c: char) -> String {
    match c {
        '"' => "\\\"".into(),
        '\\' => "\\\\".into(),
        '\u{0008}' => "\\b".into(),
        '\u{000C}' => "\\f".into(),
        '\n' => "\\n".into(),
        '\r' => "\\r".into(),
        '\t' => "\\t".into(),
        '\0' => "\\0".into(),
        c if c.is_control() => format!("\\u{:04X}", c as u32),
        c if c.is_whitespace() && !c.is_ascii_whitespace() => {
            format!("\\u{:04X}", c as u32)
        }
        c => c.to_string(),
    }
}

fn format_char_set(set: &[char]) -> String {
    let mut out = String::new();
    for (i, c) in set.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push('\'');
        out.push_str(&format_char(*c));
        out.push('\'');
    }
    out
}
