//! The JSON pull parser.
//!
//! [`PullParser`] consumes an async stream of text chunks — a model's
//! token-by-token output, say — and exposes the JSON value being
//! transmitted either eagerly ([`read_value`](PullParser::read_value)) or
//! lazily, through the container cursors returned by
//! [`enter_object`](PullParser::enter_object) and
//! [`enter_array`](PullParser::enter_array). Chunks may split any token,
//! keyword, number, or escape sequence at any character boundary.
//!
//! # Examples
//!
//! ```
//! use futures::{executor::block_on, stream};
//! use jsonpull::{PullParser, Value};
//!
//! let chunks = stream::iter(vec![
//!     r#"{"na"#.to_string(),
//!     r#"me": "Alice", "age": 3"#.to_string(),
//!     r#"0}"#.to_string(),
//! ]);
//! let mut parser = PullParser::new(chunks);
//! let value = block_on(parser.read_value()).unwrap();
//! assert_eq!(
//!     value.as_object().unwrap()["name"],
//!     Value::String("Alice".into()),
//! );
//! ```

use futures::future::{FutureExt, LocalBoxFuture};

use crate::cursor::{ArrayCursor, ObjectCursor};
use crate::error::{Found, ParseError};
use crate::escape_buffer::UnicodeEscapeBuffer;
use crate::stream::{ChunkSource, ChunkStream};
use crate::value::Value;

/// The six JSON value types, as classified from a value's first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Boolean,
    Number,
    String,
    Object,
    Array,
}

/// Classify the upcoming value from its first non-whitespace character.
pub(crate) fn classify(c: Option<char>) -> Result<ValueKind, ParseError> {
    match c {
        None => Err(ParseError::ReadPastEndOfStream),
        Some('"') => Ok(ValueKind::String),
        Some('{') => Ok(ValueKind::Object),
        Some('[') => Ok(ValueKind::Array),
        Some('t' | 'f') => Ok(ValueKind::Boolean),
        Some('n') => Ok(ValueKind::Null),
        Some(c) if c == '-' || c.is_ascii_digit() => Ok(ValueKind::Number),
        Some(c) => Err(ParseError::UnexpectedCharacter(c)),
    }
}

/// A pull parser over an async stream of JSON text chunks.
///
/// The parser is pull-driven and single-threaded: it awaits the source
/// only when it has no buffered characters left, and it holds no
/// background work. Exactly one reading operation, cursor, or handle may
/// drive the parser at a time; exclusive access is passed hand-over-hand
/// through `&mut` borrows.
///
/// The parser reads exactly one top-level value. Once that value has
/// completed, a further read reports `ReadPastEndOfStream` if the stream
/// is exhausted, `UnexpectedCharacter` if the next byte cannot start a
/// value, and `ValueAfterEnd` otherwise.
#[derive(Debug)]
pub struct PullParser<S> {
    pub(crate) stream: ChunkStream<S>,
    /// Open containers; incremented on enter, decremented on exit.
    pub(crate) depth: u32,
    /// Bumped whenever a cursor advances; binds handles to their slot.
    handle_gen: u64,
    /// An issued handle has not yet consumed its value.
    pub(crate) pending_skip: bool,
    /// The single top-level value has completed.
    done: bool,
    /// Reused by the number lexer.
    scratch: String,
    escape: UnicodeEscapeBuffer,
}

impl<S: ChunkSource> PullParser<S> {
    /// Creates a parser over `source`.
    ///
    /// The source yields text fragments of arbitrary size and signals end
    /// of input by finishing. Fragments are `String`s, so a chunk never
    /// splits a multi-byte code point.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self {
            stream: ChunkStream::new(source),
            depth: 0,
            handle_gen: 0,
            pending_skip: false,
            done: false,
            scratch: String::new(),
            escape: UnicodeEscapeBuffer::new(),
        }
    }

    /// Number of characters consumed from the source so far.
    ///
    /// Purely diagnostic: handy when reporting where a model stream got
    /// stuck.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.stream.position()
    }

    /// Classifies the upcoming value without consuming it.
    ///
    /// Skips leading whitespace, pulling from the source as needed.
    pub async fn peek_type(&mut self) -> Result<ValueKind, ParseError> {
        self.stream.skip_whitespace().await?;
        classify(self.stream.current())
    }

    /// Positions the parser on the next value and classifies it, refusing
    /// a second top-level value.
    pub(crate) async fn begin_value(&mut self) -> Result<ValueKind, ParseError> {
        self.stream.skip_whitespace().await?;
        let kind = classify(self.stream.current())?;
        if self.done && self.depth == 0 {
            return Err(ParseError::ValueAfterEnd);
        }
        Ok(kind)
    }

    /// Marks a completed value; at depth zero that is the whole document.
    pub(crate) fn value_done(&mut self) {
        if self.depth == 0 {
            self.done = true;
        }
    }

    pub(crate) fn exit_container(&mut self) {
        self.depth -= 1;
        self.value_done();
    }

    pub(crate) fn issue_generation(&mut self) -> u64 {
        self.handle_gen += 1;
        self.pending_skip = true;
        self.handle_gen
    }

    pub(crate) fn invalidate_handles(&mut self) {
        self.handle_gen += 1;
    }

    pub(crate) fn handle_generation(&self) -> u64 {
        self.handle_gen
    }

    /// Reads `null`.
    pub async fn read_null(&mut self) -> Result<(), ParseError> {
        self.begin_value().await?;
        match self.stream.current() {
            Some('n') => {
                self.read_keyword("null").await?;
                self.value_done();
                Ok(())
            }
            other => Err(ParseError::ExpectedCharacter {
                expected: 'n',
                found: other.into(),
            }),
        }
    }

    /// Reads `true` or `false`.
    pub async fn read_bool(&mut self) -> Result<bool, ParseError> {
        self.begin_value().await?;
        match self.stream.current() {
            Some('t') => {
                self.read_keyword("true").await?;
                self.value_done();
                Ok(true)
            }
            Some('f') => {
                self.read_keyword("false").await?;
                self.value_done();
                Ok(false)
            }
            other => Err(ParseError::ExpectedOneOf {
                expected: &['t', 'f'],
                found: other.into(),
            }),
        }
    }

    /// Reads a number as an IEEE-754 double.
    ///
    /// The grammar is the JSON one: leading-zero integers are rejected,
    /// fraction and exponent require at least one digit, and values that
    /// overflow to a non-finite double are `MalformedNumber`. After the
    /// last digit the parser is positioned on the terminator, which may be
    /// a structural byte, whitespace, or end of stream.
    pub async fn read_number(&mut self) -> Result<f64, ParseError> {
        self.begin_value().await?;
        match self.stream.current() {
            Some(c) if c == '-' || c.is_ascii_digit() => {
                let n = self.lex_number().await?;
                self.value_done();
                Ok(n)
            }
            other => Err(ParseError::MalformedNumber(format!(
                "expected digit or '-', got {}",
                Found::from(other)
            ))),
        }
    }

    /// Reads a complete string into an owned, fully decoded `String`.
    pub async fn read_string(&mut self) -> Result<String, ParseError> {
        self.begin_value().await?;
        match self.stream.current() {
            Some('"') => {
                let mut out = String::new();
                self.scan_string(Some(&mut out)).await?;
                self.value_done();
                Ok(out)
            }
            other => Err(ParseError::ExpectedCharacter {
                expected: '"',
                found: other.into(),
            }),
        }
    }

    /// Begins reading a string in chunked mode.
    ///
    /// The returned [`StringChunks`] yields decoded fragments as the
    /// source produces them: whenever locally buffered data runs out
    /// mid-string, the accumulated fragment is handed to the consumer
    /// before the parser awaits the next chunk. The concatenation of all
    /// fragments equals the decoded string value. This is the hot path
    /// for long streamed text values.
    pub async fn read_string_chunked(&mut self) -> Result<StringChunks, ParseError> {
        self.begin_value().await?;
        match self.stream.current() {
            Some('"') => {
                self.stream.advance().await?;
                Ok(StringChunks {
                    done: false,
                    needs_advance: false,
                })
            }
            other => Err(ParseError::ExpectedCharacter {
                expected: '"',
                found: other.into(),
            }),
        }
    }

    /// Consumes the opening `{` and returns a cursor over the entries.
    ///
    /// The cursor does not consume any entries until iterated.
    pub async fn enter_object(&mut self) -> Result<ObjectCursor, ParseError> {
        self.begin_value().await?;
        match self.stream.current() {
            Some('{') => {
                self.depth += 1;
                self.stream.advance().await?;
                Ok(ObjectCursor::new(self.depth))
            }
            other => Err(ParseError::ExpectedCharacter {
                expected: '{',
                found: other.into(),
            }),
        }
    }

    /// Consumes the opening `[` and returns a cursor over the elements.
    pub async fn enter_array(&mut self) -> Result<ArrayCursor, ParseError> {
        self.begin_value().await?;
        match self.stream.current() {
            Some('[') => {
                self.depth += 1;
                self.stream.advance().await?;
                Ok(ArrayCursor::new(self.depth))
            }
            other => Err(ParseError::ExpectedCharacter {
                expected: '[',
                found: other.into(),
            }),
        }
    }

    /// Reads one complete value, materializing containers recursively.
    pub fn read_value(&mut self) -> LocalBoxFuture<'_, Result<Value, ParseError>> {
        async move {
            match self.begin_value().await? {
                ValueKind::Null => {
                    self.read_null().await?;
                    Ok(Value::Null)
                }
                ValueKind::Boolean => Ok(Value::Boolean(self.read_bool().await?)),
                ValueKind::Number => Ok(Value::Number(self.read_number().await?)),
                ValueKind::String => Ok(Value::String(self.read_string().await?)),
                ValueKind::Object => {
                    let mut cursor = self.enter_object().await?;
                    Ok(Value::Object(cursor.value(self).await?))
                }
                ValueKind::Array => {
                    let mut cursor = self.enter_array().await?;
                    Ok(Value::Array(cursor.value(self).await?))
                }
            }
        }
        .boxed_local()
    }

    /// Reads one full value and discards it, without materializing
    /// containers.
    ///
    /// Implemented by snapshotting the nesting level, stepping the
    /// dispatcher once, and stepping again until the level returns to the
    /// snapshot — each container enter/exit adjusts the level exactly
    /// once.
    pub async fn skip_value(&mut self) -> Result<(), ParseError> {
        self.begin_value().await?;
        let base = self.depth;
        self.skip_step().await?;
        while self.depth > base {
            self.skip_step().await?;
        }
        self.value_done();
        Ok(())
    }

    /// Consumes one lexical unit while skipping: a scalar, a structural
    /// byte, or a separator.
    async fn skip_step(&mut self) -> Result<(), ParseError> {
        self.stream.skip_whitespace().await?;
        match self.stream.current() {
            None => Err(ParseError::ReadPastEndOfStream),
            Some('{' | '[') => {
                self.depth += 1;
                self.stream.advance().await
            }
            Some('}' | ']') => {
                self.depth -= 1;
                self.stream.advance().await
            }
            Some(',' | ':') => self.stream.advance().await,
            Some('"') => self.scan_string(None).await,
            Some('t') => self.read_keyword("true").await,
            Some('f') => self.read_keyword("false").await,
            Some('n') => self.read_keyword("null").await,
            Some(c) if c == '-' || c.is_ascii_digit() => self.lex_number().await.map(|_| ()),
            Some(c) => Err(ParseError::UnexpectedCharacter(c)),
        }
    }

    // --------------------------------------------------------------------
    // Token recognizers
    // --------------------------------------------------------------------

    /// Matches `word` byte by byte; the parser is on its first character.
    /// Leaves the parser on the terminator after the keyword.
    pub(crate) async fn read_keyword(&mut self, word: &'static str) -> Result<(), ParseError> {
        let mut chars = word.chars();
        let first = chars.next();
        debug_assert_eq!(self.stream.current(), first);
        for expected in chars {
            self.stream.advance().await?;
            match self.stream.current() {
                Some(c) if c == expected => {}
                other => {
                    return Err(ParseError::ExpectedCharacter {
                        expected,
                        found: other.into(),
                    });
                }
            }
        }
        self.stream.advance().await
    }

    /// Lexes a number starting at the current `-` or digit. Leaves the
    /// parser on the terminator.
    async fn lex_number(&mut self) -> Result<f64, ParseError> {
        self.scratch.clear();

        if self.stream.current() == Some('-') {
            self.scratch.push('-');
            self.stream.advance().await?;
        }

        match self.stream.current() {
            Some('0') => {
                self.scratch.push('0');
                self.stream.advance().await?;
                if matches!(self.stream.current(), Some(c) if c.is_ascii_digit()) {
                    return Err(ParseError::MalformedNumber(
                        "leading zero in integer part".into(),
                    ));
                }
            }
            Some(c @ '1'..='9') => {
                self.scratch.push(c);
                self.stream.advance().await?;
                self.lex_digits().await?;
            }
            other => {
                return Err(ParseError::MalformedNumber(format!(
                    "expected digit, got {}",
                    Found::from(other)
                )));
            }
        }

        if self.stream.current() == Some('.') {
            self.scratch.push('.');
            self.stream.advance().await?;
            self.require_digit("expected digit after decimal point")
                .await?;
            self.lex_digits().await?;
        }

        if matches!(self.stream.current(), Some('e' | 'E')) {
            self.scratch.push('e');
            self.stream.advance().await?;
            if let Some(sign @ ('+' | '-')) = self.stream.current() {
                self.scratch.push(sign);
                self.stream.advance().await?;
            }
            self.require_digit("expected digit in exponent").await?;
            self.lex_digits().await?;
        }

        // The lexed text is a valid f64 literal by construction.
        let value: f64 = self.scratch.parse().unwrap();
        if !value.is_finite() {
            return Err(ParseError::MalformedNumber(format!(
                "number out of range: {}",
                self.scratch
            )));
        }
        Ok(value)
    }

    async fn require_digit(&mut self, context: &str) -> Result<(), ParseError> {
        match self.stream.current() {
            Some(c) if c.is_ascii_digit() => {
                self.scratch.push(c);
                self.stream.advance().await
            }
            other => Err(ParseError::MalformedNumber(format!(
                "{context}, got {}",
                Found::from(other)
            ))),
        }
    }

    async fn lex_digits(&mut self) -> Result<(), ParseError> {
        while let Some(c) = self.stream.current() {
            if !c.is_ascii_digit() {
                break;
            }
            self.scratch.push(c);
            self.stream.advance().await?;
        }
        Ok(())
    }

    /// Consumes a string literal, the parser sitting on the opening
    /// quote. Decoded characters go to `out` when present; skipping
    /// passes `None` and allocates nothing. Leaves the parser on the
    /// character after the closing quote.
    pub(crate) async fn scan_string(
        &mut self,
        mut out: Option<&mut String>,
    ) -> Result<(), ParseError> {
        debug_assert_eq!(self.stream.current(), Some('"'));
        self.stream.advance().await?;
        loop {
            match self.stream.current() {
                None => return Err(ParseError::ReadPastEndOfStream),
                Some('"') => {
                    self.stream.advance().await?;
                    return Ok(());
                }
                Some('\\') => self.read_escape(out.as_deref_mut()).await?,
                Some(c) => {
                    if let Some(out) = out.as_deref_mut() {
                        out.push(c);
                    }
                    self.stream.advance().await?;
                }
            }
        }
    }

    /// Reads an object key, the cursor having already skipped whitespace.
    pub(crate) async fn read_object_key(&mut self) -> Result<String, ParseError> {
        match self.stream.current() {
            Some('"') => {
                let mut key = String::new();
                self.scan_string(Some(&mut key)).await?;
                Ok(key)
            }
            other => Err(ParseError::ExpectedCharacter {
                expected: '"',
                found: other.into(),
            }),
        }
    }

    /// Decodes one escape sequence, the parser sitting on the backslash.
    /// Leaves the parser on the character after the escape.
    ///
    /// Each `\uXXXX` names a 16-bit code unit. A high surrogate must be
    /// followed immediately by a `\uXXXX` low surrogate and the pair is
    /// recombined into a single code point; anything else unpaired is
    /// `InvalidUnicodeEscape`, since a lone surrogate has no
    /// representation in a Rust string.
    async fn read_escape(&mut self, out: Option<&mut String>) -> Result<(), ParseError> {
        debug_assert_eq!(self.stream.current(), Some('\\'));
        self.stream.advance().await?;
        let decoded = match self.stream.current() {
            None => return Err(ParseError::IncompleteEscape),
            Some('"') => '"',
            Some('\\') => '\\',
            Some('/') => '/',
            Some('b') => '\u{0008}',
            Some('f') => '\u{000C}',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            Some('u') => {
                let unit = self.read_hex_unit().await?;
                match unit {
                    0xD800..=0xDBFF => self.read_low_surrogate(unit).await?,
                    0xDC00..=0xDFFF => {
                        return Err(ParseError::InvalidUnicodeEscape(format!(
                            "unpaired low surrogate \\u{unit:04X}"
                        )));
                    }
                    // Any other 16-bit unit is a valid scalar value.
                    _ => char::from_u32(u32::from(unit)).unwrap(),
                }
            }
            Some(c) => return Err(ParseError::InvalidEscape(c)),
        };
        if let Some(out) = out {
            out.push(decoded);
        }
        self.stream.advance().await
    }

    /// Consumes `uXXXX`, the parser sitting on the `u`. Leaves the parser
    /// on the final hex digit.
    async fn read_hex_unit(&mut self) -> Result<u16, ParseError> {
        debug_assert_eq!(self.stream.current(), Some('u'));
        self.escape.reset();
        loop {
            self.stream.advance().await?;
            match self.stream.current() {
                None => return Err(ParseError::IncompleteEscape),
                Some(c) => {
                    if let Some(unit) = self.escape.feed(c)? {
                        return Ok(unit);
                    }
                }
            }
        }
    }

    /// Reads the `\uXXXX` low half that must follow a high surrogate and
    /// recombines the pair.
    async fn read_low_surrogate(&mut self, high: u16) -> Result<char, ParseError> {
        self.stream.advance().await?;
        if self.stream.current() != Some('\\') {
            return Err(ParseError::InvalidUnicodeEscape(format!(
                "unpaired high surrogate \\u{high:04X}"
            )));
        }
        self.stream.advance().await?;
        if self.stream.current() != Some('u') {
            return Err(ParseError::InvalidUnicodeEscape(format!(
                "unpaired high surrogate \\u{high:04X}"
            )));
        }
        let low = self.read_hex_unit().await?;
        if !(0xDC00..=0xDFFF).contains(&low) {
            return Err(ParseError::InvalidUnicodeEscape(format!(
                "expected low surrogate after \\u{high:04X}, got \\u{low:04X}"
            )));
        }
        let code = 0x10000 + ((u32::from(high) - 0xD800) << 10) + (u32::from(low) - 0xDC00);
        // Supplementary-plane code points are always valid scalars.
        Ok(char::from_u32(code).unwrap())
    }
}

/// A one-shot reader yielding the decoded fragments of a single string
/// value.
///
/// Obtained from [`PullParser::read_string_chunked`] or
/// [`Unparsed::read_string_chunked`](crate::Unparsed::read_string_chunked).
/// Each [`next`](StringChunks::next) call returns `Some(fragment)` until
/// the closing quote, then `None`. Fragments are never empty.
///
/// Abandoning the reader before it returns `None` leaves the parser in
/// the middle of the string; touching the parser afterwards other than
/// through this reader is unspecified usage.
#[derive(Debug)]
pub struct StringChunks {
    done: bool,
    /// The previous fragment ended with a consumed character still in the
    /// current slot; pull past it before scanning again.
    needs_advance: bool,
}

impl StringChunks {
    /// Yields the next decoded fragment, or `None` once the string has
    /// ended.
    ///
    /// A fragment is handed out as soon as locally buffered data runs out
    /// mid-string, before awaiting the source; escape sequences split
    /// across chunks are decoded across the boundary.
    pub async fn next<S: ChunkSource>(
        &mut self,
        parser: &mut PullParser<S>,
    ) -> Result<Option<String>, ParseError> {
        if self.done {
            return Ok(None);
        }
        if self.needs_advance {
            parser.stream.advance().await?;
            self.needs_advance = false;
        }
        let mut fragment = String::new();
        loop {
            match parser.stream.current() {
                None => return Err(ParseError::ReadPastEndOfStream),
                Some('"') => {
                    parser.stream.advance().await?;
                    self.done = true;
                    parser.value_done();
                    return Ok(if fragment.is_empty() {
                        None
                    } else {
                        Some(fragment)
                    });
                }
                Some('\\') => parser.read_escape(Some(&mut fragment)).await?,
                Some(c) => {
                    fragment.push(c);
                    if !parser.stream.advance_if_buffered() {
                        self.needs_advance = true;
                        return Ok(Some(fragment));
                    }
                }
            }
        }
    }
}
