//! Lazy container traversal: object and array cursors, and the one-shot
//! value handles they yield.
//!
//! A cursor is a passive token; every operation takes the parser by
//! `&mut`, so exclusive access moves hand-over-hand between the consumer,
//! the cursor, and the current handle. Each entry or element comes with an
//! [`Unparsed`] handle authorizing exactly one typed read of the child
//! value. Values the consumer ignores are skipped automatically when the
//! cursor next advances, and the skipped-over handle becomes stale.
//!
//! Handles are bound to the parser that issued them; presenting a handle
//! to a different parser is unspecified usage.
//!
//! # Examples
//!
//! ```
//! use futures::{executor::block_on, stream};
//! use jsonpull::{ParseError, PullParser};
//!
//! let chunks = stream::iter(vec![r#"{"name": "Alice", "age": 30}"#.to_string()]);
//! let mut parser = PullParser::new(chunks);
//! block_on(async {
//!     let mut obj = parser.enter_object().await?;
//!     while let Some(mut entry) = obj.next_entry(&mut parser).await? {
//!         if entry.key == "age" {
//!             assert_eq!(entry.value.read_number(&mut parser).await?, 30.0);
//!         }
//!         // other values are skipped automatically
//!     }
//!     Ok::<_, ParseError>(())
//! })
//! .unwrap();
//! ```

use crate::error::ParseError;
use crate::parser::{classify, PullParser, StringChunks, ValueKind};
use crate::stream::ChunkSource;
use crate::value::{Array, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    /// Entered, nothing consumed yet.
    Fresh,
    /// `next_entry` / `next_element` has been called.
    Iterating,
    /// `value()` has materialized the container.
    Materialized,
    /// The closing brace/bracket has been consumed.
    Done,
}

/// One object entry: the key plus the handle for its unread value.
#[derive(Debug)]
pub struct ObjectEntry {
    pub key: String,
    pub value: Unparsed,
}

/// One array element: the running index plus the handle for its value.
#[derive(Debug)]
pub struct ArrayElement {
    pub index: usize,
    pub value: Unparsed,
}

/// Reconcile the previously issued handle before the cursor advances:
/// skip the value if nobody consumed it, and stale-out the handle.
async fn reconcile<S: ChunkSource>(parser: &mut PullParser<S>) -> Result<(), ParseError> {
    if parser.pending_skip {
        parser.pending_skip = false;
        parser.skip_value().await?;
    }
    parser.invalidate_handles();
    Ok(())
}

/// A lazy cursor over the entries of a JSON object.
///
/// Returned by [`PullParser::enter_object`] with the opening brace
/// already consumed. Iterate with
/// [`next_entry`](ObjectCursor::next_entry), or materialize everything
/// with [`value`](ObjectCursor::value); the two are mutually exclusive
/// and refusal is [`ParseError::AlreadyIterated`].
#[derive(Debug)]
pub struct ObjectCursor {
    state: CursorState,
    /// Parser depth while this container is the innermost one.
    depth: u32,
    cached: Option<Map>,
}

impl ObjectCursor {
    pub(crate) fn new(depth: u32) -> Self {
        Self {
            state: CursorState::Fresh,
            depth,
            cached: None,
        }
    }

    /// Advances to the next entry, first auto-skipping the previous
    /// entry's value if the consumer left it unread.
    ///
    /// Returns `None` once the closing brace has been consumed; the
    /// cursor is fused afterwards.
    pub async fn next_entry<S: ChunkSource>(
        &mut self,
        parser: &mut PullParser<S>,
    ) -> Result<Option<ObjectEntry>, ParseError> {
        match self.state {
            CursorState::Done => return Ok(None),
            CursorState::Materialized => return Err(ParseError::AlreadyIterated),
            CursorState::Fresh => {
                debug_assert_eq!(parser.depth, self.depth, "cursor used out of order");
                self.state = CursorState::Iterating;
                parser.stream.skip_whitespace().await?;
                if parser.stream.current() == Some('}') {
                    return self.close(parser).await;
                }
            }
            CursorState::Iterating => {
                reconcile(parser).await?;
                parser.stream.skip_whitespace().await?;
                match parser.stream.current() {
                    Some('}') => return self.close(parser).await,
                    Some(',') => {
                        parser.stream.advance().await?;
                        parser.stream.skip_whitespace().await?;
                    }
                    other => {
                        return Err(ParseError::ExpectedOneOf {
                            expected: &[',', '}'],
                            found: other.into(),
                        });
                    }
                }
            }
        }

        let key = parser.read_object_key().await?;
        parser.stream.skip_whitespace().await?;
        match parser.stream.current() {
            Some(':') => parser.stream.advance().await?,
            other => {
                return Err(ParseError::ExpectedCharacter {
                    expected: ':',
                    found: other.into(),
                });
            }
        }
        let value = Unparsed::issue(parser);
        Ok(Some(ObjectEntry { key, value }))
    }

    async fn close<S: ChunkSource>(
        &mut self,
        parser: &mut PullParser<S>,
    ) -> Result<Option<ObjectEntry>, ParseError> {
        parser.stream.advance().await?;
        parser.exit_container();
        self.state = CursorState::Done;
        Ok(None)
    }

    /// Materializes the remaining object eagerly into a [`Map`].
    ///
    /// Refused with `AlreadyIterated` once iteration has begun. A second
    /// call returns the same cached result.
    pub async fn value<S: ChunkSource>(
        &mut self,
        parser: &mut PullParser<S>,
    ) -> Result<Map, ParseError> {
        match self.state {
            CursorState::Iterating | CursorState::Done => {
                return Err(ParseError::AlreadyIterated);
            }
            CursorState::Materialized => {
                // `cached` is always set in this state.
                return Ok(self.cached.clone().unwrap());
            }
            CursorState::Fresh => {}
        }
        debug_assert_eq!(parser.depth, self.depth, "cursor used out of order");

        let mut map = Map::new();
        let mut first = true;
        loop {
            parser.stream.skip_whitespace().await?;
            if first {
                first = false;
                if parser.stream.current() == Some('}') {
                    parser.stream.advance().await?;
                    parser.exit_container();
                    break;
                }
            } else {
                match parser.stream.current() {
                    Some('}') => {
                        parser.stream.advance().await?;
                        parser.exit_container();
                        break;
                    }
                    Some(',') => {
                        parser.stream.advance().await?;
                        parser.stream.skip_whitespace().await?;
                    }
                    other => {
                        return Err(ParseError::ExpectedOneOf {
                            expected: &[',', '}'],
                            found: other.into(),
                        });
                    }
                }
            }

            let key = parser.read_object_key().await?;
            parser.stream.skip_whitespace().await?;
            match parser.stream.current() {
                Some(':') => parser.stream.advance().await?,
                other => {
                    return Err(ParseError::ExpectedCharacter {
                        expected: ':',
                        found: other.into(),
                    });
                }
            }
            let val = parser.read_value().await?;
            map.insert(key, val);
        }

        self.state = CursorState::Materialized;
        self.cached = Some(map.clone());
        Ok(map)
    }
}

/// A lazy cursor over the elements of a JSON array.
///
/// Returned by [`PullParser::enter_array`] with the opening bracket
/// already consumed. The same one-shot rules as [`ObjectCursor`] apply.
#[derive(Debug)]
pub struct ArrayCursor {
    state: CursorState,
    depth: u32,
    next_index: usize,
    cached: Option<Array>,
}

impl ArrayCursor {
    pub(crate) fn new(depth: u32) -> Self {
        Self {
            state: CursorState::Fresh,
            depth,
            next_index: 0,
            cached: None,
        }
    }

    /// Advances to the next element, auto-skipping the previous element's
    /// value if it was left unread.
    pub async fn next_element<S: ChunkSource>(
        &mut self,
        parser: &mut PullParser<S>,
    ) -> Result<Option<ArrayElement>, ParseError> {
        match self.state {
            CursorState::Done => return Ok(None),
            CursorState::Materialized => return Err(ParseError::AlreadyIterated),
            CursorState::Fresh => {
                debug_assert_eq!(parser.depth, self.depth, "cursor used out of order");
                self.state = CursorState::Iterating;
                parser.stream.skip_whitespace().await?;
                if parser.stream.current() == Some(']') {
                    return self.close(parser).await;
                }
            }
            CursorState::Iterating => {
                reconcile(parser).await?;
                parser.stream.skip_whitespace().await?;
                match parser.stream.current() {
                    Some(']') => return self.close(parser).await,
                    Some(',') => {
                        parser.stream.advance().await?;
                        parser.stream.skip_whitespace().await?;
                    }
                    other => {
                        return Err(ParseError::ExpectedOneOf {
                            expected: &[',', ']'],
                            found: other.into(),
                        });
                    }
                }
            }
        }

        // Reject `[1,]` and `[,` before handing out a handle.
        classify(parser.stream.current())?;

        let index = self.next_index;
        self.next_index += 1;
        let value = Unparsed::issue(parser);
        Ok(Some(ArrayElement { index, value }))
    }

    async fn close<S: ChunkSource>(
        &mut self,
        parser: &mut PullParser<S>,
    ) -> Result<Option<ArrayElement>, ParseError> {
        parser.stream.advance().await?;
        parser.exit_container();
        self.state = CursorState::Done;
        Ok(None)
    }

    /// Materializes the remaining array eagerly.
    ///
    /// Refused with `AlreadyIterated` once iteration has begun. A second
    /// call returns the same cached result.
    pub async fn value<S: ChunkSource>(
        &mut self,
        parser: &mut PullParser<S>,
    ) -> Result<Array, ParseError> {
        match self.state {
            CursorState::Iterating | CursorState::Done => {
                return Err(ParseError::AlreadyIterated);
            }
            CursorState::Materialized => {
                return Ok(self.cached.clone().unwrap());
            }
            CursorState::Fresh => {}
        }
        debug_assert_eq!(parser.depth, self.depth, "cursor used out of order");

        let mut items = Array::new();
        let mut first = true;
        loop {
            parser.stream.skip_whitespace().await?;
            if first {
                first = false;
                if parser.stream.current() == Some(']') {
                    parser.stream.advance().await?;
                    parser.exit_container();
                    break;
                }
            } else {
                match parser.stream.current() {
                    Some(']') => {
                        parser.stream.advance().await?;
                        parser.exit_container();
                        break;
                    }
                    Some(',') => {
                        parser.stream.advance().await?;
                        parser.stream.skip_whitespace().await?;
                    }
                    other => {
                        return Err(ParseError::ExpectedOneOf {
                            expected: &[',', ']'],
                            found: other.into(),
                        });
                    }
                }
            }

            items.push(parser.read_value().await?);
        }

        self.state = CursorState::Materialized;
        self.cached = Some(items.clone());
        Ok(items)
    }
}

/// A one-shot capability to read exactly one container child.
///
/// Yielded by the cursors alongside each key or index. Calling a typed
/// reader consumes the handle; a second call is
/// [`ParseError::DoubleConsume`]. Once the owning cursor advances past
/// the entry, the handle is stale and every operation is
/// [`ParseError::StaleHandle`]. A handle the consumer never touches is
/// reconciled by the cursor, which skips the value without materializing
/// it.
#[derive(Debug)]
pub struct Unparsed {
    generation: u64,
    consumed: bool,
}

impl Unparsed {
    pub(crate) fn issue<S: ChunkSource>(parser: &mut PullParser<S>) -> Self {
        Self {
            generation: parser.issue_generation(),
            consumed: false,
        }
    }

    fn check<S: ChunkSource>(&self, parser: &PullParser<S>) -> Result<(), ParseError> {
        if self.consumed {
            return Err(ParseError::DoubleConsume);
        }
        if self.generation != parser.handle_generation() {
            return Err(ParseError::StaleHandle);
        }
        Ok(())
    }

    fn consume<S: ChunkSource>(&mut self, parser: &mut PullParser<S>) -> Result<(), ParseError> {
        self.check(parser)?;
        self.consumed = true;
        parser.pending_skip = false;
        Ok(())
    }

    /// Classifies the value without consuming the handle.
    pub async fn peek<S: ChunkSource>(
        &self,
        parser: &mut PullParser<S>,
    ) -> Result<ValueKind, ParseError> {
        self.check(parser)?;
        parser.peek_type().await
    }

    /// Reads the value as `null`.
    pub async fn read_null<S: ChunkSource>(
        &mut self,
        parser: &mut PullParser<S>,
    ) -> Result<(), ParseError> {
        self.consume(parser)?;
        parser.read_null().await
    }

    /// Reads the value as a boolean.
    pub async fn read_bool<S: ChunkSource>(
        &mut self,
        parser: &mut PullParser<S>,
    ) -> Result<bool, ParseError> {
        self.consume(parser)?;
        parser.read_bool().await
    }

    /// Reads the value as a number.
    pub async fn read_number<S: ChunkSource>(
        &mut self,
        parser: &mut PullParser<S>,
    ) -> Result<f64, ParseError> {
        self.consume(parser)?;
        parser.read_number().await
    }

    /// Reads the value as a fully decoded string.
    pub async fn read_string<S: ChunkSource>(
        &mut self,
        parser: &mut PullParser<S>,
    ) -> Result<String, ParseError> {
        self.consume(parser)?;
        parser.read_string().await
    }

    /// Reads the value as a string delivered in decoded fragments.
    pub async fn read_string_chunked<S: ChunkSource>(
        &mut self,
        parser: &mut PullParser<S>,
    ) -> Result<StringChunks, ParseError> {
        self.consume(parser)?;
        parser.read_string_chunked().await
    }

    /// Enters the value as a nested object.
    pub async fn enter_object<S: ChunkSource>(
        &mut self,
        parser: &mut PullParser<S>,
    ) -> Result<ObjectCursor, ParseError> {
        self.consume(parser)?;
        parser.enter_object().await
    }

    /// Enters the value as a nested array.
    pub async fn enter_array<S: ChunkSource>(
        &mut self,
        parser: &mut PullParser<S>,
    ) -> Result<ArrayCursor, ParseError> {
        self.consume(parser)?;
        parser.enter_array().await
    }

    /// Reads the value eagerly, whatever its type.
    pub async fn read_value<S: ChunkSource>(
        &mut self,
        parser: &mut PullParser<S>,
    ) -> Result<Value, ParseError> {
        self.consume(parser)?;
        parser.read_value().await
    }

    /// Skips the value explicitly instead of waiting for the cursor to
    /// reconcile it.
    pub async fn skip<S: ChunkSource>(
        &mut self,
        parser: &mut PullParser<S>,
    ) -> Result<(), ParseError> {
        self.consume(parser)?;
        parser.skip_value().await
    }
}
