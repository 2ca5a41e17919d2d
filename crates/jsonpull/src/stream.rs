//! One-character-at-a-time façade over an async stream of text chunks.
//!
//! The adapter owns the source stream and at most one pending chunk. The
//! single `current` slot holds the next unconsumed character, or `None`
//! once the stream has cleanly ended. Together the slot and the unread
//! tail of the pending chunk are a lossless view of everything the source
//! has produced but the parser has not yet consumed.
//!
//! Chunks arrive as `String`s, so a fragment can never split a multi-byte
//! code point; it can, however, split a token, a keyword, or an escape
//! sequence anywhere, and the lexing layers above are built around that.

use futures::{Stream, StreamExt};

use crate::error::ParseError;

/// A pull-style producer of text fragments.
///
/// End of input is signalled by the stream finishing. Blanket-implemented
/// for every `Stream<Item = String> + Unpin`.
pub trait ChunkSource: Stream<Item = String> + Unpin {}

impl<S> ChunkSource for S where S: Stream<Item = String> + Unpin {}

#[derive(Debug)]
pub(crate) struct ChunkStream<S> {
    source: S,
    /// Set once the source has returned its end-of-stream marker.
    exhausted: bool,
    chunk: String,
    offset: usize,
    current: Option<char>,
    /// Count of characters consumed, for diagnostics.
    pos: u64,
}

impl<S: ChunkSource> ChunkStream<S> {
    pub(crate) fn new(source: S) -> Self {
        Self {
            source,
            exhausted: false,
            chunk: String::new(),
            offset: 0,
            current: None,
            pos: 0,
        }
    }

    /// The character most recently pulled, or `None` at start of life and
    /// after clean end of stream.
    #[inline]
    pub(crate) fn current(&self) -> Option<char> {
        self.current
    }

    /// Count of characters consumed so far.
    pub(crate) fn position(&self) -> u64 {
        self.pos
    }

    #[inline]
    fn buffered_char(&self) -> Option<char> {
        self.chunk[self.offset..].chars().next()
    }

    /// Pull one more character, drawing the next chunk from the source if
    /// the local buffer is exhausted.
    ///
    /// Clean end of stream parks the slot at `None`; advancing again once
    /// the slot is already empty fails with `ReadPastEndOfStream`.
    pub(crate) async fn advance(&mut self) -> Result<(), ParseError> {
        loop {
            if let Some(ch) = self.buffered_char() {
                self.offset += ch.len_utf8();
                self.current = Some(ch);
                self.pos += 1;
                return Ok(());
            }

            if self.exhausted {
                if self.current.is_none() {
                    return Err(ParseError::ReadPastEndOfStream);
                }
                self.current = None;
                return Ok(());
            }

            match self.source.next().await {
                Some(chunk) => {
                    // Empty fragments are legal; keep pulling.
                    self.chunk = chunk;
                    self.offset = 0;
                }
                None => self.exhausted = true,
            }
        }
    }

    /// Advance only if a character is locally buffered; never awaits.
    ///
    /// The chunked string reader uses this to hand accumulated fragments
    /// to the consumer the moment local data runs out, instead of holding
    /// them while blocked on the source.
    #[inline]
    pub(crate) fn advance_if_buffered(&mut self) -> bool {
        match self.buffered_char() {
            Some(ch) => {
                self.offset += ch.len_utf8();
                self.current = Some(ch);
                self.pos += 1;
                true
            }
            None => false,
        }
    }

    /// Skip the JSON whitespace set: space, tab, CR, LF.
    ///
    /// Pulls a first character if the slot is empty at entry, so callers
    /// may invoke it at start of life.
    pub(crate) async fn skip_whitespace(&mut self) -> Result<(), ParseError> {
        if self.current.is_none() {
            self.advance().await?;
        }
        while matches!(self.current, Some(' ' | '\t' | '\r' | '\n')) {
            self.advance().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use futures::stream;

    use super::*;

    fn chunked(chunks: &[&str]) -> ChunkStream<impl ChunkSource> {
        let owned: Vec<String> = chunks.iter().map(|s| (*s).to_owned()).collect();
        ChunkStream::new(stream::iter(owned))
    }

    #[test]
    fn advances_across_chunk_boundaries() {
        block_on(async {
            let mut s = chunked(&["ab", "", "c"]);
            s.advance().await.unwrap();
            assert_eq!(s.current(), Some('a'));
            s.advance().await.unwrap();
            assert_eq!(s.current(), Some('b'));
            s.advance().await.unwrap();
            assert_eq!(s.current(), Some('c'));
            s.advance().await.unwrap();
            assert_eq!(s.current(), None);
        });
    }

    #[test]
    fn read_past_end_fails() {
        block_on(async {
            let mut s = chunked(&["x"]);
            s.advance().await.unwrap();
            s.advance().await.unwrap();
            assert_eq!(s.current(), None);
            assert_eq!(
                s.advance().await.unwrap_err(),
                ParseError::ReadPastEndOfStream
            );
        });
    }

    #[test]
    fn empty_stream_fails_on_first_pull() {
        block_on(async {
            let mut s = chunked(&[]);
            assert_eq!(
                s.advance().await.unwrap_err(),
                ParseError::ReadPastEndOfStream
            );
        });
    }

    #[test]
    fn advance_if_buffered_refuses_to_await() {
        block_on(async {
            let mut s = chunked(&["ab", "c"]);
            s.advance().await.unwrap();
            assert!(s.advance_if_buffered());
            assert_eq!(s.current(), Some('b'));
            // The next character lives in the second chunk.
            assert!(!s.advance_if_buffered());
            assert_eq!(s.current(), Some('b'));
            s.advance().await.unwrap();
            assert_eq!(s.current(), Some('c'));
        });
    }

    #[test]
    fn skips_json_whitespace_only() {
        block_on(async {
            let mut s = chunked(&[" \t\r\n", " x"]);
            s.skip_whitespace().await.unwrap();
            assert_eq!(s.current(), Some('x'));
            assert_eq!(s.position(), 6);
        });
    }
}
