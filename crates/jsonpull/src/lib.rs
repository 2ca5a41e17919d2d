//! Incremental pull parsing for JSON arriving over an async stream of
//! text chunks, built for consuming a language model's token-by-token
//! output.
//!
//! The core is [`PullParser`]: point it at any
//! `futures::Stream<Item = String>` and walk the transmitted value while
//! it is still arriving. Objects and arrays are traversed lazily through
//! [`ObjectCursor`] and [`ArrayCursor`], which yield one-shot
//! [`Unparsed`] handles per child and automatically skip whatever the
//! consumer ignores; long strings can be drained fragment by fragment
//! through [`StringChunks`] without waiting for the closing quote.
//! Fragments may split any token, keyword, number, or escape sequence.
//!
//! Two companions share the same incremental-stream shape:
//! [`SegmentSplitter`] separates prose from `<plan>`-tagged reasoning in
//! a model's text channel, and [`SyncedReducer`] folds dispatched actions
//! into a state while mirroring them onto an outbound stream.
//!
//! ```
//! use futures::{executor::block_on, stream};
//! use jsonpull::{ParseError, PullParser};
//!
//! let chunks = stream::iter(vec![
//!     r#"{"files": [{"path": "main.rs"#.to_string(),
//!     r#""}], "done": true}"#.to_string(),
//! ]);
//! let mut parser = PullParser::new(chunks);
//! block_on(async {
//!     let mut obj = parser.enter_object().await?;
//!     while let Some(mut entry) = obj.next_entry(&mut parser).await? {
//!         if entry.key == "done" {
//!             assert!(entry.value.read_bool(&mut parser).await?);
//!         }
//!     }
//!     Ok::<_, ParseError>(())
//! })
//! .unwrap();
//! ```

mod cursor;
mod error;
mod escape_buffer;
mod parser;
mod reducer;
mod splitter;
mod stream;
mod value;

pub use cursor::{ArrayCursor, ArrayElement, ObjectCursor, ObjectEntry, Unparsed};
pub use error::{Found, ParseError};
pub use parser::{PullParser, StringChunks, ValueKind};
pub use reducer::SyncedReducer;
pub use splitter::{SegmentDelta, SegmentKind, SegmentSplitter};
pub use stream::ChunkSource;
pub use value::{Array, Map, Value};

#[cfg(test)]
mod tests;
