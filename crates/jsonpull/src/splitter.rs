//! Splits a growing text stream into alternating prose and reasoning
//! segments.
//!
//! Model output interleaves ordinary prose with reasoning wrapped in
//! literal `<plan>` ... `</plan>` markers. [`SegmentSplitter`] scans
//! appended fragments and produces [`SegmentDelta`]s, tolerating marker
//! fragments at chunk boundaries and never mistaking lookalikes
//! (`<play>`, a bare `x < y`) for markers. Deltas belonging to one
//! contiguous segment share a generation id, reissued at every mode
//! transition, so downstream consumers can coalesce them.
//!
//! At any moment the machine is looking for exactly one marker: the
//! opener while in prose mode, the closer while in reasoning mode. A
//! partially matched marker at the end of an `append` is retained as
//! lookahead for the next call.

use crate::error::ParseError;

const OPEN_MARKER: &str = "<plan>";
const CLOSE_MARKER: &str = "</plan>";

/// Which side of the markers a delta belongs to.
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Prose,
    Reasoning,
}

/// One emitted slice of segment text.
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentDelta {
    pub kind: SegmentKind,
    /// Constant across deltas of one contiguous segment; reissued at
    /// every mode transition.
    pub generation: u64,
    pub text: String,
}

/// Two-mode state machine over appended text fragments.
#[derive(Debug, Default)]
pub struct SegmentSplitter {
    mode: SegmentKind,
    /// Characters of the current marker matched so far. The lookahead
    /// buffer is exactly `marker[..matched]`.
    matched: usize,
    generation: u64,
}

impl Default for SegmentKind {
    fn default() -> Self {
        SegmentKind::Prose
    }
}

impl SegmentSplitter {
    /// Starts in prose mode with generation 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The marker currently being looked for.
    fn marker(&self) -> &'static str {
        match self.mode {
            SegmentKind::Prose => OPEN_MARKER,
            SegmentKind::Reasoning => CLOSE_MARKER,
        }
    }

    /// Scans one appended fragment and returns the deltas it produced.
    ///
    /// Any accumulated text left at the end of the fragment is flushed as
    /// a delta; only a partially matched marker survives the call, as
    /// lookahead for the next `append`.
    pub fn append(&mut self, fragment: &str) -> Vec<SegmentDelta> {
        let mut out = Vec::new();
        let mut acc = String::new();

        for c in fragment.chars() {
            // Runs at most twice: a mismatch with pending lookahead
            // rewinds once, then the character either starts a new match
            // or joins the accumulator.
            loop {
                let marker = self.marker();
                let expected = marker.as_bytes()[self.matched] as char;
                if c == expected {
                    self.matched += 1;
                    if self.matched == marker.len() {
                        if !acc.is_empty() {
                            out.push(self.delta(std::mem::take(&mut acc)));
                        }
                        self.transition();
                    }
                    break;
                } else if self.matched > 0 {
                    // The matched prefix was ordinary content after all.
                    // Re-examining only the current character is sound
                    // because '<' occurs in the markers at position 0
                    // only, so no new match can start inside the prefix.
                    acc.push_str(&marker[..self.matched]);
                    self.matched = 0;
                } else {
                    acc.push(c);
                    break;
                }
            }
        }

        if !acc.is_empty() {
            out.push(self.delta(acc));
        }
        out
    }

    /// Resets for an independent stream: back to prose mode, fresh
    /// generation.
    ///
    /// A marker prefix left dangling in the lookahead buffer means the
    /// previous stream was cut mid-marker; resetting over it is a
    /// programmer error and fails with `DirtyReset`.
    pub fn reset(&mut self) -> Result<(), ParseError> {
        if self.matched != 0 {
            return Err(ParseError::DirtyReset);
        }
        self.mode = SegmentKind::Prose;
        self.generation += 1;
        Ok(())
    }

    fn delta(&self, text: String) -> SegmentDelta {
        SegmentDelta {
            kind: self.mode,
            generation: self.generation,
            text,
        }
    }

    fn transition(&mut self) {
        self.mode = match self.mode {
            SegmentKind::Prose => SegmentKind::Reasoning,
            SegmentKind::Reasoning => SegmentKind::Prose,
        };
        self.matched = 0;
        self.generation += 1;
    }
}
