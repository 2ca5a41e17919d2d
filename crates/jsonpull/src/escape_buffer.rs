//! Buffering and decoding of four-digit Unicode escape sequences.
//!
//! [`UnicodeEscapeBuffer`] accumulates up to four ASCII hexadecimal digits
//! (`0-9`, `A-F`, `a-f`) and converts them to the corresponding 16-bit
//! code unit once exactly four digits have been provided. After a
//! successful conversion the buffer resets automatically for the next
//! escape. Surrogate pairing happens one layer up, in the string reader,
//! which sees the raw code units this buffer produces.

use crate::error::ParseError;

#[derive(Debug)]
pub(crate) struct UnicodeEscapeBuffer {
    buffer: [u8; 4],
    len: u8,
}

impl UnicodeEscapeBuffer {
    pub(crate) fn new() -> Self {
        Self {
            buffer: [0; 4],
            len: 0,
        }
    }

    /// Clears any accumulated digits.
    pub(crate) fn reset(&mut self) {
        self.len = 0;
    }

    /// Feeds one character of a `\uXXXX` escape.
    ///
    /// Returns `Ok(None)` while fewer than four digits have arrived and
    /// `Ok(Some(unit))` once the fourth digit completes the code unit.
    /// A non-hex character fails with `InvalidUnicodeEscape`.
    pub(crate) fn feed(&mut self, c: char) -> Result<Option<u16>, ParseError> {
        if !c.is_ascii_hexdigit() {
            return Err(ParseError::InvalidUnicodeEscape(format!(
                "'{c}' is not a hex digit"
            )));
        }

        debug_assert!(self.len < 4, "escape buffer overfilled");
        self.buffer[self.len as usize] = c as u8;
        self.len += 1;

        if self.len < 4 {
            return Ok(None);
        }

        // The four bytes are ASCII hex digits by construction.
        let hex = core::str::from_utf8(&self.buffer).unwrap();
        let unit = u16::from_str_radix(hex, 16).unwrap();
        self.reset();
        Ok(Some(unit))
    }
}
