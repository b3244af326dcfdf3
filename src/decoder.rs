//! Incremental UTF-8 decoding of a byte stream.

use std::str;

/// Replacement for byte sequences that are not valid UTF-8.
const REPLACEMENT: char = '\u{FFFD}';

/// Decodes a byte stream into text one read at a time.
///
/// A multi-byte character split across two reads is held back until its
/// remaining bytes arrive, so no read ever yields half a character. Invalid
/// sequences decode to U+FFFD instead of failing the stream.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the decoder holds the start of an unfinished character.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Decodes the next read, returning every complete character it finishes.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(bytes);

        let mut text = String::with_capacity(input.len());
        let mut rest = input.as_slice();
        loop {
            match str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            text.push(REPLACEMENT);
                            rest = &after[len..];
                        }
                        None => {
                            // Truncated sequence at the end: wait for more bytes.
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        text
    }

    /// Flushes the decoder at end of stream.
    ///
    /// An unfinished character left over at this point can never complete and
    /// decodes to a single U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            REPLACEMENT.to_string()
        }
    }
}
