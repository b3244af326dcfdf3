//! Message content parsing.
//!
//! Replies from the assistant mix prose with three kinds of inline markup,
//! listed here from highest to lowest precedence:
//!
//! - `[MAP: <lat>,<lng>]` embeds a map centered on the given point,
//! - `![<alt>](<url>)` embeds an image,
//! - `**<text>**` marks bold text.
//!
//! [`parse`] turns a message into an ordered list of [`Segment`]s in a single
//! left-to-right pass. At each position that could open a markup construct a
//! bounded lookahead decides whether the construct is complete. A construct
//! never swallows a construct of higher precedence: an image that would
//! contain a map tag is not an image, and bold text ends neither across a map,
//! an image, nor a line break. Anything that is not valid markup stays in the
//! output verbatim, so the parser never fails and is safe to call on every
//! partial text of a streaming reply.

use crate::types::{MapReference, Segment};

/// Splits message text into renderable segments.
///
/// Plain text between markup is carried over byte for byte; empty fragments
/// are dropped, so the empty string yields no segments and text without
/// markup yields exactly one [`Segment::PlainText`].
///
/// # Examples
///
/// ```
/// use nomadia::{Segment, parse};
///
/// let segments = parse("[MAP: 36.8, 10.3] see **here**");
/// assert_eq!(
///     segments,
///     vec![
///         Segment::map(36.8, 10.3),
///         Segment::plain(" see "),
///         Segment::bold("here"),
///     ]
/// );
/// ```
pub fn parse(text: &str) -> Vec<Segment> {
    Tokenizer::new(text).run()
}

/// Where the next closing byte of each kind sits, for every offset.
///
/// Entries stop at line breaks: `next_bracket[i]` is the first `]` or line
/// break at or after `i`, or the text length. With these, recognizing an
/// image or asking whether a span holds a map tag takes constant time, so a
/// line full of unclosed `![` stays linear.
struct Horizons {
    next_bracket: Vec<usize>,
    next_paren: Vec<usize>,
    next_map: Vec<usize>,
}

impl Horizons {
    fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let len = bytes.len();
        let mut next_bracket = vec![len; len + 1];
        let mut next_paren = vec![len; len + 1];
        let mut next_map = vec![len; len + 1];
        for pos in (0..len).rev() {
            let byte = bytes[pos];
            next_bracket[pos] = if byte == b']' || is_line_break(byte) {
                pos
            } else {
                next_bracket[pos + 1]
            };
            next_paren[pos] = if byte == b')' || is_line_break(byte) {
                pos
            } else {
                next_paren[pos + 1]
            };
            // Map tag attempts never overlap a `[`, so this is linear overall.
            next_map[pos] = if byte == b'[' && map_tag_at(text, pos).is_some() {
                pos
            } else {
                next_map[pos + 1]
            };
        }
        Self {
            next_bracket,
            next_paren,
            next_map,
        }
    }
}

struct Tokenizer<'a> {
    text: &'a str,
    bytes: &'a [u8],
    horizons: Horizons,
    segments: Vec<Segment>,
    plain_start: usize,
    // No bold run opening before this offset can be closed.
    bold_dead_until: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            horizons: Horizons::new(text),
            segments: Vec::new(),
            plain_start: 0,
            bold_dead_until: 0,
        }
    }

    fn run(mut self) -> Vec<Segment> {
        let mut pos = 0;
        while pos < self.bytes.len() {
            let token = match self.bytes[pos] {
                b'[' if self.horizons.next_map[pos] == pos => map_tag_at(self.text, pos)
                    .map(|(map, end)| (Some(Segment::MapReference(map)), end)),
                b'!' => self
                    .image_at(pos)
                    .map(|(alt, url, end)| (Some(Segment::image(alt, url)), end)),
                b'*' => self.bold_at(pos).map(|(text, end)| {
                    let segment = (!text.is_empty()).then(|| Segment::bold(text));
                    (segment, end)
                }),
                _ => None,
            };
            match token {
                Some((segment, end)) => {
                    self.flush_plain(pos);
                    if let Some(segment) = segment {
                        self.segments.push(segment);
                    }
                    pos = end;
                    self.plain_start = end;
                }
                // Markup bytes are ASCII, so stepping byte-wise never splits
                // a character at a position that is later sliced.
                None => pos += 1,
            }
        }
        self.flush_plain(self.bytes.len());
        self.segments
    }

    fn flush_plain(&mut self, end: usize) {
        if end <= self.plain_start {
            return;
        }
        let fragment = &self.text[self.plain_start..end];
        if let Some(Segment::PlainText { text }) = self.segments.last_mut() {
            text.push_str(fragment);
        } else {
            self.segments.push(Segment::plain(fragment));
        }
    }

    /// Recognizes `![<alt>](<url>)` starting at `start`.
    ///
    /// The alt text stops at the first `]` and the url at the first `)`;
    /// neither may span a line break, and the whole construct may not hold a
    /// map tag.
    fn image_at(&self, start: usize) -> Option<(&'a str, &'a str, usize)> {
        if self.bytes.get(start + 1) != Some(&b'[') {
            return None;
        }
        let alt_start = start + 2;
        let alt_end = self.horizons.next_bracket[alt_start];
        if self.bytes.get(alt_end) != Some(&b']') || self.bytes.get(alt_end + 1) != Some(&b'(') {
            return None;
        }
        let url_end = self.horizons.next_paren[alt_end + 2];
        if self.bytes.get(url_end) != Some(&b')') {
            return None;
        }
        let end = url_end + 1;
        if self.horizons.next_map[start + 1] < end {
            return None;
        }
        Some((
            &self.text[alt_start..alt_end],
            &self.text[alt_end + 2..url_end],
            end,
        ))
    }

    /// Recognizes `**<text>**` starting at `start`, closing at the nearest
    /// `**` on the same line that is not preceded by a map or an image.
    fn bold_at(&mut self, start: usize) -> Option<(&'a str, usize)> {
        if self.bytes.get(start + 1) != Some(&b'*') || start < self.bold_dead_until {
            return None;
        }
        let content_start = start + 2;
        let mut pos = content_start;
        while let Some(&byte) = self.bytes.get(pos) {
            let boundary = match byte {
                b'*' if self.bytes.get(pos + 1) == Some(&b'*') => {
                    return Some((&self.text[content_start..pos], pos + 2));
                }
                b'[' => self.horizons.next_map[pos] == pos,
                b'!' => self.image_at(pos).is_some(),
                byte => is_line_break(byte),
            };
            if boundary {
                self.bold_dead_until = pos;
                return None;
            }
            pos += 1;
        }
        self.bold_dead_until = self.bytes.len();
        None
    }
}

/// Recognizes `[MAP:\s*<num>,\s*<num>]` starting at `start`.
fn map_tag_at(text: &str, start: usize) -> Option<(MapReference, usize)> {
    let mut cursor = Cursor::new(text, start);
    cursor.eat_literal("[MAP:")?;
    cursor.skip_whitespace();
    let latitude = cursor.number()?;
    cursor.eat(b',')?;
    cursor.skip_whitespace();
    let longitude = cursor.number()?;
    cursor.eat(b']')?;
    Some((MapReference::new(latitude, longitude), cursor.pos))
}

fn is_line_break(byte: u8) -> bool {
    matches!(byte, b'\n' | b'\r')
}

/// Byte cursor for the map tag grammar.
struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str, pos: usize) -> Self {
        Self { text, pos }
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn eat(&mut self, expected: u8) -> Option<()> {
        (self.peek()? == expected).then(|| self.pos += 1)
    }

    fn eat_literal(&mut self, literal: &str) -> Option<()> {
        let rest = self.text.as_bytes().get(self.pos..)?;
        rest.starts_with(literal.as_bytes())
            .then(|| self.pos += literal.len())
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|byte| byte.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn skip_digits(&mut self) -> usize {
        let start = self.pos;
        while self.peek().is_some_and(|byte| byte.is_ascii_digit()) {
            self.pos += 1;
        }
        self.pos - start
    }

    /// Reads `-?\d+(\.\d+)?` as a float.
    fn number(&mut self) -> Option<f64> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        if self.skip_digits() == 0 {
            return None;
        }
        let integer_end = self.pos;
        if self.peek() == Some(b'.') {
            self.pos += 1;
            if self.skip_digits() == 0 {
                // A dot without digits is not part of the number.
                self.pos = integer_end;
            }
        }
        self.text[start..self.pos].parse().ok()
    }
}
