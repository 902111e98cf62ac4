//! Size-bounded text segmentation.
//!
//! Length is counted in `char`s and every cut falls on a char boundary, so
//! multi-byte text is never split inside a code point.

/// Chunk size for framed delivery.
pub const PROCESS_LIMIT: usize = 4000;

/// Chunk size for paced raw delivery.
pub const SEND_LIMIT: usize = 2000;

/// One ordered part of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseChunk {
    /// Position in the sequence, from 0. Part 0 carries the answer framing.
    pub index: usize,
    pub text: String,
}

impl ResponseChunk {
    pub fn is_first(&self) -> bool {
        self.index == 0
    }
}

/// Iterator over contiguous pieces of at most `limit` chars.
///
/// A `limit` of 0 is treated as 1.
pub fn segments(text: &str, limit: usize) -> Segments<'_> {
    Segments {
        rest: text,
        limit: limit.max(1),
    }
}

/// Iterator returned by [`segments`].
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    rest: &'a str,
    limit: usize,
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            return None;
        }
        let cut = self
            .rest
            .char_indices()
            .nth(self.limit)
            .map_or(self.rest.len(), |(at, _)| at);
        let (head, tail) = self.rest.split_at(cut);
        self.rest = tail;
        Some(head)
    }
}

/// Split `text` into ordered chunks of at most `limit` chars.
///
/// Empty input yields no chunks; concatenating the chunk texts gives back
/// `text` exactly.
pub fn process_large(text: &str, limit: usize) -> Vec<ResponseChunk> {
    segments(text, limit)
        .enumerate()
        .map(|(index, piece)| ResponseChunk {
            index,
            text: piece.to_string(),
        })
        .collect()
}
