//! Overlapping character-window text splitter.
//!
//! Splits document text into [`Chunk`]s of at most `chunk_size`
//! characters, with consecutive chunks sharing up to `overlap` characters.
//!
//! # Algorithm
//!
//! 1. Split the text into atomic units on a literal `separator`
//!    (default `"\n"`). Empty units between consecutive separators are
//!    kept, so every chunk is an exact substring of the input.
//! 2. Accumulate units into a buffer. The buffer length is the character
//!    count of its units joined by the separator.
//! 3. When the next unit would push the buffer past `chunk_size`, emit
//!    the buffer, then drop units from its front until what is left is
//!    at most `overlap` characters *and* leaves room for the next unit.
//!    The survivors are the leading overlap of the next chunk.
//! 4. A unit longer than `chunk_size` is never cut under
//!    [`OversizedUnits::Preserve`]: it becomes a chunk of its own.
//!    [`OversizedUnits::Window`] instead cuts it into overlapping
//!    character windows.
//!
//! Lengths are counted in Unicode scalar values, never bytes. Output is
//! fully deterministic.
//!
//! # Example
//!
//! ```rust
//! use docqa_core::chunk::split_text;
//!
//! let chunks = split_text("alpha\nbeta\ngamma", "\n", 10, 5).unwrap();
//! assert_eq!(chunks, vec!["alpha\nbeta", "beta\ngamma"]);
//! ```

use std::collections::VecDeque;

use serde::Deserialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::RagError;
use crate::models::{Chunk, Document};

/// What to do with a single unit that is longer than `chunk_size`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OversizedUnits {
    /// Emit the unit whole, exceeding `chunk_size`.
    #[default]
    Preserve,
    /// Cut the unit into `chunk_size` windows stepping by
    /// `chunk_size - overlap`; a trailing remainder of at most `overlap`
    /// characters is folded into the last window.
    ///
    /// That last window can therefore hold up to `chunk_size + overlap`
    /// characters, wherever the unit sits in the document. Like a
    /// preserved unit, it is an oversized-unit exception to the
    /// `chunk_size` bound.
    Window,
}

/// Byte range `[start, end)` of one chunk within the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy)]
struct Unit {
    start: usize,
    end: usize,
    chars: usize,
}

/// Validated splitter settings.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    separator: String,
    separator_chars: usize,
    chunk_size: usize,
    overlap: usize,
    oversized: OversizedUnits,
}

impl TextSplitter {
    /// # Errors
    ///
    /// [`RagError::InvalidConfig`] unless `chunk_size > 0` and
    /// `overlap < chunk_size`.
    pub fn new(
        separator: impl Into<String>,
        chunk_size: usize,
        overlap: usize,
    ) -> Result<Self, RagError> {
        if chunk_size == 0 {
            return Err(RagError::InvalidConfig(
                "chunking.chunk_size must be > 0".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(RagError::InvalidConfig(format!(
                "chunking.overlap ({}) must be smaller than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        let separator = separator.into();
        Ok(Self {
            separator_chars: separator.chars().count(),
            separator,
            chunk_size,
            overlap,
            oversized: OversizedUnits::Preserve,
        })
    }

    pub fn with_oversized_units(mut self, policy: OversizedUnits) -> Self {
        self.oversized = policy;
        self
    }

    /// Split `text` into chunk strings.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_spans(text)
            .into_iter()
            .map(|s| text[s.start..s.end].to_string())
            .collect()
    }

    /// Split `text` into byte spans, in source order.
    ///
    /// Spans whose text is empty or whitespace-only are dropped.
    pub fn split_spans(&self, text: &str) -> Vec<Span> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut spans = Vec::new();
        let mut buf: VecDeque<Unit> = VecDeque::new();
        let mut total = 0usize;

        for unit in self.units(text) {
            if unit.chars > self.chunk_size && self.oversized == OversizedUnits::Window {
                if !buf.is_empty() {
                    spans.push(span_of(&buf));
                    buf.clear();
                    total = 0;
                }
                spans.extend(self.windows(text, unit));
                continue;
            }

            if total + unit.chars + self.gap(&buf) > self.chunk_size && !buf.is_empty() {
                spans.push(span_of(&buf));
                while total > self.overlap
                    || (total > 0 && total + unit.chars + self.gap(&buf) > self.chunk_size)
                {
                    let Some(front) = buf.pop_front() else {
                        break;
                    };
                    total -= front.chars + self.gap(&buf);
                }
            }

            total += unit.chars + self.gap(&buf);
            buf.push_back(unit);
        }

        if !buf.is_empty() {
            spans.push(span_of(&buf));
        }

        spans.retain(|s| !text[s.start..s.end].trim().is_empty());
        spans
    }

    /// Split a document into [`Chunk`]s with fresh ids and content hashes.
    pub fn chunk_document(&self, document: &Document) -> Vec<Chunk> {
        self.split_spans(&document.text)
            .into_iter()
            .enumerate()
            .map(|(i, span)| {
                make_chunk(
                    &document.id,
                    i as i64,
                    span,
                    &document.text[span.start..span.end],
                )
            })
            .collect()
    }

    /// Separator length owed when one more unit joins a buffer.
    fn gap(&self, buf: &VecDeque<Unit>) -> usize {
        if buf.is_empty() {
            0
        } else {
            self.separator_chars
        }
    }

    fn units(&self, text: &str) -> Vec<Unit> {
        if self.separator.is_empty() {
            return text
                .char_indices()
                .map(|(i, c)| Unit {
                    start: i,
                    end: i + c.len_utf8(),
                    chars: 1,
                })
                .collect();
        }

        let mut units = Vec::new();
        let mut start = 0;
        for (pos, _) in text.match_indices(self.separator.as_str()) {
            units.push(Unit {
                start,
                end: pos,
                chars: text[start..pos].chars().count(),
            });
            start = pos + self.separator.len();
        }
        units.push(Unit {
            start,
            end: text.len(),
            chars: text[start..].chars().count(),
        });
        units
    }

    fn windows(&self, text: &str, unit: Unit) -> Vec<Span> {
        let bounds: Vec<usize> = text[unit.start..unit.end]
            .char_indices()
            .map(|(i, _)| unit.start + i)
            .chain(std::iter::once(unit.end))
            .collect();
        let n = unit.chars;

        let mut spans = Vec::new();
        let mut start = 0;
        loop {
            let mut end = (start + self.chunk_size).min(n);
            if n - end <= self.overlap {
                end = n;
            }
            spans.push(Span {
                start: bounds[start],
                end: bounds[end],
            });
            if end == n {
                break;
            }
            start = end - self.overlap;
        }
        spans
    }
}

/// Split `text` with the given settings and the default oversized-unit policy.
///
/// # Errors
///
/// [`RagError::InvalidConfig`] for `chunk_size == 0` or `overlap >= chunk_size`.
pub fn split_text(
    text: &str,
    separator: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<String>, RagError> {
    Ok(TextSplitter::new(separator, chunk_size, overlap)?.split(text))
}

fn span_of(buf: &VecDeque<Unit>) -> Span {
    match (buf.front(), buf.back()) {
        (Some(first), Some(last)) => Span {
            start: first.start,
            end: last.end,
        },
        _ => Span { start: 0, end: 0 },
    }
}

fn make_chunk(document_id: &str, index: i64, span: Span, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        chunk_index: index,
        start: span.start,
        end: span.end,
        text: text.to_string(),
        hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn char_len(s: &str) -> usize {
        s.chars().count()
    }

    /// Rebuild the source from each span's fresh (non-overlapping) part,
    /// putting back the separator-only gaps between spans.
    fn reassemble(text: &str, spans: &[Span]) -> String {
        let mut out = String::new();
        let mut covered = 0;
        for s in spans {
            if s.start > covered {
                out.push_str(&text[covered..s.start]);
            }
            let fresh = s.start.max(covered);
            if s.end > fresh {
                out.push_str(&text[fresh..s.end]);
                covered = s.end;
            }
        }
        out.push_str(&text[covered..]);
        out
    }

    fn sample_text() -> String {
        (0..60)
            .map(|i| format!("Line {} of the sample, with ünïcode and some words.", i))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_rejects_bad_settings() {
        assert!(matches!(
            TextSplitter::new("\n", 0, 0),
            Err(RagError::InvalidConfig(_))
        ));
        assert!(matches!(
            TextSplitter::new("\n", 100, 100),
            Err(RagError::InvalidConfig(_))
        ));
        assert!(TextSplitter::new("\n", 100, 99).is_ok());
    }

    #[test]
    fn test_empty_text() {
        assert!(split_text("", "\n", 800, 200).unwrap().is_empty());
    }

    #[test]
    fn test_whitespace_only_text() {
        assert!(split_text("\n\n  \n", "\n", 800, 200).unwrap().is_empty());
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = split_text("Hello, world!", "\n", 800, 200).unwrap();
        assert_eq!(chunks, vec!["Hello, world!"]);
    }

    #[test]
    fn test_greedy_accumulation_with_overlap() {
        let chunks = split_text("aaaa\nbbbb\ncccc\ndddd", "\n", 9, 4).unwrap();
        assert_eq!(chunks, vec!["aaaa\nbbbb", "bbbb\ncccc", "cccc\ndddd"]);
    }

    #[test]
    fn test_zero_overlap() {
        let chunks = split_text("aaaa\nbbbb\ncccc\ndddd", "\n", 9, 0).unwrap();
        assert_eq!(chunks, vec!["aaaa\nbbbb", "cccc\ndddd"]);
    }

    #[test]
    fn test_oversized_unit_preserved_whole() {
        let long = "x".repeat(30);
        let text = format!("ab\n{}\ncd", long);
        let chunks = split_text(&text, "\n", 10, 2).unwrap();
        assert_eq!(chunks, vec!["ab".to_string(), long, "cd".to_string()]);
    }

    #[test]
    fn test_no_separator_is_one_chunk() {
        let text = "y".repeat(1500);
        let chunks = split_text(&text, "\n", 800, 200).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(char_len(&chunks[0]), 1500);
    }

    #[test]
    fn test_window_policy_1500_chars() {
        let text: String = (0..1500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let splitter = TextSplitter::new("\n", 800, 200)
            .unwrap()
            .with_oversized_units(OversizedUnits::Window);
        let spans = splitter.split_spans(&text);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0], Span { start: 0, end: 800 });
        assert_eq!(spans[1], Span { start: 600, end: 1500 });
        let chunks = splitter.split(&text);
        assert_eq!(char_len(&chunks[0]), 800);
        assert_eq!(char_len(&chunks[1]), 900);
        assert_eq!(&chunks[0][600..], &chunks[1][..200]);
    }

    #[test]
    fn test_window_policy_exact_overlap_between_windows() {
        let text = "z".repeat(5000);
        let splitter = TextSplitter::new("\n", 800, 200)
            .unwrap()
            .with_oversized_units(OversizedUnits::Window);
        let chunks = splitter.split(&text);
        for pair in chunks.windows(2) {
            let tail: String = pair[0].chars().skip(char_len(&pair[0]) - 200).collect();
            assert!(pair[1].starts_with(&tail));
        }
        for c in &chunks[..chunks.len() - 1] {
            assert!(char_len(c) <= 800);
        }
    }

    #[test]
    fn test_window_policy_flushes_buffer_first() {
        let text = format!("head\n{}\ntail", "w".repeat(25));
        let splitter = TextSplitter::new("\n", 10, 3)
            .unwrap()
            .with_oversized_units(OversizedUnits::Window);
        let chunks = splitter.split(&text);
        assert_eq!(chunks.first().map(String::as_str), Some("head"));
        assert_eq!(chunks.last().map(String::as_str), Some("tail"));
        assert!(chunks[1..chunks.len() - 1].iter().all(|c| c.chars().all(|ch| ch == 'w')));
    }

    #[test]
    fn test_window_absorbed_tail_mid_document() {
        // 1500 chars at 800/200: the second window absorbs the 100-char tail.
        let text = format!("head\n{}\ntail", "m".repeat(1500));
        let splitter = TextSplitter::new("\n", 800, 200)
            .unwrap()
            .with_oversized_units(OversizedUnits::Window);
        let chunks = splitter.split(&text);
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0], "head");
        assert_eq!(char_len(&chunks[1]), 800);
        assert_eq!(char_len(&chunks[2]), 900);
        assert!(char_len(&chunks[2]) <= 800 + 200);
        assert!(chunks[2].chars().all(|c| c == 'm'));
        assert_eq!(chunks[3], "tail");
    }

    #[test]
    fn test_multibyte_lengths_are_chars() {
        let text = "┌──┐\n│ab│\n└──┘";
        let chunks = split_text(text, "\n", 9, 0).unwrap();
        assert_eq!(chunks, vec!["┌──┐\n│ab│", "└──┘"]);
    }

    #[test]
    fn test_empty_separator_splits_on_chars() {
        let chunks = split_text("abcdefgh", "", 4, 1).unwrap();
        assert_eq!(chunks, vec!["abcd", "defg", "gh"]);
    }

    #[test]
    fn test_multi_char_separator() {
        let chunks = split_text("one\n\ntwo\n\nthree", "\n\n", 8, 0).unwrap();
        assert_eq!(chunks, vec!["one\n\ntwo", "three"]);
    }

    #[test]
    fn test_spans_are_exact_substrings() {
        let text = sample_text();
        let splitter = TextSplitter::new("\n", 200, 60).unwrap();
        let spans = splitter.split_spans(&text);
        let chunks = splitter.split(&text);
        assert_eq!(spans.len(), chunks.len());
        for (s, c) in spans.iter().zip(&chunks) {
            assert_eq!(&text[s.start..s.end], c.as_str());
        }
    }

    #[test]
    fn test_reassembles_original_text() {
        let text = sample_text();
        for (size, overlap) in [(50, 0), (120, 40), (200, 199), (1000, 300)] {
            let splitter = TextSplitter::new("\n", size, overlap).unwrap();
            let spans = splitter.split_spans(&text);
            assert_eq!(reassemble(&text, &spans), text, "size={} overlap={}", size, overlap);
            for pair in spans.windows(2) {
                if pair[1].start > pair[0].end {
                    assert_eq!(&text[pair[0].end..pair[1].start], "\n");
                }
            }
        }
    }

    #[test]
    fn test_non_last_chunks_respect_size() {
        let text = sample_text();
        let chunks = split_text(&text, "\n", 150, 50).unwrap();
        for c in &chunks[..chunks.len() - 1] {
            assert!(char_len(c) <= 150, "chunk too long: {}", char_len(c));
        }
    }

    #[test]
    fn test_next_chunk_starts_with_tail_of_previous() {
        let text = sample_text();
        let splitter = TextSplitter::new("\n", 150, 60).unwrap();
        let spans = splitter.split_spans(&text);
        for pair in spans.windows(2) {
            if pair[1].start < pair[0].end {
                let shared = &text[pair[1].start..pair[0].end];
                assert!(text[pair[0].start..pair[0].end].ends_with(shared));
                assert!(char_len(shared) <= 60);
            }
        }
        assert!(spans.windows(2).any(|p| p[1].start < p[0].end));
    }

    #[test]
    fn test_deterministic() {
        let text = sample_text();
        let a = split_text(&text, "\n", 120, 30).unwrap();
        let b = split_text(&text, "\n", 120, 30).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_chunk_document_indices_and_hashes() {
        let doc = Document::new("sample.txt", "text/plain", sample_text());
        let splitter = TextSplitter::new("\n", 200, 50).unwrap();
        let chunks = splitter.chunk_document(&doc);
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64);
            assert_eq!(c.document_id, doc.id);
            assert_eq!(&doc.text[c.start..c.end], c.text);
            assert_eq!(c.hash.len(), 64);
        }
        let again = splitter.chunk_document(&doc);
        assert_eq!(
            chunks.iter().map(|c| &c.hash).collect::<Vec<_>>(),
            again.iter().map(|c| &c.hash).collect::<Vec<_>>()
        );
    }
}
