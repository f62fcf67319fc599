//! Sliding-window chunking.
//!
//! A document is cut into windows of `chunk_size` characters whose starts advance by
//! `chunk_size - overlap`, so consecutive windows share `overlap` characters. Offsets count
//! Unicode scalar values, which keeps every window on a character boundary. Windows are trimmed
//! and those left empty are dropped.

use super::types::ChunkingError;

/// One untrimmed window of the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window<'a> {
    /// Character offset of the first character of the window.
    pub start: usize,
    /// Window contents, at most `chunk_size` characters.
    pub text: &'a str,
}

/// Iterator over the windows of a text.
#[derive(Debug, Clone)]
pub struct SlidingWindows<'a> {
    text: &'a str,
    // Byte offset of every char, followed by `text.len()`.
    boundaries: Vec<usize>,
    chunk_size: usize,
    step: usize,
    next_start: usize,
}

impl SlidingWindows<'_> {
    fn char_len(&self) -> usize {
        self.boundaries.len() - 1
    }
}

impl<'a> Iterator for SlidingWindows<'a> {
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let len = self.char_len();
        if self.next_start >= len {
            return None;
        }

        let start = self.next_start;
        let end = (start + self.chunk_size).min(len);
        self.next_start += self.step;

        Some(Window {
            start,
            text: &self.text[self.boundaries[start]..self.boundaries[end]],
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .char_len()
            .saturating_sub(self.next_start)
            .div_ceil(self.step);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SlidingWindows<'_> {}

/// Validate the window geometry and return an iterator over the raw windows of `text`.
///
/// `overlap` must be strictly smaller than `chunk_size`; otherwise the window start would never
/// advance.
pub fn sliding_windows(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<SlidingWindows<'_>, ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if overlap >= chunk_size {
        return Err(ChunkingError::InvalidOverlap {
            chunk_size,
            overlap,
        });
    }

    let boundaries = text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .collect();

    Ok(SlidingWindows {
        text,
        boundaries,
        chunk_size,
        step: chunk_size - overlap,
        next_start: 0,
    })
}

/// Split `text` into trimmed, non-empty overlapping chunks in document order.
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<String>, ChunkingError> {
    Ok(sliding_windows(text, chunk_size, overlap)?
        .map(|window| window.text.trim())
        .filter(|chunk| !chunk.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn three_hundred_chars_yield_two_windows() {
        let text = "a".repeat(300);
        let starts: Vec<_> = sliding_windows(&text, 250, 50)
            .expect("windows")
            .map(|window| window.start)
            .collect();
        assert_eq!(starts, vec![0, 200]);

        let chunks = chunk_text(&text, 250, 50).expect("chunks");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 250);
        assert_eq!(chunks[1].len(), 100);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(chunk_text("", 250, 50).expect("chunks").is_empty());
        assert_eq!(sliding_windows("", 250, 50).expect("windows").count(), 0);
    }

    #[test]
    fn overlap_not_smaller_than_window_is_rejected() {
        assert!(matches!(
            chunk_text("hello", 10, 10),
            Err(ChunkingError::InvalidOverlap {
                chunk_size: 10,
                overlap: 10
            })
        ));
        assert!(matches!(
            chunk_text("hello", 10, 12),
            Err(ChunkingError::InvalidOverlap { .. })
        ));
        assert!(matches!(
            chunk_text("hello", 0, 0),
            Err(ChunkingError::InvalidChunkSize)
        ));
    }

    #[test]
    fn windows_are_trimmed_and_blank_windows_dropped() {
        // Windows: "ab  " | "    " | "  cd"
        let text = "ab        cd";
        let chunks = chunk_text(text, 4, 0).expect("chunks");
        assert_eq!(chunks, vec!["ab", "cd"]);
    }

    #[test]
    fn consecutive_windows_share_overlap() {
        let chunks = chunk_text("abcdefghij", 4, 2).expect("chunks");
        assert_eq!(chunks, vec!["abcd", "cdef", "efgh", "ghij", "ij"]);
    }

    #[test]
    fn multibyte_text_is_cut_on_char_boundaries() {
        let text = "héllo wörld ✓✓";
        let chunks = chunk_text(text, 5, 1).expect("chunks");
        assert_eq!(chunks, vec!["héllo", "o wör", "rld ✓", "✓✓"]);
    }

    proptest! {
        #[test]
        fn window_starts_advance_by_step(
            text in "\\PC{0,400}",
            chunk_size in 1usize..64,
            overlap_seed in 0usize..64,
        ) {
            let overlap = overlap_seed % chunk_size;
            let windows: Vec<_> = sliding_windows(&text, chunk_size, overlap).unwrap().collect();
            let char_len = text.chars().count();

            prop_assert_eq!(windows.len(), char_len.div_ceil(chunk_size - overlap));
            for (index, window) in windows.iter().enumerate() {
                prop_assert_eq!(window.start, index * (chunk_size - overlap));
                let expected_len = chunk_size.min(char_len - window.start);
                prop_assert_eq!(window.text.chars().count(), expected_len);
            }
        }

        #[test]
        fn chunks_are_trimmed_and_bounded(
            text in "[a-z \\n]{0,300}",
            chunk_size in 1usize..40,
            overlap_seed in 0usize..40,
        ) {
            let overlap = overlap_seed % chunk_size;
            let chunks = chunk_text(&text, chunk_size, overlap).unwrap();
            let window_count = text.chars().count().div_ceil(chunk_size - overlap);

            prop_assert!(chunks.len() <= window_count);
            for chunk in &chunks {
                prop_assert!(!chunk.is_empty());
                prop_assert_eq!(chunk.trim(), chunk.as_str());
                prop_assert!(chunk.chars().count() <= chunk_size);
            }
        }
    }
}
