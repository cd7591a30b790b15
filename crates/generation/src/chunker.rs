//! Page-window chunking
//!
//! Groups consecutive pages into fixed-size windows and hard-caps each
//! window's text at a character budget. No attempt is made to preserve word
//! boundaries at the cap - a simplicity/cost tradeoff, not a bug.

use crate::errors::GenerationError;
use tracing::debug;

/// Configuration for page-window chunking
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk
    pub max_chars: usize,
    /// Consecutive pages grouped per chunk
    pub window_pages: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: 4000,
            window_pages: 2,
        }
    }
}

/// A window of consecutive pages' text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageChunk {
    /// Window text, capped at `max_chars` characters
    pub text: String,
    /// 1-based first page covered
    pub page_start: usize,
    /// 1-based last page covered (inclusive)
    pub page_end: usize,
}

/// Split per-page texts into page-window chunks.
///
/// The final window may cover fewer than `window_pages` pages. Zero pages
/// produce an empty vec; `window_pages == 0` is a configuration error.
pub fn chunk_pages(
    pages: &[String],
    config: &ChunkingConfig,
) -> Result<Vec<PageChunk>, GenerationError> {
    if config.window_pages == 0 {
        return Err(GenerationError::Chunking(
            "window_pages must be at least 1".to_string(),
        ));
    }

    let mut chunks = Vec::with_capacity(pages.len().div_ceil(config.window_pages));

    for (group_index, group) in pages.chunks(config.window_pages).enumerate() {
        let start = group_index * config.window_pages;
        let text = truncate_chars(&group.join("\n\n"), config.max_chars);

        chunks.push(PageChunk {
            text,
            page_start: start + 1,
            page_end: start + group.len(),
        });
    }

    debug!(
        page_count = pages.len(),
        chunk_count = chunks.len(),
        window_pages = config.window_pages,
        max_chars = config.max_chars,
        "Pages chunked"
    );

    Ok(chunks)
}

/// Truncate to a character count, respecting UTF-8 boundaries
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("page {} text", i)).collect()
    }

    #[test]
    fn test_ten_pages_window_two() {
        // 10 pages, window 2 -> exactly 5 chunks covering (1,2)..(9,10)
        let chunks = chunk_pages(&pages(10), &ChunkingConfig::default()).unwrap();
        assert_eq!(chunks.len(), 5);
        let ranges: Vec<(usize, usize)> =
            chunks.iter().map(|c| (c.page_start, c.page_end)).collect();
        assert_eq!(ranges, vec![(1, 2), (3, 4), (5, 6), (7, 8), (9, 10)]);
    }

    #[test]
    fn test_full_coverage_no_gaps_or_overlaps() {
        for page_count in 1..=17 {
            for window in 1..=5 {
                let config = ChunkingConfig {
                    max_chars: 4000,
                    window_pages: window,
                };
                let chunks = chunk_pages(&pages(page_count), &config).unwrap();

                let mut expected_start = 1;
                for chunk in &chunks {
                    assert_eq!(chunk.page_start, expected_start);
                    assert!(chunk.page_end >= chunk.page_start);
                    expected_start = chunk.page_end + 1;
                }
                assert_eq!(expected_start, page_count + 1);
            }
        }
    }

    #[test]
    fn test_short_final_window() {
        let config = ChunkingConfig {
            max_chars: 4000,
            window_pages: 2,
        };
        let chunks = chunk_pages(&pages(5), &config).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(
            (chunks[2].page_start, chunks[2].page_end),
            (5, 5)
        );
    }

    #[test]
    fn test_truncation_at_max_chars() {
        let long_pages = vec!["a".repeat(3000), "b".repeat(3000)];
        let config = ChunkingConfig {
            max_chars: 4000,
            window_pages: 2,
        };
        let chunks = chunk_pages(&long_pages, &config).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text.chars().count(), 4000);
    }

    #[test]
    fn test_truncation_counts_chars_not_bytes() {
        let multibyte = vec!["é".repeat(10)];
        let config = ChunkingConfig {
            max_chars: 4,
            window_pages: 1,
        };
        let chunks = chunk_pages(&multibyte, &config).unwrap();
        assert_eq!(chunks[0].text, "éééé");
    }

    #[test]
    fn test_pages_joined_with_blank_line() {
        let two = vec!["first".to_string(), "second".to_string()];
        let chunks = chunk_pages(&two, &ChunkingConfig::default()).unwrap();
        assert_eq!(chunks[0].text, "first\n\nsecond");
    }

    #[test]
    fn test_zero_pages() {
        let chunks = chunk_pages(&[], &ChunkingConfig::default()).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_zero_window_pages_fails_fast() {
        let config = ChunkingConfig {
            max_chars: 4000,
            window_pages: 0,
        };
        let err = chunk_pages(&pages(3), &config);
        assert!(matches!(err, Err(GenerationError::Chunking(_))));
    }
}
