//! Prompt construction and per-chunk quota allocation

use crate::chunker::PageChunk;

/// System prompt for card generation
pub const SYSTEM_PROMPT: &str = r#"You create high-quality flashcards from the provided text ONLY.
One atomic fact per card. No hallucinations.
Each suggestion must include a difficulty: "easy" | "medium" | "hard".
Return strict JSON:
{"suggestions":[{"type":"qa|cloze","front":"...","back":"...","pageRefs":[int,...],"confidence":0..1,"difficulty":"easy|medium|hard"}]}"#;

/// Build the user prompt for one chunk
pub fn user_prompt(chunk: &PageChunk, requested: u32) -> String {
    format!(
        "PAGES {}-{}:\n{}\n\nReturn at most {} suggestions.",
        chunk.page_start, chunk.page_end, chunk.text, requested
    )
}

/// Fair-share allocator: how many suggestions to ask for from chunk `index`.
///
/// `ceil((target - made) / remaining_chunks)`, never below 1. The ask shrinks
/// as the target is approached and grows when earlier chunks under-deliver.
pub fn fair_share(target: u32, made: u32, total_chunks: usize, index: usize) -> u32 {
    let remaining = target.saturating_sub(made);
    let chunks_left = total_chunks.saturating_sub(index).max(1) as u32;
    remaining.div_ceil(chunks_left).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fair_share_even_split() {
        // 50 cards over 5 chunks -> 10 each while on track
        assert_eq!(fair_share(50, 0, 5, 0), 10);
        assert_eq!(fair_share(50, 10, 5, 1), 10);
        assert_eq!(fair_share(50, 20, 5, 2), 10);
    }

    #[test]
    fn test_fair_share_grows_when_chunks_under_deliver() {
        // Chunk 1 yields nothing: made stays 0 while remaining chunks shrink,
        // so every later chunk sees a growing ask
        let target = 50;
        let total = 5;
        let asks: Vec<u32> = (0..total).map(|i| fair_share(target, 0, total, i)).collect();
        assert_eq!(asks, vec![10, 13, 17, 25, 50]);
        assert!(asks.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_fair_share_shrinks_as_target_approached() {
        assert_eq!(fair_share(50, 48, 5, 3), 1);
        assert_eq!(fair_share(50, 49, 5, 4), 1);
    }

    #[test]
    fn test_fair_share_never_below_one() {
        assert_eq!(fair_share(10, 10, 5, 2), 1);
        assert_eq!(fair_share(0, 0, 5, 0), 1);
        // Index beyond the chunk list still divides by at least 1
        assert_eq!(fair_share(10, 0, 3, 7), 10);
    }

    #[test]
    fn test_user_prompt_includes_page_range() {
        let chunk = PageChunk {
            text: "content".to_string(),
            page_start: 3,
            page_end: 4,
        };
        let prompt = user_prompt(&chunk, 7);
        assert!(prompt.starts_with("PAGES 3-4:"));
        assert!(prompt.contains("content"));
        assert!(prompt.ends_with("Return at most 7 suggestions."));
    }
}
