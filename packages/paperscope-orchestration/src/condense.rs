//! Extractive text condensation for summary nodes.
//!
//! No model calls here: condensation picks the highest-signal sentences from
//! already-generated agent text and reassembles them in original order under
//! a character budget.

use std::collections::HashSet;

pub struct TextCondenser;

impl TextCondenser {
    pub fn new() -> Self {
        Self
    }

    /// Condense `text` to at most `max_chars` characters, preferring
    /// sentences that carry structural or quantitative signal.
    pub fn condense(&self, text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }

        let sentences: Vec<&str> = text
            .split(['.', '\n'])
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();

        if sentences.is_empty() {
            return truncate_at_boundary(text, max_chars);
        }

        let mut scored: Vec<(usize, usize, &str)> = sentences
            .iter()
            .enumerate()
            .map(|(i, s)| (i, score_sentence(s, i, sentences.len()), *s))
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        let mut included: Vec<usize> = Vec::new();
        let mut total_len = 0;
        for (original_idx, _score, sentence) in &scored {
            let additional = if included.is_empty() {
                sentence.chars().count()
            } else {
                sentence.chars().count() + 2 // ". " separator
            };
            if total_len + additional <= max_chars {
                included.push(*original_idx);
                total_len += additional;
            }
        }

        if included.is_empty() {
            // Budget is smaller than every sentence; hard-truncate the best one
            return truncate_at_boundary(scored[0].2, max_chars);
        }

        // Reassemble in original position order
        included.sort_unstable();
        let mut result = String::with_capacity(total_len);
        for (i, &idx) in included.iter().enumerate() {
            if i > 0 {
                result.push_str(". ");
            }
            result.push_str(sentences[idx]);
        }

        if result.chars().count() > max_chars {
            truncate_at_boundary(&result, max_chars)
        } else {
            result
        }
    }

    /// Drop items that are near-duplicates of an already-kept item, judged by
    /// word overlap. Keeps first occurrence; preserves input order.
    pub fn dedup_similar(&self, items: &[String], similarity_threshold: f32) -> Vec<String> {
        let mut kept: Vec<String> = Vec::new();
        for item in items {
            let duplicate = kept
                .iter()
                .any(|existing| word_overlap(existing, item) >= similarity_threshold);
            if !duplicate {
                kept.push(item.clone());
            }
        }
        kept
    }
}

impl Default for TextCondenser {
    fn default() -> Self {
        Self::new()
    }
}

fn score_sentence(sentence: &str, position: usize, total: usize) -> usize {
    let mut score = 0;

    // Opening sentences carry framing, closing ones carry conclusions
    if position == 0 {
        score += 20;
    } else if position == total - 1 {
        score += 15;
    }

    // Quantitative claims are the part reviewers cite
    if sentence.chars().any(|c| c.is_ascii_digit()) || sentence.contains('%') {
        score += 8;
    }

    if sentence.contains(':') {
        score += 5;
    }

    let char_count = sentence.chars().count();
    if (20..200).contains(&char_count) {
        score += 10;
    }

    score
}

/// Jaccard overlap of whitespace-separated words
fn word_overlap(a: &str, b: &str) -> f32 {
    let words_a: HashSet<&str> = a.split_whitespace().collect();
    let words_b: HashSet<&str> = b.split_whitespace().collect();

    if words_a.is_empty() && words_b.is_empty() {
        return 1.0;
    }
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();
    intersection as f32 / union as f32
}

fn truncate_at_boundary(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
