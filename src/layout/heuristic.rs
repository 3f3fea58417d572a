//! Contention-to-gap keyword heuristic
//!
//! A heuristic, not a guarantee: short topic words ("of", "in") match
//! almost any gap, and a contention point may match several gaps. All
//! matches are kept.

/// Whether any whitespace-delimited word of `topic` occurs, case-insensitively,
/// as a substring of `gap`.
pub fn topic_matches_gap(topic: &str, gap: &str) -> bool {
    let gap = gap.to_lowercase();
    topic
        .split_whitespace()
        .any(|word| gap.contains(&word.to_lowercase()))
}

/// Indices of the gaps `topic` matches, falling back to
/// `contention_index mod gaps.len()` when it matches none.
///
/// Empty only when there are no gaps.
pub fn related_gaps(topic: &str, contention_index: usize, gaps: &[String]) -> Vec<usize> {
    let matched: Vec<usize> = gaps
        .iter()
        .enumerate()
        .filter(|(_, gap)| topic_matches_gap(topic, gap))
        .map(|(i, _)| i)
        .collect();
    if matched.is_empty() && !gaps.is_empty() {
        vec![contention_index % gaps.len()]
    } else {
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gaps(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn matches_case_insensitive_substring() {
        assert!(topic_matches_gap("Dosage Effects", "Optimal dosage remains unknown"));
        assert!(topic_matches_gap("sleep", "Effects of SLEEPING patterns"));
        assert!(!topic_matches_gap("Dosage", "Long-term outcomes"));
    }

    #[test]
    fn blank_topic_matches_nothing() {
        assert!(!topic_matches_gap("   ", "anything"));
        assert!(!topic_matches_gap("", "anything"));
    }

    #[test]
    fn keeps_every_match() {
        let g = gaps(&["cost of care", "care in rural areas", "unrelated"]);
        assert_eq!(related_gaps("Care models", 0, &g), vec![0, 1]);
    }

    #[test]
    fn unmatched_falls_back_round_robin() {
        let g = gaps(&["alpha", "beta"]);
        assert_eq!(related_gaps("zzz", 0, &g), vec![0]);
        assert_eq!(related_gaps("zzz", 3, &g), vec![1]);
        assert!(related_gaps("zzz", 3, &[]).is_empty());
    }
}
