// Fuzzy matching utilities for deck and word-book group suggestions

/// Calculate Levenshtein distance between two strings
/// Returns the minimum number of single-character edits (insertions, deletions, substitutions)
/// needed to transform one string into another
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();
    let s1_len = s1_chars.len();
    let s2_len = s2_chars.len();

    if s1_len == 0 {
        return s2_len;
    }
    if s2_len == 0 {
        return s1_len;
    }

    // Two rolling rows are enough; names here are short
    let mut prev: Vec<usize> = (0..=s2_len).collect();
    let mut curr = vec![0; s2_len + 1];

    for i in 1..=s1_len {
        curr[0] = i;
        for j in 1..=s2_len {
            let cost = if s1_chars[i - 1] == s2_chars[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1)              // deletion
                .min(curr[j - 1] + 1)            // insertion
                .min(prev[j - 1] + cost);        // substitution
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[s2_len]
}

/// Check if `needle` occurs in `haystack` (case-insensitive)
pub fn is_substring_match(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Find near matches for a name among candidates (deck names, group names)
/// Returns up to 5 matches sorted by distance (closest first)
pub fn find_near_matches(
    search_name: &str,
    candidates: &[String],
    max_distance: usize,
) -> Vec<(String, usize)> {
    let search_lower = search_name.to_lowercase();
    let search_len = search_lower.chars().count();
    let mut matches: Vec<(String, usize)> = Vec::new();

    for candidate in candidates {
        let candidate_lower = candidate.to_lowercase();
        let candidate_len = candidate_lower.chars().count();

        let distance = levenshtein_distance(&search_lower, &candidate_lower);
        if distance <= max_distance {
            matches.push((candidate.clone(), distance));
        } else if search_len < candidate_len && is_substring_match(candidate, search_name) {
            // Prefixes are always suggested, ranked no worse than `max_distance`;
            // inner substrings only when the length gap stays small
            let extra = candidate_len - search_len;
            if candidate_lower.starts_with(&search_lower) {
                matches.push((candidate.clone(), extra.min(max_distance)));
            } else if extra < max_distance + 2 {
                matches.push((candidate.clone(), (extra + 1).min(max_distance)));
            }
        }
    }

    matches.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    matches.into_iter().take(5).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("abc", ""), 3);
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("same", "same"), 0);
        assert_eq!(levenshtein_distance("单词本", "单词"), 1);
    }

    #[test]
    fn test_is_substring_match() {
        assert!(is_substring_match("Vocabulary", "vocab"));
        assert!(is_substring_match("GRE words", "WORDS"));
        assert!(!is_substring_match("GRE", "TOEFL"));
    }

    #[test]
    fn test_find_near_matches() {
        let groups = vec![
            "Default".to_string(),
            "GRE".to_string(),
            "GRE verbal".to_string(),
            "Reading".to_string(),
        ];

        let matches = find_near_matches("default", &groups, 3);
        assert_eq!(matches[0].0, "Default");
        assert_eq!(matches[0].1, 0);

        let matches = find_near_matches("Readin", &groups, 3);
        assert_eq!(matches[0].0, "Reading");

        let matches = find_near_matches("gre", &groups, 3);
        assert_eq!(matches[0].0, "GRE");
        assert!(matches.iter().any(|(name, _)| name == "GRE verbal"));

        assert!(find_near_matches("nonexistent group", &groups, 3).is_empty());
    }

    #[test]
    fn test_long_prefix_always_suggested() {
        let groups = vec!["Vocabulary for the final exam".to_string(), "Other words".to_string()];

        let matches = find_near_matches("vocab", &groups, 3);
        assert_eq!(matches, vec![("Vocabulary for the final exam".to_string(), 3)]);

        // Inner substrings still need a small length gap
        assert!(find_near_matches("final", &groups, 3).is_empty());
        assert_eq!(find_near_matches("er word", &groups, 3)[0].0, "Other words");
    }
}
