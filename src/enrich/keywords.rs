use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "about", "above", "after", "again", "against", "also", "been", "before", "being", "below",
        "between", "both", "but", "could", "does", "doing", "down", "during", "each", "even",
        "every", "from", "further", "have", "having", "here", "hers", "herself", "himself", "into",
        "itself", "just", "more", "most", "much", "must", "myself", "only", "other", "ours",
        "ourselves", "over", "same", "should", "some", "such", "than", "that", "their", "theirs",
        "them", "themselves", "then", "there", "these", "they", "this", "those", "through", "under",
        "until", "very", "want", "were", "what", "when", "where", "which", "while", "whom", "will",
        "with", "would", "your", "yours", "yourself", "yourselves", "trending", "says", "said",
        "year", "years", "like", "make", "made", "many", "near", "still", "today",
    ]
    .into_iter()
    .collect()
});

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+").unwrap());
static HASHTAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"#[\p{L}\p{N}_]+").unwrap());

pub const MAX_KEYWORDS: usize = 3;

/// Remove `#tag` tokens.
pub fn strip_hashtags(s: &str) -> String {
    HASHTAG.replace_all(s, " ").to_string()
}

/// Up to three keywords: lower-cased words longer than three characters,
/// not stop words, ranked by frequency with ties broken by first occurrence.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (pos, m) in WORD.find_iter(&lower).enumerate() {
        let w = m.as_str();
        if w.chars().count() <= 3 || STOP_WORDS.contains(w) {
            continue;
        }
        counts.entry(w).or_insert((0, pos)).0 += 1;
    }

    let mut ranked: Vec<(&str, usize, usize)> =
        counts.into_iter().map(|(w, (n, first))| (w, n, first)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked
        .into_iter()
        .take(MAX_KEYWORDS)
        .map(|(w, _, _)| w.to_string())
        .collect()
}

/// `["trending", "<source lower-cased>"]`.
pub fn fallback_keywords(source: &str) -> Vec<String> {
    vec!["trending".to_string(), source.trim().to_lowercase()]
}

/// `rust lang` → `#Rustlang`.
pub fn hashtag(keyword: &str) -> String {
    let cleaned: String = keyword.chars().filter(|c| c.is_alphanumeric()).collect();
    let mut chars = cleaned.chars();
    match chars.next() {
        Some(first) => format!("#{}{}", first.to_uppercase(), chars.as_str()),
        None => String::new(),
    }
}
