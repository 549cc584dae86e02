//! Mood tags: a fixed table of label → trigger words, matched on whole words.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_MOOD: &str = "Trending";

/// Checked in order; an item can carry several labels.
const MOODS: &[(&str, &[&str])] = &[
    (
        "Exciting",
        &["launch", "launches", "released", "release", "breakthrough", "record", "unveils", "announces", "wins"],
    ),
    (
        "Controversial",
        &["ban", "banned", "lawsuit", "sues", "controversy", "backlash", "scandal", "debate", "fined"],
    ),
    (
        "Concerning",
        &["breach", "hacked", "outage", "vulnerability", "exploit", "layoffs", "crash", "warning", "leak"],
    ),
    (
        "Funny",
        &["meme", "funny", "hilarious", "joke", "weird", "cat", "dog", "lol"],
    ),
    (
        "Inspiring",
        &["community", "volunteers", "donate", "donates", "hero", "inspiring", "rescue", "free"],
    ),
    (
        "Techy",
        &["rust", "python", "linux", "kernel", "gpu", "database", "compiler", "api", "ai", "javascript", "open-source"],
    ),
    (
        "Gaming",
        &["game", "games", "gaming", "steam", "console", "esports", "nintendo", "playstation", "xbox"],
    ),
];

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+(?:-[\p{L}\p{N}]+)*").unwrap());

/// Labels whose trigger words occur in `text`, in table order; `["Trending"]`
/// when nothing matches.
pub fn moods_for(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    let words: HashSet<&str> = WORD.find_iter(&lower).map(|m| m.as_str()).collect();

    let hits: Vec<&'static str> = MOODS
        .iter()
        .filter(|(_, triggers)| triggers.iter().any(|t| words.contains(t)))
        .map(|(label, _)| *label)
        .collect();
    if hits.is_empty() {
        vec![DEFAULT_MOOD]
    } else {
        hits
    }
}
