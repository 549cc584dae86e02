//! # Identity
//!
//! Derives a stable, content-based id for a scraped candidate so the same
//! real-world item is recognized across fetch cycles and across collectors.
//!
//! - Title: lower-cased, punctuation stripped, whitespace collapsed.
//! - Link: `scheme://host/path`, trailing slash, query and fragment dropped;
//!   a missing scheme defaults to `https`.
//! - Digest: first 128 bits of SHA-256 over `title \x1f link`, lowercase hex.
//!
//! An unparsable link canonicalizes to the empty string, so identity falls
//! back to the title alone.

use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use url::Url;

use crate::ingest::types::TrendCandidate;

/// Separator between the two hashed parts; cannot occur in a normalized title.
const FIELD_SEP: char = '\u{1f}';

/// Stable id for a candidate.
pub fn assign_id(c: &TrendCandidate) -> String {
    id_for(&c.title, &c.link)
}

/// Stable id for a raw `(title, link)` pair.
pub fn id_for(title: &str, link: &str) -> String {
    let mut key = normalize_title(title);
    key.push(FIELD_SEP);
    key.push_str(&canonicalize_link(link));

    let digest = Sha256::digest(key.as_bytes());
    let mut out = String::with_capacity(32);
    for b in digest.iter().take(16) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Lower-case, drop punctuation, collapse whitespace.
pub fn normalize_title(s: &str) -> String {
    let lowered = s.to_lowercase();
    let kept: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Re-serialize a link as `scheme://host/path`. Returns `""` when the link
/// cannot be parsed or has no host.
pub fn canonicalize_link(link: &str) -> String {
    let raw = link.trim();
    if raw.is_empty() {
        return String::new();
    }

    let parsed = match Url::parse(raw) {
        Ok(u) => Some(u),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            if let Some(rest) = raw.strip_prefix("//") {
                Url::parse(&format!("https://{rest}")).ok()
            } else if raw.starts_with('/') {
                // a bare path carries no host to anchor it
                None
            } else {
                Url::parse(&format!("https://{raw}")).ok()
            }
        }
        Err(_) => None,
    };

    let Some(url) = parsed else {
        return String::new();
    };
    let Some(host) = url.host_str() else {
        return String::new();
    };

    let path = url.path().trim_end_matches('/');
    format!("{}://{}{}", url.scheme(), host, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(title: &str, link: &str, source: &str) -> TrendCandidate {
        TrendCandidate::new(title, link, source)
    }

    #[test]
    fn title_normalization() {
        assert_eq!(normalize_title("  Show HN:   Foo!! "), "show hn foo");
        assert_eq!(normalize_title("Rust\t1.80\nreleased"), "rust 180 released");
        assert_eq!(normalize_title("Ünïcödé — Title"), "ünïcödé title");
    }

    #[test]
    fn link_canonicalization() {
        assert_eq!(
            canonicalize_link("https://news.ycombinator.com/item?id=1"),
            "https://news.ycombinator.com/item"
        );
        assert_eq!(
            canonicalize_link("https://GitHub.com/rust-lang/rust/#readme"),
            "https://github.com/rust-lang/rust"
        );
        assert_eq!(canonicalize_link("example.com/a/b/"), "https://example.com/a/b");
        assert_eq!(canonicalize_link("//cdn.example.com/x"), "https://cdn.example.com/x");
        assert_eq!(canonicalize_link("http://example.com/"), "http://example.com");
    }

    #[test]
    fn unparsable_link_is_empty() {
        assert_eq!(canonicalize_link(""), "");
        assert_eq!(canonicalize_link("/relative/only"), "");
        assert_eq!(canonicalize_link("mailto:someone@example.com"), "");
        assert_eq!(canonicalize_link("http://"), "");
    }

    #[test]
    fn same_content_same_id_across_sources() {
        let a = cand("Show HN: Foo", "https://news.ycombinator.com/item?id=1", "From Hacker News");
        let b = cand("show hn   foo", "https://news.ycombinator.com/item/?utm=x#c", "From Lobsters");
        assert_eq!(assign_id(&a), assign_id(&b));
    }

    #[test]
    fn different_content_different_id() {
        let a = cand("Show HN: Foo", "https://example.com/a", "x");
        let b = cand("Show HN: Bar", "https://example.com/a", "x");
        let c = cand("Show HN: Foo", "https://example.com/b", "x");
        assert_ne!(assign_id(&a), assign_id(&b));
        assert_ne!(assign_id(&a), assign_id(&c));
        assert_ne!(assign_id(&b), assign_id(&c));
    }

    #[test]
    fn id_is_128_bit_hex_and_deterministic() {
        let id = id_for("Hello", "https://example.com");
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(id, id_for("hello", "https://example.com/"));
    }

    #[test]
    fn title_only_fallback_for_bad_links() {
        assert_eq!(id_for("Same", "/a"), id_for("Same", "/b"));
    }
}
