//! # Enrichment
//!
//! Per-item summary, keywords and hashtags, computed on demand for the
//! detail view. Never fails: a short input or a summarizer error yields a
//! templated sentence instead.

pub mod keywords;
pub mod mood;
pub mod summarizer;

use serde::Serialize;

use crate::trend::Trend;
use keywords::{extract_keywords, fallback_keywords, hashtag, strip_hashtags};
use summarizer::{Summarizer, SummaryParams};

/// Inputs shorter than this many tokens skip the model.
pub const MIN_TOKENS_FOR_MODEL: usize = 5;
pub const META_DESCRIPTION_CHARS: usize = 160;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enrichment {
    pub summary: String,
    pub hashtags: Vec<String>,
    pub meta_description: String,
    pub meta_keywords: String,
    /// True when the summary came from the model rather than the template.
    pub generated: bool,
}

/// `'<title>' is trending on <source>.`
pub fn template_sentence(trend: &Trend) -> String {
    format!("'{}' is trending on {}.", trend.title, trend.source)
}

/// Raw `title description`.
pub fn title_and_description(trend: &Trend) -> String {
    format!(
        "{} {}",
        trend.title,
        trend.description.as_deref().unwrap_or_default()
    )
}

/// Title and description with `#tags` removed and whitespace collapsed.
pub fn prepare_input(trend: &Trend) -> String {
    strip_hashtags(&title_and_description(trend))
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub async fn summarize(trend: &Trend, summarizer: &dyn Summarizer) -> Enrichment {
    let input = prepare_input(trend);
    let tokens = input.split_whitespace().count();

    if tokens < MIN_TOKENS_FOR_MODEL {
        let summary = template_sentence(trend);
        let keywords = keywords_or_fallback(&keyword_text(trend, &summary), trend);
        return build(summary, keywords, false);
    }

    let result = summarizer
        .summarize(&input, SummaryParams::for_tokens(tokens))
        .await
        .and_then(|s| match s.trim() {
            "" => Err(anyhow::anyhow!("empty summary")),
            t => Ok(t.to_string()),
        });

    match result {
        Ok(summary) => {
            let keywords = keywords_or_fallback(&keyword_text(trend, &summary), trend);
            build(summary, keywords, true)
        }
        Err(e) => {
            tracing::debug!(
                target: "enrich",
                trend_id = %trend.id,
                provider = summarizer.provider_name(),
                error = %e,
                "summarizer failed; using template"
            );
            let keywords = keywords_or_fallback(&trend.title, trend);
            build(template_sentence(trend), keywords, false)
        }
    }
}

/// Title, description and summary as scraped, hashtags included.
pub fn keyword_text(trend: &Trend, summary: &str) -> String {
    format!("{} {summary}", title_and_description(trend))
}

fn keywords_or_fallback(text: &str, trend: &Trend) -> Vec<String> {
    let kw = extract_keywords(text);
    if kw.is_empty() {
        fallback_keywords(&trend.source)
    } else {
        kw
    }
}

fn build(summary: String, keywords: Vec<String>, generated: bool) -> Enrichment {
    let hashtags = keywords
        .iter()
        .map(|k| hashtag(k))
        .filter(|h| !h.is_empty())
        .collect();
    Enrichment {
        meta_description: summary.chars().take(META_DESCRIPTION_CHARS).collect(),
        meta_keywords: keywords.join(", "),
        summary,
        hashtags,
        generated,
    }
}
