use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::Html;
use url::Url;

use super::{fetch_text, resolve, selector, text_of};
use crate::ingest::types::{SourceProvider, TrendCandidate};

const HOT: &str = "https://stackoverflow.com/questions?tab=Hot";
const SITE: &str = "https://stackoverflow.com";
const SOURCE: &str = "From Stack Overflow";
const MAX_ITEMS: usize = 5;

pub struct StackOverflowProvider {
    client: reqwest::Client,
    url: String,
}

impl StackOverflowProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            url: HOT.to_string(),
        }
    }
}

/// Hot questions with their excerpts. Both the classic and the current
/// question-list markup are recognized.
pub fn parse_hot(html: &str) -> Result<Vec<TrendCandidate>> {
    let site = Url::parse(SITE).context("stack overflow base url")?;
    let doc = Html::parse_document(html);
    let summary = selector(".question-summary, .s-post-summary")?;
    let title_link = selector(".question-hyperlink, .s-post-summary--content-title a")?;
    let excerpt = selector(".excerpt, .s-post-summary--content-excerpt")?;

    let mut out = Vec::new();
    for q in doc.select(&summary).take(MAX_ITEMS) {
        let Some(a) = q.select(&title_link).next() else {
            continue;
        };
        let link = resolve(&site, a.value().attr("href").unwrap_or_default());
        let description = q.select(&excerpt).next().map(text_of).unwrap_or_default();
        out.push(
            TrendCandidate::new(text_of(a).trim(), link, SOURCE)
                .with_description(description.trim()),
        );
    }
    Ok(out)
}

#[async_trait]
impl SourceProvider for StackOverflowProvider {
    async fn fetch_candidates(&self) -> Result<Vec<TrendCandidate>> {
        let body = fetch_text(&self.client, &self.url).await?;
        parse_hot(&body)
    }

    fn name(&self) -> &str {
        "stack_overflow"
    }
}
