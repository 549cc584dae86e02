use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html};
use url::Url;

use super::{fetch_text, resolve, selector, text_of};
use crate::ingest::types::{SourceProvider, TrendCandidate};

const NEWS: &str = "https://www.bbc.com/news";
const SOURCE: &str = "From BBC";
const MAX_ITEMS: usize = 5;

pub struct BbcNewsProvider {
    client: reqwest::Client,
    url: String,
}

impl BbcNewsProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            url: NEWS.to_string(),
        }
    }
}

/// Promo headlines; the summary is a sibling under the headline's parent.
pub fn parse_news(html: &str, base: &str) -> Result<Vec<TrendCandidate>> {
    let base = Url::parse(base).context("bbc base url")?;
    let doc = Html::parse_document(html);
    let heading = selector("a.gs-c-promo-heading")?;
    let summary = selector(".gs-c-promo-summary")?;

    let mut out = Vec::new();
    for a in doc.select(&heading).take(MAX_ITEMS) {
        let description = a
            .parent()
            .and_then(ElementRef::wrap)
            .and_then(|p| p.select(&summary).next())
            .map(text_of)
            .unwrap_or_default();
        let link = resolve(&base, a.value().attr("href").unwrap_or_default());
        out.push(
            TrendCandidate::new(text_of(a).trim(), link, SOURCE)
                .with_description(description.trim()),
        );
    }
    Ok(out)
}

#[async_trait]
impl SourceProvider for BbcNewsProvider {
    async fn fetch_candidates(&self) -> Result<Vec<TrendCandidate>> {
        let body = fetch_text(&self.client, &self.url).await?;
        parse_news(&body, &self.url)
    }

    fn name(&self) -> &str {
        "bbc"
    }
}
