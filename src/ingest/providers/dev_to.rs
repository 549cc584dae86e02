use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::Html;
use url::Url;

use super::{fetch_text, resolve, selector, text_of};
use crate::ingest::types::{SourceProvider, TrendCandidate};

const HOME: &str = "https://dev.to/";
const SOURCE: &str = "From Dev.to";
const MAX_ITEMS: usize = 5;

pub struct DevToProvider {
    client: reqwest::Client,
    url: String,
}

impl DevToProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            url: HOME.to_string(),
        }
    }
}

/// Latest stories on the home feed.
pub fn parse_feed(html: &str, base: &str) -> Result<Vec<TrendCandidate>> {
    let base = Url::parse(base).context("dev.to base url")?;
    let doc = Html::parse_document(html);
    let story = selector("div.crayons-story")?;
    let title_link = selector("h2.crayons-story__title a")?;
    let body = selector("div.crayons-story__body")?;

    let mut out = Vec::new();
    for s in doc.select(&story).take(MAX_ITEMS) {
        let Some(a) = s.select(&title_link).next() else {
            continue;
        };
        let link = resolve(&base, a.value().attr("href").unwrap_or_default());
        let description = s.select(&body).next().map(text_of).unwrap_or_default();
        out.push(
            TrendCandidate::new(text_of(a).trim(), link, SOURCE)
                .with_description(description.trim()),
        );
    }
    Ok(out)
}

#[async_trait]
impl SourceProvider for DevToProvider {
    async fn fetch_candidates(&self) -> Result<Vec<TrendCandidate>> {
        let body = fetch_text(&self.client, &self.url).await?;
        parse_feed(&body, &self.url)
    }

    fn name(&self) -> &str {
        "dev_to"
    }
}
