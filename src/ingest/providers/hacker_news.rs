use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::Html;
use url::Url;

use super::{fetch_text, resolve, selector, text_of};
use crate::ingest::types::{SourceProvider, TrendCandidate};

const FRONT_PAGE: &str = "https://news.ycombinator.com/";
const SOURCE: &str = "From Hacker News";
const MAX_ITEMS: usize = 5;

pub struct HackerNewsProvider {
    client: reqwest::Client,
    url: String,
}

impl HackerNewsProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            url: FRONT_PAGE.to_string(),
        }
    }
}

/// Top stories from the front page. Relative links (`item?id=..`, Ask HN)
/// resolve against `base`.
pub fn parse_front_page(html: &str, base: &str) -> Result<Vec<TrendCandidate>> {
    let base = Url::parse(base).context("hacker news base url")?;
    let doc = Html::parse_document(html);
    let row = selector("tr.athing")?;
    let title_link = selector(".titleline > a")?;

    let mut out = Vec::new();
    for item in doc.select(&row).take(MAX_ITEMS) {
        let Some(a) = item.select(&title_link).next() else {
            continue;
        };
        let link = resolve(&base, a.value().attr("href").unwrap_or_default());
        out.push(TrendCandidate::new(text_of(a), link, SOURCE));
    }
    Ok(out)
}

#[async_trait]
impl SourceProvider for HackerNewsProvider {
    async fn fetch_candidates(&self) -> Result<Vec<TrendCandidate>> {
        let body = fetch_text(&self.client, &self.url).await?;
        parse_front_page(&body, &self.url)
    }

    fn name(&self) -> &str {
        "hacker_news"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = include_str!("../../../tests/fixtures/hacker_news.html");

    #[test]
    fn parses_top_five_and_resolves_relative_links() {
        let items = parse_front_page(PAGE, FRONT_PAGE).expect("parse");
        assert_eq!(items.len(), 5);
        assert_eq!(items[0].title, "Show HN: Foo");
        assert_eq!(items[0].link, "https://news.ycombinator.com/item?id=1");
        assert_eq!(items[1].link, "https://example.com/rust-2025");
        assert!(items.iter().all(|c| c.source == SOURCE && c.description.is_none()));
    }

    #[test]
    fn page_without_stories_is_empty() {
        let items = parse_front_page("<html><body>down</body></html>", FRONT_PAGE).expect("parse");
        assert!(items.is_empty());
    }
}
