use anyhow::Result;
use async_trait::async_trait;
use scraper::Html;

use super::{fetch_text, selector, text_of};
use crate::ingest::types::{SourceProvider, TrendCandidate};

const TRENDING: &str = "https://github.com/trending";
const SOURCE: &str = "From GitHub";
const MAX_ITEMS: usize = 5;

pub struct GithubTrendingProvider {
    client: reqwest::Client,
    url: String,
}

impl GithubTrendingProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            url: TRENDING.to_string(),
        }
    }
}

/// Repositories from the trending page, titled `owner/name`.
pub fn parse_trending(html: &str) -> Result<Vec<TrendCandidate>> {
    let doc = Html::parse_document(html);
    let article = selector("article.Box-row")?;
    let heading_link = selector("h2 a")?;
    let blurb = selector("p")?;

    let mut out = Vec::new();
    for repo in doc.select(&article).take(MAX_ITEMS) {
        let Some(a) = repo.select(&heading_link).next() else {
            continue;
        };
        let title: String = text_of(a).split_whitespace().collect();
        let href = a.value().attr("href").unwrap_or_default();
        let link = format!("https://github.com{href}");
        let description = repo.select(&blurb).next().map(text_of).unwrap_or_default();
        out.push(TrendCandidate::new(title, link, SOURCE).with_description(description.trim()));
    }
    Ok(out)
}

#[async_trait]
impl SourceProvider for GithubTrendingProvider {
    async fn fetch_candidates(&self) -> Result<Vec<TrendCandidate>> {
        let body = fetch_text(&self.client, &self.url).await?;
        parse_trending(&body)
    }

    fn name(&self) -> &str {
        "github"
    }
}
