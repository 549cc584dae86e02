use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use scraper::Html;
use url::Url;

use super::{fetch_text, resolve, selector, text_of};
use crate::ingest::types::{SourceProvider, TrendCandidate};

const POPULAR_BY_DATE: &str = "https://www.goodreads.com/book/popular_by_date";
const SITE: &str = "https://www.goodreads.com";
const SOURCE: &str = "From Goodreads";
const MAX_ITEMS: usize = 20;

pub struct GoodreadsProvider {
    client: reqwest::Client,
    base: String,
}

impl GoodreadsProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base: POPULAR_BY_DATE.to_string(),
        }
    }

    /// Popular books of the current year.
    fn page_url(&self) -> String {
        format!("{}/{}", self.base, Utc::now().year())
    }
}

/// Book rows with both a title link and a cover; others are skipped.
pub fn parse_popular(html: &str) -> Result<Vec<TrendCandidate>> {
    let site = Url::parse(SITE).context("goodreads base url")?;
    let doc = Html::parse_document(html);
    let row = selector("table.tableList tr, div.tableList tr")?;
    let title_link = selector("a.bookTitle")?;
    let cover = selector("img.bookCover")?;

    let mut out = Vec::new();
    for tr in doc.select(&row).take(MAX_ITEMS) {
        let (Some(a), Some(img)) = (tr.select(&title_link).next(), tr.select(&cover).next()) else {
            continue;
        };
        let Some(src) = img.value().attr("src") else {
            continue;
        };
        let link = resolve(&site, a.value().attr("href").unwrap_or_default());
        out.push(
            TrendCandidate::new(text_of(a).trim(), link, SOURCE).with_image(Some(src.to_string())),
        );
    }
    Ok(out)
}

#[async_trait]
impl SourceProvider for GoodreadsProvider {
    async fn fetch_candidates(&self) -> Result<Vec<TrendCandidate>> {
        let body = fetch_text(&self.client, &self.page_url()).await?;
        parse_popular(&body)
    }

    fn name(&self) -> &str {
        "goodreads"
    }
}
