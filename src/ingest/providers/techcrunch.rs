use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html};
use url::Url;

use super::{fetch_text, resolve, selector, text_of};
use crate::ingest::types::{SourceProvider, TrendCandidate};

const HOME: &str = "https://techcrunch.com/";
const SOURCE: &str = "From TechCrunch";
const MAX_ITEMS: usize = 5;

pub struct TechCrunchProvider {
    client: reqwest::Client,
    url: String,
}

impl TechCrunchProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            url: HOME.to_string(),
        }
    }
}

/// Headline links from the home page. Excerpt and image come from the
/// enclosing `div.post-block`, when there is one.
pub fn parse_home(html: &str, base: &str) -> Result<Vec<TrendCandidate>> {
    let base = Url::parse(base).context("techcrunch base url")?;
    let doc = Html::parse_document(html);
    let title_link = selector("a.post-block__title__link")?;
    let block = selector("div.post-block")?;
    let content = selector(".post-block__content")?;
    let img = selector("img")?;

    let mut out = Vec::new();
    for a in doc.select(&title_link).take(MAX_ITEMS) {
        let parent = a
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| block.matches(el));
        let description = parent
            .and_then(|p| p.select(&content).next())
            .map(text_of)
            .unwrap_or_default();
        let image = parent
            .and_then(|p| p.select(&img).next())
            .and_then(|i| i.value().attr("src"))
            .map(str::to_string);

        let link = resolve(&base, a.value().attr("href").unwrap_or_default());
        out.push(
            TrendCandidate::new(text_of(a).trim(), link, SOURCE)
                .with_description(description.trim())
                .with_image(image),
        );
    }
    Ok(out)
}

#[async_trait]
impl SourceProvider for TechCrunchProvider {
    async fn fetch_candidates(&self) -> Result<Vec<TrendCandidate>> {
        let body = fetch_text(&self.client, &self.url).await?;
        parse_home(&body, &self.url)
    }

    fn name(&self) -> &str {
        "techcrunch"
    }
}
