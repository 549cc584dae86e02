use anyhow::{Context, Result};
use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;

use super::fetch_text;
use crate::ingest::strip_markup;
use crate::ingest::types::{SourceProvider, TrendCandidate};

const MAX_ITEMS: usize = 5;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "thumbnail", alias = "media:thumbnail")]
    thumbnail: Option<Thumbnail>,
}
#[derive(Debug, Deserialize)]
struct Thumbnail {
    #[serde(rename = "@url")]
    url: Option<String>,
}

/// Any RSS 2.0 feed, labelled with a fixed source.
pub struct RssProvider {
    name: &'static str,
    source: &'static str,
    url: String,
    client: reqwest::Client,
}

impl RssProvider {
    pub fn new(
        name: &'static str,
        source: &'static str,
        url: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            name,
            source,
            url: url.into(),
            client,
        }
    }

    /// Feeds known by registry name.
    pub fn preset(name: &str, client: reqwest::Client) -> Option<Self> {
        let (name, source, url) = match name {
            "lobsters" => ("lobsters", "From Lobsters", "https://lobste.rs/rss"),
            "slashdot" => (
                "slashdot",
                "From Slashdot",
                "https://rss.slashdot.org/Slashdot/slashdotMain",
            ),
            "ars_technica" => (
                "ars_technica",
                "From Ars Technica",
                "https://feeds.arstechnica.com/arstechnica/index",
            ),
            "wired" => ("wired", "From Wired", "https://www.wired.com/feed/rss"),
            _ => return None,
        };
        Some(Self::new(name, source, url, client))
    }
}

/// First items of an RSS document. Items without a title or link are kept
/// here and dropped by the collection round.
pub fn parse_feed(xml: &str, source: &str) -> Result<Vec<TrendCandidate>> {
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;

    Ok(rss
        .channel
        .item
        .into_iter()
        .take(MAX_ITEMS)
        .map(|it| {
            TrendCandidate::new(
                it.title.unwrap_or_default(),
                it.link.unwrap_or_default(),
                source,
            )
            .with_description(strip_markup(&it.description.unwrap_or_default()))
            .with_image(it.thumbnail.and_then(|t| t.url))
        })
        .collect())
}

#[async_trait]
impl SourceProvider for RssProvider {
    async fn fetch_candidates(&self) -> Result<Vec<TrendCandidate>> {
        let body = fetch_text(&self.client, &self.url).await?;
        parse_feed(&body, self.source).with_context(|| format!("feed {}", self.url))
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// HTML entities that are not valid XML.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&hellip;", "...")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
