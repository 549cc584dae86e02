//! Concrete collectors and the registry that wires them up by name.
//!
//! Every provider splits into a network half (`fetch_candidates`) and a pure
//! `parse_*` function over the response body, so parsing is testable against
//! saved pages under `tests/fixtures/`.

pub mod bbc;
pub mod dev_to;
pub mod github;
pub mod goodreads;
pub mod hacker_news;
pub mod reddit;
pub mod rss;
pub mod spotify_charts;
pub mod stack_overflow;
pub mod steam_charts;
pub mod techcrunch;
pub mod youtube;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use scraper::{ElementRef, Selector};
use url::Url;

use crate::ingest::types::SourceProvider;

const USER_AGENT: &str = "trendwire/0.1 (+https://github.com/trendwire/trendwire)";

/// Shared outbound client. The per-request timeout backs up the collection
/// deadline so a stuck socket is closed, not just abandoned.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(4))
        .timeout(timeout)
        .build()
        .context("building http client")
}

/// GET `url` and return the body, failing on non-2xx.
pub(crate) async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String> {
    client
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {url}"))?
        .error_for_status()
        .with_context(|| format!("GET {url}"))?
        .text()
        .await
        .with_context(|| format!("reading body of {url}"))
}

pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector {css:?}: {e}"))
}

/// Concatenated text content of an element.
pub(crate) fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

/// `href` joined onto `base`; kept verbatim when it does not join.
pub(crate) fn resolve(base: &Url, href: &str) -> String {
    match base.join(href) {
        Ok(u) => u.to_string(),
        Err(_) => href.to_string(),
    }
}

/// Settings the registry needs beyond the source names.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub youtube_api_key: Option<String>,
}

/// Build providers for `names`, in the given order. Unknown names are logged
/// and skipped; YouTube is skipped without an API key.
pub fn build_registry(
    names: &[String],
    settings: &ProviderSettings,
    client: &reqwest::Client,
) -> Vec<Arc<dyn SourceProvider>> {
    let mut out: Vec<Arc<dyn SourceProvider>> = Vec::with_capacity(names.len());
    for name in names {
        let client = client.clone();
        let provider: Arc<dyn SourceProvider> = match name.as_str() {
            "hacker_news" => Arc::new(hacker_news::HackerNewsProvider::new(client)),
            "github" => Arc::new(github::GithubTrendingProvider::new(client)),
            "reddit" => Arc::new(reddit::RedditProvider::new(client)),
            "techcrunch" => Arc::new(techcrunch::TechCrunchProvider::new(client)),
            "stack_overflow" => Arc::new(stack_overflow::StackOverflowProvider::new(client)),
            "dev_to" => Arc::new(dev_to::DevToProvider::new(client)),
            "bbc" => Arc::new(bbc::BbcNewsProvider::new(client)),
            "goodreads" => Arc::new(goodreads::GoodreadsProvider::new(client)),
            "steam_charts" => Arc::new(steam_charts::SteamChartsProvider::new(client)),
            "spotify_charts" => Arc::new(spotify_charts::SpotifyChartsProvider::new(client)),
            "youtube" => match settings.youtube_api_key.as_deref() {
                Some(key) if !key.trim().is_empty() => {
                    Arc::new(youtube::YoutubeProvider::new(client, key))
                }
                _ => {
                    tracing::info!(target: "ingest", provider = "youtube", "YOUTUBE_API_KEY not set; skipping");
                    continue;
                }
            },
            other => match rss::RssProvider::preset(other, client) {
                Some(p) => Arc::new(p),
                None => {
                    tracing::warn!(target: "ingest", provider = other, "unknown source name; skipping");
                    continue;
                }
            },
        };
        out.push(provider);
    }
    out
}
