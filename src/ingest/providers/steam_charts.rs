use anyhow::Result;
use async_trait::async_trait;
use scraper::Html;

use super::{fetch_text, selector, text_of};
use crate::ingest::types::{SourceProvider, TrendCandidate};

const TOP: &str = "https://steamcharts.com/top";
const SOURCE: &str = "From Steam Charts";
const MAX_ITEMS: usize = 20;

pub struct SteamChartsProvider {
    client: reqwest::Client,
    url: String,
}

impl SteamChartsProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            url: TOP.to_string(),
        }
    }
}

/// Top games by concurrent players, with the store header image.
pub fn parse_top(html: &str) -> Result<Vec<TrendCandidate>> {
    let doc = Html::parse_document(html);
    let row = selector("table.common-table tbody tr")?;
    let name = selector("td.game-name > a")?;

    let mut out = Vec::new();
    for tr in doc.select(&row).take(MAX_ITEMS) {
        let Some(a) = tr.select(&name).next() else {
            continue;
        };
        let href = a.value().attr("href").unwrap_or_default();
        let app_id = href.rsplit('/').next().unwrap_or_default();
        let image = (!app_id.is_empty())
            .then(|| format!("https://cdn.cloudflare.steamstatic.com/steam/apps/{app_id}/header.jpg"));
        out.push(
            TrendCandidate::new(text_of(a).trim(), format!("https://steamcharts.com{href}"), SOURCE)
                .with_image(image),
        );
    }
    Ok(out)
}

#[async_trait]
impl SourceProvider for SteamChartsProvider {
    async fn fetch_candidates(&self) -> Result<Vec<TrendCandidate>> {
        let body = fetch_text(&self.client, &self.url).await?;
        parse_top(&body)
    }

    fn name(&self) -> &str {
        "steam_charts"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_and_header_images() {
        let html = r#"
            <table class="common-table">
              <thead><tr><th>Name</th></tr></thead>
              <tbody>
                <tr><td>1.</td><td class="game-name left"><a href="/app/730">
                    Counter-Strike 2
                </a></td><td>1,200,000</td></tr>
                <tr><td>2.</td><td class="game-name left">no link</td></tr>
                <tr><td>3.</td><td class="game-name left"><a href="/app/570">Dota 2</a></td></tr>
              </tbody>
            </table>"#;
        let items = parse_top(html).expect("parse");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Counter-Strike 2");
        assert_eq!(items[0].link, "https://steamcharts.com/app/730");
        assert_eq!(
            items[0].image,
            "https://cdn.cloudflare.steamstatic.com/steam/apps/730/header.jpg"
        );
        assert_eq!(items[1].title, "Dota 2");
    }
}
