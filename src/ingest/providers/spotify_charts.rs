use anyhow::Result;
use async_trait::async_trait;
use scraper::Html;

use super::{fetch_text, selector, text_of};
use crate::ingest::types::{SourceProvider, TrendCandidate};

const DAILY_GLOBAL: &str = "https://spotifycharts.com/regional/global/daily/latest";
const SOURCE: &str = "From Spotify Charts";
const MAX_ITEMS: usize = 20;

pub struct SpotifyChartsProvider {
    client: reqwest::Client,
    url: String,
}

impl SpotifyChartsProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            url: DAILY_GLOBAL.to_string(),
        }
    }
}

/// `background-image: url('...')` → the url.
fn style_url(style: &str) -> Option<&str> {
    let rest = style.split_once("url('")?.1;
    rest.split_once("')").map(|(u, _)| u)
}

/// Daily chart rows: track as title, `<track> by <artist>` as description.
/// Rows without a track link point at the chart page itself.
pub fn parse_chart(html: &str, page: &str) -> Result<Vec<TrendCandidate>> {
    let doc = Html::parse_document(html);
    let row = selector("table.chart-table tbody tr")?;
    let track = selector(".chart-table-track strong")?;
    let artist = selector(".chart-table-track span")?;
    let art = selector(".chart-table-image")?;
    let art_link = selector(".chart-table-image a")?;

    let mut out = Vec::new();
    for tr in doc.select(&row).take(MAX_ITEMS) {
        let Some(title) = tr.select(&track).next().map(text_of) else {
            continue;
        };
        let title = title.trim();
        let artist = tr
            .select(&artist)
            .next()
            .map(text_of)
            .unwrap_or_default()
            .trim()
            .replace("by ", "");
        let link = tr
            .select(&art_link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .unwrap_or(page);
        let image = tr
            .select(&art)
            .next()
            .and_then(|el| el.value().attr("style"))
            .and_then(style_url)
            .map(str::to_string);

        out.push(
            TrendCandidate::new(title, link, SOURCE)
                .with_description(format!("{title} by {artist}"))
                .with_image(image),
        );
    }
    Ok(out)
}

#[async_trait]
impl SourceProvider for SpotifyChartsProvider {
    async fn fetch_candidates(&self) -> Result<Vec<TrendCandidate>> {
        let body = fetch_text(&self.client, &self.url).await?;
        parse_chart(&body, &self.url)
    }

    fn name(&self) -> &str {
        "spotify_charts"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::DEFAULT_IMAGE;

    #[test]
    fn parses_track_artist_art_and_link() {
        let html = r#"
            <table class="chart-table"><tbody>
              <tr>
                <td class="chart-table-image" style="background-image: url('https://i.scdn.co/image/ab67');">
                  <a href="https://open.spotify.com/track/2plbrEY59IikOBgBGLjaoe"></a>
                </td>
                <td class="chart-table-track"><strong>Die With A Smile</strong><span>by Lady Gaga, Bruno Mars</span></td>
              </tr>
              <tr>
                <td class="chart-table-image"></td>
                <td class="chart-table-track"><strong>APT.</strong><span>by ROSÉ</span></td>
              </tr>
              <tr><td class="chart-table-track"><span>by Nobody</span></td></tr>
            </tbody></table>"#;
        let items = parse_chart(html, DAILY_GLOBAL).expect("parse");
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].title, "Die With A Smile");
        assert_eq!(
            items[0].description.as_deref(),
            Some("Die With A Smile by Lady Gaga, Bruno Mars")
        );
        assert_eq!(items[0].link, "https://open.spotify.com/track/2plbrEY59IikOBgBGLjaoe");
        assert_eq!(items[0].image, "https://i.scdn.co/image/ab67");

        assert_eq!(items[1].link, DAILY_GLOBAL);
        assert_eq!(items[1].image, DEFAULT_IMAGE);
        assert_eq!(items[1].description.as_deref(), Some("APT. by ROSÉ"));
    }

    #[test]
    fn style_url_needs_quoted_url() {
        assert_eq!(style_url("background-image: url('a.png')"), Some("a.png"));
        assert_eq!(style_url("background: none"), None);
    }
}
