use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::ingest::types::{SourceProvider, TrendCandidate};

const VIDEOS_API: &str = "https://www.googleapis.com/youtube/v3/videos";
const SOURCE: &str = "From YouTube";
const MAX_RESULTS: &str = "25";

#[derive(Debug, Deserialize)]
struct VideoList {
    #[serde(default)]
    items: Vec<Video>,
}
#[derive(Debug, Deserialize)]
struct Video {
    id: String,
    snippet: Snippet,
}
#[derive(Debug, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}
#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    medium: Option<Thumb>,
}
#[derive(Debug, Deserialize)]
struct Thumb {
    url: String,
}

/// Most-popular chart from the Data API. Needs an API key.
pub struct YoutubeProvider {
    client: reqwest::Client,
    api_key: String,
    region: String,
}

impl YoutubeProvider {
    pub fn new(client: reqwest::Client, api_key: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            region: "US".to_string(),
        }
    }
}

pub fn parse_videos(body: &str) -> Result<Vec<TrendCandidate>> {
    let list: VideoList = serde_json::from_str(body).context("parsing youtube videos json")?;
    Ok(list
        .items
        .into_iter()
        .map(|v| {
            TrendCandidate::new(
                v.snippet.title,
                format!("https://www.youtube.com/watch?v={}", v.id),
                SOURCE,
            )
            .with_description(v.snippet.description)
            .with_image(v.snippet.thumbnails.medium.map(|t| t.url))
        })
        .collect())
}

#[async_trait]
impl SourceProvider for YoutubeProvider {
    async fn fetch_candidates(&self) -> Result<Vec<TrendCandidate>> {
        let body = self
            .client
            .get(VIDEOS_API)
            .query(&[
                ("part", "snippet"),
                ("chart", "mostPopular"),
                ("maxResults", MAX_RESULTS),
                ("regionCode", self.region.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .context("youtube http get()")?
            .error_for_status()
            .context("youtube http status")?
            .text()
            .await
            .context("youtube http .text()")?;
        parse_videos(&body)
    }

    fn name(&self) -> &str {
        "youtube"
    }
}
