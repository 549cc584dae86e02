use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use super::fetch_text;
use crate::ingest::types::{SourceProvider, TrendCandidate};

const TOP_JSON: &str = "https://www.reddit.com/r/popular/top.json?limit=10";
const SOURCE: &str = "From Reddit";

pub struct RedditProvider {
    client: reqwest::Client,
    url: String,
}

impl RedditProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            url: TOP_JSON.to_string(),
        }
    }
}

fn str_at<'a>(v: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(v, |cur, key| cur.get(key))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Playable video for a post, in order of preference: hosted video, preview
/// clip, then gif-style media (`media.type` starting with `gif`), which
/// links the clip itself.
fn video_of(post: &Value) -> Option<String> {
    let media = post
        .get("secure_media")
        .filter(|m| !m.is_null())
        .or_else(|| post.get("media"));
    if let Some(url) = media.and_then(|m| str_at(m, &["reddit_video", "fallback_url"])) {
        return Some(url.to_string());
    }
    if let Some(url) = str_at(post, &["preview", "reddit_video_preview", "fallback_url"]) {
        return Some(url.to_string());
    }
    let gif = media
        .and_then(|m| str_at(m, &["type"]))
        .is_some_and(|t| t.starts_with("gif"));
    if gif {
        return str_at(post, &["url_overridden_by_dest"])
            .or_else(|| str_at(post, &["url"]))
            .filter(|u| u.starts_with("http"))
            .map(str::to_string);
    }
    None
}

/// Still image for a post without video: thumbnail if it is a URL, else the
/// first preview image (entity-escaped in the API response).
fn image_of(post: &Value) -> Option<String> {
    if let Some(thumb) = str_at(post, &["thumbnail"]).filter(|t| t.starts_with("http")) {
        return Some(thumb.to_string());
    }
    post.get("preview")
        .and_then(|p| p.get("images"))
        .and_then(|imgs| imgs.get(0))
        .and_then(|first| str_at(first, &["source", "url"]))
        .map(|u| u.replace("&amp;", "&"))
}

/// Posts from a listing document (`{"data": {"children": [{"data": {..}}]}}`).
pub fn parse_listing(body: &str) -> Result<Vec<TrendCandidate>> {
    let doc: Value = serde_json::from_str(body).context("parsing reddit listing json")?;
    let children = doc
        .pointer("/data/children")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut out = Vec::with_capacity(children.len());
    for child in &children {
        let Some(post) = child.get("data") else {
            continue;
        };
        let permalink = str_at(post, &["permalink"]).unwrap_or_default();
        let title = str_at(post, &["title"]).unwrap_or("No title");
        let description = str_at(post, &["selftext"]).unwrap_or_default();

        let video = video_of(post);
        let image = if video.is_none() { image_of(post) } else { None };

        out.push(
            TrendCandidate::new(title, format!("https://reddit.com{permalink}"), SOURCE)
                .with_description(description)
                .with_image(image)
                .with_video(video),
        );
    }
    Ok(out)
}

#[async_trait]
impl SourceProvider for RedditProvider {
    async fn fetch_candidates(&self) -> Result<Vec<TrendCandidate>> {
        let body = fetch_text(&self.client, &self.url).await?;
        parse_listing(&body)
    }

    fn name(&self) -> &str {
        "reddit"
    }
}
