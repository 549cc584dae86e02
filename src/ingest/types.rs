// src/ingest/types.rs
use anyhow::Result;

/// Image shown when a source has no artwork for an item.
pub const DEFAULT_IMAGE: &str = "/static/images/default_trendy.svg";

/// A freshly scraped, not-yet-identified record from one source.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct TrendCandidate {
    pub title: String,
    pub description: Option<String>,
    pub link: String,
    pub source: String, // display label, e.g. "From Hacker News"
    pub image: String,
    pub video: Option<String>,
}

impl TrendCandidate {
    /// Candidate with the placeholder image and no description/video.
    pub fn new(title: impl Into<String>, link: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            link: link.into(),
            source: source.into(),
            image: DEFAULT_IMAGE.to_string(),
            video: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let d = description.into();
        self.description = if d.trim().is_empty() { None } else { Some(d) };
        self
    }

    pub fn with_image(mut self, image: Option<String>) -> Self {
        if let Some(img) = image.filter(|s| !s.trim().is_empty()) {
            self.image = img;
        }
        self
    }

    pub fn with_video(mut self, video: Option<String>) -> Self {
        self.video = video.filter(|s| !s.trim().is_empty());
        self
    }

    /// A record is usable only with a non-empty title and link.
    pub fn is_well_formed(&self) -> bool {
        !self.title.trim().is_empty() && !self.link.trim().is_empty()
    }
}

/// One external site that can produce trend candidates.
#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_candidates(&self) -> Result<Vec<TrendCandidate>>;
    fn name(&self) -> &str;
}
