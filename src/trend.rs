//! # Trend
//! The persisted entity produced by reconciliation, plus small display helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity;
use crate::ingest::types::TrendCandidate;

/// A trend as persisted and cached. `id` is content-derived; `discovered_at`
/// is set once on first observation and never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Trend {
    pub id: String,
    pub title: String,
    pub image: String,
    pub description: Option<String>,
    pub link: String,
    pub source: String,
    pub video: Option<String>,
    pub discovered_at: DateTime<Utc>,
}

impl Trend {
    /// Build a trend from a candidate, deriving its id.
    pub fn from_candidate(c: TrendCandidate, discovered_at: DateTime<Utc>) -> Self {
        let id = identity::assign_id(&c);
        Self::with_id(id, c, discovered_at)
    }

    pub(crate) fn with_id(id: String, c: TrendCandidate, discovered_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: c.title,
            image: c.image,
            description: c.description,
            link: c.link,
            source: c.source,
            video: c.video,
            discovered_at,
        }
    }

    /// Refresh the display fields from a newer scrape, keeping identity and provenance.
    pub fn refresh_from(&mut self, c: TrendCandidate) {
        self.title = c.title;
        self.image = c.image;
        self.description = c.description;
        self.link = c.link;
        self.source = c.source;
        self.video = c.video;
    }
}

/// Human-friendly age such as "5 minutes ago".
pub fn time_ago(past: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = now.signed_duration_since(past).num_seconds().max(0);
    let (n, unit) = match secs {
        s if s < 60 => (s, "seconds"),
        s if s < 3_600 => (s / 60, "minutes"),
        s if s < 86_400 => (s / 3_600, "hours"),
        s => (s / 86_400, "days"),
    };
    format!("{n} {unit} ago")
}
