//! # Votes
//! One vote per `(trend, voter)`; duplicates are rejected, never overwritten.

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::store::{StoreError, VoteStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Like,
    Dislike,
}

impl VoteType {
    pub fn as_str(self) -> &'static str {
        match self {
            VoteType::Like => "like",
            VoteType::Dislike => "dislike",
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "like" => Ok(VoteType::Like),
            "dislike" => Ok(VoteType::Dislike),
            other => Err(format!("unknown vote type '{other}'")),
        }
    }
}

/// Per-type vote counts for one trend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCounts {
    pub like: u64,
    pub dislike: u64,
}

impl VoteCounts {
    pub fn add(&mut self, vote_type: VoteType, n: u64) {
        match vote_type {
            VoteType::Like => self.like += n,
            VoteType::Dislike => self.dislike += n,
        }
    }

    pub fn total(&self) -> u64 {
        self.like + self.dislike
    }
}

/// Result of [`cast_vote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    Accepted(VoteCounts),
    /// The voter already voted on this trend; nothing was written.
    Rejected,
    UnknownTrend,
}

/// Record a vote. Uniqueness is enforced by the store, so two concurrent
/// attempts for the same pair produce exactly one `Accepted`.
pub async fn cast_vote(
    store: &dyn VoteStore,
    trend_id: &str,
    voter_key: &str,
    vote_type: VoteType,
    now: DateTime<Utc>,
) -> Result<VoteOutcome, StoreError> {
    match store
        .insert_vote(trend_id.to_string(), voter_key.to_string(), vote_type, now)
        .await
    {
        Ok(counts) => {
            counter!("votes_accepted_total").increment(1);
            Ok(VoteOutcome::Accepted(counts))
        }
        Err(StoreError::Conflict(_)) => {
            counter!("votes_rejected_total").increment(1);
            tracing::debug!(trend_id, "duplicate vote rejected");
            Ok(VoteOutcome::Rejected)
        }
        Err(StoreError::NotFound(_)) => Ok(VoteOutcome::UnknownTrend),
        Err(e) => Err(e),
    }
}
