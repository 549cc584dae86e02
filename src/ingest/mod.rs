// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod scheduler;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use crate::ingest::types::{SourceProvider, TrendCandidate};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "ingest_candidates_total",
            "Well-formed candidates returned by providers."
        );
        describe_counter!(
            "ingest_provider_errors_total",
            "Provider errors, timeouts and panics."
        );
        describe_counter!(
            "ingest_dropped_total",
            "Records dropped for an empty title or link."
        );
        describe_counter!("reconcile_inserted_total", "Trends seen for the first time.");
        describe_counter!("reconcile_updated_total", "Known trends refreshed.");
        describe_counter!(
            "reconcile_duplicates_total",
            "Candidates collapsed by in-batch deduplication."
        );
        describe_counter!(
            "reconcile_degraded_total",
            "Reconciliations served without persistence."
        );
        describe_counter!("refresh_runs_total", "Completed refresh cycles.");
        describe_histogram!("refresh_duration_ms", "Refresh cycle duration in milliseconds.");
        describe_gauge!("cache_items", "Items in the current snapshot.");
        describe_gauge!("cache_last_refresh_ts", "Unix ts of the installed snapshot.");
        describe_counter!("retention_deleted_total", "Trend rows removed by the sweep.");
        describe_counter!("votes_accepted_total", "Votes recorded.");
        describe_counter!("votes_rejected_total", "Duplicate votes rejected.");
    });
}

/// Normalize scraped text: decode entities, collapse whitespace, cap length.
/// Angle brackets are content here (`Option<T>`); markup is removed only by
/// [`strip_markup`] on fields known to carry HTML.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 3) Length cap: 1500 chars
    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }

    out
}

const MAX_TEXT_CHARS: usize = 1500;

/// Text content of an HTML fragment, e.g. an RSS `<description>`.
pub fn strip_markup(html: &str) -> String {
    let frag = scraper::Html::parse_fragment(html);
    let text = frag.root_element().text().collect::<Vec<_>>().join(" ");
    normalize_text(&text)
}

/// How one provider's fetch ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ProviderOutcome {
    Ok,
    Failed(String),
    TimedOut,
    Panicked,
}

/// Per-provider result of one collection round.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderReport {
    pub provider: String,
    pub outcome: ProviderOutcome,
    pub kept: usize,
    pub dropped: usize,
}

/// Everything gathered in one round, in registry order.
#[derive(Debug, Default)]
pub struct Collected {
    pub candidates: Vec<TrendCandidate>,
    pub reports: Vec<ProviderReport>,
}

impl Collected {
    pub fn failed_providers(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.outcome != ProviderOutcome::Ok)
            .count()
    }
}

/// Trim text fields and drop records without a title or link.
fn clean(provider: &str, raw: Vec<TrendCandidate>) -> (Vec<TrendCandidate>, usize) {
    let mut kept = Vec::with_capacity(raw.len());
    let mut dropped = 0usize;
    for mut c in raw {
        c.title = normalize_text(&c.title);
        c.link = c.link.trim().to_string();
        c.description = c
            .description
            .as_deref()
            .map(normalize_text)
            .filter(|d| !d.is_empty());
        if !c.is_well_formed() {
            dropped += 1;
            tracing::debug!(target: "ingest", provider, title = %c.title, link = %c.link, "dropping malformed record");
            continue;
        }
        kept.push(c);
    }
    (kept, dropped)
}

/// Run every provider concurrently, each in its own task with `limit` as
/// deadline, and gather the results in registry order.
///
/// A provider that errors, panics or runs past the deadline contributes
/// nothing; the round itself never fails.
pub async fn collect_all(providers: &[Arc<dyn SourceProvider>], limit: Duration) -> Collected {
    ensure_metrics_described();

    let handles: Vec<_> = providers
        .iter()
        .map(|p| {
            let p = Arc::clone(p);
            tokio::spawn(async move { tokio::time::timeout(limit, p.fetch_candidates()).await })
        })
        .collect();
    let results = futures::future::join_all(handles).await;

    let mut out = Collected::default();
    for (p, res) in providers.iter().zip(results) {
        let name = p.name().to_string();
        let (outcome, raw) = match res {
            Ok(Ok(Ok(items))) => (ProviderOutcome::Ok, items),
            Ok(Ok(Err(e))) => {
                tracing::warn!(target: "ingest", error = ?e, provider = %name, "provider error");
                (ProviderOutcome::Failed(format!("{e:#}")), Vec::new())
            }
            Ok(Err(_elapsed)) => {
                tracing::warn!(target: "ingest", provider = %name, timeout_ms = limit.as_millis() as u64, "provider timed out");
                (ProviderOutcome::TimedOut, Vec::new())
            }
            Err(join) if join.is_panic() => {
                tracing::error!(target: "ingest", provider = %name, "provider panicked");
                (ProviderOutcome::Panicked, Vec::new())
            }
            Err(join) => {
                tracing::warn!(target: "ingest", error = %join, provider = %name, "provider task cancelled");
                (ProviderOutcome::Failed(join.to_string()), Vec::new())
            }
        };
        if outcome != ProviderOutcome::Ok {
            counter!("ingest_provider_errors_total", "provider" => name.clone()).increment(1);
        }

        let (mut kept, dropped) = clean(&name, raw);
        counter!("ingest_candidates_total").increment(kept.len() as u64);
        counter!("ingest_dropped_total").increment(dropped as u64);

        out.reports.push(ProviderReport {
            provider: name,
            outcome,
            kept: kept.len(),
            dropped,
        });
        out.candidates.append(&mut kept);
    }

    tracing::info!(
        target: "ingest",
        providers = providers.len(),
        failed = out.failed_providers(),
        candidates = out.candidates.len(),
        "collection round finished"
    );
    out
}
