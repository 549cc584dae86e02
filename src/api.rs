use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, FromRequestParts, Path, State},
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::cache::{CacheStatus, SnapshotOrigin};
use crate::engine::{RefreshEngine, RefreshReport};
use crate::enrich::{self, mood, summarizer::DynSummarizer, Enrichment};
use crate::metrics::Metrics;
use crate::store::VoteStore;
use crate::trend::{time_ago, Trend};
use crate::votes::{self, VoteCounts, VoteOutcome, VoteType};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RefreshEngine>,
    pub votes: Arc<dyn VoteStore>,
    pub summarizer: DynSummarizer,
    pub static_dir: PathBuf,
    /// Take the voter address from proxy headers instead of the socket peer.
    pub trust_proxy: bool,
}

pub fn router(state: AppState) -> Router {
    let static_dir = state.static_dir.clone();

    let app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/trends", get(list_trends))
        .route("/api/trend/{id}", get(trend_detail))
        .route("/api/vote", post(cast_vote))
        .route("/api/votes", get(all_votes))
        .route("/api/sources", get(sources))
        .route("/api/status", get(status))
        .route("/admin/refresh", post(admin_refresh))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(CorsLayer::very_permissive())
        .with_state(state);

    match Metrics::init() {
        Ok(m) => app.merge(m.router()),
        Err(e) => {
            tracing::warn!(error = ?e, "prometheus recorder unavailable; /metrics disabled");
            app
        }
    }
}

fn error(status: StatusCode, msg: &str) -> Response {
    (status, Json(serde_json::json!({ "error": msg }))).into_response()
}

/// Voter identity: the socket peer address. With `trust_proxy` set, the
/// rightmost `X-Forwarded-For` hop (the one the proxy appended) wins, then
/// `X-Real-IP`. Requests with no usable address are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoterKey(pub String);

impl VoterKey {
    fn from_proxy_headers(headers: &HeaderMap) -> Option<IpAddr> {
        let forwarded = headers
            .get_all("x-forwarded-for")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .last()
            .and_then(|v| v.parse().ok());
        let real = || {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
        };
        forwarded.or_else(real)
    }

    fn resolve(parts: &Parts, trust_proxy: bool) -> Option<IpAddr> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        if trust_proxy {
            Self::from_proxy_headers(&parts.headers).or(peer)
        } else {
            peer
        }
    }
}

impl FromRequestParts<AppState> for VoterKey {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match Self::resolve(parts, state.trust_proxy) {
            Some(ip) => Ok(VoterKey(ip.to_string())),
            None => {
                tracing::warn!("vote without a client address; is ConnectInfo wired?");
                Err(error(StatusCode::BAD_REQUEST, "client address unavailable"))
            }
        }
    }
}

#[derive(Serialize)]
struct TrendView<'a> {
    #[serde(flatten)]
    trend: &'a Trend,
    time_ago: String,
    moods: Vec<&'static str>,
}

fn moods_of(t: &Trend) -> Vec<&'static str> {
    mood::moods_for(&enrich::title_and_description(t))
}

async fn list_trends(State(state): State<AppState>) -> Response {
    let snap = state.engine.snapshot().await;
    let now = Utc::now();
    let view: Vec<TrendView<'_>> = snap
        .items
        .iter()
        .map(|t| TrendView {
            trend: t,
            time_ago: time_ago(t.discovered_at, now),
            moods: moods_of(t),
        })
        .collect();
    Json(view).into_response()
}

#[derive(Serialize)]
struct TrendDetail<'a> {
    #[serde(flatten)]
    trend: &'a Trend,
    time_ago: String,
    moods: Vec<&'static str>,
    enrichment: Enrichment,
    votes: VoteCounts,
}

async fn trend_detail(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let snap = state.engine.snapshot().await;
    let Some(trend) = snap.get(&id) else {
        return error(StatusCode::NOT_FOUND, "trend not found");
    };

    let enrichment = enrich::summarize(trend, state.summarizer.as_ref()).await;
    let votes = match state.votes.counts_for(id.clone()).await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, trend_id = %id, "reading vote counts failed");
            VoteCounts::default()
        }
    };

    Json(TrendDetail {
        trend,
        time_ago: time_ago(trend.discovered_at, Utc::now()),
        moods: mood::moods_for(&enrich::keyword_text(trend, &enrichment.summary)),
        enrichment,
        votes,
    })
    .into_response()
}

#[derive(Deserialize)]
struct VoteReq {
    #[serde(alias = "trendId")]
    trend_id: String,
    #[serde(alias = "voteType")]
    vote_type: String,
}

async fn cast_vote(
    State(state): State<AppState>,
    voter: VoterKey,
    Json(body): Json<VoteReq>,
) -> Response {
    let Ok(vote_type) = body.vote_type.parse::<VoteType>() else {
        return error(StatusCode::BAD_REQUEST, "Invalid vote type");
    };

    match votes::cast_vote(
        state.votes.as_ref(),
        &body.trend_id,
        &voter.0,
        vote_type,
        Utc::now(),
    )
    .await
    {
        Ok(VoteOutcome::Accepted(counts)) => Json(counts).into_response(),
        Ok(VoteOutcome::Rejected) => error(
            StatusCode::CONFLICT,
            "You have already voted for this trend",
        ),
        Ok(VoteOutcome::UnknownTrend) => error(StatusCode::NOT_FOUND, "trend not found"),
        Err(e) => {
            tracing::error!(error = %e, trend_id = %body.trend_id, "vote insert failed");
            error(StatusCode::INTERNAL_SERVER_ERROR, "vote could not be recorded")
        }
    }
}

async fn all_votes(State(state): State<AppState>) -> Response {
    match state.votes.all_counts().await {
        Ok(counts) => Json(counts).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "reading vote counts failed");
            error(StatusCode::INTERNAL_SERVER_ERROR, "votes unavailable")
        }
    }
}

async fn sources(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.engine.snapshot().await.sources())
}

#[derive(Serialize)]
struct StatusOut {
    status: CacheStatus,
    captured_at: Option<DateTime<Utc>>,
    origin: Option<SnapshotOrigin>,
    items: usize,
    refresh_interval_secs: u64,
    providers: Vec<String>,
    last_report: Option<RefreshReport>,
}

async fn status(State(state): State<AppState>) -> Json<StatusOut> {
    let engine = &state.engine;
    let snap = engine.cache().load();
    Json(StatusOut {
        status: engine.status(),
        captured_at: snap.as_ref().map(|s| s.captured_at),
        origin: snap.as_ref().map(|s| s.origin),
        items: snap.as_ref().map_or(0, |s| s.len()),
        refresh_interval_secs: engine.settings().refresh_interval.as_secs(),
        providers: engine.provider_names(),
        last_report: engine.last_report(),
    })
}

async fn admin_refresh(State(state): State<AppState>) -> Json<RefreshReport> {
    Json(state.engine.refresh().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request};

    fn ip(s: &str) -> IpAddr {
        s.parse().expect("ip")
    }

    fn parts(peer: Option<&str>, headers: &[(&str, &str)]) -> Parts {
        let mut req = Request::builder().uri("/api/vote");
        for (k, v) in headers {
            req = req.header(*k, *v);
        }
        let (mut parts, _) = req.body(()).expect("request").into_parts();
        if let Some(p) = peer {
            parts
                .extensions
                .insert(ConnectInfo(p.parse::<SocketAddr>().expect("addr")));
        }
        parts
    }

    #[test]
    fn peer_address_ignores_headers_by_default() {
        let p = parts(
            Some("192.0.2.10:5000"),
            &[("x-forwarded-for", "203.0.113.7"), ("x-real-ip", "198.51.100.2")],
        );
        assert_eq!(VoterKey::resolve(&p, false), Some(ip("192.0.2.10")));
        assert_eq!(VoterKey::resolve(&parts(None, &[("x-real-ip", "198.51.100.2")]), false), None);
    }

    #[test]
    fn trusted_proxy_uses_rightmost_forwarded_hop() {
        let mut h = HeaderMap::new();
        h.append("x-forwarded-for", HeaderValue::from_static("1.1.1.1, 203.0.113.7"));
        h.append("x-forwarded-for", HeaderValue::from_static(" 198.51.100.9 "));
        h.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(VoterKey::from_proxy_headers(&h), Some(ip("198.51.100.9")));

        h.remove("x-forwarded-for");
        assert_eq!(VoterKey::from_proxy_headers(&h), Some(ip("198.51.100.2")));

        h.insert("x-real-ip", HeaderValue::from_static("not-an-ip"));
        assert_eq!(VoterKey::from_proxy_headers(&h), None);

        let p = parts(Some("10.0.0.1:443"), &[]);
        assert_eq!(VoterKey::resolve(&p, true), Some(ip("10.0.0.1")));
    }
}
