//! Summarizer adapter: provider abstraction + HTTP client + deterministic mock.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Length bounds passed to the model, in tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SummaryParams {
    pub max_length: usize,
    pub min_length: usize,
}

impl SummaryParams {
    /// Bounds scaled to the input: twice the input (20..=100) and half of it (5..=20).
    pub fn for_tokens(tokens: usize) -> Self {
        Self {
            max_length: (tokens * 2).clamp(20, 100),
            min_length: (tokens / 2).clamp(5, 20),
        }
    }
}

/// Trait object used by the enrichment pipeline and handlers.
pub trait Summarizer: Send + Sync {
    fn summarize<'a>(
        &'a self,
        text: &'a str,
        params: SummaryParams,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynSummarizer = Arc<dyn Summarizer>;

/// How to build the summarizer at startup.
#[derive(Debug, Clone, Default)]
pub struct SummarizerConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub test_mode_mock: bool,
    pub timeout: Duration,
}

/// * mock mode → [`MockSummarizer`]
/// * endpoint configured → [`HttpSummarizer`]
/// * otherwise → [`DisabledSummarizer`] (every item gets the templated summary)
pub fn build_summarizer(cfg: &SummarizerConfig) -> Result<DynSummarizer> {
    if cfg.test_mode_mock {
        return Ok(Arc::new(MockSummarizer));
    }
    match cfg.url.as_deref().filter(|u| !u.trim().is_empty()) {
        Some(url) => Ok(Arc::new(HttpSummarizer::new(
            url,
            cfg.api_key.clone(),
            cfg.timeout,
        )?)),
        None => Ok(Arc::new(DisabledSummarizer)),
    }
}

/// Text-summarization endpoint speaking the Hugging Face inference format:
/// `{"inputs": .., "parameters": {..}}` → `[{"summary_text": ..}]`.
pub struct HttpSummarizer {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpSummarizer {
    pub fn new(url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building summarizer http client")?;
        Ok(Self {
            http,
            url: url.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }
}

impl Summarizer for HttpSummarizer {
    fn summarize<'a>(
        &'a self,
        text: &'a str,
        params: SummaryParams,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            #[derive(Serialize)]
            struct Parameters {
                max_length: usize,
                min_length: usize,
                do_sample: bool,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                inputs: &'a str,
                parameters: Parameters,
            }
            #[derive(Deserialize)]
            struct Out {
                summary_text: String,
            }

            let req = Req {
                inputs: text,
                parameters: Parameters {
                    max_length: params.max_length,
                    min_length: params.min_length,
                    do_sample: false,
                },
            };
            let mut call = self.http.post(&self.url).json(&req);
            if let Some(key) = &self.api_key {
                call = call.bearer_auth(key);
            }
            let out: Vec<Out> = call
                .send()
                .await
                .context("summarizer http post()")?
                .error_for_status()
                .context("summarizer http status")?
                .json()
                .await
                .context("summarizer response json")?;

            let summary = out
                .into_iter()
                .next()
                .map(|o| o.summary_text.trim().to_string())
                .unwrap_or_default();
            if summary.is_empty() {
                bail!("summarizer returned no text");
            }
            Ok(summary)
        })
    }

    fn provider_name(&self) -> &'static str {
        "http"
    }
}

/// Deterministic stand-in: the first `max_length` words of the input.
pub struct MockSummarizer;

impl Summarizer for MockSummarizer {
    fn summarize<'a>(
        &'a self,
        text: &'a str,
        params: SummaryParams,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let words: Vec<&str> = text.split_whitespace().take(params.max_length).collect();
            Ok(words.join(" "))
        })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// No model configured; always fails so callers take the template path.
pub struct DisabledSummarizer;

impl Summarizer for DisabledSummarizer {
    fn summarize<'a>(
        &'a self,
        _text: &'a str,
        _params: SummaryParams,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async { Err(anyhow!("summarizer disabled")) })
    }

    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}
