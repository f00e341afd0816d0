//! ==============================================================================
//! feed.rs - upstream csv source
//! ==============================================================================
//!
//! purpose:
//!     fetches the raw csv export of the sensor sheet.
//!
//! design:
//!     - `SensorFeed` is the seam between the poller and the network, so the
//!       poll cycle can be exercised against an in-memory feed.
//!     - `HttpFeed` is the real implementation: one GET with a hard timeout,
//!       redirects followed (the sheet endpoint always answers with a redirect
//!       to the rendered export).
//!     - the endpoint is parsed on every poll, so a bad url is a poll failure
//!       visible in the snapshot rather than a startup crash.
//!
//! failure signals:
//!     - transport / timeout  -> PollError::Transport / PollError::Timeout
//!     - unparsable endpoint  -> PollError::InvalidEndpoint
//!     - non-2xx              -> PollError::Status (status + body as sent)
//!     - body "OK"            -> PollError::WrongMode. the endpoint was deployed
//!                               in its write mode and acknowledges instead of
//!                               exporting.
//!
//! ==============================================================================

use crate::error::PollError;
use anyhow::{Context, Result};
use reqwest::{redirect, Client, Url};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// body the upstream sends when it is not in export mode
pub const WRONG_MODE_SENTINEL: &str = "OK";

const MAX_REDIRECTS: usize = 10;

pub trait SensorFeed: Send + Sync + 'static {
    /// fetch the full csv text of the sheet
    fn fetch_csv(&self) -> impl Future<Output = Result<String, PollError>> + Send;
}

pub struct HttpFeed {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpFeed {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify(&self, err: reqwest::Error) -> PollError {
        if err.is_timeout() {
            PollError::Timeout(self.timeout)
        } else {
            PollError::Transport(err)
        }
    }
}

impl SensorFeed for HttpFeed {
    async fn fetch_csv(&self) -> Result<String, PollError> {
        let url = export_url(&self.endpoint)?;
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            return Err(PollError::Status {
                status: status.as_u16(),
                body,
            });
        }
        if body.trim() == WRONG_MODE_SENTINEL {
            return Err(PollError::WrongMode);
        }

        debug!("Fetched {} bytes of csv", body.len());
        Ok(body)
    }
}

/// the sheet script only exports csv when asked with `format=csv`; add it unless
/// the configured url already picks a format
pub fn export_url(endpoint: &str) -> Result<Url, PollError> {
    let mut url = Url::parse(endpoint).map_err(|e| PollError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;

    if !url.query_pairs().any(|(key, _)| key == "format") {
        url.query_pairs_mut().append_pair("format", "csv");
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::RawQuery,
        http::StatusCode,
        response::Redirect,
        routing::get,
        Router,
    };
    use tokio::net::TcpListener;

    /// stand-in for the sheet endpoint
    async fn spawn_upstream() -> String {
        let app = Router::new()
            .route("/csv", get(|| async { "sensorId,temp\nS1,21\n" }))
            .route(
                "/broken",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "script failed") }),
            )
            .route("/ok", get(|| async { "OK\n" }))
            .route(
                "/busy",
                get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "  busy, retry later\n") }),
            )
            .route("/moved", get(|| async { Redirect::temporary("/csv") }))
            .route(
                "/echo",
                get(|RawQuery(query): RawQuery| async move { query.unwrap_or_default() }),
            )
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn feed(base: &str, path: &str) -> HttpFeed {
        HttpFeed::new(&format!("{}{}", base, path), Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_export_url_adds_format() {
        let url = export_url("https://example.com/exec").unwrap();
        assert_eq!(url.as_str(), "https://example.com/exec?format=csv");

        let url = export_url("https://example.com/exec?sheet=1").unwrap();
        assert_eq!(url.as_str(), "https://example.com/exec?sheet=1&format=csv");
    }

    #[test]
    fn test_export_url_keeps_explicit_format() {
        let url = export_url("https://example.com/exec?format=tsv").unwrap();
        assert_eq!(url.as_str(), "https://example.com/exec?format=tsv");
    }

    #[test]
    fn test_export_url_rejects_garbage() {
        let err = export_url("not a url").unwrap_err();
        assert!(matches!(err, PollError::InvalidEndpoint { ref endpoint, .. } if endpoint == "not a url"));
    }

    #[tokio::test]
    async fn test_invalid_endpoint_fails_each_poll() {
        let feed = HttpFeed::new("not a url", Duration::from_secs(2)).unwrap();
        for _ in 0..2 {
            let err = feed.fetch_csv().await.unwrap_err();
            assert!(matches!(err, PollError::InvalidEndpoint { .. }));
            assert!(!err.is_transport());
        }
    }

    #[tokio::test]
    async fn test_fetches_csv_body() {
        let base = spawn_upstream().await;
        let body = feed(&base, "/csv").fetch_csv().await.unwrap();
        assert_eq!(body, "sensorId,temp\nS1,21\n");
    }

    #[tokio::test]
    async fn test_follows_redirects() {
        let base = spawn_upstream().await;
        let body = feed(&base, "/moved").fetch_csv().await.unwrap();
        assert!(body.starts_with("sensorId"));
    }

    #[tokio::test]
    async fn test_sends_format_query() {
        let base = spawn_upstream().await;
        let body = feed(&base, "/echo").fetch_csv().await.unwrap();
        assert_eq!(body, "format=csv");
    }

    #[tokio::test]
    async fn test_non_2xx_carries_status_and_body() {
        let base = spawn_upstream().await;
        let err = feed(&base, "/broken").fetch_csv().await.unwrap_err();
        match err {
            PollError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "script failed");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_non_2xx_body_is_kept_verbatim() {
        let base = spawn_upstream().await;
        let err = feed(&base, "/busy").fetch_csv().await.unwrap_err();
        match err {
            PollError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "  busy, retry later\n");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_ok_sentinel_is_wrong_mode() {
        let base = spawn_upstream().await;
        let err = feed(&base, "/ok").fetch_csv().await.unwrap_err();
        assert!(matches!(err, PollError::WrongMode));
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let base = spawn_upstream().await;
        let feed = HttpFeed::new(&format!("{}/slow", base), Duration::from_millis(200)).unwrap();
        let err = feed.fetch_csv().await.unwrap_err();
        assert!(matches!(err, PollError::Timeout(d) if d == Duration::from_millis(200)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport() {
        // bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let feed = HttpFeed::new(&format!("http://{}/csv", addr), Duration::from_secs(2)).unwrap();
        let err = feed.fetch_csv().await.unwrap_err();
        assert!(matches!(err, PollError::Transport(_)));
    }
}
