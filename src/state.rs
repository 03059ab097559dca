use axum::http::{header, HeaderMap};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::handlers::health::UpstreamStatus;
use crate::scoring::ScoringClient;
use crate::session::SessionStore;

/// Last upstream health check, reused for a short while.
#[derive(Clone, Debug)]
pub struct CachedHealth {
    pub api_base: String,
    pub checked_at: Instant,
    pub status: UpstreamStatus,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub client: ScoringClient,
    pub sessions: SessionStore,
    pub upstream_health: Arc<Mutex<Option<CachedHealth>>>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let client = ScoringClient::new(config.score_timeout)?;
        let sessions = SessionStore::with_capacity(config.max_sessions);
        Ok(Self {
            config,
            client,
            sessions,
            upstream_health: Arc::new(Mutex::new(None)),
        })
    }

    /// Scoring API base for a request. In order: the configured `API_BASE`,
    /// the configured public origin, the request's own origin (only when
    /// forwarded headers are trusted), then `http://localhost:{port}`.
    /// Request headers never pick the outbound host unless explicitly trusted.
    pub fn api_base(&self, headers: &HeaderMap) -> String {
        if let Some(base) = &self.config.api_base {
            return base.clone();
        }
        if let Some(origin) = &self.config.public_origin {
            return origin.clone();
        }
        if self.config.trust_forwarded_headers {
            return request_origin(headers, self.config.port);
        }
        format!("http://localhost:{}", self.config.port)
    }
}

pub fn request_origin(headers: &HeaderMap, port: u16) -> String {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let scheme = header_str("x-forwarded-proto").unwrap_or_else(|| "http".to_string());
    let host = header_str("x-forwarded-host")
        .or_else(|| header_str(header::HOST.as_str()))
        .unwrap_or_else(|| format!("localhost:{}", port));
    format!("{}://{}", scheme, host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    use crate::config::ConfigToml;

    fn state_with(pairs: &[(&str, &str)]) -> AppState {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let config = Config::resolve(ConfigToml::default(), |key| {
            pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
        });
        AppState::new(config).unwrap()
    }

    fn forged_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("10.0.0.5:9000"));
        headers.insert("x-forwarded-host", HeaderValue::from_static("169.254.169.254"));
        headers
    }

    #[test]
    fn untrusted_headers_do_not_pick_the_api_base() {
        let state = state_with(&[("PORT", "4000")]);
        assert_eq!(state.api_base(&forged_headers()), "http://localhost:4000");
    }

    #[test]
    fn public_origin_beats_request_headers() {
        let state = state_with(&[
            ("PUBLIC_ORIGIN", "https://claims.example.com"),
            ("TRUST_FORWARDED_HEADERS", "true"),
        ]);
        assert_eq!(state.api_base(&forged_headers()), "https://claims.example.com");
    }

    #[test]
    fn trusted_headers_give_the_request_origin() {
        let state = state_with(&[("TRUST_FORWARDED_HEADERS", "true")]);
        assert_eq!(state.api_base(&forged_headers()), "http://169.254.169.254");
    }

    #[test]
    fn configured_api_base_always_wins() {
        let state = state_with(&[
            ("API_BASE", "http://scoring:8000"),
            ("TRUST_FORWARDED_HEADERS", "true"),
        ]);
        assert_eq!(state.api_base(&forged_headers()), "http://scoring:8000");
    }

    #[test]
    fn origin_from_host_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("127.0.0.1:8080"));
        assert_eq!(request_origin(&headers, 3000), "http://127.0.0.1:8080");
    }

    #[test]
    fn forwarded_headers_win() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("internal:3000"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        headers.insert(
            "x-forwarded-host",
            HeaderValue::from_static("claims.example.com, proxy.local"),
        );
        assert_eq!(request_origin(&headers, 3000), "https://claims.example.com");
    }

    #[test]
    fn no_headers_falls_back_to_local_port() {
        assert_eq!(request_origin(&HeaderMap::new(), 4000), "http://localhost:4000");
    }
}
