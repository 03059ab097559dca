use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use std::time::{Duration, Instant};

use crate::scoring::UpstreamHealth;
use crate::state::{AppState, CachedHealth};

/// How long one upstream health check answers for repeated `/health` hits.
const HEALTH_CACHE_TTL: Duration = Duration::from_secs(15);

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub api_base: String,
    pub sessions: usize,
    pub upstream: UpstreamStatus,
}

#[derive(Clone, Debug, Serialize)]
pub struct UpstreamStatus {
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<UpstreamHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// This server is up as long as it answers; the scoring service's own
/// `/fraud/health` is reported alongside, not folded into `status`.
pub async fn health(State(state): State<AppState>, headers: HeaderMap) -> Json<HealthResponse> {
    let api_base = state.api_base(&headers);
    let upstream = check_upstream(&state, &api_base).await;

    Json(HealthResponse {
        status: "ok".to_string(),
        version: format!("claimscore-console-v{}", env!("CARGO_PKG_VERSION")),
        api_base,
        sessions: state.sessions.len(),
        upstream,
    })
}

/// At most one outbound check per `HEALTH_CACHE_TTL` per base; concurrent callers
/// wait on the lock and share the fresh answer.
async fn check_upstream(state: &AppState, api_base: &str) -> UpstreamStatus {
    let mut cached = state.upstream_health.lock().await;
    if let Some(last) = cached.as_ref() {
        if last.api_base == api_base && last.checked_at.elapsed() < HEALTH_CACHE_TTL {
            return last.status.clone();
        }
    }

    let status = match state.client.health(api_base).await {
        Ok(health) => UpstreamStatus {
            reachable: true,
            health: Some(health),
            error: None,
        },
        Err(e) => UpstreamStatus {
            reachable: false,
            health: None,
            error: Some(e.to_string()),
        },
    };
    *cached = Some(CachedHealth {
        api_base: api_base.to_string(),
        checked_at: Instant::now(),
        status: status.clone(),
    });
    status
}
