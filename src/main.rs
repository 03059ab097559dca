use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::info;

use claimscore_console::config::Config;
use claimscore_console::handlers;
use claimscore_console::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    info!("[claimscore] Starting fraud scoring console");
    match &config.api_base {
        Some(base) => info!("[claimscore] Scoring API base: {}", base),
        None => match (&config.public_origin, config.trust_forwarded_headers) {
            (Some(origin), _) => info!("[claimscore] Scoring API base: public origin {}", origin),
            (None, true) => info!("[claimscore] Scoring API base: request origin (forwarded headers trusted)"),
            (None, false) => info!(
                "[claimscore] Scoring API base: http://localhost:{} (set API_BASE or PUBLIC_ORIGIN)",
                config.port
            ),
        },
    }
    info!("[claimscore] Session cap: {}", config.max_sessions);
    match config.score_timeout {
        Some(t) => info!("[claimscore] Scoring timeout: {:?}", t),
        None => info!("[claimscore] Scoring timeout: transport default"),
    }

    let state = AppState::new(config.clone())?;

    // Idle page sessions are dropped; a reload of `/` starts over anyway.
    let sessions = state.sessions.clone();
    let session_ttl = config.session_ttl;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            sessions.cleanup(session_ttl);
        }
    });

    // CORS configuration
    let cors = if let Some(ref origins) = config.cors_origins {
        let origins: Vec<_> = origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let app = handlers::router(state).layer(cors);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("[claimscore] Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
