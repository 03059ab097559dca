use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SESSION_TTL_SECS: u64 = 3600;
const DEFAULT_MAX_SESSIONS: usize = 1000;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// Scoring API base address. `None` means "same origin as the page".
    pub api_base: Option<String>,
    /// The page's public origin, used as the API base when `api_base` is unset.
    pub public_origin: Option<String>,
    /// Derive the page origin from `Host`/`X-Forwarded-*`. Only safe behind a
    /// proxy that overwrites those headers.
    pub trust_forwarded_headers: bool,
    pub cors_origins: Option<String>,
    /// Outbound timeout for scoring calls; `None` keeps the transport default.
    pub score_timeout: Option<Duration>,
    pub session_ttl: Duration,
    pub max_sessions: usize,
}

/// Optional config file, named by `CLAIMSCORE_CONFIG`. Environment variables
/// override anything set here.
#[derive(Deserialize, Default, Debug)]
pub struct ConfigToml {
    pub port: Option<u16>,
    pub api_base: Option<String>,
    pub public_origin: Option<String>,
    pub trust_forwarded_headers: Option<bool>,
    pub cors_origins: Option<String>,
    pub score_timeout_secs: Option<u64>,
    pub session_ttl_secs: Option<u64>,
    pub max_sessions: Option<usize>,
}

impl ConfigToml {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {:?}", path))?;
        toml::from_str(&contents).with_context(|| format!("parsing config file {:?}", path))
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let file = match std::env::var("CLAIMSCORE_CONFIG") {
            Ok(path) => {
                info!("[claimscore] Loading config file {}", path);
                ConfigToml::load(Path::new(&path))?
            }
            Err(_) => ConfigToml::default(),
        };
        Ok(Self::resolve(file, |key| std::env::var(key).ok()))
    }

    /// Merge file values with variables from `lookup` (env wins).
    pub fn resolve<F>(file: ConfigToml, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(p) => p.parse().unwrap_or_else(|_| {
                warn!("[claimscore] Invalid PORT value, defaulting to {}", DEFAULT_PORT);
                DEFAULT_PORT
            }),
            None => file.port.unwrap_or(DEFAULT_PORT),
        };

        // An empty API_BASE counts as unset so the page falls back to its own origin.
        let api_base = lookup("API_BASE")
            .or(file.api_base)
            .map(|b| b.trim().trim_end_matches('/').to_string())
            .filter(|b| !b.is_empty());

        let public_origin = lookup("PUBLIC_ORIGIN")
            .or(file.public_origin)
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty());

        let trust_forwarded_headers = match lookup("TRUST_FORWARDED_HEADERS") {
            Some(v) => parse_flag(&v).unwrap_or_else(|| {
                warn!("[claimscore] Invalid TRUST_FORWARDED_HEADERS value, defaulting to false");
                false
            }),
            None => file.trust_forwarded_headers.unwrap_or(false),
        };

        let cors_origins = lookup("CORS_ORIGINS").or(file.cors_origins);

        let score_timeout = match lookup("SCORE_TIMEOUT_SECS") {
            Some(s) => match s.parse::<u64>() {
                Ok(secs) => Some(secs),
                Err(_) => {
                    warn!("[claimscore] Invalid SCORE_TIMEOUT_SECS value, using transport default");
                    None
                }
            },
            None => file.score_timeout_secs,
        }
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);

        let session_ttl_secs = match lookup("SESSION_TTL_SECS") {
            Some(s) => s.parse().unwrap_or_else(|_| {
                warn!(
                    "[claimscore] Invalid SESSION_TTL_SECS value, defaulting to {}",
                    DEFAULT_SESSION_TTL_SECS
                );
                DEFAULT_SESSION_TTL_SECS
            }),
            None => file.session_ttl_secs.unwrap_or(DEFAULT_SESSION_TTL_SECS),
        };

        let max_sessions = match lookup("MAX_SESSIONS") {
            Some(s) => s.parse().unwrap_or_else(|_| {
                warn!(
                    "[claimscore] Invalid MAX_SESSIONS value, defaulting to {}",
                    DEFAULT_MAX_SESSIONS
                );
                DEFAULT_MAX_SESSIONS
            }),
            None => file.max_sessions.unwrap_or(DEFAULT_MAX_SESSIONS),
        }
        .max(1);

        Self {
            port,
            api_base,
            public_origin,
            trust_forwarded_headers,
            cors_origins,
            score_timeout,
            session_ttl: Duration::from_secs(session_ttl_secs),
            max_sessions,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
