use reqwest::Client;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

/// Which scoring route a submission targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestMode {
    /// `/fraud/score_simple`: fills defaults and coerces types server-side.
    #[default]
    Simple,
    /// `/fraud/score`: the full claim schema.
    Strict,
}

impl RequestMode {
    pub fn from_simple_flag(simple: bool) -> Self {
        if simple {
            RequestMode::Simple
        } else {
            RequestMode::Strict
        }
    }

    pub fn is_simple(&self) -> bool {
        *self == RequestMode::Simple
    }

    pub fn path(&self) -> &'static str {
        match self {
            RequestMode::Simple => "/fraud/score_simple",
            RequestMode::Strict => "/fraud/score",
        }
    }

    pub fn schema_label(&self) -> &'static str {
        match self {
            RequestMode::Simple => "minimal",
            RequestMode::Strict => "strict",
        }
    }
}

pub fn endpoint(base: &str, mode: RequestMode) -> String {
    format!("{}{}", base.trim_end_matches('/'), mode.path())
}

pub fn docs_url(base: &str) -> String {
    format!("{}/docs", base.trim_end_matches('/'))
}

/// Everything that can end a submission. The `Display` form is exactly what
/// the page shows in its error block.
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    /// The editor text is not valid JSON. Never reaches the network.
    #[error("{0}")]
    Client(String),

    #[error("{0}")]
    Network(String),

    /// Non-success status; `body` is the raw response text.
    #[error("{status} {status_text}: {body}")]
    Service {
        status: u16,
        status_text: String,
        body: String,
    },

    /// Success status but the body was not JSON.
    #[error("invalid JSON in response: {0}")]
    Decode(String),
}

impl ScoreError {
    pub fn kind(&self) -> &'static str {
        match self {
            ScoreError::Client(_) => "client",
            ScoreError::Network(_) => "network",
            ScoreError::Service { .. } => "service",
            ScoreError::Decode(_) => "decode",
        }
    }
}

/// Scoring result. Every field is optional and read leniently: a field of the
/// wrong type is treated as absent. `raw` keeps the full body for the
/// raw-JSON view.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreResponse {
    pub fraud_probability: Option<f64>,
    pub prob_label: Option<String>,
    pub reasons: Option<Vec<String>>,
    pub top_features: Option<Vec<String>>,
    pub engine: Option<String>,
    /// 0/1 decision emitted by the rule engine alongside the probability.
    pub label: Option<i64>,
    pub raw: Value,
}

impl ScoreResponse {
    pub fn from_value(raw: Value) -> Self {
        let string_list = |key: &str| -> Option<Vec<String>> {
            raw.get(key)?.as_array().map(|items| {
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect()
            })
        };

        Self {
            fraud_probability: raw.get("fraud_probability").and_then(Value::as_f64),
            prob_label: raw
                .get("prob_label")
                .and_then(Value::as_str)
                .map(str::to_string),
            reasons: string_list("reasons"),
            top_features: string_list("top_features"),
            engine: raw.get("engine").and_then(Value::as_str).map(str::to_string),
            label: raw.get("label").and_then(Value::as_i64),
            raw,
        }
    }

    pub fn engine_label(&self) -> &str {
        self.engine
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or("rules")
    }

    pub fn probability_display(&self) -> Option<String> {
        self.fraud_probability.map(|p| format!("{:.3}", p))
    }

    /// Features to list, or `None` when absent or empty.
    pub fn listed_features(&self) -> Option<&[String]> {
        self.top_features.as_deref().filter(|f| !f.is_empty())
    }

    /// Reasons to list, or `None` when absent or empty.
    pub fn listed_reasons(&self) -> Option<&[String]> {
        self.reasons.as_deref().filter(|r| !r.is_empty())
    }

    pub fn decision_display(&self) -> Option<&'static str> {
        self.label.map(|l| if l != 0 { "flagged" } else { "not flagged" })
    }

    pub fn raw_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.raw).unwrap_or_else(|_| self.raw.to_string())
    }
}

impl Serialize for ScoreResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

/// What the scoring service says about itself on `/fraud/health`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UpstreamHealth {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub model_loaded: Option<bool>,
}

#[derive(Clone)]
pub struct ScoringClient {
    client: Client,
}

impl ScoringClient {
    pub fn new(timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// One POST of `claim` to `endpoint`. No retries.
    pub async fn score(&self, endpoint: &str, claim: &Value) -> Result<ScoreResponse, ScoreError> {
        let resp = self
            .client
            .post(endpoint)
            .json(claim)
            .send()
            .await
            .map_err(|e| ScoreError::Network(describe(&e)))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ScoreError::Network(describe(&e)))?;

        if !status.is_success() {
            warn!("[claimscore] POST {} returned {}", endpoint, status);
            return Err(ScoreError::Service {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            });
        }

        let raw: Value =
            serde_json::from_str(&body).map_err(|e| ScoreError::Decode(e.to_string()))?;
        info!("[claimscore] POST {} scored ({})", endpoint, status);
        Ok(ScoreResponse::from_value(raw))
    }

    pub async fn health(&self, base: &str) -> Result<UpstreamHealth, ScoreError> {
        let url = format!("{}/fraud/health", base.trim_end_matches('/'));
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ScoreError::Network(describe(&e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ScoreError::Service {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            });
        }

        resp.json::<UpstreamHealth>()
            .await
            .map_err(|e| ScoreError::Decode(e.to_string()))
    }
}

/// reqwest's top-level message hides the interesting part (refused, DNS,
/// timeout) in the source chain.
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> ScoringClient {
        ScoringClient::new(Some(Duration::from_secs(5))).unwrap()
    }

    #[test]
    fn endpoint_follows_mode() {
        assert_eq!(
            endpoint("http://api:8000", RequestMode::Simple),
            "http://api:8000/fraud/score_simple"
        );
        assert_eq!(
            endpoint("http://api:8000/", RequestMode::Strict),
            "http://api:8000/fraud/score"
        );
        assert_eq!(docs_url("http://api:8000"), "http://api:8000/docs");
    }

    #[test]
    fn mode_from_checkbox_flag() {
        assert_eq!(RequestMode::from_simple_flag(true), RequestMode::Simple);
        assert_eq!(RequestMode::from_simple_flag(false), RequestMode::Strict);
        assert_eq!(RequestMode::default(), RequestMode::Simple);
    }

    #[test]
    fn response_fields_are_all_optional() {
        let resp = ScoreResponse::from_value(json!({}));
        assert_eq!(resp.engine_label(), "rules");
        assert!(resp.probability_display().is_none());
        assert!(resp.prob_label.is_none());
        assert!(resp.listed_features().is_none());
        assert!(resp.listed_reasons().is_none());
        assert!(resp.decision_display().is_none());
    }

    #[test]
    fn response_reads_known_fields() {
        let resp = ScoreResponse::from_value(json!({
            "fraud_probability": 0.71234,
            "prob_label": "high",
            "reasons": ["late_report"],
            "top_features": ["claim_amount", "late_report_days"],
            "engine": "model",
            "label": 1
        }));
        assert_eq!(resp.engine_label(), "model");
        assert_eq!(resp.probability_display().as_deref(), Some("0.712"));
        assert_eq!(resp.prob_label.as_deref(), Some("high"));
        assert_eq!(resp.listed_reasons().unwrap(), ["late_report".to_string()]);
        assert_eq!(resp.listed_features().unwrap().len(), 2);
        assert_eq!(resp.decision_display(), Some("flagged"));
    }

    #[test]
    fn empty_engine_displays_as_rules() {
        let resp = ScoreResponse::from_value(json!({"engine": ""}));
        assert_eq!(resp.engine_label(), "rules");
    }

    #[test]
    fn mistyped_fields_count_as_absent() {
        let resp = ScoreResponse::from_value(json!({
            "fraud_probability": "0.4",
            "engine": 7,
            "top_features": []
        }));
        assert!(resp.fraud_probability.is_none());
        assert_eq!(resp.engine_label(), "rules");
        assert!(resp.top_features.is_some());
        assert!(resp.listed_features().is_none());
    }

    #[test]
    fn service_error_display_composes_status_and_body() {
        let err = ScoreError::Service {
            status: 500,
            status_text: "Internal Server Error".to_string(),
            body: "internal error".to_string(),
        };
        assert_eq!(err.to_string(), "500 Internal Server Error: internal error");
        assert_eq!(err.kind(), "service");
    }

    #[tokio::test]
    async fn posts_claim_as_json() {
        let server = MockServer::start().await;
        let claim = json!({"claim_id": "C001", "claim_amount": 12000});

        Mock::given(method("POST"))
            .and(path("/fraud/score_simple"))
            .and(header("content-type", "application/json"))
            .and(body_json(&claim))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "fraud_probability": 0.3,
                "reasons": ["amount_vs_severity_no_police"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let url = endpoint(&server.uri(), RequestMode::Simple);
        let resp = client().score(&url, &claim).await.unwrap();
        assert_eq!(resp.fraud_probability, Some(0.3));
        assert_eq!(resp.reasons.unwrap(), vec!["amount_vs_severity_no_police"]);
    }

    #[tokio::test]
    async fn non_success_status_is_a_service_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/fraud/score"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;

        let url = endpoint(&server.uri(), RequestMode::Strict);
        let err = client().score(&url, &json!({})).await.unwrap_err();
        match &err {
            ScoreError::Service {
                status,
                status_text,
                body,
            } => {
                assert_eq!(*status, 500);
                assert_eq!(status_text, "Internal Server Error");
                assert_eq!(body, "internal error");
            }
            other => panic!("expected Service, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn validation_bodies_are_kept_verbatim() {
        let server = MockServer::start().await;
        let detail = r#"{"detail":[{"loc":["body","state"],"msg":"field required"}]}"#;

        Mock::given(method("POST"))
            .and(path("/fraud/score"))
            .respond_with(ResponseTemplate::new(422).set_body_string(detail))
            .mount(&server)
            .await;

        let url = endpoint(&server.uri(), RequestMode::Strict);
        let err = client().score(&url, &json!({})).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("422 Unprocessable Entity: {detail}")
        );
    }

    #[tokio::test]
    async fn connection_refused_is_a_network_error() {
        // Grab a free port and release it so nothing is listening there.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let url = endpoint(&format!("http://{addr}"), RequestMode::Simple);

        let err = client().score(&url, &json!({})).await.unwrap_err();
        assert!(matches!(err, ScoreError::Network(_)), "got: {err:?}");
        assert!(!err.to_string().is_empty());
    }

    #[tokio::test]
    async fn success_with_non_json_body_is_a_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let url = endpoint(&server.uri(), RequestMode::Simple);
        let err = client().score(&url, &json!({})).await.unwrap_err();
        assert!(matches!(err, ScoreError::Decode(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn health_reads_upstream_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/fraud/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "engine": "rules",
                "model_loaded": false
            })))
            .mount(&server)
            .await;

        let health = client().health(&server.uri()).await.unwrap();
        assert!(health.ok);
        assert_eq!(health.engine.as_deref(), Some("rules"));
        assert_eq!(health.model_loaded, Some(false));
    }
}
