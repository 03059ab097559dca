use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::claim::{parse_claim, sample_claim_text};
use crate::scoring::{endpoint, RequestMode, ScoreError, ScoreResponse, ScoringClient};

/// Everything the scoring page holds. Mutated only through the transition
/// methods below, one per user event.
#[derive(Clone, Debug, Serialize)]
pub struct PageState {
    pub input: String,
    pub mode: RequestMode,
    pub loading: bool,
    pub result: Option<ScoreResponse>,
    pub error: Option<String>,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            input: sample_claim_text(),
            mode: RequestMode::Simple,
            loading: false,
            result: None,
            error: None,
        }
    }
}

/// Which result panel the page shows.
#[derive(Debug, PartialEq)]
pub enum ResultView<'a> {
    Empty,
    Error(&'a str),
    Scored(&'a ScoreResponse),
}

/// Snapshot taken when a submission starts. Later edits or mode flips do not
/// reach a request already in flight.
#[derive(Clone, Debug)]
pub struct Submission {
    pub input: String,
    pub mode: RequestMode,
}

#[derive(Clone, Debug)]
pub struct PreparedRequest {
    pub endpoint: String,
    pub claim: Value,
}

impl Submission {
    pub fn prepare(&self, base: &str) -> Result<PreparedRequest, ScoreError> {
        let claim = parse_claim(&self.input)?;
        Ok(PreparedRequest {
            endpoint: endpoint(base, self.mode),
            claim,
        })
    }

    /// Parse, then make the single outbound call. A malformed buffer returns
    /// before any request is built.
    pub async fn run(
        &self,
        client: &ScoringClient,
        base: &str,
    ) -> Result<ScoreResponse, ScoreError> {
        let request = self.prepare(base)?;
        client.score(&request.endpoint, &request.claim).await
    }
}

impl PageState {
    pub fn edit_input(&mut self, text: String) {
        self.input = text;
    }

    pub fn set_mode(&mut self, mode: RequestMode) {
        self.mode = mode;
    }

    pub fn reset_input(&mut self) {
        self.input = sample_claim_text();
    }

    pub fn endpoint(&self, base: &str) -> String {
        endpoint(base, self.mode)
    }

    /// Clears the previous outcome and marks the page busy.
    pub fn begin_submit(&mut self) -> Submission {
        self.error = None;
        self.result = None;
        self.loading = true;
        Submission {
            input: self.input.clone(),
            mode: self.mode,
        }
    }

    /// Stores the outcome of a submission. Whichever submission finishes last
    /// owns the result slots, and the first to finish clears `loading`.
    pub fn finish_submit(&mut self, outcome: Result<ScoreResponse, ScoreError>) {
        match outcome {
            Ok(resp) => {
                info!(
                    "[claimscore] Scored claim: engine={} probability={:?}",
                    resp.engine_label(),
                    resp.fraud_probability
                );
                self.result = Some(resp);
            }
            Err(e) => {
                warn!("[claimscore] Submission failed ({}): {}", e.kind(), e);
                self.error = Some(e.to_string());
            }
        }
        self.loading = false;
    }

    pub fn view(&self) -> ResultView<'_> {
        if let Some(error) = self.error.as_deref() {
            return ResultView::Error(error);
        }
        match &self.result {
            Some(resp) => ResultView::Scored(resp),
            None => ResultView::Empty,
        }
    }

    pub fn trigger_disabled(&self) -> bool {
        self.loading
    }

    pub fn trigger_label(&self) -> &'static str {
        if self.loading {
            "Scoring\u{2026}"
        } else {
            "Score Claim"
        }
    }
}

/// Full request/response cycle for a state the caller owns exclusively.
pub async fn submit(state: &mut PageState, client: &ScoringClient, base: &str) {
    let submission = state.begin_submit();
    let outcome = submission.run(client, base).await;
    state.finish_submit(outcome);
}
