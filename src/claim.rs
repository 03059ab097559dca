use serde_json::{json, Value};

use crate::scoring::ScoreError;

/// The claim the editor starts with, shaped like the minimal scoring schema.
pub fn sample_claim() -> Value {
    json!({
        "claim_id": "C001",
        "line_of_business": "Auto",
        "late_report_days": 3,
        "claim_amount": 12000,
        "paid_to_date": 5000,
        "reserve": 7000,
        "claimant_age": 42,
        "injury_severity": 2,
        "police_report": true,
        "prior_claims_count": 1
    })
}

pub fn sample_claim_text() -> String {
    serde_json::to_string_pretty(&sample_claim()).unwrap_or_else(|_| "{}".to_string())
}

/// Parse the editor buffer. Any JSON value passes; the schema is the scoring
/// service's business.
pub fn parse_claim(text: &str) -> Result<Value, ScoreError> {
    serde_json::from_str(text).map_err(|e| ScoreError::Client(e.to_string()))
}
