//! Operator console for a remote claim fraud-scoring API: an HTML page where
//! a claim is pasted as JSON, posted to `/fraud/score_simple` or
//! `/fraud/score`, and the returned probability, label, reasons and top
//! features are shown.

pub mod claim;
pub mod config;
pub mod handlers;
pub mod page;
pub mod scoring;
pub mod session;
pub mod state;
pub mod templates;
