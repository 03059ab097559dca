use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::page::PageState;
use crate::scoring::{docs_url, RequestMode};
use crate::state::AppState;
use crate::templates::page::{self as page_template, PageView};

#[derive(Deserialize, Debug)]
pub struct PageForm {
    #[serde(default)]
    pub claim_json: String,
    /// Checkbox: present (any value) when ticked, absent otherwise.
    #[serde(default)]
    pub simple_mode: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub endpoint: String,
    pub docs_url: String,
    #[serde(flatten)]
    pub state: PageState,
}

fn session_url(id: &Uuid) -> String {
    format!("/session/{}", id)
}

/// Every visit to `/` starts a fresh page with the sample claim.
pub async fn new_session(State(state): State<AppState>) -> Redirect {
    let id = state.sessions.create();
    info!("[claimscore] Opened page session {}", id);
    Redirect::to(&session_url(&id))
}

pub async fn show_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Response {
    let page = match state.sessions.get(&id) {
        Some(p) => p,
        None => return Redirect::to("/").into_response(),
    };
    let api_base = state.api_base(&headers);

    // Content negotiation: JSON if Accept: application/json, HTML otherwise
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("text/html");

    if accept.contains("application/json") {
        Json(SessionResponse {
            session_id: id,
            endpoint: page.endpoint(&api_base),
            docs_url: docs_url(&api_base),
            state: page,
        })
        .into_response()
    } else {
        Html(page_template::render(&PageView {
            session_id: id,
            state: &page,
            api_base: &api_base,
        }))
        .into_response()
    }
}

/// Applies the submitted editor text and mode, then runs the requested
/// action. The session lock is released around the scoring call; a second
/// submit from the same session is not blocked and the later completion
/// overwrites the earlier one.
pub async fn submit_form(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Form(form): Form<PageForm>,
) -> Redirect {
    let mode = RequestMode::from_simple_flag(form.simple_mode.is_some());
    let action = form.action.as_deref().unwrap_or("score");
    let claim_json = form.claim_json;

    let submission = state.sessions.update(&id, |page| {
        page.edit_input(claim_json);
        page.set_mode(mode);
        match action {
            "reset" => {
                page.reset_input();
                None
            }
            "apply" => None,
            _ => Some(page.begin_submit()),
        }
    });

    let submission = match submission {
        Some(Some(s)) => s,
        Some(None) => return Redirect::to(&session_url(&id)),
        None => {
            warn!("[claimscore] Submit for unknown session {}", id);
            return Redirect::to("/");
        }
    };

    let api_base = state.api_base(&headers);
    info!(
        "[claimscore] Session {} scoring via {}",
        id,
        crate::scoring::endpoint(&api_base, submission.mode)
    );
    let outcome = submission.run(&state.client, &api_base).await;

    if state
        .sessions
        .update(&id, |page| page.finish_submit(outcome))
        .is_none()
    {
        warn!("[claimscore] Session {} evicted before scoring finished", id);
    }

    Redirect::to(&session_url(&id))
}
