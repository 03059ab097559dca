use uuid::Uuid;

use crate::page::{PageState, ResultView};
use crate::scoring::{docs_url, ScoreResponse};

/// Inputs for one render of the scoring page.
pub struct PageView<'a> {
    pub session_id: Uuid,
    pub state: &'a PageState,
    /// Resolved scoring API base (configured, or the page's own origin).
    pub api_base: &'a str,
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn list_block(title: &str, items: &[String]) -> String {
    let rows: String = items
        .iter()
        .map(|item| format!("<li>{}</li>", escape(item)))
        .collect();
    format!(
        r#"<div class="block">
                <div class="block-title">{title}:</div>
                <ul>{rows}</ul>
            </div>"#
    )
}

fn scored_panel(resp: &ScoreResponse) -> String {
    let mut rows = vec![format!(
        r#"<div class="row"><b>Engine</b>: {}</div>"#,
        escape(resp.engine_label())
    )];
    if let Some(p) = resp.probability_display() {
        rows.push(format!(r#"<div class="row"><b>Fraud Probability</b>: {p}</div>"#));
    }
    if let Some(label) = resp.prob_label.as_deref() {
        rows.push(format!(
            r#"<div class="row"><b>Label</b>: {}</div>"#,
            escape(label)
        ));
    }
    if let Some(decision) = resp.decision_display() {
        rows.push(format!(
            r#"<div class="row"><b>Decision</b>: {decision}</div>"#
        ));
    }
    if let Some(features) = resp.listed_features() {
        rows.push(list_block("Top Features", features));
    }
    if let Some(reasons) = resp.listed_reasons() {
        rows.push(list_block("Reasons", reasons));
    }
    rows.join("\n            ")
}

pub fn render(view: &PageView) -> String {
    let state = view.state;
    let mode = state.mode;

    let error_block = match state.error.as_deref() {
        Some(error) => format!(r#"<pre class="error" role="alert">{}</pre>"#, escape(error)),
        None => String::new(),
    };

    let result_panel = match state.view() {
        // The error block already carries the message.
        ResultView::Empty | ResultView::Error(_) => {
            r#"<div class="muted">No score yet.</div>"#.to_string()
        }
        ResultView::Scored(resp) => scored_panel(resp),
    };

    let raw_json = match (&state.result, &state.error) {
        (Some(resp), None) => format!(
            r#"<details class="raw">
            <summary>Raw JSON</summary>
            <pre>{}</pre>
        </details>"#,
            escape(&resp.raw_pretty())
        ),
        _ => String::new(),
    };

    let checked = if mode.is_simple() { " checked" } else { "" };
    let disabled = if state.trigger_disabled() { " disabled" } else { "" };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Fraud Scoring</title>
    <style>
        *, *::before, *::after {{ margin: 0; padding: 0; box-sizing: border-box; }}

        :root {{
            --bg: #ffffff;
            --bg-secondary: #f7f8fa;
            --border: #d8dce3;
            --text-primary: #111827;
            --text-secondary: #4b5563;
            --text-tertiary: #9ca3af;
            --red: #b91c1c;
            --red-bg: #fef2f2;
            --red-border: #fecaca;
            --link: #2563eb;
            --mono: 'SF Mono', 'Fira Code', 'JetBrains Mono', 'Cascadia Code', Menlo, monospace;
        }}

        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Inter', system-ui, sans-serif;
            background: var(--bg); color: var(--text-primary); min-height: 100vh;
        }}
        .page {{ max-width: 64rem; margin: 0 auto; padding: 1.5rem; }}
        h1 {{ font-size: 1.5rem; font-weight: 600; margin-bottom: 1.5rem; }}
        .toolbar {{ display: flex; align-items: center; gap: 0.75rem; margin-bottom: 1.5rem; }}
        .toolbar a {{ color: var(--link); }}
        code {{ font-family: var(--mono); font-size: 0.8125rem; }}
        .grid {{ display: grid; grid-template-columns: 1fr 1fr; gap: 1.5rem; }}
        @media (max-width: 48rem) {{ .grid {{ grid-template-columns: 1fr; }} }}
        .caption {{ font-size: 0.875rem; color: var(--text-secondary); margin-bottom: 0.5rem; }}
        textarea {{
            width: 100%; height: 20rem; font-family: var(--mono); font-size: 0.875rem;
            border: 1px solid var(--border); border-radius: 4px; padding: 0.75rem;
        }}
        .actions {{ display: flex; gap: 0.5rem; margin-top: 0.5rem; }}
        button {{
            padding: 0.5rem 1rem; border-radius: 4px; border: 1px solid var(--border);
            background: var(--bg); cursor: pointer;
        }}
        button.primary {{ background: #000; color: #fff; border-color: #000; }}
        button:disabled {{ opacity: 0.5; cursor: default; }}
        pre.error {{
            margin-top: 0.75rem; padding: 0.75rem; background: var(--red-bg); color: var(--red);
            border: 1px solid var(--red-border); font-size: 0.875rem; white-space: pre-wrap;
        }}
        .result {{ border: 1px solid var(--border); border-radius: 4px; padding: 0.75rem; min-height: 5rem; }}
        .result .row {{ font-size: 0.875rem; margin-bottom: 0.75rem; }}
        .block {{ margin-bottom: 0.75rem; }}
        .block-title {{ font-size: 0.875rem; font-weight: 500; margin-bottom: 0.25rem; }}
        .block ul {{ list-style: disc; padding-left: 1.25rem; font-size: 0.875rem; }}
        .muted {{ color: var(--text-tertiary); }}
        details.raw {{ margin-top: 0.75rem; font-size: 0.875rem; }}
        details.raw summary {{ cursor: pointer; }}
        details.raw pre {{
            margin-top: 0.5rem; background: var(--bg-secondary); padding: 0.75rem;
            border-radius: 4px; overflow: auto; font-family: var(--mono);
        }}
    </style>
</head>
<body>
    <form class="page" method="post" action="/session/{session_id}">
        <h1>Fraud Scoring</h1>

        <div class="toolbar">
            <label>
                <input type="checkbox" name="simple_mode" value="on"{checked}
                       onchange="document.getElementById('apply').click()">
                Use friendly endpoint (<code>/fraud/score_simple</code>)
            </label>
            <a href="{docs_url}" target="_blank">API Docs</a>
        </div>

        <div class="grid">
            <div>
                <div class="caption">Paste/Edit claim JSON ({schema}):</div>
                <textarea name="claim_json" spellcheck="false">{input}</textarea>
                <div class="actions">
                    <button id="score" class="primary" type="submit" name="action" value="score"{disabled}
                            data-busy="Scoring&#8230;">{trigger_label}</button>
                    <button id="apply" type="submit" name="action" value="apply">Apply</button>
                    <button type="submit" name="action" value="reset">Reset sample</button>
                </div>
                {error_block}
            </div>

            <div>
                <div class="caption">Result:</div>
                <div class="result">
            {result_panel}
                </div>
                {raw_json}
            </div>
        </div>
    </form>
    <script>
        document.querySelector('form').addEventListener('submit', function (e) {{
            if (e.submitter && e.submitter.id === 'score') {{
                e.submitter.textContent = e.submitter.dataset.busy;
                setTimeout(function () {{ e.submitter.disabled = true; }}, 0);
            }}
        }});
    </script>
</body>
</html>"#,
        session_id = view.session_id,
        checked = checked,
        docs_url = escape(&docs_url(view.api_base)),
        schema = mode.schema_label(),
        input = escape(&state.input),
        disabled = disabled,
        trigger_label = escape(state.trigger_label()),
        error_block = error_block,
        result_panel = result_panel,
        raw_json = raw_json,
    )
}
