//! Root HTML page.

use crate::state::AppState;
use axum::extract::State;
use axum::response::Html;

/// GET / - Serve the configured index page, or a built-in landing page.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    if let Some(path) = &state.config.server.index_file {
        match tokio::fs::read_to_string(path).await {
            Ok(page) => return Html(page),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read index file, serving built-in page"
                );
            }
        }
    }
    Html(fallback_page(&state.config.app.name))
}

fn fallback_page(app_name: &str) -> String {
    let name = escape_html(app_name);
    format!(
        r#"<!DOCTYPE html>
<html>
    <head><title>{name}</title></head>
    <body>
        <h1>{name}</h1>
        <p>Current count: <span id="count">…</span></p>
        <button id="increment">Increment</button>
        <button id="reset">Reset</button>
        <script>
            const show = (c) => document.getElementById("count").textContent = c.count;
            const call = (method, path) => fetch(path, {{ method }}).then(r => r.json()).then(show);
            document.getElementById("increment").onclick = () => call("POST", "/api/counter");
            document.getElementById("reset").onclick = () => call("POST", "/api/counter/reset");
            call("GET", "/api/counter");
        </script>
    </body>
</html>
"#
    )
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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
