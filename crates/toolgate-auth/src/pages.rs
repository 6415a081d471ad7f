//! HTML pages shown in the browser at the end of a flow.

const STYLE: &str = r#"  <style>
    body { font-family: system-ui, -apple-system, sans-serif; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0; background: #f8fafc; color: #0f172a; }
    .container { text-align: center; padding: 2rem; }
    h1.ok { color: #16a34a; }
    h1.failed { color: #dc2626; }
    p { color: #475569; }
    .detail { font-family: monospace; margin-top: 1rem; padding: 1rem; background: rgba(220,38,38,0.08); border-radius: 0.5rem; white-space: pre-wrap; }
  </style>"#;

/// Page for a flow that failed, with an optional detail line.
pub fn failure_page(title: &str, detail: Option<&str>) -> String {
    let detail = detail
        .filter(|d| !d.is_empty())
        .map(|d| format!("\n    <div class=\"detail\">{}</div>", html_escape(d)))
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <title>{title}</title>
{STYLE}
</head>
<body>
  <div class="container">
    <h1 class="failed">{title}</h1>{detail}
  </div>
</body>
</html>"#,
        title = html_escape(title),
    )
}

/// Page telling the opener window the flow succeeded, then closing itself.
pub fn success_page(provider: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <title>Authentication Successful</title>
{STYLE}
</head>
<body>
  <div class="container">
    <h1 class="ok">Authentication Successful!</h1>
    <p>You can close this window and return to the application.</p>
  </div>
  <script>
    if (window.opener) {{
      window.opener.postMessage({{ type: 'oauth_success', provider: {provider} }}, '*');
      window.close();
    }}
  </script>
</body>
</html>"#,
        provider = js_string(provider),
    )
}

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Quote a value as a JavaScript string literal safe inside `<script>`.
fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string())
        .to_string()
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}
