//! Browser side of live reload: served pages subscribe to the server's event
//! stream and reload when a watched file changes.

/// Route of the server-sent event stream
pub const EVENTS_PATH: &str = "/__merge/events";

/// Name of the event sent on every change
pub const RELOAD_EVENT: &str = "reload";

pub fn script() -> String {
    format!(
        r#"<script>new EventSource("{}").addEventListener("{}", function () {{ location.reload(); }});</script>"#,
        EVENTS_PATH, RELOAD_EVENT
    )
}

/// Insert the reload script before `</head>`, else before `</body>`, else at
/// the end of the page
pub fn inject(html: &str) -> String {
    let script = script();
    let lower = html.to_ascii_lowercase();
    let at = lower.rfind("</head>").or_else(|| lower.rfind("</body>"));

    match at {
        Some(index) => {
            let mut output = String::with_capacity(html.len() + script.len());
            output.push_str(&html[..index]);
            output.push_str(&script);
            output.push_str(&html[index..]);
            output
        }
        None => format!("{}{}", html, script),
    }
}
