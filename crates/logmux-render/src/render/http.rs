use serde_json::{Map, Value};

use super::js;

/// One HTTP object laid out for the details block. Fields with no special
/// handling come back in `leftovers` to be shown as `<object>.<field>`.
#[derive(Debug, Default)]
pub(super) struct HttpBlock<'a> {
    pub text: Option<String>,
    pub leftovers: Vec<(&'a str, &'a Value)>,
}

fn leftovers<'a>(object: &'a Map<String, Value>, handled: &[&str]) -> Vec<(&'a str, &'a Value)> {
    object
        .iter()
        .filter(|(key, _)| !handled.contains(&key.as_str()))
        .map(|(key, value)| (key.as_str(), value))
        .collect()
}

/// `name: value` lines for a header object; strings are used as-is
fn header_lines(headers: &Value) -> String {
    match headers {
        Value::Object(map) => map
            .iter()
            .map(|(name, value)| format!("{}: {}", name, js::display(Some(value))))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, value)| format!("{}: {}", i, js::display(Some(value))))
            .collect::<Vec<_>>()
            .join("\n"),
        other => js::display(Some(other)),
    }
}

/// Objects are pretty-printed, anything else stringified
fn body_text(body: &Value) -> String {
    match body {
        Value::Object(_) | Value::Array(_) | Value::Null => js::pretty(body),
        other => js::display(Some(other)),
    }
}

fn request_line(object: &Map<String, Value>) -> String {
    let version = object
        .get("httpVersion")
        .filter(|v| js::truthy(v))
        .map(|v| js::display(Some(v)))
        .unwrap_or_else(|| "1.1".to_string());
    format!(
        "{} {} HTTP/{}",
        js::display(object.get("method")),
        js::display(object.get("url")),
        version
    )
}

/// Server-side request: request line, headers, body and trailers
pub(super) fn request(req: &Map<String, Value>) -> HttpBlock<'_> {
    let mut handled = vec!["method", "url", "httpVersion", "headers", "trailers"];
    let mut text = request_line(req);

    if let Some(headers) = req.get("headers").filter(|h| js::truthy(h)) {
        text.push('\n');
        text.push_str(&header_lines(headers));
    }

    if let Some(body) = req.get("body").filter(|b| js::truthy(b)) {
        handled.push("body");
        text.push_str("\n\n");
        text.push_str(&body_text(body));
    }

    if let Some(trailers) = req
        .get("trailers")
        .filter(|t| t.as_object().is_some_and(|map| !map.is_empty()))
    {
        text.push('\n');
        text.push_str(&header_lines(trailers));
    }

    HttpBlock {
        text: Some(text),
        leftovers: leftovers(req, &handled),
    }
}

/// Outgoing request as seen by an HTTP client; the target address becomes
/// a `Host:` line
pub(super) fn client_request(req: &Map<String, Value>) -> HttpBlock<'_> {
    let mut handled = vec!["method", "url", "httpVersion", "headers", "address", "port"];
    let mut text = request_line(req);

    if let Some(address) = req.get("address").filter(|a| js::truthy(a)) {
        text.push_str("\nHost: ");
        text.push_str(&js::display(Some(address)));
        if let Some(port) = req.get("port").filter(|p| js::truthy(p)) {
            text.push(':');
            text.push_str(&js::display(Some(port)));
        }
    }

    if let Some(headers) = req.get("headers").filter(|h| js::truthy(h)) {
        text.push('\n');
        text.push_str(&header_lines(headers));
    }

    if let Some(body) = req.get("body").filter(|b| js::truthy(b)) {
        handled.push("body");
        text.push_str("\n\n");
        text.push_str(&body_text(body));
    }

    HttpBlock {
        text: Some(text),
        leftovers: leftovers(req, &handled),
    }
}

/// Response (server or client side): status line, headers, body, trailer.
///
/// `header` is preferred over `headers`. A header string that already
/// starts with a status line suppresses the synthesized one.
pub(super) fn response(res: &Map<String, Value>) -> HttpBlock<'_> {
    let mut handled = vec!["statusCode", "trailer"];

    let headers = ["header", "headers"].into_iter().find_map(|key| {
        res.get(key)
            .filter(|h| js::truthy(h) && (h.is_string() || h.is_object() || h.is_array()))
            .map(|h| (key, h))
    });

    let mut header_text = String::new();
    let mut has_status_line = false;
    if let Some((key, headers)) = headers {
        handled.push(key);
        match headers {
            Value::String(raw) => {
                header_text = raw.trim_end().to_string();
                has_status_line = header_text.starts_with("HTTP/");
            }
            other => header_text = header_lines(other),
        }
    }

    let mut text = String::new();
    if !has_status_line {
        if let Some(code) = res.get("statusCode") {
            text.push_str(&status_line(code));
            text.push('\n');
        }
    }
    text.push_str(&header_text);

    match res.get("body") {
        Some(body) => {
            handled.push("body");
            let body = body_text(body);
            if body.is_empty() {
                text.truncate(text.trim_end().len());
            } else {
                text.push_str("\n\n");
                text.push_str(&body);
            }
        }
        None => text.truncate(text.trim_end().len()),
    }

    if let Some(trailer) = res.get("trailer").filter(|t| js::truthy(t)) {
        text.push('\n');
        text.push_str(&js::display(Some(trailer)));
    }

    HttpBlock {
        text: (!text.is_empty()).then_some(text),
        leftovers: leftovers(res, &handled),
    }
}

/// `HTTP/1.1 404 Not Found`; the reason is left off for unknown codes
fn status_line(code: &Value) -> String {
    let reason = code
        .as_u64()
        .or_else(|| code.as_str().and_then(|s| s.parse().ok()))
        .and_then(|n| u16::try_from(n).ok())
        .and_then(|n| http::StatusCode::from_u16(n).ok())
        .and_then(|status| status.canonical_reason());
    match reason {
        Some(reason) => format!("HTTP/1.1 {} {}", js::display(Some(code)), reason),
        None => format!("HTTP/1.1 {}", js::display(Some(code))),
    }
}
