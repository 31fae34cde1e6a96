use axum::http::request::Parts;

/// Reads a credential from, in order: a header, a cookie, or a query
/// parameter — matching this system's convention of accepting an API
/// key in any of the three locations.
pub fn extract_credential(parts: &Parts, header_name: &str, query_name: &str) -> Option<String> {
    if let Some(value) = parts
        .headers
        .get(header_name)
        .and_then(|v| v.to_str().ok())
    {
        return Some(value.to_string());
    }

    if let Some(cookie_header) = parts.headers.get(axum::http::header::COOKIE)
        && let Ok(cookie_header) = cookie_header.to_str()
    {
        for pair in cookie_header.split(';') {
            let pair = pair.trim();
            if let Some(value) = pair.strip_prefix(&format!("{header_name}=")) {
                return Some(value.to_string());
            }
        }
    }

    if let Some(query) = parts.uri.query() {
        for pair in query.split('&') {
            let mut parts = pair.splitn(2, '=');
            if parts.next() == Some(query_name)
                && let Some(value) = parts.next()
            {
                return percent_encoding::percent_decode_str(value)
                    .decode_utf8()
                    .ok()
                    .map(|s| s.into_owned());
            }
        }
    }

    None
}
