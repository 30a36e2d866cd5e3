//! Strips the HTTP framing the transport keeps in front of a payload and picks the session cookie out of it.

use crate::session::SessionContext;
use regex::bytes::Regex;
use std::sync::LazyLock;

const XML_MARKER: &[u8] = b"<?xml";
const HEADER_SEPARATOR: &[u8] = b"\r\n\r\n";

static SESSION_COOKIE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)WPCSessionID="([^;\x00-\x1F\x7F]*)";"#).expect("session cookie pattern is valid")
});

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Returns the payload starting at the first `<?xml` marker, or the whole response if there is none.
pub(crate) fn strip_xml_header(response: &[u8]) -> &[u8] {
    match find(response, XML_MARKER) {
        Some(start) => &response[start..],
        None => response,
    }
}

/// Returns everything after the first blank line, or the whole response if there is none.
pub(crate) fn strip_container_header(response: &[u8]) -> &[u8] {
    match find(response, HEADER_SEPARATOR) {
        Some(start) => &response[start + HEADER_SEPARATOR.len()..],
        None => response,
    }
}

/// Finds the session token assigned in the header block of the raw response.
///
/// Only the part before the first blank line is searched, a response without one has no headers. Tokens holding
/// control characters never match, they could not be sent back as a header value.
pub(crate) fn find_session_token(response: &[u8]) -> Option<String> {
    let headers = &response[..find(response, HEADER_SEPARATOR)?];
    SESSION_COOKIE_PATTERN
        .captures(headers)
        .and_then(|captures| captures.get(1))
        .map(|token| String::from_utf8_lossy(token.as_bytes()).into_owned())
}

/// Remembers the token found in `response` if it differs from the current one. Returns `true` on change.
pub(crate) fn sync_session_cookie(response: &[u8], session: &SessionContext) -> bool {
    match find_session_token(response) {
        Some(token) => {
            let changed = session.set_token(token);
            if changed {
                tracing::debug!(cookie = crate::session::SESSION_COOKIE, "Session token updated");
            }
            changed
        }
        None => false,
    }
}
