use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Name of the cookie the publishing engine uses to keep a session.
pub const SESSION_COOKIE: &str = "WPCSessionID";

#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    outbound: Option<String>,
}

/// Holds the session token shared by every [`Connector`] it is handed to.
///
/// Clones point to the same token, so one context can serve several connectors to the same server. The token is
/// read before a request and written after a response; the context does not serialise whole requests, so concurrent
/// callers racing on the token must coordinate themselves.
///
/// # Examples
///
/// ```
/// # use fmxml::SessionContext;
/// let session = SessionContext::new();
/// let shared = session.clone();
///
/// session.set_token("abc123");
/// assert_eq!(Some("abc123".to_owned()), shared.token());
/// assert_eq!(Some("WPCSessionID=abc123".to_owned()), shared.cookie_header());
/// ```
///
/// [`Connector`]: crate::Connector
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    state: Arc<Mutex<SessionState>>,
}

impl SessionContext {
    /// Creates a context without a token.
    pub fn new() -> Self {
        Self::default()
    }

    /// The token remembered from the last response that carried one.
    pub fn token(&self) -> Option<String> {
        self.lock().token.clone()
    }

    /// Remembers `token` and mirrors it into the outbound cookie. Returns `true` if it differed from the previous one.
    pub fn set_token(&self, token: impl Into<String>) -> bool {
        let token = token.into();
        let mut state = self.lock();
        if state.token.as_deref() == Some(token.as_str()) {
            return false;
        }
        state.outbound = Some(format!("{}={}", SESSION_COOKIE, token));
        state.token = Some(token);
        true
    }

    /// The `Cookie` header value to send, if a token is known.
    pub fn cookie_header(&self) -> Option<String> {
        self.lock().outbound.clone()
    }

    /// Forgets the token, e.g. after the session was terminated.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.token = None;
        state.outbound = None;
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
