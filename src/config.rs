use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::str::FromStr;

/// Selects whether the facade hands errors back as values or raises them.
///
/// The connector itself always returns [`Result`]; this switch is read by the layer above it.
///
/// [`Result`]: crate::Result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorHandling {
    /// Errors are returned to the caller. Configured as `"default"`.
    #[default]
    #[serde(rename = "default")]
    ReturnError,
    /// Errors are raised. Configured as any other value.
    #[serde(rename = "exception")]
    Raise,
}

impl FromStr for ErrorHandling {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "default" => ErrorHandling::ReturnError,
            _ => ErrorHandling::Raise,
        })
    }
}

/// Transport-specific overrides, applied verbatim after every built-in setting.
///
/// Keys keep their insertion order; setting a key again replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransportOptions {
    options: Vec<(String, String)>,
}

impl TransportOptions {
    /// Creates an empty set of options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, the last write wins.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match self.options.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.options.push((key, value)),
        }
        self
    }

    /// Value of `key`, if set.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Iterates over the options in the order their keys were first set.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns `true` if no option is set.
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

/// Connection properties the [`Connector`] reads on every call.
///
/// # Examples
///
/// ```
/// # use fmxml::ConnectionConfig;
/// let config = ConnectionConfig::new("https://fms.example.com")
///     .with_credentials("admin", "secret")
///     .with_cookie_session(true);
///
/// assert_eq!("https://fms.example.com/", config.normalized_host());
/// ```
///
/// [`Connector`]: crate::Connector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Base URL of the server, with or without a trailing `/`.
    pub host: String,
    /// Basic auth is sent only when this is set and not empty.
    pub username: Option<String>,
    /// Password sent along with [`username`](Self::username).
    pub password: Option<String>,
    /// Charset request values are sent in. Any label other than UTF-8 transcodes them.
    pub charset: String,
    /// Whether the `WPCSessionID` cookie is read from responses and sent back.
    pub use_cookie_session: bool,
    /// Transport-specific overrides.
    pub transport_options: TransportOptions,
    /// How the facade reports errors.
    pub error_handling: ErrorHandling,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".to_owned(),
            username: None,
            password: None,
            charset: "utf-8".to_owned(),
            use_cookie_session: false,
            transport_options: TransportOptions::default(),
            error_handling: ErrorHandling::default(),
        }
    }
}

impl ConnectionConfig {
    /// Configuration for `host` with every other property at its default.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Sets the credentials sent with basic auth.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets the charset request values are sent in, e.g. `ISO-8859-1`.
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Enables or disables the session cookie.
    pub fn with_cookie_session(mut self, enabled: bool) -> Self {
        self.use_cookie_session = enabled;
        self
    }

    /// Sets one transport option, see [`TransportOptions::set`].
    pub fn with_transport_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.transport_options.set(key, value);
        self
    }

    /// Sets how the facade reports errors.
    pub fn with_error_handling(mut self, error_handling: ErrorHandling) -> Self {
        self.error_handling = error_handling;
        self
    }

    /// Host with exactly one trailing `/`.
    pub fn normalized_host(&self) -> String {
        format!("{}/", self.host.trim_end_matches('/'))
    }

    /// Returns `true` when the configured charset is UTF-8 and values are sent unchanged.
    pub fn is_utf8(&self) -> bool {
        let charset = self.charset.trim();
        charset.eq_ignore_ascii_case("utf-8") || charset.eq_ignore_ascii_case("utf8")
    }

    /// Credentials for basic auth, present only when a non-empty username is configured.
    pub(crate) fn credentials(&self) -> Option<(&str, &str)> {
        match self.username.as_deref() {
            Some(username) if !username.is_empty() => Some((username, self.password.as_deref().unwrap_or(""))),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("http://fms.local" ; "without separator")]
    #[test_case("http://fms.local/" ; "with separator")]
    #[test_case("http://fms.local///" ; "with many separators")]
    fn test_normalized_host_ends_with_single_separator(host: &str) {
        let config = ConnectionConfig::new(host);

        assert_eq!("http://fms.local/", config.normalized_host());
    }

    #[test]
    fn test_normalized_host_is_idempotent() {
        let once = ConnectionConfig::new("http://fms.local").normalized_host();
        let twice = ConnectionConfig::new(once.clone()).normalized_host();

        assert_eq!(once, twice);
    }

    #[test_case("default", ErrorHandling::ReturnError)]
    #[test_case("exception", ErrorHandling::Raise)]
    #[test_case("", ErrorHandling::Raise ; "empty")]
    fn test_parses_error_handling(value: &str, expected: ErrorHandling) {
        assert_eq!(expected, value.parse().unwrap());
    }

    #[test]
    fn test_transport_option_last_write_wins() {
        let mut options = TransportOptions::new();
        options.set("timeout", "5").set("proxy", "http://proxy").set("timeout", "30");

        assert_eq!(Some("30"), options.get("timeout"));
        assert_eq!(
            vec![("timeout", "30"), ("proxy", "http://proxy")],
            options.iter().collect::<Vec<_>>()
        );
    }

    #[test_case("utf-8", true)]
    #[test_case("UTF-8", true)]
    #[test_case("utf8", true)]
    #[test_case("ISO-8859-1", false)]
    fn test_detects_utf8_charset(charset: &str, expected: bool) {
        assert_eq!(expected, ConnectionConfig::new("h").with_charset(charset).is_utf8());
    }

    #[test]
    fn test_credentials_require_username() {
        let mut config = ConnectionConfig::new("h");
        assert_eq!(None, config.credentials());

        config.username = Some(String::new());
        assert_eq!(None, config.credentials());

        config.username = Some("admin".to_owned());
        assert_eq!(Some(("admin", "")), config.credentials());
    }

    #[test]
    fn test_deserializes_with_defaults() {
        let config: ConnectionConfig = serde_json::from_str(
            r#"{"host": "https://fms.example.com", "username": "web", "transport_options": [["timeout", "10"]]}"#,
        )
        .unwrap();

        assert_eq!("https://fms.example.com", config.host);
        assert_eq!(Some("web".to_owned()), config.username);
        assert_eq!("utf-8", config.charset);
        assert!(!config.use_cookie_session);
        assert_eq!(ErrorHandling::ReturnError, config.error_handling);
        assert_eq!(Some("10"), config.transport_options.get("timeout"));
    }

    #[test]
    fn test_deserializes_error_handling() {
        let config: ConnectionConfig = serde_json::from_str(r#"{"error_handling": "exception"}"#).unwrap();

        assert_eq!(ErrorHandling::Raise, config.error_handling);
        assert_eq!("http://localhost/", config.normalized_host());
    }
}
