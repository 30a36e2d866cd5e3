use crate::{ClientError, ConnectionConfig, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use encoding_rs::Encoding;
use indexmap::IndexMap;
use std::fmt::{Display, Formatter};

/// Name of the parameter that selects the grammar instead of being sent to the server.
pub const GRAMMAR_PARAMETER: &str = "-grammar";

/// Selects the schema the server uses to shape its XML response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Grammar {
    /// `fmresultset`, the standard result set grammar.
    #[default]
    ResultSet,
    /// `FMPXMLLAYOUT`, layout information including value lists.
    LayoutInfo,
    /// `FMPXMLRESULT`, the legacy result grammar.
    FmpXmlResult,
    /// Any other grammar, passed by name.
    Custom(String),
}

impl Grammar {
    /// Name of the grammar as it appears in the request path.
    pub fn as_str(&self) -> &str {
        match self {
            Grammar::ResultSet => "fmresultset",
            Grammar::LayoutInfo => "FMPXMLLAYOUT",
            Grammar::FmpXmlResult => "FMPXMLRESULT",
            Grammar::Custom(name) => name,
        }
    }
}

impl From<&str> for Grammar {
    fn from(name: &str) -> Self {
        match name {
            "fmresultset" => Grammar::ResultSet,
            "FMPXMLLAYOUT" => Grammar::LayoutInfo,
            "FMPXMLRESULT" => Grammar::FmpXmlResult,
            other => Grammar::Custom(other.to_owned()),
        }
    }
}

impl Display for Grammar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of a request parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// Sent as `key=value`.
    Text(String),
    /// Sent as the bare `key`.
    Flag,
}

/// Parameters of one request, in the order they are sent, plus the grammar the response should use.
///
/// # Examples
///
/// ```
/// # use fmxml::{Grammar, RequestIntent};
/// let intent = RequestIntent::new()
///     .param("-db", "Contacts")
///     .param("-lay", "Web")
///     .flag("-findall");
///
/// let (grammar, params) = intent.into_parts();
/// assert_eq!(Grammar::ResultSet, grammar);
/// assert_eq!(3, params.len());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestIntent {
    params: IndexMap<String, ParamValue>,
    grammar: Option<Grammar>,
}

impl RequestIntent {
    /// Creates an intent without parameters, using the default grammar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `key=value`, replacing an earlier value of the same key in place.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), ParamValue::Text(value.into()));
        self
    }

    /// Adds a bare `key`.
    pub fn flag(mut self, key: impl Into<String>) -> Self {
        self.params.insert(key.into(), ParamValue::Flag);
        self
    }

    /// Selects the grammar, overriding any `-grammar` parameter.
    pub fn grammar(mut self, grammar: impl Into<Grammar>) -> Self {
        self.grammar = Some(grammar.into());
        self
    }

    /// Parameters added so far, in insertion order.
    pub fn params(&self) -> &IndexMap<String, ParamValue> {
        &self.params
    }

    /// Splits the intent into the grammar and the parameters to send.
    ///
    /// A `-grammar` parameter is taken out of the set; it selects the grammar unless one was set explicitly.
    pub fn into_parts(mut self) -> (Grammar, IndexMap<String, ParamValue>) {
        let from_param = match self.params.shift_remove(GRAMMAR_PARAMETER) {
            Some(ParamValue::Text(name)) => Some(Grammar::from(name.as_str())),
            _ => None,
        };
        let grammar = self.grammar.or(from_param).unwrap_or_default();

        (grammar, self.params)
    }
}

/// Looks up the encoding values have to be sent in. `None` means UTF-8 and values pass through unchanged.
pub(crate) fn outbound_encoding(config: &ConnectionConfig) -> Result<Option<&'static Encoding>> {
    if config.is_utf8() {
        return Ok(None);
    }
    Encoding::for_label(config.charset.trim().as_bytes())
        .map(Some)
        .ok_or_else(|| ClientError::InvalidCharset(config.charset.clone()))
}

/// Joins the parameters into an `application/x-www-form-urlencoded` body.
pub(crate) fn encode_params(params: &IndexMap<String, ParamValue>, encoding: Option<&'static Encoding>) -> String {
    params
        .iter()
        .map(|(key, value)| match value {
            ParamValue::Flag => urlencoding::encode(key).into_owned(),
            ParamValue::Text(text) => format!("{}={}", urlencoding::encode(key), encode_value(text, encoding)),
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Characters the charset cannot represent are sent as numeric character references such as `&#322;`, which the
/// server stores literally. Charsets that cannot encode form values (UTF-16) fall back to UTF-8.
fn encode_value(value: &str, encoding: Option<&'static Encoding>) -> String {
    match encoding {
        None => urlencoding::encode(value).into_owned(),
        Some(encoding) => {
            let (bytes, used, unmappable) = encoding.encode(value);
            if used != encoding {
                tracing::warn!(charset = encoding.name(), sent_as = used.name(), "Charset cannot encode form values");
            }
            if unmappable {
                tracing::warn!(
                    charset = used.name(),
                    "Value has characters outside of the charset, sent as numeric character references"
                );
            }
            urlencoding::encode_binary(&bytes).into_owned()
        }
    }
}

/// Value of the `Authorization` header for `username` and `password`.
///
/// Credentials are narrowed to Latin-1 first, characters outside of it become `?`. Older servers expect that; it is
/// kept as is even though it breaks credentials that need other characters.
pub(crate) fn basic_auth(username: &str, password: &str) -> String {
    let credentials: Vec<u8> = format!("{}:{}", username, password)
        .chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect();

    format!("Basic {}", STANDARD.encode(credentials))
}
