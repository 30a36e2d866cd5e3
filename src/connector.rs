use crate::framing::{strip_container_header, strip_xml_header, sync_session_cookie};
use crate::request::{basic_auth, encode_params, outbound_encoding};
use crate::transport::{Method, TransportOutcome, TransportRequest, HEADER_OPTION_PREFIX};
use crate::{ClientError, ConnectionConfig, RequestIntent, Result, SessionContext, Transport};

/// Path of the XML interface below the host.
const XML_PATH: &str = "fmi/xml/";

/// Every container path served by the same host starts with this.
pub const CONTAINER_PREFIX: &str = "/fmi/xml/cnt";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";
const PRIVILEGE_HEADER: &str = "X-FMI-PE-ExtendedPrivilege";
const PRIVILEGE_TOKEN: &str = "IrG6U+Rx0F5bLIQCUb9gOw==";

/// Sends requests to the XML publishing interface of one server and hands back the raw payloads.
///
/// The connector does not understand the XML it receives; it only composes the request, sends it through its
/// [`Transport`] once, keeps the session cookie in sync and removes the HTTP framing from the response. Turning the
/// payload into records is up to the grammar parsers.
///
/// # Examples
///
/// ```no_run
/// # use fmxml::{ConnectionConfig, Connector, RequestIntent, Result};
/// # fn main() -> Result<()> {
/// let config = ConnectionConfig::new("https://fms.example.com").with_credentials("web", "secret");
/// let mut connector = Connector::connect(config);
///
/// let xml = connector.execute(
///     RequestIntent::new().param("-db", "Contacts").param("-lay", "Web").flag("-findall"),
/// )?;
/// assert!(xml.starts_with(b"<?xml"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Connector<T>
where
    T: Transport,
{
    config: ConnectionConfig,
    session: SessionContext,
    transport: T,
    last_requested_url: Option<String>,
}

#[cfg(feature = "http")]
impl Connector<crate::HttpTransport> {
    /// Creates a connector that talks HTTP with its own session context.
    pub fn connect(config: ConnectionConfig) -> Self {
        Self::new(config, SessionContext::new(), crate::HttpTransport::new())
    }
}

impl<T> Connector<T>
where
    T: Transport,
{
    /// Returns a connector sending requests through `transport`, sharing the session token held by `session`.
    pub fn new(config: ConnectionConfig, session: SessionContext, transport: T) -> Self {
        Self {
            config,
            session,
            transport,
            last_requested_url: None,
        }
    }

    /// Configuration read on every request.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Changes take effect with the next request.
    pub fn config_mut(&mut self) -> &mut ConnectionConfig {
        &mut self.config
    }

    /// Session context holding the token sent with the next request.
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// The last composed request URL including the encoded parameters, whether the request succeeded or not.
    pub fn last_requested_url(&self) -> Option<&str> {
        self.last_requested_url.as_deref()
    }

    /// Sends `intent` to the grammar it selects and returns the XML document of the response.
    ///
    /// The payload starts at the `<?xml` declaration when the transport kept the response headers. Transport
    /// failures are classified into [`ClientError::ServiceDown`], [`ClientError::ServiceDownAlt`],
    /// [`ClientError::AuthOrPrivilege`] or [`ClientError::Transport`].
    pub fn execute(&mut self, intent: RequestIntent) -> Result<Vec<u8>> {
        let (grammar, params) = intent.into_parts();
        let body = encode_params(&params, outbound_encoding(&self.config)?);
        let url = format!("{}{}{}.xml", self.config.normalized_host(), XML_PATH, grammar);
        tracing::info!("Request for {}", url);

        let mut headers = vec![
            ("Content-Type".to_owned(), FORM_CONTENT_TYPE.to_owned()),
            (PRIVILEGE_HEADER.to_owned(), PRIVILEGE_TOKEN.to_owned()),
        ];
        self.push_session_headers(&mut headers);

        let requested_url = format!("{}?{}", url, body);
        tracing::debug!("{}", requested_url);
        self.last_requested_url = Some(requested_url);

        match self.dispatch(&url, Method::Post, headers, Some(body))? {
            TransportOutcome::Success { raw, headers_captured } => {
                tracing::debug!("{}", String::from_utf8_lossy(&raw));
                match headers_captured {
                    true => {
                        self.sync_session(&raw);
                        Ok(strip_xml_header(&raw).to_vec())
                    }
                    false => Ok(raw),
                }
            }
            TransportOutcome::Failure { code, message } => Err(self.classify(code, message)),
        }
    }

    /// Fetches the data of a container field from `path`, as found in a container field of a record.
    ///
    /// Only paths on the same server, starting with [`CONTAINER_PREFIX`], are supported; anything else fails with
    /// [`ClientError::UnsupportedRemoteContainer`] before a request is sent. Transport failures are reported as
    /// [`ClientError::Transport`], a missing container is not a credentials problem.
    pub fn container_data(&mut self, path: &str) -> Result<Vec<u8>> {
        if !has_container_prefix(path) {
            return Err(ClientError::UnsupportedRemoteContainer(path.to_owned()));
        }

        let url = container_url(&self.config, path);
        tracing::info!("Request for {}", url);

        let mut headers = vec![(PRIVILEGE_HEADER.to_owned(), PRIVILEGE_TOKEN.to_owned())];
        self.push_session_headers(&mut headers);
        self.last_requested_url = Some(url.clone());

        match self.dispatch(&url, Method::Get, headers, None)? {
            TransportOutcome::Success { raw, headers_captured } => {
                let data = match headers_captured {
                    true => {
                        self.sync_session(&raw);
                        strip_container_header(&raw).to_vec()
                    }
                    false => raw,
                };
                tracing::debug!(bytes = data.len(), "Received container data");
                Ok(data)
            }
            TransportOutcome::Failure { code, message } => Err(self.report(ClientError::Transport { code, message })),
        }
    }

    fn push_session_headers(&self, headers: &mut Vec<(String, String)>) {
        if let Some((username, password)) = self.config.credentials() {
            headers.push(("Authorization".to_owned(), basic_auth(username, password)));
        }
        if self.config.use_cookie_session {
            if let Some(cookie) = self.session.cookie_header() {
                headers.push(("Cookie".to_owned(), cookie));
            }
        }
    }

    fn dispatch(
        &mut self,
        url: &str,
        method: Method,
        mut headers: Vec<(String, String)>,
        body: Option<String>,
    ) -> Result<TransportOutcome> {
        let options = &self.config.transport_options;
        for (key, value) in options.iter() {
            if let Some(name) = key.strip_prefix(HEADER_OPTION_PREFIX) {
                match headers.iter_mut().find(|(existing, _)| existing.eq_ignore_ascii_case(name)) {
                    Some(header) => header.1 = value.to_owned(),
                    None => headers.push((name.to_owned(), value.to_owned())),
                }
            }
        }

        let request = TransportRequest {
            url,
            method,
            headers,
            body,
            options,
        };
        self.transport.send(&request)
    }

    /// Picks the session cookie out of a response that still carries its headers.
    fn sync_session(&self, raw: &[u8]) {
        if self.config.use_cookie_session {
            sync_session_cookie(raw, &self.session);
        }
    }

    fn classify(&self, code: crate::TransportErrorCode, message: String) -> ClientError {
        self.report(ClientError::from_transport(code, message))
    }

    fn report(&self, error: ClientError) -> ClientError {
        tracing::warn!(
            code = error.code().map(|code| code.as_u32()),
            url = self.last_requested_url.as_deref().unwrap_or_default(),
            "{}",
            error
        );
        error
    }
}

fn has_container_prefix(path: &str) -> bool {
    path.get(..CONTAINER_PREFIX.len())
        .map_or(false, |prefix| prefix.eq_ignore_ascii_case(CONTAINER_PREFIX))
}

/// Absolute URL of a container path: entities in the path are decoded and spaces escaped.
fn container_url(config: &ConnectionConfig, path: &str) -> String {
    let host = config.normalized_host();
    let host = host.strip_suffix('/').unwrap_or(&host);

    format!("{}{}", host, decode_html_entities(path)).replace(' ', "%20")
}

fn decode_html_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
