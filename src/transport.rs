use crate::config::TransportOptions;
use crate::errors::TransportErrorCode;
use crate::Result;

/// Prefix of transport options that set a raw request header, e.g. `header.Accept-Language`.
pub const HEADER_OPTION_PREFIX: &str = "header.";

/// Transport option that decides whether the raw response keeps its status line and headers. Defaults to `true`.
pub const CAPTURE_HEADERS_OPTION: &str = "capture_headers";

/// HTTP method of a [`TransportRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Used to fetch container data.
    Get,
    /// Used for XML requests, the parameters travel in the body.
    Post,
}

/// One request, fully composed by the [`Connector`].
///
/// [`Connector`]: crate::Connector
#[derive(Debug, Clone)]
pub struct TransportRequest<'a> {
    /// Absolute URL of the request.
    pub url: &'a str,
    /// HTTP method to send the request with.
    pub method: Method,
    /// Header names and values, in the order they are sent.
    pub headers: Vec<(String, String)>,
    /// Form-encoded body, present for `POST` requests.
    pub body: Option<String>,
    /// Transport options of the connection.
    pub options: &'a TransportOptions,
}

impl TransportRequest<'_> {
    /// Value of the header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether the raw response should keep its status line and headers in front of the payload.
    pub fn capture_headers(&self) -> bool {
        self.options
            .get(CAPTURE_HEADERS_OPTION)
            .and_then(parse_bool)
            .unwrap_or(true)
    }
}

/// Result of a single request attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOutcome {
    /// The server answered with a success status.
    Success {
        /// Response bytes as received.
        raw: Vec<u8>,
        /// `true` if `raw` starts with the status line and headers.
        headers_captured: bool,
    },
    /// The request failed below the XML layer.
    Failure {
        /// Native code of the failure.
        code: TransportErrorCode,
        /// Native message of the failure.
        message: String,
    },
}

/// Sends a request to the server, once.
///
/// Implementors must not retry and must not keep a connection open past the call. An [`Err`] is reserved for a
/// transport that cannot be used at all, i.e. [`ClientError::TransportUnavailable`]; every failure of an attempted
/// request is reported as [`TransportOutcome::Failure`].
///
/// [`ClientError::TransportUnavailable`]: crate::ClientError::TransportUnavailable
pub trait Transport {
    /// Sends `request` and reports how the attempt ended.
    fn send(&mut self, request: &TransportRequest<'_>) -> Result<TransportOutcome>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, request: &TransportRequest<'_>) -> Result<TransportOutcome> {
        (**self).send(request)
    }
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(feature = "http")]
pub use self::http::HttpTransport;

#[cfg(feature = "http")]
mod http {
    use super::{parse_bool, Method, TransportOutcome, TransportRequest, CAPTURE_HEADERS_OPTION, HEADER_OPTION_PREFIX};
    use crate::config::TransportOptions;
    use crate::errors::TransportErrorCode;
    use crate::{ClientError, Result, Transport};
    use reqwest::blocking::{Client, Response};
    use std::time::Duration;

    /// [`Transport`] over a blocking [`reqwest`] client.
    ///
    /// A fresh client is built for every call and dropped when the call returns, so no connection outlives a request.
    /// Transport options are interpreted as follows:
    ///
    /// * `timeout`, `connect_timeout`: seconds, fractions allowed.
    /// * `danger_accept_invalid_certs`: boolean.
    /// * `proxy`: proxy URL for all schemes.
    /// * `user_agent`: the `User-Agent` header.
    /// * `capture_headers`: boolean, see [`CAPTURE_HEADERS_OPTION`].
    ///
    /// Options starting with [`HEADER_OPTION_PREFIX`] are already applied to the request headers; any other key is
    /// ignored with a warning.
    #[derive(Debug, Clone, Default)]
    pub struct HttpTransport;

    impl HttpTransport {
        /// Creates the transport. Clients are built per request, so this cannot fail.
        pub fn new() -> Self {
            Self
        }

        fn build_client(options: &TransportOptions) -> Result<Client> {
            let mut builder = Client::builder().pool_max_idle_per_host(0);

            for (key, value) in options.iter() {
                builder = match key {
                    "timeout" => match parse_seconds(value) {
                        Some(timeout) => builder.timeout(timeout),
                        None => ignore(builder, key, value),
                    },
                    "connect_timeout" => match parse_seconds(value) {
                        Some(timeout) => builder.connect_timeout(timeout),
                        None => ignore(builder, key, value),
                    },
                    "danger_accept_invalid_certs" => match parse_bool(value) {
                        Some(accept) => builder.danger_accept_invalid_certs(accept),
                        None => ignore(builder, key, value),
                    },
                    "proxy" => match reqwest::Proxy::all(value) {
                        Ok(proxy) => builder.proxy(proxy),
                        Err(_) => ignore(builder, key, value),
                    },
                    "user_agent" => builder.user_agent(value),
                    CAPTURE_HEADERS_OPTION => builder,
                    _ if key.starts_with(HEADER_OPTION_PREFIX) => builder,
                    _ => ignore(builder, key, value),
                };
            }

            builder
                .build()
                .map_err(|e| ClientError::TransportUnavailable(e.to_string()))
        }
    }

    impl Transport for HttpTransport {
        fn send(&mut self, request: &TransportRequest<'_>) -> Result<TransportOutcome> {
            let client = Self::build_client(request.options)?;

            let mut builder = match request.method {
                Method::Get => client.get(request.url),
                Method::Post => client.post(request.url),
            };
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(body) = &request.body {
                builder = builder.body(body.clone());
            }

            let response = match builder.send() {
                Ok(response) => response,
                Err(e) => return Ok(failure(&e)),
            };

            let status = response.status();
            if status.is_client_error() || status.is_server_error() {
                return Ok(TransportOutcome::Failure {
                    code: TransportErrorCode::HttpReturnedError,
                    message: format!("The requested URL returned error: {}", status),
                });
            }

            let headers_captured = request.capture_headers();
            let head = if headers_captured { raw_head(&response) } else { vec![] };

            match response.bytes() {
                Ok(body) => {
                    let mut raw = head;
                    raw.extend_from_slice(&body);
                    Ok(TransportOutcome::Success { raw, headers_captured })
                }
                Err(e) => Ok(failure(&e)),
            }
        }
    }

    fn ignore<B>(builder: B, key: &str, value: &str) -> B {
        tracing::warn!(option = key, value, "Ignoring unsupported transport option");
        builder
    }

    fn parse_seconds(value: &str) -> Option<Duration> {
        value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
            .map(Duration::from_secs_f64)
    }

    /// Rebuilds the status line and headers the way they came over the wire.
    fn raw_head(response: &Response) -> Vec<u8> {
        let mut head = format!("{:?} {}\r\n", response.version(), response.status()).into_bytes();
        for (name, value) in response.headers() {
            head.extend_from_slice(name.as_str().as_bytes());
            head.extend_from_slice(b": ");
            head.extend_from_slice(value.as_bytes());
            head.extend_from_slice(b"\r\n");
        }
        head.extend_from_slice(b"\r\n");
        head
    }

    fn failure(error: &reqwest::Error) -> TransportOutcome {
        let code = if error.is_timeout() {
            TransportErrorCode::OperationTimedOut
        } else if error.is_connect() {
            TransportErrorCode::EmptyReply
        } else if error.is_builder() {
            TransportErrorCode::Other(3)
        } else if error.is_redirect() {
            TransportErrorCode::Other(47)
        } else if error.is_body() || error.is_decode() {
            TransportErrorCode::Other(56)
        } else {
            TransportErrorCode::Other(0)
        };

        TransportOutcome::Failure {
            code,
            message: error.to_string(),
        }
    }

}
