use std::fmt::{Display, Formatter};

/// Native code reported by the transport when a request fails below the XML layer.
///
/// The numbering follows the codes the publishing engine's own tooling reports, so messages stay comparable with
/// server-side logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorCode {
    /// The server returned an HTTP status of 400 or above.
    HttpReturnedError,
    /// The request did not complete within the configured timeout.
    OperationTimedOut,
    /// The server could not be reached or closed the connection without replying.
    EmptyReply,
    /// Any other transport failure, identified by its native code.
    Other(u32),
}

impl TransportErrorCode {
    /// Returns the numeric code.
    pub fn as_u32(&self) -> u32 {
        match self {
            TransportErrorCode::HttpReturnedError => 22,
            TransportErrorCode::OperationTimedOut => 28,
            TransportErrorCode::EmptyReply => 52,
            TransportErrorCode::Other(code) => *code,
        }
    }
}

impl From<u32> for TransportErrorCode {
    fn from(code: u32) -> Self {
        match code {
            22 => TransportErrorCode::HttpReturnedError,
            28 => TransportErrorCode::OperationTimedOut,
            52 => TransportErrorCode::EmptyReply,
            other => TransportErrorCode::Other(other),
        }
    }
}

impl Display for TransportErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// The error type for the operations of the [`Connector`], [`Layout`] and associated structs and traits.
///
/// Transport failures are classified by their native code into the kinds a caller can act upon: the service being
/// down, the credentials being refused, or anything else.
///
/// [`Connector`]: crate::Connector
/// [`Layout`]: crate::Layout
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No HTTP transport could be initialised, so no request was attempted.
    #[error("An HTTP transport is required to use the XML publishing interface: {0}")]
    TransportUnavailable(String),
    /// The server closed the connection without answering.
    #[error(
        "Communication Error: ({code}) {message} - The Web Publishing Core and/or FileMaker Server services are not \
         running."
    )]
    ServiceDown {
        /// Native code of the failure.
        code: TransportErrorCode,
        /// Native message of the failure.
        message: String,
    },
    /// The server refused the request, most likely because of the credentials.
    #[error(
        "Communication Error: ({code}) {message} - This can be due to an invalid username or password, or if the \
         FMPHP privilege is not enabled for that user."
    )]
    AuthOrPrivilege {
        /// Native code of the failure.
        code: TransportErrorCode,
        /// Native message of the failure.
        message: String,
    },
    /// The server answered the request with a 50x status.
    #[error(
        "Communication Error: ({code}) {message} - The Web Publishing Core and/or FileMaker Server services are not \
         running."
    )]
    ServiceDownAlt {
        /// Native code of the failure.
        code: TransportErrorCode,
        /// Native message of the failure.
        message: String,
    },
    /// Any other transport failure.
    #[error("Communication Error: ({code}) {message}")]
    Transport {
        /// Native code of the failure.
        code: TransportErrorCode,
        /// Native message of the failure.
        message: String,
    },
    /// The container path does not point to the same server.
    #[error("Container data can only be fetched from the same server, remote containers are not supported: {0}")]
    UnsupportedRemoteContainer(String),
    /// The layout has no field of this name.
    #[error("Field \"{0}\" Not Found")]
    FieldNotFound(String),
    /// The layout has no portal based on this table occurrence.
    #[error("RelatedSet \"{name}\" Not Found in layout {layout}")]
    RelatedSetNotFound {
        /// Table occurrence that was looked up.
        name: String,
        /// Name of the layout searched.
        layout: String,
    },
    /// The layout information could not be parsed.
    #[error("Failed to parse layout information: {0}")]
    MetadataParse(String),
    /// The configured charset is not known.
    #[error("Unknown charset \"{0}\"")]
    InvalidCharset(String),
}

impl ClientError {
    /// Classifies a failed transport attempt.
    ///
    /// Code 52 means the engine is not running. Code 22 is split by the native message: a 50x status means the same,
    /// anything else points at the credentials.
    pub fn from_transport(code: TransportErrorCode, message: String) -> Self {
        match code {
            TransportErrorCode::EmptyReply => ClientError::ServiceDown { code, message },
            // The "50" substring test mirrors the engine's own tooling, keep it limited to code 22.
            TransportErrorCode::HttpReturnedError if message.contains("50") => {
                ClientError::ServiceDownAlt { code, message }
            }
            TransportErrorCode::HttpReturnedError => ClientError::AuthOrPrivilege { code, message },
            _ => ClientError::Transport { code, message },
        }
    }

    /// Returns the native transport code, if the error came from the transport.
    pub fn code(&self) -> Option<TransportErrorCode> {
        match self {
            ClientError::ServiceDown { code, .. }
            | ClientError::AuthOrPrivilege { code, .. }
            | ClientError::ServiceDownAlt { code, .. }
            | ClientError::Transport { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns `true` for both kinds that mean the publishing engine is not answering.
    pub fn is_service_down(&self) -> bool {
        matches!(self, ClientError::ServiceDown { .. } | ClientError::ServiceDownAlt { .. })
    }
}
