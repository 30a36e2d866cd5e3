//! A client for the XML custom web publishing interface of FileMaker Server.
//!
//! The [`Connector`] sends form-encoded requests to `<host>/fmi/xml/<grammar>.xml`, authenticates them, keeps the
//! server's session cookie in a [`SessionContext`] and hands back the XML payload of the response, or the bytes of a
//! container field. [`Layout`] describes the fields, portals and value lists of one layout and loads the expensive
//! parts of that description lazily, once per session.
//!
//! Parsing the XML grammars is left to the caller.
#![warn(rust_2018_idioms)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_doc_code_examples)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(unused)]
#![warn(rustdoc::broken_intra_doc_links)]
#![warn(rustdoc::private_intra_doc_links)]
#![warn(rustdoc::private_doc_tests)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_codeblock_attributes)]
#![warn(rustdoc::invalid_html_tags)]
#![warn(rustdoc::invalid_rust_codeblocks)]
#![warn(rustdoc::bare_urls)]
mod config;
mod connector;
mod errors;
mod framing;
mod layout;
mod request;
mod session;
mod transport;

pub use config::{ConnectionConfig, ErrorHandling, TransportOptions};
pub use connector::{Connector, CONTAINER_PREFIX};
pub use errors::{ClientError, TransportErrorCode};
pub use layout::{
    CacheState, Field, FieldStyle, Layout, LayoutInfo, LayoutSource, LoadScope, MetadataNode, RelatedSet,
    ValueListItem,
};
pub use request::{Grammar, ParamValue, RequestIntent, GRAMMAR_PARAMETER};
pub use session::{SessionContext, SESSION_COOKIE};
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::{
    Method, Transport, TransportOutcome, TransportRequest, CAPTURE_HEADERS_OPTION, HEADER_OPTION_PREFIX,
};

/// A [`Result`] with its [`Err`] variant set to [`ClientError`].
///
/// [`Result`]: std::result::Result
/// [`Err`]: std::result::Result::Err
/// [`ClientError`]: crate::errors::ClientError
pub type Result<T> = std::result::Result<T, ClientError>;
