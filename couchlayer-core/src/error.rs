//! Error types and result types for client operations.
//!
//! This module holds the client's error taxonomy ([`CouchError`]) together with the
//! server error vocabulary ([`ServerError`], [`CommonErrorKind`]) and the classifier
//! that maps raw error tokens onto it.

use serde_json::Error as SerdeJsonError;
use std::fmt;
use thiserror::Error;

/// The closed set of error tokens a CouchDB-style server commonly reports.
///
/// A raw token is classified by a case-insensitive, exact comparison against
/// [`CommonErrorKind::name`]. Underscores are significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommonErrorKind {
    FileExists,
    BadRequest,
    Conflict,
    NotFound,
    BadContentType,
    IllegalDocId,
    DocValidation,
}

impl CommonErrorKind {
    /// Every member, in declaration order.
    pub const ALL: [CommonErrorKind; 7] = [
        CommonErrorKind::FileExists,
        CommonErrorKind::BadRequest,
        CommonErrorKind::Conflict,
        CommonErrorKind::NotFound,
        CommonErrorKind::BadContentType,
        CommonErrorKind::IllegalDocId,
        CommonErrorKind::DocValidation,
    ];

    /// Returns the member name as it is matched against server tokens.
    pub fn name(&self) -> &'static str {
        match self {
            CommonErrorKind::FileExists => "File_Exists",
            CommonErrorKind::BadRequest => "Bad_Request",
            CommonErrorKind::Conflict => "Conflict",
            CommonErrorKind::NotFound => "Not_Found",
            CommonErrorKind::BadContentType => "Bad_Content_Type",
            CommonErrorKind::IllegalDocId => "Illegal_DocId",
            CommonErrorKind::DocValidation => "Doc_Validation",
        }
    }

    /// Looks up the member whose name equals `token`, ignoring ASCII case.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(token))
    }
}

impl fmt::Display for CommonErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A well-formed failure reported by the server.
///
/// The raw token is always preserved verbatim. `classified` is only present when the
/// token names one of the [`CommonErrorKind`] members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    raw_token: String,
    classified: Option<CommonErrorKind>,
    reason: Option<String>,
}

impl ServerError {
    /// Builds a server error from a raw token and optional reason, classifying the token.
    pub fn new(raw_token: impl Into<String>, reason: Option<String>) -> Self {
        let raw_token = raw_token.into();
        let classified = CommonErrorKind::from_token(&raw_token);

        Self { raw_token, classified, reason }
    }

    /// Classifies an optional raw token.
    ///
    /// `None` means "no error present" and yields `None`. Any token yields a
    /// [`ServerError`], classified or not.
    pub fn classify(raw_token: Option<&str>) -> Option<Self> {
        raw_token.map(|token| Self::new(token, None))
    }

    /// Same as [`ServerError::classify`], attaching the reason when an error is present.
    pub fn classify_with_reason(raw_token: Option<&str>, reason: Option<&str>) -> Option<Self> {
        raw_token.map(|token| Self::new(token, reason.map(str::to_string)))
    }

    pub fn raw_token(&self) -> &str {
        &self.raw_token
    }

    pub fn classified(&self) -> Option<CommonErrorKind> {
        self.classified
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Returns `true` if the token was classified as `kind`.
    pub fn is(&self, kind: CommonErrorKind) -> bool {
        self.classified == Some(kind)
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{}: {}", self.raw_token, reason),
            None => f.write_str(&self.raw_token),
        }
    }
}

/// Represents all possible errors that can occur when talking to the database server.
///
/// Argument errors are raised locally before any request is sent. Response errors
/// distinguish between a well-formed server failure ([`CouchError::Server`]) and a
/// response that could not be understood at all ([`CouchError::Client`],
/// [`CouchError::MalformedResponse`]). Nothing in this crate retries on any of them.
#[derive(Error, Debug)]
pub enum CouchError {
    /// The caller misused the API (missing or blank value, empty collection,
    /// illegal parameter combination).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The server answered with JSON that violates the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    /// The server answered with a well-formed error body.
    #[error("Server error ({status}): {error}")]
    Server {
        status: u16,
        error: ServerError,
    },
    /// The server answered with a failure whose body could not be parsed.
    #[error("Client error ({status}): {reason}")]
    Client {
        status: u16,
        reason: String,
    },
    /// The request never produced a response.
    #[error("Transport error: {0}")]
    Transport(String),
    /// Serialization or deserialization of a payload failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during transport construction.
    #[error("Initialization error: {0}")]
    Initialization(String),
}

impl CouchError {
    /// Shorthand for an [`CouchError::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        CouchError::InvalidArgument(message.into())
    }

    /// Returns the server error carried by this error, if any.
    pub fn server_error(&self) -> Option<&ServerError> {
        match self {
            CouchError::Server { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Returns the HTTP status this error was produced from, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            CouchError::Server { status, .. } | CouchError::Client { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.server_error()
            .is_some_and(|error| error.is(CommonErrorKind::Conflict))
    }

    pub fn is_not_found(&self) -> bool {
        self.server_error()
            .is_some_and(|error| error.is(CommonErrorKind::NotFound))
    }
}

/// A specialized `Result` type for client operations.
pub type CouchResult<T> = Result<T, CouchError>;

impl From<SerdeJsonError> for CouchError {
    fn from(err: SerdeJsonError) -> Self {
        CouchError::Serialization(err.to_string())
    }
}
