//! Mapping of raw responses onto typed results.
//!
//! Every request goes through the same small state machine: once a response is
//! received it either decodes as the expected payload ([`Outcome::Decoded`]), is a
//! "not found" the caller agreed to tolerate ([`Outcome::NotFoundTolerated`]), or
//! fails with a [`CouchError`].

use http::StatusCode;
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    error::{CommonErrorKind, CouchError, CouchResult, ServerError},
    transport::TransportResponse,
};

/// Whether a classified `not_found` failure is acceptable for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFound {
    /// Surface the failure.
    Fail,
    /// Treat it as an empty success (idempotent reads and deletes).
    Tolerate,
}

/// The non-failing end states of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Decoded(T),
    NotFoundTolerated,
}

impl<T> Outcome<T> {
    /// Returns the decoded payload, or `None` for a tolerated "not found".
    pub fn into_option(self) -> Option<T> {
        match self {
            Outcome::Decoded(value) => Some(value),
            Outcome::NotFoundTolerated => None,
        }
    }

    pub fn is_tolerated(&self) -> bool {
        matches!(self, Outcome::NotFoundTolerated)
    }
}

/// The error body shape sent by the server: `{ok, error, reason}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Returns the canonical reason phrase for a status code.
pub fn reason_phrase(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Unknown Status")
        .to_string()
}

/// Maps a response onto a decoded payload, a tolerated "not found", or a failure.
///
/// # Errors
///
/// - [`CouchError::Serialization`] if a successful body does not decode as `T`
/// - [`CouchError::Client`] if a failure body is empty or is not an error object
/// - [`CouchError::Server`] for any other failure
pub fn map_response<T>(response: &TransportResponse, not_found: NotFound) -> CouchResult<Outcome<T>>
where
    T: DeserializeOwned,
{
    if response.is_success() {
        return Ok(Outcome::Decoded(serde_json::from_slice(&response.body)?));
    }

    let error = failure(response)?;

    if not_found == NotFound::Tolerate && error.is(CommonErrorKind::NotFound) {
        tracing::debug!(status = response.status, reason = ?error.reason(), "tolerating not_found");
        return Ok(Outcome::NotFoundTolerated);
    }

    Err(CouchError::Server {
        status: response.status,
        error,
    })
}

/// Like [`map_response`], but for a single document read: any 404, whatever its
/// body, means the document is absent.
pub fn map_document<T>(response: &TransportResponse) -> CouchResult<Option<T>>
where
    T: DeserializeOwned,
{
    if response.status == StatusCode::NOT_FOUND.as_u16() {
        return Ok(None);
    }

    Ok(map_response(response, NotFound::Fail)?.into_option())
}

/// Checks that a response succeeded without decoding its body.
pub fn expect_success(response: &TransportResponse, not_found: NotFound) -> CouchResult<Outcome<()>> {
    if response.is_success() {
        return Ok(Outcome::Decoded(()));
    }

    match map_response::<serde_json::Value>(response, not_found)? {
        Outcome::NotFoundTolerated => Ok(Outcome::NotFoundTolerated),
        Outcome::Decoded(_) => Ok(Outcome::Decoded(())),
    }
}

/// Decodes a failed response's body into a [`ServerError`].
fn failure(response: &TransportResponse) -> CouchResult<ServerError> {
    let client_error = || CouchError::Client {
        status: response.status,
        reason: reason_phrase(response.status),
    };

    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Err(client_error());
    }

    let body: ErrorBody = serde_json::from_slice(&response.body).map_err(|_| client_error())?;

    ServerError::classify_with_reason(body.error.as_deref(), body.reason.as_deref()).ok_or_else(client_error)
}
