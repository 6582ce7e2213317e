//! Error types for the MQL client.

use std::time::Duration;

use mql_protocol::{DecodeError, EnvelopeError, ProtocolException};
use thiserror::Error;

/// Broad class of a failed call.
///
/// An ordinary command failure is none of these; it arrives as a
/// [`CommandResult`](mql_protocol::CommandResult) with `success == false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// The request did not complete: no endpoint, connection failure,
	/// timeout, or non-200 status.
	Transport,
	/// The response could not be decoded.
	Parse,
	/// The server rejected the request with an `exception` response.
	Protocol,
}

/// Errors returned by [`Client`](crate::Client) calls.
#[derive(Debug, Error)]
pub enum Error {
	#[error("no server endpoint configured")]
	NoEndpoint,

	#[error("invalid endpoint '{endpoint}': {source}")]
	InvalidEndpoint {
		endpoint: String,
		#[source]
		source: url::ParseError,
	},

	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("request timed out after {0:?}")]
	Timeout(Duration),

	#[error("HTTP status: {0}")]
	HttpStatus(u16),

	#[error("failed to build request: {0}")]
	Envelope(#[from] EnvelopeError),

	#[error("failed to decode response: {0}")]
	Decode(#[from] DecodeError),

	#[error("server exception: {0}")]
	Exception(ProtocolException),
}

impl Error {
	pub fn kind(&self) -> ErrorKind {
		match self {
			Error::NoEndpoint | Error::InvalidEndpoint { .. } | Error::Http(_) | Error::Timeout(_) | Error::HttpStatus(_) | Error::Envelope(_) => {
				ErrorKind::Transport
			}
			Error::Decode(_) => ErrorKind::Parse,
			Error::Exception(_) => ErrorKind::Protocol,
		}
	}
}

impl From<ProtocolException> for Error {
	fn from(exception: ProtocolException) -> Self {
		Error::Exception(exception)
	}
}

pub type Result<T> = std::result::Result<T, Error>;
