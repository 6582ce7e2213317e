//! Error types for envelope rendering and response decoding.

use thiserror::Error;

/// Failure to turn a server response into structured data.
///
/// Every variant means the response could not be understood. None of them
/// describe a server-reported fault, which is decoded as
/// [`Response::Exception`](crate::Response::Exception) instead.
#[derive(Debug, Error)]
pub enum DecodeError {
	#[error("malformed XML at byte {position}: {message}")]
	Xml { position: u64, message: String },

	#[error("response contains no root element")]
	NoRoot,

	#[error("response contains more than one root element")]
	MultipleRoots,

	#[error("unclosed element <{0}> at end of response")]
	Unclosed(String),

	#[error("missing field '{0}' in response")]
	MissingField(String),

	#[error("field '{field}' has unexpected shape: expected {expected}")]
	UnexpectedShape { field: String, expected: &'static str },

	#[error("invalid pseudo-array count '{0}'")]
	InvalidCount(String),

	#[error("malformed username header: {0}")]
	Username(String),
}

/// Failure to render an envelope as XML.
#[derive(Debug, Error)]
pub enum EnvelopeError {
	#[error("failed to write XML: {0}")]
	Write(String),

	#[error("failed to re-read serialized XML at byte {position}: {message}")]
	Reparse { position: u64, message: String },
}
