//! Response decoding.
//!
//! A response body is either a protocol exception (root element
//! `exception`) or a document whose payload is read with the helpers below.
//! Repeated values use the server's pseudo-array encoding:
//!
//! ```text
//! <results>
//!   <count>2</count>
//!   <element.0>first</element.0>
//!   <element.1>second</element.1>
//! </results>
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

use crate::error::DecodeError;
use crate::types::{CommandResult, Task};
use crate::wire::{COUNT_FIELD, ELEMENT_PREFIX, EXCEPTION_ROOT, SESSION_COOKIE, STATUS_OK};
use crate::xml::{self, XmlDocument, XmlMap, XmlValue};

/// A fault reported by the server for the request as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProtocolException {
	pub message: String,
	/// The full `exception` element as sent.
	pub detail: XmlValue,
}

impl ProtocolException {
	fn from_value(value: XmlValue) -> Self {
		let message = match &value {
			XmlValue::Map(map) => map
				.get("message")
				.map(XmlValue::flatten_text)
				.unwrap_or_else(|| value.flatten_text()),
			other => other.flatten_text(),
		};
		Self { message, detail: value }
	}
}

/// A successfully parsed response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
	Exception(ProtocolException),
	Document(XmlDocument),
}

/// Parses `body` and separates protocol exceptions from regular documents.
pub fn decode_response(body: &str) -> Result<Response, DecodeError> {
	let doc = xml::parse(body)?;
	if doc.name() == EXCEPTION_ROOT {
		return Ok(Response::Exception(ProtocolException::from_value(doc.into_value())));
	}
	Ok(Response::Document(doc))
}

/// Reads a pseudo-array: `count` holds N, items live under `element.0`
/// through `element.(N-1)`.
///
/// Items are fetched by index, never by scanning keys, so stray siblings are
/// ignored and a missing index is an error. N = 0 performs no item lookups.
/// `field` names the array in error messages.
pub fn pseudo_array<'a>(container: &'a XmlValue, field: &str) -> Result<Vec<&'a XmlValue>, DecodeError> {
	let map = container.as_map().ok_or_else(|| DecodeError::MissingField(format!("{field}.{COUNT_FIELD}")))?;
	let raw_count = text_field(map, COUNT_FIELD, field)?;
	let count: usize = raw_count
		.trim()
		.parse()
		.map_err(|_| DecodeError::InvalidCount(raw_count.to_string()))?;

	let mut items = Vec::with_capacity(count.min(map.len()));
	for index in 0..count {
		let key = format!("{ELEMENT_PREFIX}{index}");
		let item = map.get(&key).ok_or_else(|| DecodeError::MissingField(format!("{field}.{key}")))?;
		items.push(item);
	}
	Ok(items)
}

/// Extracts the `bosMQLCommand.returnVal` payload of a command response.
pub fn command_result(doc: &XmlDocument) -> Result<CommandResult, DecodeError> {
	const PATH: &str = "bosMQLCommand.returnVal";
	let return_val = doc
		.lookup(&["bosMQLCommand", "returnVal"])
		.ok_or_else(|| DecodeError::MissingField(PATH.to_string()))?
		.as_map()
		.ok_or(DecodeError::UnexpectedShape {
			field: PATH.to_string(),
			expected: "element with children",
		})?;

	let status = text_field(return_val, "status", PATH)?;
	let output = joined_text(return_val, "results")?;
	let error_text = joined_text(return_val, "errors")?;

	let tasks = pseudo_array(required(return_val, "tasks", PATH)?, "tasks")?
		.into_iter()
		.map(|item| {
			let record = item.as_map().ok_or(DecodeError::UnexpectedShape {
				field: "tasks.element".to_string(),
				expected: "task record",
			})?;
			let code = record.get("reason").map(XmlValue::flatten_text).unwrap_or_default();
			let data = record.get("taskData").map(XmlValue::flatten_text).unwrap_or_default();
			Ok(Task::new(code, data))
		})
		.collect::<Result<Vec<_>, DecodeError>>()?;

	Ok(CommandResult {
		success: status == STATUS_OK,
		output,
		error_text,
		tasks,
	})
}

/// Returns the `JSESSIONID` value from a `Cookie` header string, or an empty
/// string when the cookie is absent.
pub fn session_id_from_cookies(cookie_header: Option<&str>) -> String {
	cookie_header
		.into_iter()
		.flat_map(|header| header.split(';'))
		.filter_map(|pair| pair.trim().split_once('='))
		.find(|(name, _)| name.trim() == SESSION_COOKIE)
		.map(|(_, value)| value.trim().to_string())
		.unwrap_or_default()
}

/// Decodes the base64 username header. An absent header means nobody is
/// authenticated and yields an empty string.
pub fn username_from_header(header: Option<&str>) -> Result<String, DecodeError> {
	let Some(encoded) = header else {
		return Ok(String::new());
	};
	let bytes = STANDARD
		.decode(encoded.trim())
		.map_err(|e| DecodeError::Username(e.to_string()))?;
	String::from_utf8(bytes).map_err(|e| DecodeError::Username(e.to_string()))
}

fn required<'a>(map: &'a XmlMap, name: &str, parent: &str) -> Result<&'a XmlValue, DecodeError> {
	map.get(name).ok_or_else(|| DecodeError::MissingField(format!("{parent}.{name}")))
}

fn text_field<'a>(map: &'a XmlMap, name: &str, parent: &str) -> Result<&'a str, DecodeError> {
	required(map, name, parent)?.as_text().ok_or(DecodeError::UnexpectedShape {
		field: format!("{parent}.{name}"),
		expected: "text",
	})
}

fn joined_text(return_val: &XmlMap, field: &str) -> Result<String, DecodeError> {
	pseudo_array(required(return_val, field, "returnVal")?, field)?
		.into_iter()
		.map(|item| {
			item.as_text().ok_or(DecodeError::UnexpectedShape {
				field: format!("{field}.element"),
				expected: "text",
			})
		})
		.collect()
}
