//! Protocol constants shared by the transport and the decoder.

/// Schema alias header sent with every request.
pub const SCHEMA_ALIAS_HEADER: &str = "mx-schemaalias";
/// Timezone header sent with every request.
pub const TIMEZONE_HEADER: &str = "mx-timezone";
/// Response header carrying the base64-encoded authenticated user name.
pub const USERNAME_HEADER: &str = "mx-username";
/// Cookie that carries the server-side session identifier.
pub const SESSION_COOKIE: &str = "JSESSIONID";

/// Fixed headers attached to every request, in send order.
pub const REQUEST_HEADERS: [(&str, &str); 4] = [
	(SCHEMA_ALIAS_HEADER, "en"),
	(TIMEZONE_HEADER, "gmt"),
	("connection", "keep-alive"),
	("content-type", "text/xml"),
];

/// Root element the server uses to report a request-level fault.
pub const EXCEPTION_ROOT: &str = "exception";
/// Field holding the item count of a pseudo-array.
pub const COUNT_FIELD: &str = "count";
/// Prefix of the indexed item fields of a pseudo-array (`element.0`, `element.1`, ...).
pub const ELEMENT_PREFIX: &str = "element.";
/// Status value that marks a successful command.
pub const STATUS_OK: &str = "1";
