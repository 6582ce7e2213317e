//! Request envelopes and their XML rendering.
//!
//! An [`Envelope`] is the ordered element tree of one request. The server's
//! schema is positional and version sensitive, so every field it defines is
//! emitted in schema order even when empty.
//!
//! The server's XML parser rejects self-closing elements. [`Envelope::to_xml`]
//! therefore finishes with [`patch_empty_elements`], which expands every
//! `<tag/>` into `<tag></tag>`.

use std::fmt;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesStart, BytesText, Event};

use crate::error::EnvelopeError;

/// Body of an [`Element`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
	/// Character data; empty text renders as an empty element.
	Text(String),
	/// Nested elements in document order.
	Children(Vec<Element>),
}

/// One element of an envelope tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
	pub name: String,
	pub attributes: Vec<(String, String)>,
	pub content: Content,
}

impl Element {
	/// Creates a leaf element holding `value` as text.
	pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			attributes: Vec::new(),
			content: Content::Text(value.into()),
		}
	}

	/// Creates an element with nested children.
	pub fn parent(name: impl Into<String>, children: Vec<Element>) -> Self {
		Self {
			name: name.into(),
			attributes: Vec::new(),
			content: Content::Children(children),
		}
	}

	/// Adds an attribute, keeping insertion order.
	pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.attributes.push((key.into(), value.into()));
		self
	}

	/// Returns the first direct child named `name`.
	pub fn child(&self, name: &str) -> Option<&Element> {
		match &self.content {
			Content::Children(children) => children.iter().find(|c| c.name == name),
			Content::Text(_) => None,
		}
	}

	/// Returns the names of the direct children in order.
	pub fn child_names(&self) -> Vec<&str> {
		match &self.content {
			Content::Children(children) => children.iter().map(|c| c.name.as_str()).collect(),
			Content::Text(_) => Vec::new(),
		}
	}

	/// Returns the text of a leaf element.
	pub fn text_value(&self) -> Option<&str> {
		match &self.content {
			Content::Text(text) => Some(text),
			Content::Children(_) => None,
		}
	}
}

/// Fields of a context-reset (login) request.
///
/// Everything except `user` and `password` is a placeholder the server
/// expects to be present; leave them empty unless the deployment needs them.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct LoginRequest {
	pub tenant: String,
	pub user: String,
	pub password: String,
	/// Vault (sent as `lattice`).
	pub vault: String,
	pub application: String,
	pub client_host: String,
	pub ip_address: String,
	pub mac_address: String,
	pub custom_data: String,
	pub online_instance: String,
	pub index_password: String,
	pub extra: String,
}

impl LoginRequest {
	pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
		Self {
			user: user.into(),
			password: password.into(),
			..Default::default()
		}
	}

	pub fn vault(mut self, vault: impl Into<String>) -> Self {
		self.vault = vault.into();
		self
	}

	pub fn tenant(mut self, tenant: impl Into<String>) -> Self {
		self.tenant = tenant.into();
		self
	}

	pub fn application(mut self, application: impl Into<String>) -> Self {
		self.application = application.into();
		self
	}
}

impl fmt::Debug for LoginRequest {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LoginRequest")
			.field("tenant", &self.tenant)
			.field("user", &self.user)
			.field("password", &"<redacted>")
			.field("vault", &self.vault)
			.field("application", &self.application)
			.finish_non_exhaustive()
	}
}

/// A complete request, ready to serialize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
	root: Element,
}

impl Envelope {
	/// Builds a context-reset request that authenticates `request.user`.
	pub fn login(request: &LoginRequest) -> Self {
		let context = Element::parent(
			"bosContext",
			vec![Element::text("sessionId", ""), Element::text("stackTrace", "")],
		)
		.with_attribute("argc", "2");

		let reset = Element::parent(
			"reset",
			vec![
				Element::text("tenant", &request.tenant),
				Element::text("user", &request.user),
				Element::text("passwd", &request.password),
				Element::text("lattice", &request.vault),
				Element::text("application", &request.application),
				Element::text("clienthost", &request.client_host),
				Element::text("ipaddress", &request.ip_address),
				Element::text("macaddress", &request.mac_address),
				Element::text("customdata", &request.custom_data),
				Element::text("onlineInstance", &request.online_instance),
				Element::text("indexPassword", &request.index_password),
				Element::text("extra", &request.extra),
				Element::text("stackTrace", "NOTHING"),
			],
		);

		Self {
			root: Element::parent("bosContext", vec![context, reset]),
		}
	}

	/// Builds a request that executes `command` verbatim.
	pub fn command(command: &str) -> Self {
		let execute = Element::parent(
			"executeCmd",
			vec![Element::text("cmd", command), Element::text("stackTrace", "")],
		);
		Self {
			root: Element::parent("bosMQLCommand", vec![execute]),
		}
	}

	pub fn root(&self) -> &Element {
		&self.root
	}

	/// Renders the envelope as the request body.
	///
	/// Output has an XML declaration, one element per line, no indentation,
	/// and no self-closing tags.
	pub fn to_xml(&self) -> Result<String, EnvelopeError> {
		let mut writer = Writer::new(Vec::new());
		writer
			.write_event(Event::Decl(BytesDecl::new("1.0", None, None)))
			.map_err(|e| EnvelopeError::Write(e.to_string()))?;
		write_element(&mut writer, &self.root)?;

		let xml = String::from_utf8(writer.into_inner()).map_err(|e| EnvelopeError::Write(e.to_string()))?;
		patch_empty_elements(&xml)
	}
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), EnvelopeError> {
	writer.write_event(event).map_err(|e| EnvelopeError::Write(e.to_string()))
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<(), EnvelopeError> {
	writer.get_mut().push(b'\n');
	let mut start = BytesStart::new(element.name.as_str());
	for (key, value) in &element.attributes {
		start.push_attribute((key.as_str(), value.as_str()));
	}

	match &element.content {
		Content::Text(text) if text.is_empty() => write(writer, Event::Empty(start)),
		Content::Children(children) if children.is_empty() => write(writer, Event::Empty(start)),
		Content::Text(text) => {
			write(writer, Event::Start(start.borrow()))?;
			write(writer, Event::Text(BytesText::new(text)))?;
			write(writer, Event::End(start.to_end()))
		}
		Content::Children(children) => {
			write(writer, Event::Start(start.borrow()))?;
			for child in children {
				write_element(writer, child)?;
			}
			writer.get_mut().push(b'\n');
			write(writer, Event::End(start.to_end()))
		}
	}
}

/// Expands every empty-element tag `<tag .../>` into `<tag ...></tag>`.
///
/// The input is tokenized, so only real tags are rewritten. Text, CDATA,
/// comments, and processing instructions are copied byte for byte, even when
/// they contain `/>`. Applying the patch twice is the same as applying it once.
pub fn patch_empty_elements(xml: &str) -> Result<String, EnvelopeError> {
	let mut reader = Reader::from_str(xml);
	let mut writer = Writer::new(Vec::with_capacity(xml.len() + 64));

	loop {
		let event = reader.read_event().map_err(|e| EnvelopeError::Reparse {
			position: reader.buffer_position() as u64,
			message: e.to_string(),
		})?;
		let written = match event {
			Event::Eof => break,
			Event::Empty(tag) => writer
				.write_event(Event::Start(tag.borrow()))
				.and_then(|()| writer.write_event(Event::End(tag.to_end()))),
			other => writer.write_event(other),
		};
		written.map_err(|e| EnvelopeError::Write(e.to_string()))?;
	}

	String::from_utf8(writer.into_inner()).map_err(|e| EnvelopeError::Write(e.to_string()))
}
