//! Response tree parser.
//!
//! Responses are read into a small value tree with these rules:
//! * text is whitespace-trimmed; attributes are ignored
//! * an element without children is its text (empty element → `""`)
//! * an element with children is an ordered map of child name → value;
//!   text interleaved with children is dropped
//! * a child name seen once is a scalar; repeated siblings become a list

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::DecodeError;

/// A decoded element value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlValue {
	Text(String),
	Map(XmlMap),
	List(Vec<XmlValue>),
}

impl XmlValue {
	pub fn as_text(&self) -> Option<&str> {
		match self {
			XmlValue::Text(text) => Some(text),
			_ => None,
		}
	}

	pub fn as_map(&self) -> Option<&XmlMap> {
		match self {
			XmlValue::Map(map) => Some(map),
			_ => None,
		}
	}

	pub fn as_list(&self) -> Option<&[XmlValue]> {
		match self {
			XmlValue::List(items) => Some(items),
			_ => None,
		}
	}

	/// Concatenates every text leaf below this value in document order.
	pub fn flatten_text(&self) -> String {
		let mut out = String::new();
		self.collect_text(&mut out);
		out
	}

	fn collect_text(&self, out: &mut String) {
		match self {
			XmlValue::Text(text) => {
				if !out.is_empty() && !text.is_empty() {
					out.push(' ');
				}
				out.push_str(text);
			}
			XmlValue::Map(map) => map.iter().for_each(|(_, value)| value.collect_text(out)),
			XmlValue::List(items) => items.iter().for_each(|value| value.collect_text(out)),
		}
	}
}

/// Children of an element, keyed by element name, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlMap {
	entries: Vec<(String, XmlValue)>,
}

impl XmlMap {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, name: &str) -> Option<&XmlValue> {
		self.entries.iter().find(|(key, _)| key == name).map(|(_, value)| value)
	}

	pub fn contains_key(&self, name: &str) -> bool {
		self.get(name).is_some()
	}

	/// Adds a child value. A second value under the same name turns the entry
	/// into a list.
	pub fn insert(&mut self, name: impl Into<String>, value: XmlValue) {
		let name = name.into();
		match self.entries.iter_mut().find(|(key, _)| *key == name) {
			Some((_, XmlValue::List(items))) => items.push(value),
			Some((_, existing)) => {
				let first = std::mem::replace(existing, XmlValue::List(Vec::new()));
				*existing = XmlValue::List(vec![first, value]);
			}
			None => self.entries.push((name, value)),
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &XmlValue)> {
		self.entries.iter().map(|(key, value)| (key.as_str(), value))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// A parsed response: the root element name and its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
	name: String,
	value: XmlValue,
}

impl XmlDocument {
	pub fn new(name: impl Into<String>, value: XmlValue) -> Self {
		Self { name: name.into(), value }
	}

	/// Name of the root element.
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn value(&self) -> &XmlValue {
		&self.value
	}

	pub fn into_value(self) -> XmlValue {
		self.value
	}

	/// Follows `path` from the top of the document; the first segment names
	/// the root element. Segments are literal element names (they may contain
	/// dots, as in `element.0`).
	pub fn lookup(&self, path: &[&str]) -> Option<&XmlValue> {
		let (first, rest) = path.split_first()?;
		if *first != self.name {
			return None;
		}
		rest.iter().try_fold(&self.value, |value, segment| value.as_map()?.get(segment))
	}
}

struct Frame {
	name: String,
	text: String,
	children: XmlMap,
}

impl Frame {
	fn new(name: String) -> Self {
		Self {
			name,
			text: String::new(),
			children: XmlMap::new(),
		}
	}

	fn finish(self) -> (String, XmlValue) {
		let value = if self.children.is_empty() {
			XmlValue::Text(self.text.trim().to_string())
		} else {
			XmlValue::Map(self.children)
		};
		(self.name, value)
	}
}

/// Parses a response body into an [`XmlDocument`].
pub fn parse(body: &str) -> Result<XmlDocument, DecodeError> {
	let mut reader = Reader::from_str(body);
	let mut stack: Vec<Frame> = Vec::new();
	let mut root: Option<XmlDocument> = None;

	loop {
		let event = reader.read_event().map_err(|e| DecodeError::Xml {
			position: reader.buffer_position() as u64,
			message: e.to_string(),
		})?;

		match event {
			Event::Start(tag) => {
				if stack.is_empty() && root.is_some() {
					return Err(DecodeError::MultipleRoots);
				}
				stack.push(Frame::new(element_name(&tag)));
			}
			Event::Empty(tag) => attach(&mut stack, &mut root, element_name(&tag), XmlValue::Text(String::new()))?,
			Event::End(_) => {
				let frame = stack.pop().ok_or_else(|| DecodeError::Xml {
					position: reader.buffer_position() as u64,
					message: "end tag without start tag".to_string(),
				})?;
				let (name, value) = frame.finish();
				attach(&mut stack, &mut root, name, value)?;
			}
			Event::Text(text) => {
				if let Some(frame) = stack.last_mut() {
					let text = text.unescape().map_err(|e| DecodeError::Xml {
						position: reader.buffer_position() as u64,
						message: e.to_string(),
					})?;
					frame.text.push_str(&text);
				}
			}
			Event::CData(data) => {
				if let Some(frame) = stack.last_mut() {
					frame.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
				}
			}
			Event::Eof => break,
			_ => {}
		}
	}

	if let Some(frame) = stack.last() {
		return Err(DecodeError::Unclosed(frame.name.clone()));
	}
	root.ok_or(DecodeError::NoRoot)
}

fn element_name(tag: &BytesStart<'_>) -> String {
	String::from_utf8_lossy(tag.name().as_ref()).into_owned()
}

fn attach(stack: &mut [Frame], root: &mut Option<XmlDocument>, name: String, value: XmlValue) -> Result<(), DecodeError> {
	match stack.last_mut() {
		Some(parent) => parent.children.insert(name, value),
		None if root.is_some() => return Err(DecodeError::MultipleRoots),
		None => *root = Some(XmlDocument::new(name, value)),
	}
	Ok(())
}
