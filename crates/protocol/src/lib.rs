//! Wire types for the MQL XML-over-HTTP protocol.
//!
//! This crate contains everything that touches the bytes on the wire:
//! request envelopes and their XML rendering, the response tree parser,
//! and the decoders for the server's pseudo-array and exception encodings.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data and codecs: no I/O, no session state
//! * 1:1 with the protocol: field names, order, and header names match what
//!   the server expects
//!
//! Session handling and HTTP transport are built on top of these types in `mql-rs`.

pub mod decode;
pub mod envelope;
pub mod error;
pub mod types;
pub mod wire;
pub mod xml;

pub use decode::{ProtocolException, Response, command_result, decode_response, pseudo_array, session_id_from_cookies, username_from_header};
pub use envelope::{Element, Envelope, LoginRequest, patch_empty_elements};
pub use error::{DecodeError, EnvelopeError};
pub use types::*;
pub use xml::{XmlDocument, XmlMap, XmlValue};
