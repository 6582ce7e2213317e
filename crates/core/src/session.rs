//! Per-client session state.
//!
//! A [`Session`] remembers which server it talks to, who is logged in, and
//! the cookies that carry the server-side session. Cookies and the session
//! id only mean something for the endpoint that issued them, so moving to a
//! different endpoint drops the authenticated user and starts a fresh cookie
//! jar.

use std::fmt;
use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use url::Url;

use crate::error::{Error, Result};

/// Endpoint, identity, and cookie state for one client.
pub struct Session {
	endpoint: String,
	user: String,
	session_id: String,
	cookies: Arc<Jar>,
}

impl Session {
	pub fn new(endpoint: impl Into<String>) -> Self {
		Self {
			endpoint: endpoint.into(),
			user: String::new(),
			session_id: String::new(),
			cookies: Arc::new(Jar::default()),
		}
	}

	/// Points the session at `endpoint`.
	///
	/// When `endpoint` differs from the current one, the authenticated user is
	/// cleared and the cookie jar is replaced with an empty one, so the next
	/// decoded response reports an empty session id until the new server sets
	/// a cookie. Setting the same endpoint again changes nothing.
	///
	/// Returns `true` when the endpoint changed.
	pub fn set_endpoint(&mut self, endpoint: impl Into<String>) -> bool {
		let endpoint = endpoint.into();
		if endpoint == self.endpoint {
			return false;
		}
		self.endpoint = endpoint;
		self.user.clear();
		self.cookies = Arc::new(Jar::default());
		true
	}

	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}

	/// Host name of the endpoint, without scheme, port, or path. Empty when
	/// the endpoint is not a valid URL.
	pub fn host(&self) -> String {
		Url::parse(&self.endpoint)
			.ok()
			.and_then(|url| url.host_str().map(str::to_string))
			.unwrap_or_default()
	}

	/// Name of the authenticated user; empty when not logged in.
	pub fn user(&self) -> &str {
		&self.user
	}

	pub fn session_id(&self) -> &str {
		&self.session_id
	}

	pub fn is_authenticated(&self) -> bool {
		!self.user.is_empty()
	}

	/// Cookie jar bound to the current endpoint.
	pub fn cookies(&self) -> Arc<Jar> {
		Arc::clone(&self.cookies)
	}

	/// Parses the endpoint for a request.
	pub(crate) fn url(&self) -> Result<Url> {
		if self.endpoint.trim().is_empty() {
			return Err(Error::NoEndpoint);
		}
		Url::parse(&self.endpoint).map_err(|source| Error::InvalidEndpoint {
			endpoint: self.endpoint.clone(),
			source,
		})
	}

	/// `Cookie` header the jar would send to `url`.
	pub(crate) fn cookie_header(&self, url: &Url) -> Option<String> {
		self.cookies
			.cookies(url)
			.and_then(|value| value.to_str().ok().map(str::to_string))
	}

	pub(crate) fn set_user(&mut self, user: String) {
		self.user = user;
	}

	pub(crate) fn clear_user(&mut self) {
		self.user.clear();
	}

	pub(crate) fn set_session_id(&mut self, session_id: String) {
		self.session_id = session_id;
	}
}

impl Default for Session {
	fn default() -> Self {
		Self::new(String::new())
	}
}

impl fmt::Debug for Session {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Session")
			.field("endpoint", &self.endpoint)
			.field("user", &self.user)
			.field("session_id", &self.session_id)
			.finish_non_exhaustive()
	}
}
