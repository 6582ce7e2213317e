//! HTTP transport for protocol requests.
//!
//! Every call is a single `POST` of the serialized envelope to the session
//! endpoint, carrying the fixed protocol headers and the session's cookie
//! jar. There is no retry; a failed or timed-out request is reported once.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use mql_protocol::wire::REQUEST_HEADERS;
use parking_lot::Mutex;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ToStrError};
use tracing::debug;
use url::Url;

use crate::config::DEFAULT_TIMEOUT;
use crate::error::{Error, Result};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One outgoing request.
#[derive(Debug)]
pub struct HttpRequest {
	pub url: Url,
	pub body: String,
	/// Jar of the session the request belongs to. Responses store their
	/// cookies here.
	pub cookies: Arc<Jar>,
}

/// Raw reply before any protocol decoding.
#[derive(Debug, Clone)]
pub struct HttpResponse {
	pub status: u16,
	pub headers: HeaderMap,
	pub body: String,
}

impl HttpResponse {
	/// Returns a header value when present. A value that is not visible
	/// ASCII is an error rather than a missing header.
	pub fn header(&self, name: &str) -> std::result::Result<Option<&str>, ToStrError> {
		self.headers.get(name).map(HeaderValue::to_str).transpose()
	}
}

/// Sends protocol requests.
///
/// Implementations perform exactly one round trip per call and complete
/// once, with either the full response or an error.
pub trait Transport: Send + Sync {
	fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse>>;
}

struct CachedClient {
	jar: Arc<Jar>,
	client: reqwest::Client,
}

/// [`Transport`] over reqwest.
///
/// The underlying `reqwest::Client` is bound to one cookie jar. It is kept
/// while requests use the same jar and rebuilt when the session hands over
/// a new one after an endpoint change.
pub struct HttpTransport {
	timeout: Duration,
	cached: Mutex<Option<CachedClient>>,
}

impl HttpTransport {
	pub fn new(timeout: Duration) -> Self {
		Self {
			timeout,
			cached: Mutex::new(None),
		}
	}

	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	fn client_for(&self, jar: &Arc<Jar>) -> Result<reqwest::Client> {
		let mut cached = self.cached.lock();
		if let Some(current) = cached.as_ref() {
			if Arc::ptr_eq(&current.jar, jar) {
				return Ok(current.client.clone());
			}
		}

		debug!(timeout = ?self.timeout, "building HTTP client for new cookie jar");
		let client = reqwest::Client::builder()
			.cookie_provider(Arc::clone(jar))
			.default_headers(protocol_headers())
			.timeout(self.timeout)
			.build()?;
		*cached = Some(CachedClient {
			jar: Arc::clone(jar),
			client: client.clone(),
		});
		Ok(client)
	}

	fn map_error(&self, err: reqwest::Error) -> Error {
		if err.is_timeout() { Error::Timeout(self.timeout) } else { Error::Http(err) }
	}
}

impl Default for HttpTransport {
	fn default() -> Self {
		Self::new(DEFAULT_TIMEOUT)
	}
}

impl Transport for HttpTransport {
	fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse>> {
		Box::pin(async move {
			let client = self.client_for(&request.cookies)?;
			let response = client
				.post(request.url)
				.body(request.body)
				.send()
				.await
				.map_err(|e| self.map_error(e))?;

			let status = response.status().as_u16();
			let headers = response.headers().clone();
			let body = response.text().await.map_err(|e| self.map_error(e))?;
			Ok(HttpResponse { status, headers, body })
		})
	}
}

/// The fixed header set sent with every request.
pub fn protocol_headers() -> HeaderMap {
	let mut headers = HeaderMap::with_capacity(REQUEST_HEADERS.len());
	for (name, value) in REQUEST_HEADERS {
		headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
	}
	headers
}
