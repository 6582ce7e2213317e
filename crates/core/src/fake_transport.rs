//! Scripted in-memory transport for testing the client without a server.
//!
//! # Example
//!
//! ```ignore
//! let (transport, controller) = FakeTransportBuilder::new().build();
//! let mut client = Client::with_transport(Session::new("http://plm/servlet"), transport);
//!
//! controller.push(FakeResponse::command("1", &["creator"], &[]));
//! let result = client.exec("print user").await?;
//! assert_eq!(controller.take_sent().len(), 1);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use mql_protocol::wire::USERNAME_HEADER;
use parking_lot::Mutex;
use reqwest::cookie::CookieStore;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::warn;
use url::Url;

use crate::error::{Error, Result};
use crate::transport::{BoxFuture, HttpRequest, HttpResponse, Transport};

/// A scripted reply.
#[derive(Debug, Clone)]
pub struct FakeResponse {
	status: u16,
	headers: HeaderMap,
	set_cookies: Vec<String>,
	body: String,
}

impl FakeResponse {
	/// A 200 reply with `body`.
	pub fn ok(body: impl Into<String>) -> Self {
		Self::with_status(200, body)
	}

	pub fn with_status(status: u16, body: impl Into<String>) -> Self {
		Self {
			status,
			headers: HeaderMap::new(),
			set_cookies: Vec::new(),
			body: body.into(),
		}
	}

	/// A 200 reply carrying a command result with the given status and
	/// result/error fragments, and no tasks.
	pub fn command(status: &str, results: &[&str], errors: &[&str]) -> Self {
		Self::ok(command_body(status, results, errors, &[]))
	}

	/// Adds a response header. The value is taken as raw bytes, so non-ASCII
	/// text arrives the way a misbehaving server would send it. Invalid names
	/// or values are ignored.
	pub fn header(mut self, name: &str, value: &str) -> Self {
		if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_bytes(value.as_bytes())) {
			self.headers.append(name, value);
		}
		self
	}

	/// Adds the base64 username header the server sends after authentication.
	pub fn username(self, user: &str) -> Self {
		let encoded = STANDARD.encode(user.as_bytes());
		self.header(USERNAME_HEADER, &encoded)
	}

	/// Stores `cookie` (a `Set-Cookie` value) in the request's jar when replayed.
	pub fn set_cookie(mut self, cookie: impl Into<String>) -> Self {
		self.set_cookies.push(cookie.into());
		self
	}
}

enum Scripted {
	Reply(FakeResponse),
	Timeout(Duration),
}

/// What the fake transport received.
#[derive(Debug, Clone)]
pub struct SentRequest {
	pub url: Url,
	pub body: String,
	/// `Cookie` header the jar held for `url` when the request was sent.
	pub cookie_header: Option<String>,
}

#[derive(Default)]
struct Shared {
	replies: Mutex<VecDeque<Scripted>>,
	sent: Mutex<Vec<SentRequest>>,
}

/// Builder for creating fake transport instances.
#[derive(Default)]
pub struct FakeTransportBuilder {
	replies: Vec<FakeResponse>,
}

impl FakeTransportBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Queues a reply up front.
	pub fn reply(mut self, response: FakeResponse) -> Self {
		self.replies.push(response);
		self
	}

	/// Returns the transport to hand to a client and a controller that keeps
	/// scripting replies and inspecting requests after the transport moved.
	pub fn build(self) -> (FakeTransport, FakeTransportController) {
		let shared = Arc::new(Shared::default());
		shared.replies.lock().extend(self.replies.into_iter().map(Scripted::Reply));
		(
			FakeTransport {
				shared: Arc::clone(&shared),
			},
			FakeTransportController { shared },
		)
	}
}

/// Controller for queueing replies and inspecting sent requests.
pub struct FakeTransportController {
	shared: Arc<Shared>,
}

impl FakeTransportController {
	pub fn push(&self, response: FakeResponse) {
		self.shared.replies.lock().push_back(Scripted::Reply(response));
	}

	/// Makes the next request fail as if it ran past `timeout`.
	pub fn push_timeout(&self, timeout: Duration) {
		self.shared.replies.lock().push_back(Scripted::Timeout(timeout));
	}

	/// Takes all sent requests, clearing the buffer.
	pub fn take_sent(&self) -> Vec<SentRequest> {
		std::mem::take(&mut *self.shared.sent.lock())
	}

	pub fn pending(&self) -> usize {
		self.shared.replies.lock().len()
	}
}

/// [`Transport`] that replays scripted replies in order.
///
/// With nothing queued, requests fail with HTTP status 503.
pub struct FakeTransport {
	shared: Arc<Shared>,
}

impl Transport for FakeTransport {
	fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse>> {
		Box::pin(async move {
			let cookie_header = request
				.cookies
				.cookies(&request.url)
				.and_then(|value| value.to_str().ok().map(str::to_string));
			self.shared.sent.lock().push(SentRequest {
				url: request.url.clone(),
				body: request.body,
				cookie_header,
			});

			let next = self.shared.replies.lock().pop_front();
			match next {
				Some(Scripted::Reply(reply)) => {
					for cookie in &reply.set_cookies {
						request.cookies.add_cookie_str(cookie, &request.url);
					}
					Ok(HttpResponse {
						status: reply.status,
						headers: reply.headers,
						body: reply.body,
					})
				}
				Some(Scripted::Timeout(timeout)) => Err(Error::Timeout(timeout)),
				None => {
					warn!(url = %request.url, "fake transport has no scripted reply");
					Err(Error::HttpStatus(503))
				}
			}
		})
	}
}

/// Renders a `bosMQLCommand` response body.
///
/// `tasks` are `(reason code, task data)` pairs.
pub fn command_body(status: &str, results: &[&str], errors: &[&str], tasks: &[(&str, &str)]) -> String {
	let mut body = format!("<?xml version=\"1.0\"?>\n<bosMQLCommand>\n<returnVal>\n<status>{}</status>\n", escape(status));
	push_array(&mut body, "results", results.iter().map(|item| escape(item)));
	push_array(&mut body, "errors", errors.iter().map(|item| escape(item)));
	push_array(
		&mut body,
		"tasks",
		tasks
			.iter()
			.map(|(reason, data)| format!("<reason>{}</reason><taskData>{}</taskData>", escape(reason), escape(data))),
	);
	body.push_str("</returnVal>\n</bosMQLCommand>\n");
	body
}

fn push_array(body: &mut String, name: &str, items: impl ExactSizeIterator<Item = String>) {
	body.push_str(&format!("<{name}>\n<count>{}</count>\n", items.len()));
	for (index, item) in items.enumerate() {
		body.push_str(&format!("<element.{index}>{item}</element.{index}>\n"));
	}
	body.push_str(&format!("</{name}>\n"));
}

fn escape(text: &str) -> String {
	text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
	use super::*;
	use mql_protocol::{Response, command_result, decode_response};

	fn request(url: &Url, jar: &Arc<reqwest::cookie::Jar>) -> HttpRequest {
		HttpRequest {
			url: url.clone(),
			body: "<ping></ping>".to_string(),
			cookies: Arc::clone(jar),
		}
	}

	#[tokio::test]
	async fn replays_in_order_and_captures_requests() {
		let (transport, controller) = FakeTransportBuilder::new().reply(FakeResponse::ok("<a>1</a>")).build();
		controller.push(FakeResponse::with_status(500, ""));

		let url = Url::parse("http://plm/servlet").unwrap();
		let jar = Arc::new(reqwest::cookie::Jar::default());

		let first = transport.send(request(&url, &jar)).await.unwrap();
		assert_eq!(first.status, 200);
		assert_eq!(first.body, "<a>1</a>");
		let second = transport.send(request(&url, &jar)).await.unwrap();
		assert_eq!(second.status, 500);
		assert!(matches!(transport.send(request(&url, &jar)).await, Err(Error::HttpStatus(503))));

		let sent = controller.take_sent();
		assert_eq!(sent.len(), 3);
		assert_eq!(sent[0].body, "<ping></ping>");
		assert!(controller.take_sent().is_empty());
	}

	#[tokio::test]
	async fn cookies_land_in_request_jar() {
		let (transport, controller) = FakeTransportBuilder::new().build();
		controller.push(FakeResponse::ok("<a/>").set_cookie("JSESSIONID=s1; Path=/"));
		controller.push(FakeResponse::ok("<a/>"));

		let url = Url::parse("http://plm/servlet").unwrap();
		let jar = Arc::new(reqwest::cookie::Jar::default());
		transport.send(request(&url, &jar)).await.unwrap();
		transport.send(request(&url, &jar)).await.unwrap();

		let sent = controller.take_sent();
		assert_eq!(sent[0].cookie_header, None);
		assert_eq!(sent[1].cookie_header.as_deref(), Some("JSESSIONID=s1"));
	}

	#[tokio::test]
	async fn scripted_timeout() {
		let (transport, controller) = FakeTransportBuilder::new().build();
		controller.push_timeout(Duration::from_secs(10));
		let url = Url::parse("http://plm/servlet").unwrap();
		let jar = Arc::new(reqwest::cookie::Jar::default());
		assert!(matches!(transport.send(request(&url, &jar)).await, Err(Error::Timeout(_))));
		assert_eq!(controller.pending(), 0);
	}

	#[test]
	fn command_body_decodes() {
		let body = command_body("0", &["a<b"], &["bad & worse"], &[("4", "careful")]);
		let Response::Document(doc) = decode_response(&body).unwrap() else {
			panic!("expected document");
		};
		let result = command_result(&doc).unwrap();
		assert!(!result.success);
		assert_eq!(result.output, "a<b");
		assert_eq!(result.error_text, "bad & worse");
		assert_eq!(result.tasks[0].task_data, "careful");
	}

	#[test]
	fn username_header_is_encoded() {
		let reply = FakeResponse::ok("").username("creator");
		assert_eq!(reply.headers[USERNAME_HEADER], "Y3JlYXRvcg==");
	}

	#[test]
	fn header_keeps_non_ascii_bytes() {
		let reply = FakeResponse::ok("").header(USERNAME_HEADER, "Jürgen");
		let value = &reply.headers[USERNAME_HEADER];
		assert_eq!(value.as_bytes(), "Jürgen".as_bytes());
		assert!(value.to_str().is_err());
	}
}
