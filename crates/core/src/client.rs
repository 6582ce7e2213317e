//! Command executor: login and command execution over a [`Transport`].
//!
//! # Call flow
//!
//! 1. Build the envelope for the call and render it as XML
//! 2. POST it to the session endpoint with the session's cookie jar
//! 3. Reject non-200 replies
//! 4. Parse the body; separate protocol exceptions from documents
//! 5. Read the username header and the `JSESSIONID` cookie into the session
//! 6. Map the document into the call's result
//!
//! The session is only touched once the response has been fully decoded, so
//! transport and parse errors leave it as it was (except that `login` clears
//! the user before it sends anything).
//!
//! # Concurrency
//!
//! `login` and `exec` take `&mut self`: one request is in flight per client,
//! and each call completes exactly once. Share a client across tasks by
//! wrapping it in a `tokio::sync::Mutex`.

use mql_protocol::wire::USERNAME_HEADER;
use mql_protocol::{
	CommandResult, DecodeError, Envelope, LoginRequest, Response, command_result, decode_response, session_id_from_cookies, username_from_header,
};
use tracing::{debug, info, warn};

use crate::config::ClientOptions;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::transport::{HttpRequest, HttpTransport, Transport};

/// Parameters of [`Client::connect`].
#[derive(Clone, Default)]
pub struct ConnectOptions {
	/// Endpoint to switch to before logging in; `None` keeps the current one.
	pub server: Option<String>,
	pub user: String,
	pub password: String,
	pub vault: String,
}

impl std::fmt::Debug for ConnectOptions {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ConnectOptions")
			.field("server", &self.server)
			.field("user", &self.user)
			.field("vault", &self.vault)
			.finish_non_exhaustive()
	}
}

/// A decoded reply plus the identity it carried.
struct Reply {
	response: Response,
	user: String,
	session_id: String,
}

/// Protocol client bound to one [`Session`].
pub struct Client<T: Transport = HttpTransport> {
	session: Session,
	transport: T,
}

impl Client<HttpTransport> {
	/// Creates a client that talks HTTP.
	pub fn new(options: ClientOptions) -> Self {
		let session = Session::new(options.endpoint.unwrap_or_default());
		Self::with_transport(session, HttpTransport::new(options.timeout))
	}
}

impl<T: Transport> Client<T> {
	/// Creates a client over an existing session and transport.
	pub fn with_transport(session: Session, transport: T) -> Self {
		Self { session, transport }
	}

	pub fn session(&self) -> &Session {
		&self.session
	}

	/// Releases the session, e.g. to hand it to another client.
	pub fn into_session(self) -> Session {
		self.session
	}

	pub fn transport(&self) -> &T {
		&self.transport
	}

	pub fn endpoint(&self) -> &str {
		self.session.endpoint()
	}

	pub fn host(&self) -> String {
		self.session.host()
	}

	/// Authenticated user; empty when not logged in.
	pub fn user(&self) -> &str {
		self.session.user()
	}

	pub fn session_id(&self) -> &str {
		self.session.session_id()
	}

	/// See [`Session::set_endpoint`].
	pub fn set_endpoint(&mut self, endpoint: impl Into<String>) -> bool {
		self.session.set_endpoint(endpoint)
	}

	/// Logs in at the current endpoint.
	///
	/// Returns the authenticated user name. An empty name means the server
	/// did not accept the credentials; that is not an error.
	pub async fn login(&mut self, user: &str, password: &str) -> Result<String> {
		self.login_with(None, &LoginRequest::new(user, password)).await
	}

	/// Logs in with endpoint, user, password, and vault in one call.
	pub async fn connect(&mut self, options: ConnectOptions) -> Result<String> {
		let request = LoginRequest::new(options.user, options.password).vault(options.vault);
		self.login_with(options.server.as_deref(), &request).await
	}

	/// Sends a context-reset request built from `request`, optionally after
	/// switching to `endpoint`.
	pub async fn login_with(&mut self, endpoint: Option<&str>, request: &LoginRequest) -> Result<String> {
		if let Some(endpoint) = endpoint {
			self.session.set_endpoint(endpoint);
		}
		self.session.clear_user();

		info!(endpoint = %self.session.endpoint(), user = %request.user, "logging in");
		let reply = self.round_trip(&Envelope::login(request)).await?;
		self.apply_identity(&reply);

		if let Response::Exception(exception) = reply.response {
			warn!(error = %exception, "login rejected by server");
			return Err(Error::Exception(exception));
		}

		if self.session.is_authenticated() {
			info!(user = %self.session.user(), "logged in");
		} else {
			warn!(user = %request.user, "login failed: server returned no user");
		}
		Ok(self.session.user().to_string())
	}

	/// Executes `command` and returns its decoded result.
	///
	/// A command the server ran but rejected comes back as
	/// `Ok(CommandResult { success: false, .. })`. `Err` is reserved for
	/// transport failures, undecodable responses, and protocol exceptions.
	pub async fn exec(&mut self, command: &str) -> Result<CommandResult> {
		debug!(command, "executing command");
		let reply = self.round_trip(&Envelope::command(command)).await?;

		match &reply.response {
			Response::Exception(exception) => {
				let exception = exception.clone();
				self.apply_identity(&reply);
				Err(Error::Exception(exception))
			}
			Response::Document(doc) => {
				let result = command_result(doc)?;
				self.apply_identity(&reply);
				if !result.success {
					debug!(error = %result.error_text, "command failed");
				}
				Ok(result)
			}
		}
	}

	async fn round_trip(&self, envelope: &Envelope) -> Result<Reply> {
		let url = self.session.url()?;
		let body = envelope.to_xml()?;
		debug!(endpoint = %url, bytes = body.len(), "sending request");

		let response = self
			.transport
			.send(HttpRequest {
				url: url.clone(),
				body,
				cookies: self.session.cookies(),
			})
			.await?;
		debug!(status = response.status, bytes = response.body.len(), "received response");

		if response.status != 200 {
			return Err(Error::HttpStatus(response.status));
		}

		let decoded = decode_response(&response.body)?;
		let username = response
			.header(USERNAME_HEADER)
			.map_err(|e| DecodeError::Username(e.to_string()))?;
		let user = username_from_header(username)?;
		let session_id = session_id_from_cookies(self.session.cookie_header(&url).as_deref());
		Ok(Reply {
			response: decoded,
			user,
			session_id,
		})
	}

	fn apply_identity(&mut self, reply: &Reply) {
		self.session.set_user(reply.user.clone());
		self.session.set_session_id(reply.session_id.clone());
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use mql_protocol::TaskReason;

	use super::*;
	use crate::error::ErrorKind;
	use crate::fake_transport::{FakeResponse, FakeTransportBuilder, FakeTransportController, command_body};

	const ENDPOINT: &str = "http://plm.example.com/enovia/servlet/MatrixXMLServlet";

	fn client() -> (Client<crate::fake_transport::FakeTransport>, FakeTransportController) {
		let (transport, controller) = FakeTransportBuilder::new().build();
		(Client::with_transport(Session::new(ENDPOINT), transport), controller)
	}

	#[tokio::test]
	async fn exec_success_scenario() {
		let (mut client, controller) = client();
		controller.push(FakeResponse::command("1", &["creator"], &[]));

		let result = client.exec("print user").await.unwrap();
		assert_eq!(
			result,
			CommandResult {
				success: true,
				output: "creator".to_string(),
				error_text: String::new(),
				tasks: vec![],
			}
		);

		let sent = controller.take_sent();
		assert_eq!(sent.len(), 1);
		assert!(sent[0].body.contains("<cmd>print user</cmd>"));
		assert!(sent[0].body.contains("<stackTrace></stackTrace>"));
	}

	#[tokio::test]
	async fn exec_failure_is_a_result_not_an_error() {
		let (mut client, controller) = client();
		controller.push(FakeResponse::command("0", &[], &["unknown command"]));

		let result = client.exec("bad cmd").await.expect("command failure must not be an error");
		assert!(!result.success);
		assert_eq!(result.error_text, "unknown command");
		assert_eq!(result.output, "");
	}

	#[tokio::test]
	async fn exec_reports_tasks() {
		let (mut client, controller) = client();
		controller.push(FakeResponse::ok(command_body("1", &["ok"], &[], &[("3", "note"), ("4", "careful"), ("8", "hidden")])));

		let result = client.exec("mod bus x").await.unwrap();
		let reasons: Vec<_> = result.tasks.iter().map(|t| t.reason).collect();
		assert_eq!(reasons, vec![TaskReason::Notice, TaskReason::Warning, TaskReason::Other]);
		assert_eq!(result.reportable_tasks().count(), 2);
	}

	#[tokio::test]
	async fn protocol_exception_is_an_error() {
		let (mut client, controller) = client();
		controller.push(FakeResponse::ok("<exception><message>bad request</message></exception>"));

		let err = client.exec("print user").await.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Protocol);
		match err {
			Error::Exception(exception) => assert_eq!(exception.message, "bad request"),
			other => panic!("expected exception, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn non_200_is_a_transport_error() {
		let (mut client, controller) = client();
		controller.push(FakeResponse::with_status(500, "<html>oops</html>").username("creator"));

		let err = client.exec("print user").await.unwrap_err();
		assert!(matches!(err, Error::HttpStatus(500)));
		assert_eq!(err.kind(), ErrorKind::Transport);
		assert_eq!(client.user(), "");
	}

	#[tokio::test]
	async fn malformed_body_is_a_parse_error_and_keeps_session() {
		let (mut client, controller) = client();
		controller.push(FakeResponse::ok("<bosContext></bosContext>").username("creator").set_cookie("JSESSIONID=s1"));
		client.login("creator", "").await.unwrap();

		controller.push(FakeResponse::ok("<bosMQLCommand><returnVal>").username("someone"));
		let err = client.exec("print user").await.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Parse);
		assert_eq!(client.user(), "creator");
		assert_eq!(client.session_id(), "s1");
	}

	#[tokio::test]
	async fn wrong_shape_is_a_parse_error_and_keeps_session() {
		let (mut client, controller) = client();
		controller.push(FakeResponse::ok("<bosContext></bosContext>").username("creator"));
		client.login("creator", "").await.unwrap();

		controller.push(FakeResponse::ok("<bosMQLCommand><other>1</other></bosMQLCommand>"));
		let err = client.exec("print user").await.unwrap_err();
		assert!(matches!(err, Error::Decode(_)));
		assert_eq!(client.user(), "creator");
	}

	#[tokio::test]
	async fn login_reads_user_and_session_cookie() {
		let (mut client, controller) = client();
		controller.push(
			FakeResponse::ok("<bosContext><ok></ok></bosContext>")
				.username("creator")
				.set_cookie("JSESSIONID=abc123; Path=/"),
		);

		let user = client.login("creator", "secret").await.unwrap();
		assert_eq!(user, "creator");
		assert_eq!(client.user(), "creator");
		assert_eq!(client.session_id(), "abc123");

		let sent = controller.take_sent();
		assert!(sent[0].body.starts_with("<?xml version=\"1.0\"?>\n<bosContext>\n<bosContext argc=\"2\">"));
		assert!(sent[0].body.contains("<user>creator</user>\n<passwd>secret</passwd>\n<lattice></lattice>"));
	}

	#[tokio::test]
	async fn failed_login_is_empty_user_not_error() {
		let (mut client, controller) = client();
		controller.push(FakeResponse::ok("<bosContext></bosContext>"));

		let user = client.login("creator", "wrong").await.expect("failed login is not an error");
		assert_eq!(user, "");
		assert_eq!(client.user(), "");
		assert_eq!(client.session_id(), "");
	}

	#[tokio::test]
	async fn login_exception_still_updates_identity() {
		let (mut client, controller) = client();
		controller.push(FakeResponse::ok("<exception><message>unknown vault</message></exception>"));

		let err = client.login("creator", "").await.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Protocol);
		assert_eq!(client.user(), "");
	}

	#[tokio::test]
	async fn login_clears_user_before_sending() {
		let (mut client, controller) = client();
		controller.push(FakeResponse::ok("<bosContext></bosContext>").username("creator"));
		client.login("creator", "").await.unwrap();
		assert_eq!(client.user(), "creator");

		controller.push_timeout(Duration::from_secs(10));
		let err = client.login("other", "").await.unwrap_err();
		assert!(matches!(err, Error::Timeout(_)));
		assert_eq!(client.user(), "");
	}

	#[tokio::test]
	async fn session_cookie_is_sent_back() {
		let (mut client, controller) = client();
		controller.push(FakeResponse::ok("<bosContext></bosContext>").username("creator").set_cookie("JSESSIONID=abc; Path=/"));
		controller.push(FakeResponse::command("1", &["creator"], &[]).username("creator"));

		client.login("creator", "").await.unwrap();
		client.exec("print user").await.unwrap();

		let sent = controller.take_sent();
		assert_eq!(sent[0].cookie_header, None);
		assert_eq!(sent[1].cookie_header.as_deref(), Some("JSESSIONID=abc"));
		assert_eq!(client.session_id(), "abc");
	}

	#[tokio::test]
	async fn new_endpoint_drops_session_until_new_cookie() {
		let (mut client, controller) = client();
		controller.push(FakeResponse::ok("<bosContext></bosContext>").username("creator").set_cookie("JSESSIONID=abc; Path=/"));
		client.login("creator", "").await.unwrap();

		assert!(client.set_endpoint("http://other.example.com/servlet"));
		assert_eq!(client.user(), "");

		controller.push(FakeResponse::command("1", &[], &[]));
		client.exec("print user").await.unwrap();
		assert_eq!(client.session_id(), "");
		let sent = controller.take_sent();
		assert_eq!(sent[1].cookie_header, None);
		assert_eq!(sent[1].url.as_str(), "http://other.example.com/servlet");

		controller.push(FakeResponse::command("1", &[], &[]).set_cookie("JSESSIONID=def; Path=/"));
		client.exec("print user").await.unwrap();
		assert_eq!(client.session_id(), "def");
	}

	#[tokio::test]
	async fn same_endpoint_keeps_login() {
		let (mut client, controller) = client();
		controller.push(FakeResponse::ok("<bosContext></bosContext>").username("creator").set_cookie("JSESSIONID=abc; Path=/"));
		client.login("creator", "").await.unwrap();

		assert!(!client.set_endpoint(ENDPOINT));
		assert_eq!(client.user(), "creator");
		assert_eq!(client.session_id(), "abc");
	}

	#[tokio::test]
	async fn connect_switches_endpoint_and_sends_vault() {
		let (transport, controller) = FakeTransportBuilder::new().build();
		let mut client = Client::with_transport(Session::default(), transport);
		controller.push(FakeResponse::ok("<bosContext></bosContext>").username("Test Everything"));

		let user = client
			.connect(ConnectOptions {
				server: Some(ENDPOINT.to_string()),
				user: "Test Everything".to_string(),
				password: String::new(),
				vault: "eService Production".to_string(),
			})
			.await
			.unwrap();
		assert_eq!(user, "Test Everything");
		assert_eq!(client.endpoint(), ENDPOINT);
		assert_eq!(client.host(), "plm.example.com");

		let sent = controller.take_sent();
		assert!(sent[0].body.contains("<lattice>eService Production</lattice>"));
	}

	#[tokio::test]
	async fn missing_endpoint_is_a_transport_error() {
		let (transport, controller) = FakeTransportBuilder::new().build();
		let mut client = Client::with_transport(Session::default(), transport);

		let err = client.exec("print user").await.unwrap_err();
		assert!(matches!(err, Error::NoEndpoint));
		assert_eq!(err.kind(), ErrorKind::Transport);
		assert!(controller.take_sent().is_empty());
	}

	#[tokio::test]
	async fn malformed_username_header_is_a_parse_error() {
		let (mut client, controller) = client();
		controller.push(FakeResponse::ok("<bosContext></bosContext>").header(USERNAME_HEADER, "%%%"));

		let err = client.login("creator", "").await.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Parse);
	}

	#[tokio::test]
	async fn non_ascii_username_header_is_a_parse_error() {
		let (mut client, controller) = client();
		controller.push(FakeResponse::ok("<bosContext></bosContext>").username("creator").set_cookie("JSESSIONID=s1; Path=/"));
		client.login("creator", "").await.unwrap();

		controller.push(FakeResponse::command("1", &["ok"], &[]).header(USERNAME_HEADER, "Jürgen"));
		let err = client.exec("print user").await.unwrap_err();
		assert!(matches!(err, Error::Decode(DecodeError::Username(_))), "got {err:?}");
		assert_eq!(client.user(), "creator");
		assert_eq!(client.session_id(), "s1");
	}

	#[test]
	fn connect_options_debug_hides_password() {
		let options = ConnectOptions {
			password: "hunter2".to_string(),
			..Default::default()
		};
		assert!(!format!("{options:?}").contains("hunter2"));
	}

	#[test]
	fn into_session_returns_state() {
		let (client, _controller) = client();
		assert_eq!(client.into_session().endpoint(), ENDPOINT);
	}
}
