//! Client for the MQL XML-over-HTTP command protocol.
//!
//! A [`Client`] logs in to an ENOVIA-style servlet endpoint and executes
//! commands one at a time. Request bodies and response decoding live in
//! [`mql_protocol`]; this crate adds the HTTP transport, cookie-backed
//! session state, and error classification.
//!
//! # Example
//!
//! ```ignore
//! use mql::{Client, ClientOptions};
//!
//! let mut client = Client::new(ClientOptions::default().endpoint("http://plm/enovia/servlet/MatrixXMLServlet"));
//! let user = client.login("creator", "").await?;
//! let result = client.exec("print context").await?;
//! if result.success {
//!     println!("{}", result.output);
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod fake_transport;
pub mod session;
pub mod transport;

pub use client::{Client, ConnectOptions};
pub use config::{ClientOptions, DEFAULT_TIMEOUT};
pub use error::{Error, ErrorKind, Result};
pub use mql_protocol::{CommandResult, LoginRequest, ProtocolException, Task, TaskReason};
pub use session::Session;
pub use transport::{HttpTransport, Transport};
