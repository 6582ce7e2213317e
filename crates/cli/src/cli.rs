use std::time::Duration;

use clap::Parser;
use mql::{ClientOptions, ConnectOptions};

#[derive(Parser, Debug)]
#[command(name = "mql")]
#[command(about = "Run MQL commands against an ENOVIA server")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Servlet endpoint, e.g. http://host/enovia/servlet/MatrixXMLServlet
	#[arg(long, env = "MQLURI", value_name = "URL")]
	pub url: String,

	/// User to log in as
	#[arg(short, long, env = "MQLUSER", default_value = "creator")]
	pub user: String,

	/// Password for the user
	#[arg(short, long, env = "MQLPASSWORD", default_value = "", hide_env_values = true)]
	pub password: String,

	/// Vault to log in to
	#[arg(long, default_value = "")]
	pub vault: String,

	/// Request timeout in seconds
	#[arg(long, env = "MQL_TIMEOUT_SECS", value_name = "SECS", default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
	pub timeout: u64,

	/// Print each result as JSON
	#[arg(long)]
	pub json: bool,

	/// Commands to run; read from stdin, one per line, when omitted
	#[arg(value_name = "COMMAND")]
	pub commands: Vec<String>,
}

impl Cli {
	/// Environment defaults with the parsed flags applied on top.
	pub fn client_options(&self) -> ClientOptions {
		ClientOptions::from_env()
			.endpoint(self.url.clone())
			.timeout(Duration::from_secs(self.timeout))
	}

	pub fn connect_options(&self) -> ConnectOptions {
		ConnectOptions {
			server: Some(self.url.clone()),
			user: self.user.clone(),
			password: self.password.clone(),
			vault: self.vault.clone(),
		}
	}
}
