use clap::Parser;
use mql::Client;
use mql_cli::{cli::Cli, logging, run};
use tokio::io::BufReader;
use tracing::error;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let mut client = Client::new(cli.client_options());
	let stdin = BufReader::new(tokio::io::stdin());
	let mut stdout = std::io::stdout().lock();
	let mut stderr = std::io::stderr().lock();

	match run::run(&mut client, &cli, stdin, &mut stdout, &mut stderr).await {
		Ok(0) => {}
		Ok(failures) => {
			error!(failures, "some commands failed");
			std::process::exit(1);
		}
		Err(err) => {
			error!(error = %err, "mql failed");
			eprintln!("error: {err:#}");
			std::process::exit(1);
		}
	}
}
