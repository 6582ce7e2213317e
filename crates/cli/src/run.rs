//! Login and command loop.

use std::io::Write;

use anyhow::{Context, Result, bail};
use mql::{Client, Transport};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{error, info};

use crate::cli::Cli;
use crate::output;

/// Words that end a stdin session.
const QUIT_WORDS: [&str; 3] = ["q", "quit", "exit"];

/// Logs in and executes every command, writing results to `out` and failed
/// calls to `errors`.
///
/// Commands come from `cli.commands`, or from `input` one per line when none
/// were given. Returns the number of calls that failed with an error; a
/// command the server rejected is printed but does not count.
pub async fn run<T, R, W, E>(client: &mut Client<T>, cli: &Cli, input: R, out: &mut W, errors: &mut E) -> Result<usize>
where
	T: Transport,
	R: AsyncBufRead + Unpin,
	W: Write,
	E: Write,
{
	let user = client
		.connect(cli.connect_options())
		.await
		.with_context(|| format!("login to {} failed", cli.url))?;
	if user.is_empty() {
		bail!("login as '{}' was rejected by {}", cli.user, client.host());
	}
	info!(user = %user, host = %client.host(), "connected");

	let mut failures = 0;
	if cli.commands.is_empty() {
		let mut lines = input.lines();
		while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
			match execute(client, cli.json, line.trim(), out, errors).await? {
				Step::Quit => break,
				Step::Failed => failures += 1,
				Step::Done | Step::Skipped => {}
			}
		}
	} else {
		for command in &cli.commands {
			match execute(client, cli.json, command.trim(), out, errors).await? {
				Step::Quit => break,
				Step::Failed => failures += 1,
				Step::Done | Step::Skipped => {}
			}
		}
	}
	Ok(failures)
}

enum Step {
	Done,
	Skipped,
	Failed,
	Quit,
}

async fn execute<T, W, E>(client: &mut Client<T>, json: bool, command: &str, out: &mut W, errors: &mut E) -> Result<Step>
where
	T: Transport,
	W: Write,
	E: Write,
{
	if command.is_empty() {
		return Ok(Step::Skipped);
	}
	if QUIT_WORDS.contains(&command) {
		return Ok(Step::Quit);
	}

	match client.exec(command).await {
		Ok(result) => {
			if json {
				output::write_json(out, &result)?;
			} else {
				output::write_result(out, &result)?;
			}
			Ok(Step::Done)
		}
		Err(err) => {
			error!(command, kind = ?err.kind(), error = %err, "command failed");
			output::write_error(errors, &err)?;
			Ok(Step::Failed)
		}
	}
}
