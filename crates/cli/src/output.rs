//! Rendering of command results.

use std::io::{self, Write};

use colored::Colorize;
use mql::CommandResult;

/// Writes `result` the way an interactive shell shows it: output text, then
/// error text in red, then one `# REASON: data` line per reportable task.
pub fn write_result<W: Write>(out: &mut W, result: &CommandResult) -> io::Result<()> {
	if !result.output.is_empty() {
		writeln!(out, "{}", result.output)?;
	}
	if !result.error_text.is_empty() {
		writeln!(out, "{}", result.error_text.red())?;
	}
	for task in result.reportable_tasks() {
		writeln!(out, "{}", format!("# {}: {}", task.reason, task.task_data).red().italic())?;
	}
	Ok(())
}

/// Writes `result` as a single JSON line.
pub fn write_json<W: Write>(out: &mut W, result: &CommandResult) -> io::Result<()> {
	serde_json::to_writer(&mut *out, result)?;
	writeln!(out)
}

/// Writes a failed call as a red error line.
pub fn write_error<W: Write>(out: &mut W, err: &dyn std::fmt::Display) -> io::Result<()> {
	writeln!(out, "{}", format!("error: {err}").red())
}

#[cfg(test)]
mod tests {
	use mql::Task;

	use super::*;

	fn render(result: &CommandResult) -> String {
		colored::control::set_override(false);
		let mut out = Vec::new();
		write_result(&mut out, result).unwrap();
		String::from_utf8(out).unwrap()
	}

	#[test]
	fn success_prints_output_only() {
		let result = CommandResult {
			success: true,
			output: "creator".to_string(),
			..Default::default()
		};
		assert_eq!(render(&result), "creator\n");
	}

	#[test]
	fn failure_prints_error_text() {
		let result = CommandResult {
			success: false,
			error_text: "unknown command".to_string(),
			..Default::default()
		};
		assert_eq!(render(&result), "unknown command\n");
	}

	#[test]
	fn tasks_skip_other_reasons() {
		let result = CommandResult {
			success: true,
			output: "done".to_string(),
			error_text: String::new(),
			tasks: vec![Task::new("3", "saved"), Task::new("9", "internal"), Task::new("5", "trigger failed")],
		};
		assert_eq!(render(&result), "done\n# NOTICE: saved\n# ERROR: trigger failed\n");
	}

	#[test]
	fn json_is_one_line() {
		let result = CommandResult {
			success: true,
			output: "creator".to_string(),
			..Default::default()
		};
		let mut out = Vec::new();
		write_json(&mut out, &result).unwrap();
		let text = String::from_utf8(out).unwrap();
		assert_eq!(text.lines().count(), 1);
		let value: serde_json::Value = serde_json::from_str(&text).unwrap();
		assert_eq!(value["success"], true);
		assert_eq!(value["errorText"], "");
	}

	#[test]
	fn error_line_is_prefixed() {
		colored::control::set_override(false);
		let mut out = Vec::new();
		write_error(&mut out, &"HTTP status: 500").unwrap();
		assert_eq!(String::from_utf8(out).unwrap(), "error: HTTP status: 500\n");
	}
}
