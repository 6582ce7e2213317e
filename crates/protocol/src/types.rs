//! Decoded command results.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a client task reported alongside a command result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskReason {
	Notice,
	Warning,
	Error,
	Other,
}

impl TaskReason {
	/// Maps the server's single-character reason code.
	pub fn from_code(code: &str) -> Self {
		match code {
			"3" => TaskReason::Notice,
			"4" => TaskReason::Warning,
			"5" => TaskReason::Error,
			_ => TaskReason::Other,
		}
	}

	/// Whether consumers should show this task to a user.
	pub fn is_reportable(self) -> bool {
		!matches!(self, TaskReason::Other)
	}
}

impl fmt::Display for TaskReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TaskReason::Notice => write!(f, "NOTICE"),
			TaskReason::Warning => write!(f, "WARNING"),
			TaskReason::Error => write!(f, "ERROR"),
			TaskReason::Other => write!(f, "OTHER"),
		}
	}
}

/// A client task attached to a command result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
	pub reason: TaskReason,
	/// Raw reason code as sent by the server.
	pub code: String,
	pub task_data: String,
}

impl Task {
	pub fn new(code: impl Into<String>, task_data: impl Into<String>) -> Self {
		let code = code.into();
		Self {
			reason: TaskReason::from_code(&code),
			code,
			task_data: task_data.into(),
		}
	}
}

/// Outcome of one executed command.
///
/// `success == false` is an ordinary command failure reported by the
/// server, not a transport or protocol error. Check `success` to detect it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
	pub success: bool,
	pub output: String,
	pub error_text: String,
	pub tasks: Vec<Task>,
}

impl CommandResult {
	/// Tasks a user should see (notices, warnings, errors).
	pub fn reportable_tasks(&self) -> impl Iterator<Item = &Task> {
		self.tasks.iter().filter(|task| task.reason.is_reportable())
	}
}
