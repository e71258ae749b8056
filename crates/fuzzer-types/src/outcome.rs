//! Result of a single engine invocation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Exactly one of completed, timed out, or never started.
///
/// A non-zero exit code is still `Completed`: the engine commonly exits
/// non-zero when it finds a counterexample, so pass/fail is decided from the
/// transcript, not from the exit code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed {
        /// `None` when the process was ended by a signal.
        exit_code: Option<i32>,
        transcript: String,
    },
    TimedOut {
        /// Output captured before the deadline.
        transcript: String,
    },
    LaunchFailed {
        cause: String,
    },
}

impl RunOutcome {
    pub fn status(&self) -> RunStatus {
        match self {
            RunOutcome::Completed { .. } => RunStatus::Completed,
            RunOutcome::TimedOut { .. } => RunStatus::TimedOut,
            RunOutcome::LaunchFailed { .. } => RunStatus::LaunchFailed,
        }
    }

    /// Captured output; empty for a launch failure.
    pub fn transcript(&self) -> &str {
        match self {
            RunOutcome::Completed { transcript, .. } | RunOutcome::TimedOut { transcript } => {
                transcript
            }
            RunOutcome::LaunchFailed { .. } => "",
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RunOutcome::Completed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    TimedOut,
    LaunchFailed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Completed => "completed",
            RunStatus::TimedOut => "timed_out",
            RunStatus::LaunchFailed => "launch_failed",
        };
        f.write_str(s)
    }
}
