//! Remote side effects delegated to an external program.
//!
//! The program gets a plan as JSON on stdin and answers with JSON on stdout:
//! an array of removed item ids for a prune plan, or a restore receipt
//! (`{"playlist_id": ..., "added": [...]}`) for a restore plan.

use std::io::{self, Write};
use std::process::{Command, Stdio};

use serde::de::DeserializeOwned;
use serde::Serialize;
use ytm_core::prune::{PruneExecutor, PrunePlan};
use ytm_core::restore::{RestoreExecutor, RestorePlan, RestoreReceipt};

pub struct CommandExecutor {
    command: String,
}

impl CommandExecutor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn exchange<T, R>(&self, payload: &T) -> ytm_core::Result<R>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let mut parts = self.command.split_whitespace();
        let Some(program) = parts.next() else {
            return Err(ytm_core::Error::InvalidInput(
                "empty executor command".to_string(),
            ));
        };

        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(serde_json::to_string(payload)?.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(ytm_core::Error::Io(io::Error::other(format!(
                "`{}` exited with status {}",
                self.command, output.status
            ))));
        }
        tracing::debug!("`{}` answered {} byte(s)", self.command, output.stdout.len());

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

impl PruneExecutor for CommandExecutor {
    fn remove(&mut self, plan: &PrunePlan) -> ytm_core::Result<Vec<String>> {
        self.exchange(plan)
    }
}

impl RestoreExecutor for CommandExecutor {
    fn restore(&mut self, plan: &RestorePlan) -> ytm_core::Result<RestoreReceipt> {
        self.exchange(plan)
    }
}
