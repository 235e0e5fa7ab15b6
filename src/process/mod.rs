//! External command execution
//!
//! Every tool the runners shell out to (`openssl`, `systemctl`, `nginx`)
//! goes through [`CommandRunner`], so the runners never touch
//! `std::process` directly and tests can substitute a recording fake.

use crate::utils::{CommandError, DependencyError};
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Captured result of a finished subprocess
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit status; -1 when the process was killed by a signal
    pub status: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 0,
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == 0
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Runs external programs synchronously
pub trait CommandRunner {
    /// Run `program` with `args`, waiting for it to exit.
    ///
    /// A non-zero exit is not an error at this level; only a failure to
    /// spawn is.
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, CommandError>;

    /// Locate a tool on `PATH`
    fn locate(&self, tool: &str) -> Option<PathBuf> {
        which::which(tool).ok()
    }
}

/// [`CommandRunner`] backed by `std::process::Command`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, CommandError> {
        debug!(program, args = %args.join(" "), "Running command");

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| CommandError::Spawn {
                program: program.to_string(),
                message: e.to_string(),
            })?;

        let result = CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: output.stderr,
        };
        debug!(program, status = result.status, "Command finished");
        Ok(result)
    }
}

/// Run a command and turn a non-zero exit into [`CommandError::NonZeroExit`]
pub fn run_checked(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[String],
) -> Result<CommandOutput, CommandError> {
    let output = runner.run(program, args)?;
    if output.success() {
        Ok(output)
    } else {
        let subcommand = args.first().map(String::as_str).unwrap_or_default();
        Err(CommandError::NonZeroExit {
            command: format!("{} {}", program, subcommand).trim().to_string(),
            code: output.status,
            stderr: output.stderr_text(),
        })
    }
}

/// Fail with a [`DependencyError`] unless every `(tool, purpose)` is on `PATH`
pub fn require_tools(
    runner: &dyn CommandRunner,
    tools: &[(&str, &str)],
) -> Result<(), DependencyError> {
    for (tool, purpose) in tools {
        match runner.locate(tool) {
            Some(path) => debug!(tool, path = %path.display(), "Found dependency"),
            None => {
                return Err(DependencyError::NotFound {
                    tool: tool.to_string(),
                    purpose: purpose.to_string(),
                })
            }
        }
    }
    Ok(())
}

/// Build an owned argument vector from string-like pieces
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        vec![$(::std::string::ToString::to_string(&$arg)),*]
    };
}
