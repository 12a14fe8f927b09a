//! External tool invocation.
//!
//! Compilers and linkers are opaque programs. Everything the engine needs from
//! them goes through [`ProcessRunner::run`]: spawn with an argument vector,
//! block until exit, hand back the exit code and captured stderr.

use crate::error::BuildError;
use colored::*;
use std::process::{Command, Stdio};

/// Result of one external tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` if the process was killed by a signal
    pub code: Option<i32>,
    /// Everything the tool wrote to stderr
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Capability to run an external program.
///
/// Shared by all compile workers of one dispatch, hence `Sync`.
pub trait ProcessRunner: Sync {
    fn run(&self, program: &str, args: &[String]) -> Result<ToolOutput, BuildError>;

    /// Whether `run` prints each command line to the terminal.
    fn echoes_commands(&self) -> bool {
        false
    }
}

/// Runs programs on the host with `std::process::Command`.
#[derive(Debug, Default, Clone)]
pub struct SystemRunner {
    /// Echo each command line before running it
    pub verbose: bool,
}

impl SystemRunner {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<ToolOutput, BuildError> {
        if self.verbose {
            eprintln!("   {} {} {}", "$".dimmed(), program, args.join(" ").dimmed());
        }

        // stdout is discarded, only diagnostics are kept
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| BuildError::io(format!("failed to execute '{}'", program), e))?;

        Ok(ToolOutput {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    fn echoes_commands(&self) -> bool {
        self.verbose
    }
}
