//! Process runner for tool-backed collaborators.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::ToolSettings;
use crate::logging::RunLogger;
use crate::orchestrator::{StageError, StageResult};

/// Summary of a finished tool process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub exit_code: i32,
    pub stdout_lines: usize,
    pub stderr_lines: usize,
}

/// Runs one configured external program.
///
/// The protocol arguments `--operation <op> --request <file> --response
/// <file>` are appended after the configured arguments.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    program: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    working_dir: Option<PathBuf>,
}

impl ToolRunner {
    pub fn from_settings(settings: &ToolSettings) -> Self {
        Self {
            program: settings.program.clone(),
            args: settings.args.clone(),
            env: settings.env.clone(),
            working_dir: settings.working_dir.clone(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Full argument vector, program first (for logging).
    pub fn command_line(&self, operation: &str, request: &Path, response: &Path) -> Vec<String> {
        let mut line = Vec::with_capacity(self.args.len() + 7);
        line.push(self.program.clone());
        line.extend(self.args.iter().cloned());
        line.push("--operation".to_string());
        line.push(operation.to_string());
        line.push("--request".to_string());
        line.push(request.display().to_string());
        line.push("--response".to_string());
        line.push(response.display().to_string());
        line
    }

    /// Run the tool and wait for it.
    ///
    /// Output lines go to the logger's tail buffer once the tool exits, all
    /// stdout lines before all stderr lines. A non-zero exit is a
    /// `StageError::ToolFailed` carrying the last non-empty stderr line.
    pub fn run(
        &self,
        operation: &str,
        request: &Path,
        response: &Path,
        logger: &RunLogger,
    ) -> StageResult<ToolOutput> {
        logger.command(&self.command_line(operation, request, response).join(" "));

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--operation")
            .arg(operation)
            .arg("--request")
            .arg(request)
            .arg("--response")
            .arg(response)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!("Running: {} {} ({})", self.program, self.args.join(" "), operation);

        let output = cmd
            .output()
            .map_err(|e| StageError::io(format!("running {}", self.program), e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let mut stdout_lines = 0;
        for line in stdout.lines() {
            logger.output_line(line, false);
            stdout_lines += 1;
        }
        let mut stderr_lines = 0;
        for line in stderr.lines() {
            logger.output_line(line, true);
            stderr_lines += 1;
        }

        let exit_code = output.status.code().unwrap_or(-1);
        if !output.status.success() {
            let message = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("no error output");
            return Err(StageError::tool_failed(&self.program, exit_code, message.trim()));
        }

        Ok(ToolOutput {
            exit_code,
            stdout_lines,
            stderr_lines,
        })
    }
}
