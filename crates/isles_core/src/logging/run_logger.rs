//! Per-run logger with file and console output.
//!
//! Each training run gets one logger that:
//! - Writes to a log file inside the output directory (when it can)
//! - Sends messages to a console callback (if provided)
//! - Keeps a tail buffer of external tool output for error diagnosis

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{ConsoleCallback, LogConfig, LogLevel, MessagePrefix};

/// Per-run logger with dual output (file + console).
pub struct RunLogger {
    run_name: String,
    log_path: Option<PathBuf>,
    file_writer: Mutex<Option<BufWriter<File>>>,
    console: Option<ConsoleCallback>,
    config: LogConfig,
    /// Recent tool output lines, replayed after a failure.
    tail_buffer: Mutex<VecDeque<String>>,
}

impl RunLogger {
    /// Create a new run logger.
    ///
    /// # Arguments
    /// * `run_name` - Name of the run (shown in the log header)
    /// * `log_file` - File to write to; `None` keeps output console-only
    /// * `config` - Logging configuration
    /// * `console` - Optional callback receiving every formatted line
    pub fn new(
        run_name: impl Into<String>,
        log_file: Option<&Path>,
        config: LogConfig,
        console: Option<ConsoleCallback>,
    ) -> std::io::Result<Self> {
        let (log_path, writer) = match log_file {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let file = File::create(path)?;
                (Some(path.to_path_buf()), Some(BufWriter::new(file)))
            }
            None => (None, None),
        };

        Ok(Self {
            run_name: run_name.into(),
            log_path,
            file_writer: Mutex::new(writer),
            console,
            tail_buffer: Mutex::new(VecDeque::with_capacity(config.error_tail)),
            config,
        })
    }

    /// Logger without a file sink.
    pub fn console_only(
        run_name: impl Into<String>,
        config: LogConfig,
        console: Option<ConsoleCallback>,
    ) -> Self {
        Self {
            run_name: run_name.into(),
            log_path: None,
            file_writer: Mutex::new(None),
            console,
            tail_buffer: Mutex::new(VecDeque::with_capacity(config.error_tail)),
            config,
        }
    }

    /// Silent logger, used by tests and library callers that only want tracing.
    pub fn discard() -> Self {
        Self::console_only("discard", LogConfig::default(), None)
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    /// Path of the log file, if one is attached.
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Log a message at the specified level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }

        let formatted = self.format_message(message);
        self.output(&formatted);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        let msg = MessagePrefix::Warning.format(message);
        self.log(LogLevel::Warn, &msg);
    }

    pub fn error(&self, message: &str) {
        let msg = MessagePrefix::Error.format(message);
        self.log(LogLevel::Error, &msg);
    }

    /// Log an external command about to be executed.
    pub fn command(&self, command: &str) {
        let msg = MessagePrefix::Command.format(command);
        self.log(LogLevel::Info, &msg);
    }

    /// Log a phase marker (one per pipeline step).
    pub fn phase(&self, phase_name: &str) {
        let msg = MessagePrefix::Phase.format(phase_name);
        self.log(LogLevel::Info, &msg);
    }

    pub fn success(&self, message: &str) {
        let msg = MessagePrefix::Success.format(message);
        self.log(LogLevel::Info, &msg);
    }

    /// Record one line of tool output.
    ///
    /// Always lands in the tail buffer; echoed only outside compact mode.
    /// Stderr lines carry a `[stderr]` prefix in both places. Tools run to
    /// completion before their output is recorded, so stdout and stderr
    /// lines are not interleaved in the order the tool wrote them.
    pub fn output_line(&self, line: &str, is_stderr: bool) {
        let msg = if is_stderr {
            format!("[stderr] {}", line)
        } else {
            line.to_string()
        };

        if self.config.error_tail > 0 {
            let mut buffer = self.tail_buffer.lock();
            if buffer.len() >= self.config.error_tail {
                buffer.pop_front();
            }
            buffer.push_back(msg.clone());
        }

        if self.config.compact {
            return;
        }

        self.output(&self.format_message(&msg));
    }

    /// Replay the tail buffer (typically after an error).
    pub fn show_tail(&self, header: &str) {
        let buffer = self.tail_buffer.lock();
        if buffer.is_empty() {
            return;
        }

        self.output(&self.format_message(&format!("[{}/tail]", header)));
        for line in buffer.iter() {
            self.output(&self.format_message(line));
        }
    }

    pub fn clear_tail(&self) {
        self.tail_buffer.lock().clear();
    }

    pub fn get_tail(&self) -> Vec<String> {
        self.tail_buffer.lock().iter().cloned().collect()
    }

    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Flush and detach the file sink.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            let timestamp = Local::now().format("%H:%M:%S");
            format!("[{}] {}", timestamp, message)
        } else {
            message.to_string()
        }
    }

    fn output(&self, formatted: &str) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{}", formatted);
        }

        if let Some(ref callback) = self.console {
            callback(formatted);
        }
    }
}

impl Drop for RunLogger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Builder for creating a `RunLogger` with a fluent API.
pub struct RunLoggerBuilder {
    run_name: String,
    log_file: Option<PathBuf>,
    config: LogConfig,
    console: Option<ConsoleCallback>,
}

impl RunLoggerBuilder {
    pub fn new(run_name: impl Into<String>) -> Self {
        Self {
            run_name: run_name.into(),
            log_file: None,
            config: LogConfig::default(),
            console: None,
        }
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    pub fn console(mut self, callback: ConsoleCallback) -> Self {
        self.console = Some(callback);
        self
    }

    /// Build the logger.
    ///
    /// If the log file cannot be created the logger falls back to
    /// console-only output and the error is reported through `tracing`.
    pub fn build(self) -> RunLogger {
        match self.log_file {
            Some(path) => {
                match RunLogger::new(&self.run_name, Some(&path), self.config.clone(), None) {
                    Ok(mut logger) => {
                        logger.console = self.console;
                        logger
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Cannot open log file {}: {}; logging to console only",
                            path.display(),
                            e
                        );
                        RunLogger::console_only(self.run_name, self.config, self.console)
                    }
                }
            }
            None => RunLogger::console_only(self.run_name, self.config, self.console),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn creates_log_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("train.log");
        let logger = RunLogger::new("run", Some(&path), LogConfig::default(), None).unwrap();

        assert!(path.exists());
        assert_eq!(logger.log_path(), Some(path.as_path()));
    }

    #[test]
    fn writes_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("train.log");
        let logger = RunLogger::new("run", Some(&path), LogConfig::default(), None).unwrap();

        logger.phase("Computing brain masks...");
        logger.flush();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("=== Computing brain masks... ==="));
    }

    #[test]
    fn calls_console_callback() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let count_clone = call_count.clone();

        let callback: ConsoleCallback = Box::new(move |_msg| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        let logger = RunLogger::console_only("run", LogConfig::default(), Some(callback));
        logger.info("Message 1");
        logger.info("Message 2");
        logger.debug("filtered at info level");

        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn tail_buffer_maintains_limit() {
        let mut config = LogConfig::default();
        config.error_tail = 3;
        let logger = RunLogger::console_only("run", config, None);

        for i in 0..6 {
            logger.output_line(&format!("Line {}", i), false);
        }

        assert_eq!(logger.get_tail(), vec!["Line 3", "Line 4", "Line 5"]);
        logger.output_line("out of memory", true);
        assert_eq!(logger.get_tail().last().map(String::as_str), Some("[stderr] out of memory"));
        logger.clear_tail();
        assert!(logger.get_tail().is_empty());
    }

    #[test]
    fn compact_mode_keeps_tool_output_off_console() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();
        let callback: ConsoleCallback = Box::new(move |_msg| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });

        let logger = RunLogger::console_only("run", LogConfig::default(), Some(callback));
        logger.output_line("epoch 1 loss 0.42", false);
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        logger.show_tail("segmentator");
        // Header plus the single buffered line.
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn builder_falls_back_to_console_when_file_unavailable() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, "x").unwrap();

        let logger = RunLoggerBuilder::new("run")
            .log_file(blocker.join("train.log"))
            .build();
        assert!(logger.log_path().is_none());
    }
}
