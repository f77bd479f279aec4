//! Output collaborators: the line-oriented log sink that receives child
//! process output, and the notifier used to surface failures to the user.

use std::sync::Mutex;

use log::{error, info};

/// Append-only, line-oriented log output.
#[cfg_attr(test, mockall::automock)]
pub trait LogSink: Send + Sync {
    fn append_line(&self, line: &str);
}

/// User-visible channel for operation failures.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn notify_error(&self, message: &str);
}

/// Forwards lines to the `log` facade under the `pipmgr::pip` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCrateSink;

impl LogSink for LogCrateSink {
    fn append_line(&self, line: &str) {
        info!(target: "pipmgr::pip", "{}", line);
    }
}

/// Keeps every appended line in memory.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    lines: Mutex<Vec<String>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines appended so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

impl LogSink for MemoryLogSink {
    fn append_line(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(line.to_string());
    }
}

/// Reports failures through `log::error!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_error(&self, message: &str) {
        error!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemoryLogSink::new();
        sink.append_line("exec python -m pip list");
        sink.append_line("[]");

        assert_eq!(sink.lines(), vec!["exec python -m pip list", "[]"]);
        assert!(sink.contains("pip list"));
        assert!(!sink.contains("uninstall"));
    }
}
