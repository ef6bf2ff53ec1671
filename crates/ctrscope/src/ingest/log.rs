use std::collections::VecDeque;

use serde::Serialize;

pub const DEFAULT_LOG_CAPACITY: usize = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub sequence: u64,
    pub level: LogLevel,
    pub message: String,
}

/// When full, the oldest entry is evicted; sequences keep increasing so a
/// reader polling with `entries_since` never sees an entry twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    next_sequence: u64,
    dropped: u64,
}

impl Default for LoadLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl LoadLog {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY)),
            capacity,
            next_sequence: 0,
            dropped: 0,
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.append(LogLevel::Info, message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.append(LogLevel::Warn, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.append(LogLevel::Error, message.into());
    }

    pub fn append(&mut self, level: LogLevel, message: String) {
        match level {
            LogLevel::Info => tracing::info!(target: "ctrscope::load", "{message}"),
            LogLevel::Warn => tracing::warn!(target: "ctrscope::load", "{message}"),
            LogLevel::Error => tracing::error!(target: "ctrscope::load", "{message}"),
        }

        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            self.dropped += 1;
        }
        self.entries.push_back(LogEntry {
            sequence: self.next_sequence,
            level,
            message,
        });
        self.next_sequence += 1;
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn entries_since(&self, from: u64) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |entry| entry.sequence >= from)
    }

    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.message.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn clear(&mut self) {
        self.dropped += self.entries.len() as u64;
        self.entries.clear();
    }
}
