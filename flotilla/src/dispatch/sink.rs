//! Structured per-device log capture.
//!
//! Dispatch workers buffer their log entries in a [`DeviceLog`] and flush
//! them through the injected [`LogSink`] when the worker finishes, so one
//! device's entries are never interleaved with another's. Sinks are
//! fire-and-forget: a misbehaving sink must swallow its own failures, it
//! can never fail the dispatch.

use log::Level;

/// One structured log entry attributed to a device.
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Device name.
    pub device: String,

    /// Severity.
    pub level: Level,

    /// Message text.
    pub message: String,
}

/// Destination for structured dispatch entries.
///
/// Implementations must accept concurrent `record` calls.
pub trait LogSink: Send + Sync {
    /// Record one entry. Must not panic or block on sink errors.
    fn record(&self, entry: &LogEntry);
}

/// Default sink forwarding to the `log` facade.
///
/// One facade call per entry keeps output line-atomic under concurrent
/// workers.
#[derive(Debug, Default)]
pub struct FacadeSink;

impl LogSink for FacadeSink {
    fn record(&self, entry: &LogEntry) {
        log::log!(entry.level, "[{}] {}", entry.device, entry.message);
    }
}

/// Sink discarding everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn record(&self, _entry: &LogEntry) {}
}

/// Per-worker entry buffer, flushed once when the worker ends.
#[derive(Debug)]
pub struct DeviceLog {
    device: String,
    entries: Vec<LogEntry>,
}

impl DeviceLog {
    /// Start a buffer for one device.
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            entries: Vec::new(),
        }
    }

    /// Buffer an informational entry.
    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Level::Info, message.into());
    }

    /// Buffer a warning entry.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(Level::Warn, message.into());
    }

    /// Buffer an error entry.
    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Level::Error, message.into());
    }

    fn push(&mut self, level: Level, message: String) {
        self.entries.push(LogEntry {
            device: self.device.clone(),
            level,
            message,
        });
    }

    /// Flush all buffered entries to the sink, in order.
    pub fn flush(self, sink: &dyn LogSink) {
        for entry in &self.entries {
            sink.record(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct CaptureSink {
        entries: Mutex<Vec<LogEntry>>,
    }

    impl LogSink for CaptureSink {
        fn record(&self, entry: &LogEntry) {
            self.entries.lock().unwrap().push(entry.clone());
        }
    }

    #[test]
    fn test_flush_preserves_order_and_attribution() {
        let sink = CaptureSink::default();

        let mut journal = DeviceLog::new("R1");
        journal.info("connecting");
        journal.warn("slow response");
        journal.error("gave up");
        journal.flush(&sink);

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.device == "R1"));
        assert_eq!(entries[0].level, Level::Info);
        assert_eq!(entries[1].level, Level::Warn);
        assert_eq!(entries[2].message, "gave up");
    }
}
