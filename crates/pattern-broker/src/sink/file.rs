// pattern-broker/src/sink/file.rs
// ============================================================================
// Module: File Sink
// Description: Appends envelopes as JSON lines to a local bus file.
// Purpose: Provide a simple durable local log without a message broker
//          dependency.
// Dependencies: std::fs, serde_json
// ============================================================================

use std::fs::File;
use std::io::Write;
use std::sync::Mutex;

use pattern_core::EventEnvelope;

use super::Sink;
use super::SinkError;

/// Appends one JSON line per published envelope to a shared file handle.
///
/// Paired with a [`crate::source::FileSource`] tailing the same path by
/// [`crate::bus::FileBus::open`].
pub struct FileSink {
    /// Append-mode file handle, guarded for concurrent publishers.
    file: Mutex<File>,
}

impl FileSink {
    /// Wraps an already-opened append-mode file handle as a [`Sink`].
    #[must_use]
    pub fn new(file: File) -> Self {
        Self { file: Mutex::new(file) }
    }
}

impl Sink for FileSink {
    fn publish(&self, envelope: &EventEnvelope) -> Result<(), SinkError> {
        let line = serde_json::to_string(envelope).map_err(|err| SinkError::Encode(err.to_string()))?;
        let mut guard = self.file.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        writeln!(guard, "{line}").map_err(|err| SinkError::Io(err.to_string()))?;
        guard.flush().map_err(|err| SinkError::Io(err.to_string()))
    }
}
