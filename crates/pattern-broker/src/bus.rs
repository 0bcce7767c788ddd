// pattern-broker/src/bus.rs
// ============================================================================
// Module: Bus Constructors
// Description: Paired sink/source constructors for the two reference buses.
// Purpose: Give callers one call that wires a matched publisher/poller pair,
//          rather than constructing each adapter's internals by hand.
// Dependencies: std::sync::mpsc, std::fs
// ============================================================================

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::mpsc;

use thiserror::Error;

use crate::sink::FileSink;
use crate::sink::InlineSink;
use crate::source::FileSource;
use crate::source::InlineSource;

/// Error taxonomy for bus setup.
#[derive(Debug, Error)]
pub enum BusError {
    /// The backing bus file could not be opened or created.
    #[error("failed to open bus file: {0}")]
    Open(String),
}

/// An in-process, single-sender/single-receiver channel bus. Useful for
/// wiring a dispatcher directly to a local consumer without any durable
/// backing store, and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineBus;

impl InlineBus {
    /// Builds a matched sink/source pair sharing one channel.
    #[must_use]
    pub fn channel() -> (InlineSink, InlineSource) {
        let (sender, receiver) = mpsc::channel();
        (InlineSink::new(sender), InlineSource::new(receiver))
    }
}

/// An append-only JSON-line file bus. The sink appends; the source tails
/// from a tracked offset. Useful as a simple durable local log when no
/// external message broker is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileBus;

impl FileBus {
    /// Opens (creating if absent) the bus file at `path` and returns a
    /// matched sink/source pair over it.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Open`] if the file cannot be opened for append.
    pub fn open(path: impl AsRef<Path>) -> Result<(FileSink, FileSource), BusError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| BusError::Open(err.to_string()))?;
        Ok((FileSink::new(file), FileSource::new(path)))
    }
}
