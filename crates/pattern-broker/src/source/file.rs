// pattern-broker/src/source/file.rs
// ============================================================================
// Module: File Source
// Description: Tails a local bus file for newly appended JSON-line envelopes.
// Purpose: Provide a simple durable local log without a message broker
//          dependency.
// Dependencies: std::fs, std::io, serde_json
// ============================================================================

use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Seek;
use std::io::SeekFrom;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use pattern_core::EventEnvelope;

use super::Source;
use super::SourceError;

/// Tails a JSON-line bus file from a tracked byte offset.
///
/// Each [`Source::poll`] call re-opens the file, seeks to the last
/// consumed offset, and reads forward one complete line at a time. A
/// trailing partial line (the writer has not yet flushed a newline) is left
/// unconsumed and retried on the next call.
pub struct FileSource {
    /// Path of the bus file being tailed.
    path: PathBuf,
    /// Byte offset up to which this source has consumed complete lines.
    cursor: Mutex<u64>,
}

impl FileSource {
    /// Begins tailing `path` from its start.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), cursor: Mutex::new(0) }
    }

    /// Reads the next complete line starting at `offset`, if any, returning
    /// the line's text and the offset immediately past it.
    fn read_next_line(path: &Path, offset: u64) -> Result<Option<(String, u64)>, SourceError> {
        let mut file = File::open(path).map_err(|err| SourceError::Io(err.to_string()))?;
        file.seek(SeekFrom::Start(offset)).map_err(|err| SourceError::Io(err.to_string()))?;
        let mut reader = BufReader::new(file);
        let mut line = String::new();
        let read = reader.read_line(&mut line).map_err(|err| SourceError::Io(err.to_string()))?;
        if read == 0 || !line.ends_with('\n') {
            return Ok(None);
        }
        let consumed = u64::try_from(read).map_err(|_| SourceError::Io("line length overflow".to_string()))?;
        Ok(Some((line.trim_end_matches('\n').to_string(), offset + consumed)))
    }
}

impl Source for FileSource {
    fn poll(&self) -> Result<Option<EventEnvelope>, SourceError> {
        let mut cursor = self.cursor.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let Some((line, next_offset)) = Self::read_next_line(&self.path, *cursor)? else {
            return Ok(None);
        };
        let envelope = serde_json::from_str(&line).map_err(|err| SourceError::Decode(err.to_string()))?;
        *cursor = next_offset;
        Ok(Some(envelope))
    }
}
