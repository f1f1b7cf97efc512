//! Log Recovery
//!
//! Rebuilds an index by replaying the log from byte 0.

use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;

use crate::error::{KvError, Result};
use crate::index::Index;

use super::reader::FrameReader;

/// Replays a log file into an index
pub struct Recovery;

/// Result of a replay or verification pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecoveryReport {
    /// Complete frames found (and indexed, for a replay)
    pub frames_recovered: u64,

    /// End offset of the last complete frame
    pub bytes_consumed: u64,

    /// Dangling bytes after the last complete frame
    pub torn_bytes: u64,

    /// Whether the log ended in a partial frame
    pub was_truncated: bool,
}

impl Recovery {
    /// Replay every complete frame of `file` into `index`
    ///
    /// A partial frame at the tail ends the replay without error; it is never
    /// indexed. Any other failure is wrapped with the offset it happened at.
    pub fn replay<I: Index + ?Sized>(file: &File, index: &I) -> Result<RecoveryReport> {
        Self::scan(file, |key, location| index.put(key, location))
    }

    /// Scan `path` and report what a replay would find, without indexing
    pub fn verify(path: &Path) -> Result<RecoveryReport> {
        let file = File::open(path)?;
        Self::scan(&file, |_, _| Ok(()))
    }

    fn scan<F>(mut file: &File, mut apply: F) -> Result<RecoveryReport>
    where
        F: FnMut(&[u8], crate::index::Location) -> Result<()>,
    {
        let len = file.metadata()?.len();
        file.seek(SeekFrom::Start(0))?;

        let mut reader = FrameReader::new(file, len);
        let mut report = RecoveryReport::default();

        loop {
            let offset = reader.consumed();
            let frame = match reader.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    return Err(KvError::Recovery {
                        offset,
                        source: Box::new(e),
                    })
                }
            };

            apply(&frame.entry.key, frame.location)?;
            report.frames_recovered += 1;
        }

        report.bytes_consumed = reader.consumed();
        report.torn_bytes = reader.torn_bytes();
        report.was_truncated = report.torn_bytes > 0;

        Ok(report)
    }
}
