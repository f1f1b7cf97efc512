//! Log writer
//!
//! Owns the append-only handle and the next write offset.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::error::{KvError, Result};
use crate::index::Location;

/// Append-only storage a [`LogWriter`] writes through
///
/// Implemented for [`File`]; every write must land at the current end.
pub trait AppendTarget: Write {
    /// Current length, which is where the next append lands
    fn end_offset(&self) -> io::Result<u64>;

    /// Cut the target back to `len` bytes
    fn set_len(&mut self, len: u64) -> io::Result<()>;

    /// Force written bytes to durable storage
    fn sync(&mut self) -> io::Result<()>;
}

impl AppendTarget for File {
    fn end_offset(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn set_len(&mut self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

/// Appends frames to the end of the log
pub struct LogWriter<F: AppendTarget = File> {
    file: F,
    offset: u64,
}

impl LogWriter<File> {
    /// Open or create `path` for appending
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Self::new(file)
    }
}

impl<F: AppendTarget> LogWriter<F> {
    /// Wrap `target`; the next write offset starts at its current end
    pub fn new(target: F) -> Result<Self> {
        let offset = target.end_offset()?;
        Ok(Self { file: target, offset })
    }

    /// Append one encoded frame and return where it landed
    ///
    /// A failed write may still have put part of the frame on disk, so the
    /// offset is re-read from the target before the error is returned.
    pub fn append(&mut self, frame: &[u8]) -> Result<Location> {
        let size = u32::try_from(frame.len()).map_err(|_| KvError::EntryTooLarge {
            key_len: 0,
            value_len: frame.len(),
        })?;

        let location = Location::new(self.offset, size);
        if let Err(e) = self.file.write_all(frame) {
            self.offset = self.file.end_offset()?;
            return Err(e.into());
        }
        self.offset += frame.len() as u64;
        Ok(location)
    }

    /// Cut the file back to `len` bytes and continue writing from there
    pub fn truncate(&mut self, len: u64) -> Result<()> {
        self.file.set_len(len)?;
        self.offset = len;
        Ok(())
    }

    /// Force appended bytes to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync()?;
        Ok(())
    }

    /// Offset the next frame will be written at
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The underlying target
    pub fn get_ref(&self) -> &F {
        &self.file
    }

    pub fn get_mut(&mut self) -> &mut F {
        &mut self.file
    }
}
