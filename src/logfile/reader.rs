//! Log readers
//!
//! Sequential frame scanning for recovery, and positioned reads for lookups.

use std::fs::File;
use std::io::{self, BufReader, Read};

use crate::error::{KvError, Result};
use crate::index::Location;

use super::entry::{Entry, FrameHeader, FRAME_HEADER_SIZE, MAX_FRAME_SIZE};

/// One frame as found in the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub location: Location,
    pub entry: Entry,
}

/// Reads frames sequentially from the start of a log
///
/// The total length is fixed up front, so a frame whose header reaches past it
/// is recognised as a torn tail without reading its body. Iteration stops there;
/// [`FrameReader::torn_bytes`] reports how much was left unread.
pub struct FrameReader<R: Read> {
    reader: BufReader<R>,
    offset: u64,
    len: u64,
    torn: bool,
}

impl<R: Read> FrameReader<R> {
    /// Scan `len` bytes of `inner`, which must be positioned at byte 0
    pub fn new(inner: R, len: u64) -> Self {
        Self {
            reader: BufReader::new(inner),
            offset: 0,
            len,
            torn: false,
        }
    }

    /// Read the next complete frame
    ///
    /// Returns `Ok(None)` at a clean end or at a torn tail.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        let remaining = self.len - self.offset;
        if remaining == 0 || self.torn {
            return Ok(None);
        }
        if remaining < FRAME_HEADER_SIZE as u64 {
            self.torn = true;
            return Ok(None);
        }

        let mut header = [0u8; FRAME_HEADER_SIZE];
        self.read_exact(&mut header, FRAME_HEADER_SIZE as u64, remaining)?;
        let header = FrameHeader::parse(header);
        let frame_len = header.frame_len();

        if frame_len > remaining {
            self.torn = true;
            return Ok(None);
        }
        if frame_len > MAX_FRAME_SIZE {
            return Err(KvError::EntryTooLarge {
                key_len: header.key_len as usize,
                value_len: header.value_len as usize,
            });
        }

        let mut key = vec![0u8; header.key_len as usize];
        self.read_exact(&mut key, frame_len, remaining)?;
        let mut value = vec![0u8; header.value_len as usize];
        self.read_exact(&mut value, frame_len, remaining)?;

        let location = Location::new(self.offset, frame_len as u32);
        self.offset += frame_len;

        Ok(Some(Frame {
            location,
            entry: Entry { key, value },
        }))
    }

    /// Bytes covered by the complete frames read so far
    pub fn consumed(&self) -> u64 {
        self.offset
    }

    /// Bytes after the last complete frame, once a torn tail was hit
    pub fn torn_bytes(&self) -> u64 {
        if self.torn {
            self.len - self.offset
        } else {
            0
        }
    }

    /// A short read inside the declared length means the file shrank under us
    fn read_exact(&mut self, buf: &mut [u8], needed: u64, available: u64) -> Result<()> {
        match self.reader.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Err(KvError::CorruptFrame { needed, available })
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}

/// Read exactly the frame at `location`
///
/// A short read becomes `CorruptFrame`.
pub fn read_frame_at(file: &File, location: Location) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; location.size as usize];
    match read_exact_at(file, &mut buf, location.offset) {
        Ok(()) => Ok(buf),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(KvError::CorruptFrame {
            needed: location.size as u64,
            available: file
                .metadata()
                .map(|m| m.len().saturating_sub(location.offset))
                .unwrap_or(0),
        }),
        Err(e) => Err(e.into()),
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
            Ok(n) => {
                let rest = buf;
                buf = &mut rest[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
