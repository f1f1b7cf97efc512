//! Log File Module
//!
//! The single append-only file every write goes to.
//!
//! ## Responsibilities
//! - Frame encoding/decoding for key-value entries
//! - Appending frames and reporting their location
//! - Positioned reads of a single frame
//! - Sequential replay for recovery
//!
//! ## File Format
//! No file header, footer or magic number; frames are laid end to end.
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Frame 1                                      │
//! │ ┌──────────┬──────────┬───────┬───────────┐  │
//! │ │KeyLen (4)│ValLen (4)│  Key  │   Value   │  │
//! │ └──────────┴──────────┴───────┴───────────┘  │
//! ├──────────────────────────────────────────────┤
//! │ Frame 2 (starts at frame 1 offset + size)    │
//! │ ...                                          │
//! └──────────────────────────────────────────────┘
//! ```
//! Lengths are little-endian `u32`. There is no checksum.

mod entry;
mod reader;
mod recovery;
mod writer;

pub use entry::{Entry, FrameHeader, FRAME_HEADER_SIZE, MAX_FRAME_SIZE};
pub use reader::{read_frame_at, Frame, FrameReader};
pub use recovery::{Recovery, RecoveryReport};
pub use writer::{AppendTarget, LogWriter};
