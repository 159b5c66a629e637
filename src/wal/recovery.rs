//! WAL Recovery
//!
//! Replays an existing log after an unclean shutdown.

use std::collections::HashMap;
use std::fs::File;

use crate::error::Result;
use crate::io;
use crate::storage::PageId;

use super::frame::{decode_frame_header, FrameType, FRAME_HEADER_SIZE, HEADER_SIZE};

/// Result of a recovery pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryStats {
    /// Number of complete frames read
    pub frames_replayed: u64,

    /// Distinct pages visible after replay
    pub pages_committed: u64,

    /// Page frames dropped (rolled back or never committed)
    pub pages_discarded: u64,

    /// Whether trailing bytes past the last Commit/Rollback were cut off
    pub was_truncated: bool,
}

/// What replay learned about the log
pub(crate) struct Replay {
    /// Page → offset of its committed image
    pub committed: HashMap<PageId, u64>,

    /// End of the last Commit/Rollback frame; everything after is garbage
    pub valid_end: u64,

    /// Page frames before `valid_end`, rolled back ones included
    pub page_frames: usize,

    pub stats: RecoveryStats,
}

/// Read frames from just after the header until EOF or a torn frame.
///
/// 1. Page frames go to the uncommitted map
/// 2. Commit folds uncommitted into committed
/// 3. Rollback empties uncommitted
/// 4. Whatever is still uncommitted at the end is discarded
pub(crate) fn replay(file: &mut File, page_size: usize) -> Result<Replay> {
    let file_len = io::file_len(file)?;

    let mut committed: HashMap<PageId, u64> = HashMap::new();
    let mut uncommitted: HashMap<PageId, u64> = HashMap::new();
    let mut stats = RecoveryStats::default();

    let mut offset = HEADER_SIZE as u64;
    let mut valid_end = offset;
    let mut page_frames = 0usize;
    let mut batch_frames = 0usize;

    loop {
        let mut header = [0u8; FRAME_HEADER_SIZE];
        let got = io::read_at_most(file, offset, &mut header)?;
        if got < FRAME_HEADER_SIZE {
            break;
        }

        let (frame_type, page) = decode_frame_header(&header)?;
        let image_start = offset + FRAME_HEADER_SIZE as u64;

        match frame_type {
            FrameType::Page => {
                let frame_end = image_start + page_size as u64;
                if frame_end > file_len {
                    // torn write of the page image
                    break;
                }
                uncommitted.insert(page, image_start);
                batch_frames += 1;
                offset = frame_end;
            }
            FrameType::Commit => {
                committed.extend(uncommitted.drain());
                page_frames += std::mem::take(&mut batch_frames);
                offset = image_start;
                valid_end = offset;
            }
            FrameType::Rollback => {
                stats.pages_discarded += uncommitted.len() as u64;
                uncommitted.clear();
                page_frames += std::mem::take(&mut batch_frames);
                offset = image_start;
                valid_end = offset;
            }
        }
        stats.frames_replayed += 1;
    }

    if !uncommitted.is_empty() {
        tracing::warn!(
            "WAL has {} uncommitted page(s), discarding them",
            uncommitted.len()
        );
        stats.pages_discarded += uncommitted.len() as u64;
    }

    stats.pages_committed = committed.len() as u64;
    stats.was_truncated = file_len > valid_end;

    Ok(Replay {
        committed,
        valid_end,
        page_frames,
        stats,
    })
}
