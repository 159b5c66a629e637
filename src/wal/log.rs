//! Write-ahead log handle
//!
//! Appends page images, marks batches committed or rolled back, serves
//! staged pages back to readers and hands committed pages to checkpoint.

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::error::{Result, XlbError};
use crate::io;
use crate::storage::PageId;

use super::frame::{decode_header, encode_frame, encode_header, FrameType, FRAME_HEADER_SIZE, HEADER_SIZE};
use super::recovery::{replay, RecoveryStats};

/// Path of the log that belongs to a database file: `{db}.xdb.wal`
pub fn wal_path(db_path: &Path) -> PathBuf {
    let mut name = db_path.as_os_str().to_os_string();
    name.push(".xdb.wal");
    PathBuf::from(name)
}

/// An open write-ahead log
pub struct WriteAheadLog {
    path: PathBuf,
    file: File,
    page_size: usize,

    /// Page → image offset, visible to every reader
    committed: HashMap<PageId, u64>,

    /// Page → image offset, staged by the open transaction
    uncommitted: HashMap<PageId, u64>,

    /// Where the next appended frame goes
    end: u64,

    /// End of the last Commit/Rollback frame
    committed_end: u64,

    /// Page frames appended since the log was last emptied
    page_frames: usize,

    /// Set when this open replayed an existing log
    recovery: Option<RecoveryStats>,
}

impl WriteAheadLog {
    /// Open the log for a database, creating it if missing.
    ///
    /// A non-empty log means the store was not closed cleanly: its
    /// committed frames are replayed and the uncommitted tail is cut off.
    pub fn open(db_path: &Path, page_size: usize) -> Result<Self> {
        let path = wal_path(db_path);
        let mut file = io::open_file(&path)?;
        let len = io::file_len(&file)?;

        if len == 0 {
            io::write_at(&mut file, 0, &encode_header(page_size), true)?;
            return Ok(Self {
                path,
                file,
                page_size,
                committed: HashMap::new(),
                uncommitted: HashMap::new(),
                end: HEADER_SIZE as u64,
                committed_end: HEADER_SIZE as u64,
                page_frames: 0,
                recovery: None,
            });
        }

        tracing::warn!(
            "Found an existing WAL at {:?}, the database was not closed properly",
            path
        );

        let header = io::read_at_most_vec(&mut file, 0, HEADER_SIZE)?;
        if header.len() < HEADER_SIZE {
            return Err(XlbError::WalCorruption(format!(
                "WAL header is {} bytes, expected {}",
                header.len(),
                HEADER_SIZE
            )));
        }
        let logged_page_size = decode_header(&header);
        if logged_page_size != page_size {
            return Err(XlbError::WalCorruption(format!(
                "WAL page size {} does not match database page size {}",
                logged_page_size, page_size
            )));
        }

        let replayed = replay(&mut file, page_size)?;
        if replayed.stats.was_truncated {
            file.set_len(replayed.valid_end)?;
            io::flush_and_sync(&mut file)?;
        }

        tracing::info!(
            frames = replayed.stats.frames_replayed,
            pages_committed = replayed.stats.pages_committed,
            pages_discarded = replayed.stats.pages_discarded,
            truncated = replayed.stats.was_truncated,
            "WAL recovery complete"
        );

        Ok(Self {
            path,
            file,
            page_size,
            committed: replayed.committed,
            uncommitted: HashMap::new(),
            end: replayed.valid_end,
            committed_end: replayed.valid_end,
            page_frames: replayed.page_frames,
            recovery: Some(replayed.stats),
        })
    }

    /// Page size recorded in an existing, non-empty log for `db_path`
    pub fn logged_page_size(db_path: &Path) -> Result<Option<usize>> {
        let path = wal_path(db_path);
        if !path.exists() {
            return Ok(None);
        }
        let mut file = File::open(&path)?;
        let header = io::read_at_most_vec(&mut file, 0, HEADER_SIZE)?;
        if header.len() < HEADER_SIZE {
            return Ok(None);
        }
        Ok(Some(decode_header(&header)))
    }

    // =========================================================================
    // Frames
    // =========================================================================

    /// Stage a page image in the current batch.
    ///
    /// A page already staged in this batch is overwritten in place; any
    /// other page is appended. Page frames are not fsynced, the Commit
    /// frame is.
    pub fn set_page(&mut self, page: PageId, image: &[u8]) -> Result<()> {
        if image.len() != self.page_size {
            return Err(XlbError::PageLength {
                expected: self.page_size,
                actual: image.len(),
            });
        }

        let frame = encode_frame(FrameType::Page, page, Some(image));
        match self.uncommitted.get(&page) {
            Some(&image_start) => {
                let frame_start = image_start - FRAME_HEADER_SIZE as u64;
                io::write_at(&mut self.file, frame_start, &frame, false)?;
            }
            None => {
                let frame_start = self.end;
                io::write_at(&mut self.file, frame_start, &frame, false)?;
                self.end += frame.len() as u64;
                self.page_frames += 1;
                self.uncommitted
                    .insert(page, frame_start + FRAME_HEADER_SIZE as u64);
            }
        }
        Ok(())
    }

    /// Make the current batch durable. No-op when nothing is staged.
    pub fn commit(&mut self) -> Result<()> {
        if self.uncommitted.is_empty() {
            return Ok(());
        }
        self.append_marker(FrameType::Commit)?;
        self.committed.extend(self.uncommitted.drain());
        Ok(())
    }

    /// Discard the current batch. No-op when nothing is staged.
    pub fn rollback(&mut self) -> Result<()> {
        if self.uncommitted.is_empty() {
            return Ok(());
        }
        self.append_marker(FrameType::Rollback)?;
        self.uncommitted.clear();
        Ok(())
    }

    fn append_marker(&mut self, frame_type: FrameType) -> Result<()> {
        let frame = encode_frame(frame_type, 0, None);
        io::write_at(&mut self.file, self.end, &frame, true)?;
        self.end += frame.len() as u64;
        self.committed_end = self.end;
        Ok(())
    }

    /// Latest image of a page: staged first, then committed
    pub fn get_page(&mut self, page: PageId) -> Result<Option<Vec<u8>>> {
        let image_start = match self.uncommitted.get(&page) {
            Some(&start) => start,
            None => match self.committed.get(&page) {
                Some(&start) => start,
                None => return Ok(None),
            },
        };
        let image = io::read_exact_at(&mut self.file, page, image_start, self.page_size)?;
        Ok(Some(image))
    }

    // =========================================================================
    // Checkpoint
    // =========================================================================

    /// Hand every committed page image to `apply`, in page order.
    ///
    /// Staged frames are discarded with a warning first. The log itself
    /// is left untouched: call [`reset`](Self::reset) or
    /// [`remove`](Self::remove) once the pages are durable elsewhere.
    pub fn checkpoint<F>(&mut self, mut apply: F) -> Result<usize>
    where
        F: FnMut(PageId, &[u8]) -> Result<()>,
    {
        if !self.uncommitted.is_empty() {
            tracing::warn!(
                "Checkpoint with {} uncommitted page(s), discarding them",
                self.uncommitted.len()
            );
            self.page_frames -= self.uncommitted.len();
            self.uncommitted.clear();
            self.file.set_len(self.committed_end)?;
            self.end = self.committed_end;
        }

        io::flush_and_sync(&mut self.file)?;

        let mut pages: Vec<(PageId, u64)> =
            self.committed.iter().map(|(&p, &o)| (p, o)).collect();
        pages.sort_unstable();

        for (page, image_start) in &pages {
            let image = io::read_exact_at(&mut self.file, *page, *image_start, self.page_size)?;
            apply(*page, &image)?;
        }
        Ok(pages.len())
    }

    /// Empty the log back to a bare header
    pub fn reset(&mut self) -> Result<()> {
        self.file.set_len(HEADER_SIZE as u64)?;
        io::flush_and_sync(&mut self.file)?;
        self.committed.clear();
        self.uncommitted.clear();
        self.end = HEADER_SIZE as u64;
        self.committed_end = HEADER_SIZE as u64;
        self.page_frames = 0;
        Ok(())
    }

    /// Delete the log file
    pub fn remove(self) -> Result<()> {
        let Self { path, file, .. } = self;
        drop(file);
        fs::remove_file(&path)?;
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Number of pages with a committed image
    pub fn committed_pages(&self) -> usize {
        self.committed.len()
    }

    /// Page frames in the log, including superseded and rolled back ones
    pub fn page_frames(&self) -> usize {
        self.page_frames
    }

    /// Whether `page` has a committed image
    pub fn has_committed(&self, page: PageId) -> bool {
        self.committed.contains_key(&page)
    }

    pub fn has_uncommitted(&self) -> bool {
        !self.uncommitted.is_empty()
    }

    /// Highest page address with a committed image
    pub fn max_committed_page(&self) -> Option<PageId> {
        self.committed.keys().copied().max()
    }

    /// Stats of the replay done at open, if there was one
    pub fn recovery(&self) -> Option<&RecoveryStats> {
        self.recovery.as_ref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size of the log in bytes
    pub fn len_bytes(&self) -> u64 {
        self.end
    }
}
