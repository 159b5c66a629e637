//! Write-Ahead Log (WAL) Module
//!
//! Provides atomicity and durability for multi-page updates.
//!
//! ## Responsibilities
//! - Stage every page image in the log before the database file sees it
//! - Make a batch visible atomically with an fsynced Commit frame
//! - Discard a batch with a Rollback frame
//! - Replay committed batches after a crash
//! - Fold committed pages back into the database file at checkpoint
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Header: page_size (3, big-endian)       │
//! ├─────────────────────────────────────────┤
//! │ Frame                                   │
//! │ ┌─────────┬──────────┬────────────────┐ │
//! │ │ Type(1) │ Page (4) │ Image          │ │
//! │ └─────────┴──────────┴────────────────┘ │
//! │   1 = Page     (image is page_size)     │
//! │   2 = Commit   (no image)               │
//! │   3 = Rollback (no image)               │
//! ├─────────────────────────────────────────┤
//! │ ... Page* Commit | Page* Rollback ...   │
//! └─────────────────────────────────────────┘
//! ```

mod frame;
mod log;
mod recovery;

pub use frame::{FrameType, FRAME_HEADER_SIZE, HEADER_SIZE};
pub use log::{wal_path, WriteAheadLog};
pub use recovery::RecoveryStats;
