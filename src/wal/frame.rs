//! WAL frame definitions
//!
//! Defines the header and the three frame kinds of the log.

use bytes::{Buf, BufMut};

use crate::error::{Result, XlbError};
use crate::storage::PageId;

/// Log header: page size as 3 big-endian bytes
pub const HEADER_SIZE: usize = 3;

/// Frame header: Type (1) + Page (4)
pub const FRAME_HEADER_SIZE: usize = 5;

/// Kinds of frame that can be logged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    /// A page image follows the header
    Page = 1,

    /// Everything since the previous Commit/Rollback is durable
    Commit = 2,

    /// Everything since the previous Commit/Rollback is discarded
    Rollback = 3,
}

impl TryFrom<u8> for FrameType {
    type Error = XlbError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            1 => Ok(FrameType::Page),
            2 => Ok(FrameType::Commit),
            3 => Ok(FrameType::Rollback),
            other => Err(XlbError::WalCorruption(format!(
                "unknown frame type: {}",
                other
            ))),
        }
    }
}

pub(crate) fn encode_header(page_size: usize) -> [u8; HEADER_SIZE] {
    let size = page_size as u32;
    [(size >> 16) as u8, (size >> 8) as u8, size as u8]
}

pub(crate) fn decode_header(bytes: &[u8]) -> usize {
    ((bytes[0] as usize) << 16) | ((bytes[1] as usize) << 8) | bytes[2] as usize
}

/// Encode a frame: type + page + optional image
pub(crate) fn encode_frame(frame_type: FrameType, page: PageId, image: Option<&[u8]>) -> Vec<u8> {
    let image_len = image.map_or(0, <[u8]>::len);
    let mut buf = Vec::with_capacity(FRAME_HEADER_SIZE + image_len);
    buf.put_u8(frame_type as u8);
    buf.put_u32(page);
    if let Some(image) = image {
        buf.put_slice(image);
    }
    buf
}

/// Decode a frame header into its type and page address
pub(crate) fn decode_frame_header(mut bytes: &[u8]) -> Result<(FrameType, PageId)> {
    let frame_type = FrameType::try_from(bytes.get_u8())?;
    let page = bytes.get_u32();
    Ok((frame_type, page))
}
