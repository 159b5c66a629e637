//! Meta page (page 0)
//!
//! ```text
//! ┌──────────┬─────────┬──────────────┬─────────────┬───────────────┐
//! │ Root (4) │ Ord (1) │ PageSize (3) │ KeySize (2) │ ValueSize (4) │
//! └──────────┴─────────┴──────────────┴─────────────┴───────────────┘
//! ```
//! All big-endian, zero padded to the page size.

use bytes::{Buf, BufMut};

use crate::config::TreeConf;
use crate::error::{Result, XlbError};
use crate::storage::PageId;

/// Bytes of the meta page that carry data
pub const META_SIZE: usize = 14;

/// Tree configuration and root address, persisted in page 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meta {
    pub root: PageId,
    pub conf: TreeConf,
}

impl Meta {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.conf.page_size);
        buf.put_u32(self.root);
        buf.put_u8(self.conf.order as u8);
        let page_size = self.conf.page_size as u32;
        buf.put_u8((page_size >> 16) as u8);
        buf.put_u16(page_size as u16);
        buf.put_u16(self.conf.key_size as u16);
        buf.put_u32(self.conf.value_size as u32);
        buf.resize(self.conf.page_size, 0);
        buf
    }

    /// Decode the meta fields from the start of page 0
    pub fn decode(raw: &[u8]) -> Result<Self> {
        if raw.len() < META_SIZE {
            return Err(XlbError::corrupt(
                0,
                format!("meta page is {} bytes, need {}", raw.len(), META_SIZE),
            ));
        }
        let mut buf = &raw[..META_SIZE];
        let root = buf.get_u32();
        let order = buf.get_u8() as usize;
        let page_size = ((buf.get_u8() as usize) << 16) | buf.get_u16() as usize;
        let key_size = buf.get_u16() as usize;
        let value_size = buf.get_u32() as usize;

        if root == 0 || page_size == 0 {
            return Err(XlbError::corrupt(0, "meta page has zero root or page size"));
        }

        Ok(Self {
            root,
            conf: TreeConf {
                order,
                page_size,
                key_size,
                value_size,
            },
        })
    }
}
