//! Byte-range file primitive
//!
//! Exact-length blocking reads and writes at an absolute offset, plus
//! flush+fsync. Short reads are retried until the buffer is full or the
//! file ends; callers that must see every byte treat EOF as corruption.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Result, XlbError};

/// Open (creating if needed) a file for read/write without truncating it.
pub fn open_file(path: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    Ok(file)
}

/// Read into `buf` starting at `offset`, returning how many bytes were
/// read. Less than `buf.len()` only when the file ended first.
pub fn read_at_most(file: &mut File, offset: u64, buf: &mut [u8]) -> Result<usize> {
    file.seek(SeekFrom::Start(offset))?;

    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(XlbError::Io(e)),
        }
    }
    Ok(filled)
}

/// Read up to `len` bytes at `offset`; the result is shorter only at EOF.
pub fn read_at_most_vec(file: &mut File, offset: u64, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    let got = read_at_most(file, offset, &mut buf)?;
    buf.truncate(got);
    Ok(buf)
}

/// Read exactly `len` bytes at `offset`. Hitting EOF first is reported as
/// a corrupt page, with `page` identifying what was being read.
pub fn read_exact_at(file: &mut File, page: u32, offset: u64, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    let got = read_at_most(file, offset, &mut buf)?;
    if got < len {
        return Err(XlbError::corrupt(
            page,
            format!("short read at offset {}: wanted {} bytes, got {}", offset, len, got),
        ));
    }
    Ok(buf)
}

/// Write all of `data` at `offset`, optionally fsyncing afterwards.
pub fn write_at(file: &mut File, offset: u64, data: &[u8], fsync: bool) -> Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    // write_all already loops over partial writes and EINTR
    file.write_all(data)?;
    if fsync {
        flush_and_sync(file)?;
    }
    Ok(())
}

/// Flush userspace buffers and fsync the file contents.
pub fn flush_and_sync(file: &mut File) -> Result<()> {
    file.flush()?;
    file.sync_all()?;
    Ok(())
}

/// Current length of the file in bytes.
pub fn file_len(file: &File) -> Result<u64> {
    Ok(file.metadata()?.len())
}
