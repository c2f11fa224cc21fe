//! Bounded view over a seekable byte source.

use std::io::{self, Read, Seek, SeekFrom};

/// A bounded, independently seekable view spanning `[start, start + len)` of
/// an underlying source.
///
/// Reads never cross the section end, and seeks are relative to the section,
/// so a decoder handed a `SectionReader` sees a self-contained stream of
/// exactly `len` bytes. The underlying cursor is repositioned on
/// construction and on every section seek; the section must have exclusive
/// use of the source while alive.
pub struct SectionReader<R> {
    inner: R,
    start: u64,
    len: u64,
    pos: u64,
}

impl<R: Read + Seek> SectionReader<R> {
    /// Create a section over `[start, start + len)` of `inner`.
    pub fn new(mut inner: R, start: u64, len: u64) -> io::Result<Self> {
        inner.seek(SeekFrom::Start(start))?;
        Ok(Self {
            inner,
            start,
            len,
            pos: 0,
        })
    }

    /// Length of the section in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the section is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<R: Read + Seek> Read for SectionReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.len - self.pos;
        if remaining == 0 {
            return Ok(0);
        }
        let take = buf.len().min(remaining as usize);
        let n = self.inner.read(&mut buf[..take])?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<R: Read + Seek> Seek for SectionReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => Some(p),
            SeekFrom::End(o) => self.len.checked_add_signed(o),
            SeekFrom::Current(o) => self.pos.checked_add_signed(o),
        };
        let target = target.filter(|t| *t <= self.len).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek outside of section bounds",
            )
        })?;
        self.inner.seek(SeekFrom::Start(self.start + target))?;
        self.pos = target;
        Ok(target)
    }
}
