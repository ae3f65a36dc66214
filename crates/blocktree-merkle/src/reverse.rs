//! Reading a seekable source from its end toward its beginning.
//!
//! [`ReverseSeekReader`] starts at the end of the source and on each `read`
//! steps back by a power-of-two chunk, reads that chunk forward, and hands it
//! out with its bytes reversed. Draining the reader therefore yields the exact
//! byte-reversal of the source; [`ReverseSeekReader::read_forward`] flips it
//! back into original order.
//!
//! Chunk sizes are always `2^floor(log2(n))` where `n` is the smaller of the
//! caller's buffer and what remains before offset 0. Reads of other sizes were
//! observed to misbehave on the backing media this was written for.
//!
//! # Example
//!
//! ```
//! use std::io::{Cursor, Read};
//! use blocktree_merkle::ReverseSeekReader;
//!
//! let mut reader = ReverseSeekReader::new(Cursor::new(b"hello".to_vec())).unwrap();
//! let mut out = Vec::new();
//! reader.read_to_end(&mut out).unwrap();
//! assert_eq!(out, b"olleh");
//! ```

use std::io::{self, Read, Seek, SeekFrom};
use tracing::{debug, warn};

/// Largest power of two not exceeding `n`. Zero for zero.
pub fn floor_pow2(n: u64) -> u64 {
    if n == 0 {
        0
    } else {
        1 << (63 - n.leading_zeros())
    }
}

/// Adapter yielding a seekable source's bytes back to front.
///
/// Not safe for concurrent reads; every call moves the cursor.
#[derive(Debug)]
pub struct ReverseSeekReader<S> {
    inner: S,
    /// Absolute offset of the first byte not yet handed out.
    position: u64,
    len: u64,
    at_start: bool,
    has_read_before: bool,
}

impl<S: Read + Seek> ReverseSeekReader<S> {
    /// Wrap `inner`, positioning it at its end.
    pub fn new(mut inner: S) -> io::Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        Ok(Self {
            inner,
            position: len,
            len,
            at_start: false,
            has_read_before: false,
        })
    }

    /// Current absolute offset in the source.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Total length of the source when it was wrapped.
    pub fn source_len(&self) -> u64 {
        self.len
    }

    /// Whether the reader has consumed back to offset 0.
    pub fn is_at_start(&self) -> bool {
        self.at_start
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Drain the reader and return the remaining bytes in original forward
    /// order.
    pub fn read_forward(&mut self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.read_to_end(&mut out)?;
        out.reverse();
        Ok(out)
    }

    /// Fill `out` from the current cursor, reverse it, and step the cursor
    /// back over what was read.
    fn read_chunk(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < out.len() {
            match self.inner.read(&mut out[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        out[..filled].reverse();

        self.position = self.inner.seek(SeekFrom::Current(-(filled as i64)))?;
        Ok(filled)
    }

    /// Put the cursor back at `position` after a failed chunk so a retry
    /// resumes where the last good read ended. If that fails too the reader
    /// stops rather than skip bytes.
    fn restore_cursor(&mut self) {
        if let Err(e) = self.inner.seek(SeekFrom::Start(self.position)) {
            warn!(position = self.position, error = %e, "Failed to restore reverse cursor");
            self.at_start = true;
        }
    }

    fn chunk_size(&mut self, capacity: usize) -> u64 {
        let wanted = capacity as u64;
        let size = if self.has_read_before {
            wanted.min(self.position)
        } else {
            self.has_read_before = true;
            wanted.min(self.len)
        };
        floor_pow2(size)
    }
}

impl<S: Read + Seek> Read for ReverseSeekReader<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.at_start || buf.is_empty() {
            return Ok(0);
        }

        let chunk = self.chunk_size(buf.len());
        if chunk == 0 {
            self.at_start = true;
            return Ok(0);
        }

        let target = self.inner.seek(SeekFrom::Current(-(chunk as i64)))?;
        let filled = match self.read_chunk(&mut buf[..chunk as usize]) {
            Ok(filled) => filled,
            Err(e) => {
                self.restore_cursor();
                return Err(e);
            }
        };

        if target == 0 {
            self.at_start = true;
        }

        debug!(position = self.position, chunk = filled, "Read reverse chunk");
        Ok(filled)
    }
}
