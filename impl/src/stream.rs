//! The byte stream (component D): an append-only write cursor or a
//! read-forward cursor over a byte buffer, each counting the number of
//! logical read/write calls made against it (used by tests to assert the
//! bulk-copy optimization actually fired, per Testable Property 3 in
//! `SPEC_FULL.md` §8).

use crate::error::{Error, Result};

/// Units of a [`StreamWriter`]/[`StreamReader`]'s `Vector` length prefix:
/// always bytes, never elements. Centralized here so the exact and
/// versioned codecs can't disagree about it (see `SPEC_FULL.md` §9).
pub fn write_len_prefix<W: StreamWriter + ?Sized>(w: &mut W, len_bytes: u64) -> Result<()> {
    w.write_bytes(&len_bytes.to_ne_bytes())
}

pub fn read_len_prefix<R: StreamReader + ?Sized>(r: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    r.read_bytes(&mut buf)?;
    Ok(u64::from_ne_bytes(buf))
}

pub trait StreamWriter {
    /// Append `bytes` in one logical operation. Fails (and leaves the
    /// stream unmodified) only if the underlying sink cannot grow.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    /// Number of `write_bytes` calls made so far.
    fn operations(&self) -> u64;
}

pub trait StreamReader {
    /// Read exactly `into.len()` bytes. Fails without consuming any bytes
    /// if fewer remain.
    fn read_bytes(&mut self, into: &mut [u8]) -> Result<()>;

    /// Skip `n` bytes without copying them anywhere. Fails without
    /// consuming any bytes if fewer remain.
    fn advance(&mut self, n: usize) -> Result<()>;

    fn position(&self) -> usize;
    fn len(&self) -> usize;
    fn operations(&self) -> u64;

    fn is_exhausted(&self) -> bool {
        self.position() == self.len()
    }
}

/// A growable, in-memory [`StreamWriter`].
#[derive(Debug, Default)]
pub struct SliceWriter {
    buffer: Vec<u8>,
    operations: u64,
}

impl SliceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }
}

impl StreamWriter for SliceWriter {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(bytes);
        self.operations += 1;
        Ok(())
    }

    fn operations(&self) -> u64 {
        self.operations
    }
}

/// A borrowed, read-forward [`StreamReader`] over a byte slice.
#[derive(Debug)]
pub struct SliceReader<'a> {
    buffer: &'a [u8],
    position: usize,
    operations: u64,
}

impl<'a> SliceReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
            operations: 0,
        }
    }

    fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }
}

impl StreamReader for SliceReader<'_> {
    fn read_bytes(&mut self, into: &mut [u8]) -> Result<()> {
        if into.len() > self.remaining() {
            return Err(Error::StreamExhausted {
                needed: into.len(),
                available: self.remaining(),
            });
        }
        into.copy_from_slice(&self.buffer[self.position..self.position + into.len()]);
        self.position += into.len();
        self.operations += 1;
        Ok(())
    }

    fn advance(&mut self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(Error::StreamExhausted {
                needed: n,
                available: self.remaining(),
            });
        }
        self.position += n;
        self.operations += 1;
        Ok(())
    }

    fn position(&self) -> usize {
        self.position
    }

    fn len(&self) -> usize {
        self.buffer.len()
    }

    fn operations(&self) -> u64 {
        self.operations
    }
}

/// Adapts any `std::io::Write` into a [`StreamWriter`], for callers
/// streaming directly to a file or socket instead of building up an
/// in-memory buffer first.
pub struct IoWriter<W> {
    inner: W,
    operations: u64,
}

impl<W: std::io::Write> IoWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            operations: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: std::io::Write> StreamWriter for IoWriter<W> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.operations += 1;
        Ok(())
    }

    fn operations(&self) -> u64 {
        self.operations
    }
}

/// Adapts any `std::io::Read` into a [`StreamReader`]. Since an arbitrary
/// `io::Read` can't report its remaining length up front, `len()` always
/// equals `position()` plus whatever has been read so far (i.e. it grows
/// as data is consumed rather than being known ahead of time); this
/// matches a socket or pipe, where "end of stream" is discovered, not
/// declared.
pub struct IoReader<R> {
    inner: R,
    position: usize,
    operations: u64,
}

impl<R: std::io::Read> IoReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            position: 0,
            operations: 0,
        }
    }
}

impl<R: std::io::Read> StreamReader for IoReader<R> {
    fn read_bytes(&mut self, into: &mut [u8]) -> Result<()> {
        self.inner.read_exact(into).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::StreamExhausted {
                    needed: into.len(),
                    available: 0,
                }
            } else {
                Error::Io(e)
            }
        })?;
        self.position += into.len();
        self.operations += 1;
        Ok(())
    }

    fn advance(&mut self, n: usize) -> Result<()> {
        let mut buf = vec![0u8; n];
        self.read_bytes(&mut buf)
    }

    fn position(&self) -> usize {
        self.position
    }

    fn len(&self) -> usize {
        self.position
    }

    fn operations(&self) -> u64 {
        self.operations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_writer_counts_one_operation_per_write_bytes_call() {
        let mut w = SliceWriter::new();
        w.write_bytes(&[1, 2, 3]).unwrap();
        w.write_bytes(&[4]).unwrap();
        assert_eq!(w.operations(), 2);
        assert_eq!(w.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn slice_reader_refuses_to_read_past_the_end_without_consuming() {
        let buf = [1u8, 2, 3];
        let mut r = SliceReader::new(&buf);
        let mut out = [0u8; 4];
        let err = r.read_bytes(&mut out).unwrap_err();
        assert!(matches!(err, Error::StreamExhausted { needed: 4, available: 3 }));
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn slice_reader_advance_moves_position_without_copying() {
        let buf = [1u8, 2, 3, 4];
        let mut r = SliceReader::new(&buf);
        r.advance(2).unwrap();
        assert_eq!(r.position(), 2);
        let mut out = [0u8; 2];
        r.read_bytes(&mut out).unwrap();
        assert_eq!(out, [3, 4]);
        assert!(r.is_exhausted());
    }

    #[test]
    fn len_prefix_round_trips_through_native_order_u64() {
        let mut w = SliceWriter::new();
        write_len_prefix(&mut w, 1234).unwrap();
        let bytes = w.into_inner();
        let mut r = SliceReader::new(&bytes);
        assert_eq!(read_len_prefix(&mut r).unwrap(), 1234);
    }

    #[test]
    fn io_reader_maps_unexpected_eof_to_stream_exhausted() {
        let data: &[u8] = &[1, 2];
        let mut r = IoReader::new(data);
        let mut out = [0u8; 3];
        let err = r.read_bytes(&mut out).unwrap_err();
        assert!(matches!(err, Error::StreamExhausted { .. }));
    }

    #[test]
    fn io_writer_round_trips_through_a_vec() {
        let mut buf = Vec::new();
        {
            let mut w = IoWriter::new(&mut buf);
            w.write_bytes(&[1, 2, 3]).unwrap();
        }
        assert_eq!(buf, vec![1, 2, 3]);
    }
}
