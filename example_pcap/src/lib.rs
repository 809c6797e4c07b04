//! A toy capture-file format built on `flatpack`: a fixed `Header` record
//! followed by a stream of `Frame` records, each carrying a variable-length
//! payload. Demonstrates `Vector` framing (a `Vec<u8>` payload with its own
//! length-in-bytes prefix) end to end, grounded in the same shape the
//! teacher's own pcap-reading example used (`Header` + repeated `Packet`
//! records with a byte payload), but over `flatpack`'s codec instead of a
//! hand-rolled `read_from`.

use flatpack::exact::ExactCodec;
use flatpack::stream::{SliceReader, SliceWriter, StreamReader};

#[derive(flatpack_derive::Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct Header {
    #[flatpack(tag = 0)]
    pub magic: u32,
    #[flatpack(tag = 1)]
    pub version_major: u16,
    #[flatpack(tag = 2)]
    pub version_minor: u16,
    #[flatpack(tag = 3)]
    pub datalink: u32,
}

pub const MAGIC: u32 = 0xa1b2_c3d4;

#[derive(flatpack_derive::Reflect, Debug, Clone, PartialEq, Eq, Default)]
#[repr(C)]
pub struct Frame {
    #[flatpack(tag = 0)]
    pub ts_sec: u32,
    #[flatpack(tag = 1)]
    pub ts_usec: u32,
    #[flatpack(tag = 2)]
    pub orig_len: u32,
    #[flatpack(tag = 3)]
    pub data: Vec<u8>,
}

/// Write a whole capture (header plus every frame) into an in-memory
/// buffer.
pub fn write_capture(header: &Header, frames: &[Frame]) -> flatpack::Result<Vec<u8>> {
    let mut w = SliceWriter::new();
    header.write_exact(&mut w)?;
    for frame in frames {
        frame.write_exact(&mut w)?;
    }
    Ok(w.into_inner())
}

/// Read a header followed by every remaining frame out of `bytes`, failing
/// if the header's magic doesn't match [`MAGIC`].
pub fn read_capture(bytes: &[u8]) -> flatpack::Result<(Header, Vec<Frame>)> {
    let mut r = SliceReader::new(bytes);
    let header = Header::read_exact(&mut r)?;
    if header.magic != MAGIC {
        return Err(flatpack::Error::TypeMismatch);
    }
    let mut frames = Vec::new();
    while !r.is_exhausted() {
        frames.push(Frame::read_exact(&mut r)?);
    }
    Ok((header, frames))
}
