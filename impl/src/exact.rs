//! The exact codec (component E): writes and reads a value against its own
//! schema, with no tolerance for drift between writer and reader. Used
//! when both sides are known to be running the same type definition --
//! the common case, and the fast path Testable Property 3 (`SPEC_FULL.md`
//! §8) is about.
//!
//! Struct impls are generated by `#[derive(Reflect)]`; this module only
//! supplies the primitive, array, `Vec<T>`, and `String` building blocks
//! every generated impl is built out of.

use crate::container::DynamicContainer;
use crate::error::{Error, Result};
use crate::reflect::Reflect;
use crate::stream::{read_len_prefix, write_len_prefix, SliceReader, SliceWriter, StreamReader, StreamWriter};

pub trait ExactCodec: Reflect {
    fn write_exact<W: StreamWriter + ?Sized>(&self, w: &mut W) -> Result<()>;

    fn read_exact<R: StreamReader + ?Sized>(r: &mut R) -> Result<Self>
    where
        Self: Sized;
}

macro_rules! impl_exact_primitive {
    ($ty:ty) => {
        impl ExactCodec for $ty {
            fn write_exact<W: StreamWriter + ?Sized>(&self, w: &mut W) -> Result<()> {
                w.write_bytes(&self.to_ne_bytes())
            }

            fn read_exact<R: StreamReader + ?Sized>(r: &mut R) -> Result<Self> {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                r.read_bytes(&mut buf)?;
                Ok(<$ty>::from_ne_bytes(buf))
            }
        }
    };
}

impl_exact_primitive!(u8);
impl_exact_primitive!(u16);
impl_exact_primitive!(u32);
impl_exact_primitive!(u64);
impl_exact_primitive!(i8);
impl_exact_primitive!(i16);
impl_exact_primitive!(i32);
impl_exact_primitive!(i64);
impl_exact_primitive!(f32);
impl_exact_primitive!(f64);

impl<T: ExactCodec + Reflect + 'static, const N: usize> ExactCodec for [T; N] {
    fn write_exact<W: StreamWriter + ?Sized>(&self, w: &mut W) -> Result<()> {
        if Self::schema().is_recursively_packed_at(0) {
            // SAFETY: `is_recursively_packed_at` is only true when the
            // schema compiler proved every element (transitively) has no
            // padding and owns no heap handle, so the array's raw bytes
            // are exactly its wire representation.
            let bytes = unsafe {
                std::slice::from_raw_parts(
                    (self as *const Self).cast::<u8>(),
                    std::mem::size_of::<Self>(),
                )
            };
            w.write_bytes(bytes)
        } else {
            for elem in self {
                elem.write_exact(w)?;
            }
            Ok(())
        }
    }

    fn read_exact<R: StreamReader + ?Sized>(r: &mut R) -> Result<Self> {
        if Self::schema().is_recursively_packed_at(0) {
            let mut buf = vec![0u8; std::mem::size_of::<Self>()];
            r.read_bytes(&mut buf)?;
            // SAFETY: see `write_exact`; `buf` holds exactly
            // `size_of::<Self>()` freshly-read bytes with no partially
            // initialized state left over, and every bit pattern is valid
            // for a recursively packed `[T; N]`.
            Ok(unsafe { std::ptr::read(buf.as_ptr().cast::<Self>()) })
        } else {
            let mut out = Vec::with_capacity(N);
            for _ in 0..N {
                out.push(T::read_exact(r)?);
            }
            out.try_into()
                .unwrap_or_else(|_| unreachable!("pushed exactly N elements"))
        }
    }
}

impl<T: ExactCodec + Reflect + 'static> ExactCodec for Vec<T> {
    fn write_exact<W: StreamWriter + ?Sized>(&self, w: &mut W) -> Result<()> {
        if element_is_recursively_packed::<T>() {
            let elem_size = std::mem::size_of::<T>() as u64;
            write_len_prefix(w, self.len() as u64 * elem_size)?;
            // SAFETY: the element type was proved recursively packed, so
            // the whole backing buffer is exactly its wire representation.
            let bytes = unsafe {
                std::slice::from_raw_parts(
                    self.as_ptr().cast::<u8>(),
                    std::mem::size_of_val(self.as_slice()),
                )
            };
            w.write_bytes(bytes)
        } else {
            // Non-packed elements (e.g. a struct holding its own `Vector`
            // member, or one with padding) have no fixed per-instance wire
            // size, so the length prefix can't be derived from
            // `size_of::<T>()`. Serialize into a scratch buffer first and
            // prefix with its true length -- this is what makes a `Vector`
            // of these unconditionally skippable by byte count alone.
            let mut scratch = SliceWriter::new();
            for elem in self {
                elem.write_exact(&mut scratch)?;
            }
            let bytes = scratch.into_inner();
            write_len_prefix(w, bytes.len() as u64)?;
            w.write_bytes(&bytes)
        }
    }

    fn read_exact<R: StreamReader + ?Sized>(r: &mut R) -> Result<Self> {
        let len_bytes = read_len_prefix(r)?;

        if element_is_recursively_packed::<T>() {
            let elem_size = std::mem::size_of::<T>() as u64;
            if elem_size != 0 && len_bytes % elem_size != 0 {
                return Err(Error::VectorLengthNotAligned {
                    element_size: elem_size as usize,
                    length_bytes: len_bytes,
                });
            }
            let count = if elem_size == 0 {
                0
            } else {
                (len_bytes / elem_size) as usize
            };
            let mut buf = vec![0u8; len_bytes as usize];
            r.read_bytes(&mut buf)?;
            let mut out = Vec::with_capacity(count);
            for chunk in buf.chunks_exact(elem_size.max(1) as usize) {
                // SAFETY: see `write_exact`.
                out.push(unsafe { std::ptr::read(chunk.as_ptr().cast::<T>()) });
            }
            Ok(out)
        } else {
            // Bound the recursive reads to exactly the vector's declared
            // extent, so a malformed length prefix can't make element
            // parsing run past its own vector into whatever follows.
            let mut raw = vec![0u8; len_bytes as usize];
            r.read_bytes(&mut raw)?;
            let mut inner = SliceReader::new(&raw);
            let mut out = Vec::new();
            while !inner.is_exhausted() {
                out.push(T::read_exact(&mut inner)?);
            }
            Ok(out)
        }
    }
}

impl ExactCodec for String {
    fn write_exact<W: StreamWriter + ?Sized>(&self, w: &mut W) -> Result<()> {
        write_len_prefix(w, self.len_bytes() as u64)?;
        w.write_bytes(self.segment_span())
    }

    fn read_exact<R: StreamReader + ?Sized>(r: &mut R) -> Result<Self> {
        let len_bytes = read_len_prefix(r)?;
        let mut value = String::new();
        if !value.resize(len_bytes as usize, true) {
            return Err(Error::ContainerResizeFailed {
                requested_len: len_bytes,
            });
        }
        r.read_bytes(value.segment_span_mut())?;
        std::str::from_utf8(value.as_bytes()).map_err(|_| Error::TypeMismatch)?;
        Ok(value)
    }
}

/// Whether `T`'s own schema root is eligible for the bulk-copy path -- for
/// a primitive this is trivially true; for a struct or array element it
/// means following the `Vec<T>` element descriptor's link to `T`'s
/// standalone schema and checking *its* root, since the element slot
/// itself carries no `is_recursively_packed` flag of its own.
fn element_is_recursively_packed<T: Reflect + 'static>() -> bool {
    if T::CATEGORY.is_primitive() {
        return true;
    }
    let schema = T::schema();
    schema.is_recursively_packed_at(0)
}
