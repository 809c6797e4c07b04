//! The versioned reader (component H): reads a value written against one
//! schema (`Src`) into a possibly different Rust type (`Dst`), matching struct
//! members by their ordinal `#[flatpack(tag = N)]` rather than by
//! position, per `SPEC_FULL.md` §4.4.
//!
//! `Src` contributes only its schema -- no `Src` value is ever
//! materialized, which is why `versioned::read` takes `Src` purely as a
//! type parameter (`Reflect`, not `ExactCodec`). `Dst` must additionally
//! implement [`VersionedCodec`], whose `read_versioned_member` dispatch is
//! generated by `#[derive(Reflect)]` as a `match` over `Dst`'s own
//! declared tags.

use crate::category::TypeCategory;
use crate::error::{Error, Result};
use crate::reflect::Reflect;
use crate::schema::{Payload, Schema};
use crate::skip;
use crate::stream::{read_len_prefix, StreamReader};

/// Policy flags gating lossy or destructive versioned-read behavior. The
/// default is the strict/safe policy: any drift between `Src` and `Dst`
/// that would lose data is refused rather than silently accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Permit a numeric conversion where either side is a float and the
    /// other an integer (binary32/64 <-> any integer category).
    pub allow_float_to_int_truncation: bool,
    /// Permit a matched `Array`/`Vector` member where the source has more
    /// elements than the sink can hold; the excess is skipped.
    pub allow_drop_excess_array_items: bool,
    /// Permit a source struct member with no matching tag in `Dst` to be
    /// silently skipped rather than treated as an error.
    pub allow_drop_excess_struct_members: bool,
}

/// Implemented by every `#[derive(Reflect)]` struct so it can be the `Dst`
/// of a [`read`] call. `read_versioned_member` is generated as a `match`
/// over the struct's own declared `#[flatpack(tag = N)]` values; an
/// unrecognized tag is unreachable from generated code (the driver only
/// ever calls it with tags it already checked against the struct's own
/// member list -- see [`read_struct_fields`]) but the trait still returns
/// `Result` since a matched member can still fail (a category mismatch, a
/// refused numeric conversion, a malformed stream).
pub trait VersionedCodec: Reflect + Default + Sized {
    /// Attempt to consume one source member of category `src_category`
    /// whose ordinal tag is `tag`, reading from `r` and writing the
    /// decoded value into `self`'s matching field (if any). Returns
    /// `Ok(true)` if `tag` matched a field and was consumed, `Ok(false)`
    /// if `Dst` has no field with that tag (the caller must then skip it
    /// itself).
    fn read_versioned_member<R: StreamReader + ?Sized>(
        &mut self,
        tag: u32,
        src_category: TypeCategory,
        src_link: &Schema,
        src_link_index: usize,
        r: &mut R,
        options: Options,
    ) -> Result<bool>;
}

/// Read a `Dst` value from `r`, which was written by a `Src`-shaped
/// `ExactCodec::write_exact` call (or another `versioned::read` targeting
/// a type with the same on-wire shape as `Src`).
pub fn read<Src, Dst, R>(r: &mut R, options: Options) -> Result<Dst>
where
    Src: Reflect + 'static,
    Dst: VersionedCodec,
    R: StreamReader + ?Sized,
{
    let schema = Src::schema();
    match schema.root().payload {
        Payload::StructHeader { .. } => read_struct_fields::<Dst, R>(schema, 0, r, options),
        _ => Err(Error::TypeMismatch),
    }
}

/// Walk the members of the struct header at `index` in `schema`
/// (`Src`'s declaration order) and dispatch each to `Dst::read_versioned_member`.
fn read_struct_fields<Dst, R>(schema: &Schema, index: usize, r: &mut R, options: Options) -> Result<Dst>
where
    Dst: VersionedCodec,
    R: StreamReader + ?Sized,
{
    let mut dst = Dst::default();
    for member in schema.members_of(index) {
        let tag = match member.payload {
            Payload::Member { member_tag, .. } => member_tag,
            _ => unreachable!("schema.members_of only ever yields Member descriptors"),
        };
        let matched = dst.read_versioned_member(tag, member.category, schema, schema.resolve(member), r, options)?;
        if !matched {
            if !options.allow_drop_excess_struct_members {
                return Err(Error::ExcessNotAllowed {
                    what: "struct member",
                });
            }
            if member.category.is_primitive() {
                r.advance(member.size_bytes as usize)?;
            } else {
                skip::skip(r, schema, schema.resolve(member))?;
            }
        }
    }
    Ok(dst)
}

/// Read a nested struct member (both source and sink categories are
/// `Struct`) into `Dst`. Exposed for `#[derive(Reflect)]`-generated
/// `read_versioned_member` impls to call when recursing into a struct
/// field.
pub fn read_nested_struct<Dst, R>(schema: &Schema, index: usize, r: &mut R, options: Options) -> Result<Dst>
where
    Dst: VersionedCodec,
    R: StreamReader + ?Sized,
{
    read_struct_fields::<Dst, R>(schema, index, r, options)
}

/// Read a matched primitive member, converting numerically if the source
/// and sink categories differ. `Dst` is the sink's primitive Rust type.
pub fn read_primitive<Dst, R>(src_category: TypeCategory, r: &mut R, options: Options) -> Result<Dst>
where
    Dst: NumericSink,
    R: StreamReader + ?Sized,
{
    let raw = read_raw_primitive(src_category, r)?;
    let touches_float = src_category.is_float() || Dst::CATEGORY.is_float();
    if !options.allow_float_to_int_truncation && touches_float && src_category != Dst::CATEGORY {
        return Err(Error::NumericConversionRefused {
            from: src_category,
            to: Dst::CATEGORY,
        });
    }
    Ok(Dst::from_raw(raw))
}

/// Bulk fast path for a matched primitive `Array`/`Vector` member whose
/// source and sink categories are identical (`SPEC_FULL.md` §4.4): with no
/// numeric conversion to apply, the serialized bytes already are `Dst`'s
/// native representation, so the whole span is read into the sink's
/// container span with a single `read_bytes` call instead of decoding one
/// element at a time through [`read_primitive`].
pub fn read_primitive_span<Dst, R>(into: &mut [Dst], r: &mut R) -> Result<()>
where
    Dst: NumericSink,
    R: StreamReader + ?Sized,
{
    if into.is_empty() {
        return Ok(());
    }
    // SAFETY: `Dst` is one of the ten fixed-width numeric primitives
    // `NumericSink` is implemented for, none of which have padding or
    // invalid bit patterns, so reinterpreting the slice as bytes is
    // sound -- the wire format is explicitly native-order, same as every
    // other primitive read in this crate.
    let bytes =
        unsafe { std::slice::from_raw_parts_mut(into.as_mut_ptr().cast::<u8>(), std::mem::size_of_val(into)) };
    r.read_bytes(bytes)
}

/// Every possible source primitive's value, widened to a common
/// representation so a single conversion function can target any sink
/// primitive type.
#[derive(Debug, Clone, Copy)]
pub enum RawPrimitive {
    U(u64),
    I(i64),
    F(f64),
}

fn read_raw_primitive<R: StreamReader + ?Sized>(category: TypeCategory, r: &mut R) -> Result<RawPrimitive> {
    Ok(match category {
        TypeCategory::U8 => RawPrimitive::U(read_ne::<u8, _>(r)? as u64),
        TypeCategory::U16 => RawPrimitive::U(read_ne::<u16, _>(r)? as u64),
        TypeCategory::U32 => RawPrimitive::U(read_ne::<u32, _>(r)? as u64),
        TypeCategory::U64 => RawPrimitive::U(read_ne::<u64, _>(r)?),
        TypeCategory::I8 => RawPrimitive::I(read_ne::<i8, _>(r)? as i64),
        TypeCategory::I16 => RawPrimitive::I(read_ne::<i16, _>(r)? as i64),
        TypeCategory::I32 => RawPrimitive::I(read_ne::<i32, _>(r)? as i64),
        TypeCategory::I64 => RawPrimitive::I(read_ne::<i64, _>(r)?),
        TypeCategory::F32 => RawPrimitive::F(read_ne::<f32, _>(r)? as f64),
        TypeCategory::F64 => RawPrimitive::F(read_ne::<f64, _>(r)?),
        other => unreachable!("read_primitive is only called for matched primitive members, got {other:?}"),
    })
}

macro_rules! read_ne_impl {
    ($ty:ty) => {
        impl ReadNe for $ty {
            fn read_ne<R: StreamReader + ?Sized>(r: &mut R) -> Result<Self> {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                r.read_bytes(&mut buf)?;
                Ok(<$ty>::from_ne_bytes(buf))
            }
        }
    };
}

trait ReadNe: Sized {
    fn read_ne<R: StreamReader + ?Sized>(r: &mut R) -> Result<Self>;
}

read_ne_impl!(u8);
read_ne_impl!(u16);
read_ne_impl!(u32);
read_ne_impl!(u64);
read_ne_impl!(i8);
read_ne_impl!(i16);
read_ne_impl!(i32);
read_ne_impl!(i64);
read_ne_impl!(f32);
read_ne_impl!(f64);

fn read_ne<T: ReadNe, R: StreamReader + ?Sized>(r: &mut R) -> Result<T> {
    T::read_ne(r)
}

/// A primitive Rust type that can be the *sink* of a versioned numeric
/// conversion: knows its own [`TypeCategory`] and how to narrow/widen a
/// [`RawPrimitive`] into itself.
pub trait NumericSink: Sized {
    const CATEGORY: TypeCategory;
    fn from_raw(raw: RawPrimitive) -> Self;
}

macro_rules! impl_numeric_sink_int {
    ($ty:ty, $cat:ident) => {
        impl NumericSink for $ty {
            const CATEGORY: TypeCategory = TypeCategory::$cat;
            fn from_raw(raw: RawPrimitive) -> Self {
                match raw {
                    RawPrimitive::U(v) => v as $ty,
                    RawPrimitive::I(v) => v as $ty,
                    RawPrimitive::F(v) => v as $ty,
                }
            }
        }
    };
}

macro_rules! impl_numeric_sink_float {
    ($ty:ty, $cat:ident) => {
        impl NumericSink for $ty {
            const CATEGORY: TypeCategory = TypeCategory::$cat;
            fn from_raw(raw: RawPrimitive) -> Self {
                match raw {
                    RawPrimitive::U(v) => v as $ty,
                    RawPrimitive::I(v) => v as $ty,
                    RawPrimitive::F(v) => v as $ty,
                }
            }
        }
    };
}

impl_numeric_sink_int!(u8, U8);
impl_numeric_sink_int!(u16, U16);
impl_numeric_sink_int!(u32, U32);
impl_numeric_sink_int!(u64, U64);
impl_numeric_sink_int!(i8, I8);
impl_numeric_sink_int!(i16, I16);
impl_numeric_sink_int!(i32, I32);
impl_numeric_sink_int!(i64, I64);
impl_numeric_sink_float!(f32, F32);
impl_numeric_sink_float!(f64, F64);


/// Determine a matched `Array`/`Vector` member's source element count.
/// Per `SPEC_FULL.md` §4.4, a sink is matched against *either* source
/// shape identically: a schema-known `Array` source contributes nothing to
/// the stream (its length lives in the schema, read here with no `r`
/// access), while a `Vector` source's length lives in its own `u64`
/// length-in-bytes prefix, consumed here. After this call the remaining
/// stream holds exactly `count` back-to-back primitive elements either
/// way.
pub fn source_element_count<R: StreamReader + ?Sized>(
    src_category: TypeCategory,
    src_schema: &Schema,
    src_index: usize,
    elem_size: usize,
    r: &mut R,
) -> Result<u32> {
    match src_category {
        TypeCategory::Array => match src_schema.types[src_index].payload {
            Payload::ArrayHeader { length, .. } => Ok(length),
            _ => unreachable!("Array category always carries an ArrayHeader payload"),
        },
        TypeCategory::Vector => read_vector_count(elem_size, r),
        other => Err(Error::SchemaMismatch {
            expected: TypeCategory::Array,
            found: other,
        }),
    }
}

/// Read a matched `Array`/`Vector` member whose elements are themselves
/// structs, capping the number copied at `sink_cap` (pass `usize::MAX` for
/// a dynamic `Vec` sink, which has no real capacity ceiling). Handles both
/// source shapes: a schema-known `Array` (elements read back-to-back with
/// no prefix, excess skipped via [`crate::skip`]) and a length-prefixed
/// `Vector` (elements bounded to the declared byte span via a
/// [`crate::stream::SliceReader`], exactly as the exact codec's non-packed
/// `Vec<T>` path does).
pub fn read_struct_elements<Dst, R>(
    src_category: TypeCategory,
    src_schema: &Schema,
    src_index: usize,
    sink_cap: usize,
    r: &mut R,
    options: Options,
) -> Result<Vec<Dst>>
where
    Dst: VersionedCodec,
    R: StreamReader + ?Sized,
{
    let elem_info = src_schema.types[src_index + 1];
    if elem_info.category != TypeCategory::Struct {
        return Err(Error::SchemaMismatch {
            expected: TypeCategory::Struct,
            found: elem_info.category,
        });
    }
    let elem_root = src_schema.resolve(&elem_info);

    match src_category {
        TypeCategory::Array => {
            let src_length = match src_schema.types[src_index].payload {
                Payload::ArrayHeader { length, .. } => length,
                _ => unreachable!("Array category always carries an ArrayHeader payload"),
            };
            let copy_count = (src_length as usize).min(sink_cap);
            if src_length as usize > sink_cap && !options.allow_drop_excess_array_items {
                return Err(Error::ExcessNotAllowed {
                    what: "array element",
                });
            }
            let mut out = Vec::with_capacity(copy_count);
            for _ in 0..copy_count {
                out.push(read_nested_struct(src_schema, elem_root, r, options)?);
            }
            for _ in copy_count..src_length as usize {
                skip::skip(r, src_schema, elem_root)?;
            }
            Ok(out)
        }
        TypeCategory::Vector => {
            let raw = read_vector_bounded(r)?;
            let mut inner = crate::stream::SliceReader::new(&raw);
            let mut out = Vec::new();
            while !inner.is_exhausted() {
                if out.len() < sink_cap {
                    out.push(read_nested_struct(src_schema, elem_root, &mut inner, options)?);
                } else {
                    if !options.allow_drop_excess_array_items {
                        return Err(Error::ExcessNotAllowed {
                            what: "array element",
                        });
                    }
                    skip::skip(&mut inner, src_schema, elem_root)?;
                }
            }
            Ok(out)
        }
        other => Err(Error::SchemaMismatch {
            expected: TypeCategory::Array,
            found: other,
        }),
    }
}

/// Read a `Vector` member's `u64` length-in-bytes prefix and return the
/// source element count, given the element's in-memory size (only valid
/// when the source element category is a fixed-size primitive/packed
/// type -- the only shape a versioned read can size sight-unseen without
/// decoding).
pub fn read_vector_count<R: StreamReader + ?Sized>(elem_size: usize, r: &mut R) -> Result<u32> {
    let len_bytes = read_len_prefix(r)?;
    if elem_size == 0 {
        return Ok(0);
    }
    if len_bytes as usize % elem_size != 0 {
        return Err(Error::VectorLengthNotAligned {
            element_size: elem_size,
            length_bytes: len_bytes,
        });
    }
    Ok((len_bytes as usize / elem_size) as u32)
}

/// Read a `Vector` member's full byte span (length prefix plus content)
/// when its element type is not a fixed-size primitive and so can't be
/// sized by `elem_size * count` alone (e.g. a `Vector` of structs that
/// themselves contain a `Vector`). The derive macro decodes elements out
/// of this span with a bounded [`crate::stream::SliceReader`], exactly as
/// [`crate::exact`]'s non-packed `Vec<T>` path does, so a malformed
/// length prefix can't make element decoding run past the vector's own
/// declared extent.
pub fn read_vector_bounded<R: StreamReader + ?Sized>(r: &mut R) -> Result<Vec<u8>> {
    let len_bytes = read_len_prefix(r)?;
    let mut raw = vec![0u8; len_bytes as usize];
    r.read_bytes(&mut raw)?;
    Ok(raw)
}
