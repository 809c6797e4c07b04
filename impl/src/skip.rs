//! The skipper (component G): advances a [`StreamReader`] past a value
//! whose schema is known but whose content is not needed -- a struct
//! member present in the source schema but absent from the destination
//! type, per `SPEC_FULL.md` §4.3/§4.5.
//!
//! The skipper never allocates a typed value; it only ever reads raw
//! bytes and discards them, or (for a `Vector`) reads the `u64`
//! length-in-bytes prefix and advances that many bytes in one call, since
//! a vector's serialized content is always a self-contained, byte-bounded
//! span regardless of its element type (see [`crate::exact`]'s `Vec<T>`
//! impl, which guarantees this by construction).

use crate::error::Result;
use crate::schema::{Payload, Schema};
use crate::stream::{read_len_prefix, StreamReader};

/// Skip the value described by `schema.types[index]`.
pub fn skip<R: StreamReader + ?Sized>(r: &mut R, schema: &Schema, index: usize) -> Result<()> {
    let info = &schema.types[index];

    if info.category.is_primitive() || schema.is_recursively_packed_at(index) {
        return r.advance(info.size_bytes as usize);
    }

    match info.category {
        crate::category::TypeCategory::Vector => {
            let len_bytes = read_len_prefix(r)?;
            r.advance(len_bytes as usize)
        }
        crate::category::TypeCategory::Array => match info.payload {
            Payload::ArrayHeader { length, .. } => {
                let elem = schema.types[index + 1];
                for _ in 0..length {
                    skip_slot(r, schema, &elem)?;
                }
                Ok(())
            }
            _ => r.advance(info.size_bytes as usize),
        },
        crate::category::TypeCategory::Struct => {
            for member in schema.members_of(index) {
                skip_slot(r, schema, member)?;
            }
            Ok(())
        }
        _ => r.advance(info.size_bytes as usize),
    }
}

/// Skip one member/element slot described by `info`, which may be a
/// primitive (no sub-schema to recurse into -- its size is already
/// everything needed) or a structural type (resolved via its `link_index`
/// into the same flat table `schema` already carries it in).
fn skip_slot<R: StreamReader + ?Sized>(r: &mut R, schema: &Schema, info: &crate::schema::TypeInfo) -> Result<()> {
    if info.category.is_primitive() {
        return r.advance(info.size_bytes as usize);
    }
    skip(r, schema, schema.resolve(info))
}
