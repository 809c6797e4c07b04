//! The schema compiler (component C): the work stack and dedup map the
//! `#[derive(Reflect)]`-generated code drives to assemble a flat
//! [`Schema`].
//!
//! A fresh [`SchemaCompiler`] is created once per `Reflect::schema()` call
//! (the call itself only ever runs once per type, behind a `OnceLock`).
//! Generated code first `link`s every field's own (already-built)
//! sub-schema into the compiler's accumulating table -- deduplicating by
//! `TypeId` exactly as the source spec's "work stack plus dedup map from
//! type identity to already-assigned link index" describes -- then calls
//! [`SchemaCompiler::finish_struct`] to emit the header and member slots in
//! front of the accumulated bodies.

use std::any::TypeId;
use std::collections::HashMap;

use super::{Payload, Schema, TypeInfo};
use crate::category::TypeCategory;
use crate::reflect::Reflect;

/// Compilation fails (by panicking, deterministically, the first time the
/// offending type's schema is built) once a single schema would carry more
/// descriptors than this. Guards against runaway nesting; ordinary object
/// graphs never come close.
const MAX_SCHEMA_TYPES: usize = 1 << 16;

/// One not-yet-placed struct member, built by generated code before it
/// calls [`SchemaCompiler::finish_struct`].
pub struct MemberSpec {
    pub tag: u32,
    pub offset: u32,
    pub size: u32,
    pub category: TypeCategory,
    /// Index returned by [`SchemaCompiler::link`], or `-1` for primitives.
    pub link_index: i32,
}

#[derive(Default)]
pub struct SchemaCompiler {
    pub(crate) types: Vec<TypeInfo>,
    pub(crate) vtables: Vec<crate::container::VTableEntry>,
    dedup: HashMap<TypeId, i32>,
}

impl SchemaCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T`'s own schema into this table, returning the index its
    /// root descriptor landed at. Primitives are never spliced in (they
    /// need no sub-schema) and always return `-1`. A type already linked
    /// into this table returns the index from the first registration --
    /// this is the deduplication the spec's schema compiler requires.
    pub fn link<T: Reflect + 'static>(&mut self) -> i32 {
        if T::CATEGORY.is_primitive() {
            return -1;
        }
        let tid = TypeId::of::<T>();
        if let Some(&idx) = self.dedup.get(&tid) {
            return idx;
        }
        let sub = T::schema();
        let base = self.types.len() as i32;
        assert!(
            self.types.len() + sub.types.len() <= MAX_SCHEMA_TYPES,
            "flatpack: schema type count exceeds MAX_SCHEMA_TYPES ({MAX_SCHEMA_TYPES})"
        );
        self.dedup.insert(tid, base);
        for info in &sub.types {
            let mut info = *info;
            if info.link_index >= 0 {
                info.link_index += base;
            }
            self.types.push(info);
        }
        for vt in &sub.vtables {
            let mut vt = vt.clone();
            vt.link_index += base;
            self.vtables.push(vt);
        }
        base
    }

    fn is_recursively_packed_link(&self, link_index: i32) -> bool {
        if link_index < 0 {
            return true;
        }
        let info = &self.types[link_index as usize];
        if info.category.is_primitive() {
            return true;
        }
        match info.payload {
            Payload::StructHeader {
                is_recursively_packed,
                ..
            } => is_recursively_packed,
            Payload::ArrayHeader {
                is_recursively_packed,
                ..
            } => is_recursively_packed,
            _ => false,
        }
    }

    /// Emit the struct header and member descriptors in front of every
    /// subtree already `link`ed, producing the finished [`Schema`] for a
    /// root struct type of `self_size` bytes.
    pub fn finish_struct(mut self, self_size: u32, members: Vec<MemberSpec>) -> Schema {
        let member_count = members.len() as u32;
        let shift = 1 + members.len() as i32;

        let mut types = Vec::with_capacity(1 + members.len() + self.types.len());
        types.push(TypeInfo::invalid()); // header, patched below
        for m in &members {
            types.push(TypeInfo {
                category: m.category,
                size_bytes: m.size,
                payload: Payload::Member {
                    offset_bytes: m.offset,
                    member_tag: m.tag,
                },
                link_index: if m.link_index >= 0 {
                    m.link_index + shift
                } else {
                    -1
                },
            });
        }

        let sum_of_members: u64 = members.iter().map(|m| m.size as u64).sum();
        let is_packed = sum_of_members == self_size as u64;
        let is_recursively_packed = is_packed
            && members
                .iter()
                .all(|m| self.is_recursively_packed_link(m.link_index));

        for info in &self.types {
            let mut info = *info;
            if info.link_index >= 0 {
                info.link_index += shift;
            }
            types.push(info);
        }

        types[0] = TypeInfo {
            category: TypeCategory::Struct,
            size_bytes: self_size,
            payload: Payload::StructHeader {
                is_packed,
                is_recursively_packed,
                member_count,
            },
            link_index: -1,
        };

        let vtables = self
            .vtables
            .drain(..)
            .map(|mut vt| {
                vt.link_index += shift;
                vt
            })
            .collect();

        log::debug!(
            "flatpack: compiled struct schema with {} members, {} total descriptors, packed={}, recursively_packed={}",
            member_count,
            types.len(),
            is_packed,
            is_recursively_packed
        );

        Schema { types, vtables }
    }

    /// Emit the header and element descriptor for a root `[T; N]` array
    /// schema.
    pub fn finish_array<T: Reflect + 'static>(mut self, length: u32) -> Schema {
        let elem_link = self.link::<T>();
        let elem_size = std::mem::size_of::<T>() as u32;
        let is_recursively_packed = self.is_recursively_packed_link(elem_link);
        let shift = 2i32;

        let mut types = Vec::with_capacity(2 + self.types.len());
        types.push(TypeInfo::invalid()); // header, patched below
        types.push(TypeInfo {
            category: T::CATEGORY,
            size_bytes: elem_size,
            payload: Payload::None,
            link_index: if elem_link >= 0 { elem_link + shift } else { -1 },
        });

        for info in &self.types {
            let mut info = *info;
            if info.link_index >= 0 {
                info.link_index += shift;
            }
            types.push(info);
        }

        types[0] = TypeInfo {
            category: TypeCategory::Array,
            size_bytes: length.saturating_mul(elem_size),
            payload: Payload::ArrayHeader {
                length,
                is_recursively_packed,
            },
            link_index: -1,
        };

        let vtables = self
            .vtables
            .drain(..)
            .map(|mut vt| {
                vt.link_index += shift;
                vt
            })
            .collect();

        Schema { types, vtables }
    }
}
