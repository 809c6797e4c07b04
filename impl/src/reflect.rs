//! The `Reflect` trait: the compile-time-reflection entry point (component
//! C's public face). Every type participating in the wire format --
//! primitives, fixed-size arrays, `Vec<T>`, `String`, and every
//! `#[derive(Reflect)]` struct -- implements this trait, and its `schema()`
//! is what the exact codec, versioned reader, and skipper all walk.

use std::sync::OnceLock;

use crate::category::TypeCategory;
use crate::container::VTableEntry;
use crate::schema::compiler::SchemaCompiler;
use crate::schema::Schema;

/// A type whose memory layout is described by a [`Schema`], built once and
/// cached for the remainder of the process.
///
/// Implemented directly for the ten numeric primitives, `[T; N]`, `Vec<T>`,
/// and `String` below. Structs implement it via `#[derive(Reflect)]`, which
/// generates the same shape: a `OnceLock<Schema>` populated on first access
/// by driving a fresh [`SchemaCompiler`].
pub trait Reflect {
    const CATEGORY: TypeCategory;

    /// The type's own standalone schema, rooted at index 0. Called at most
    /// once per type per process; every other call observes the cached
    /// result.
    fn schema() -> &'static Schema
    where
        Self: Sized;
}

macro_rules! impl_reflect_primitive {
    ($ty:ty, $cat:ident) => {
        impl Reflect for $ty {
            const CATEGORY: TypeCategory = TypeCategory::$cat;

            fn schema() -> &'static Schema {
                static SCHEMA: OnceLock<Schema> = OnceLock::new();
                SCHEMA.get_or_init(|| Schema {
                    types: vec![crate::schema::TypeInfo {
                        category: TypeCategory::$cat,
                        size_bytes: std::mem::size_of::<$ty>() as u32,
                        payload: crate::schema::Payload::None,
                        link_index: -1,
                    }],
                    vtables: Vec::new(),
                })
            }
        }
    };
}

impl_reflect_primitive!(u8, U8);
impl_reflect_primitive!(u16, U16);
impl_reflect_primitive!(u32, U32);
impl_reflect_primitive!(u64, U64);
impl_reflect_primitive!(i8, I8);
impl_reflect_primitive!(i16, I16);
impl_reflect_primitive!(i32, I32);
impl_reflect_primitive!(i64, I64);
impl_reflect_primitive!(f32, F32);
impl_reflect_primitive!(f64, F64);

impl<T: Reflect + 'static, const N: usize> Reflect for [T; N] {
    const CATEGORY: TypeCategory = TypeCategory::Array;

    fn schema() -> &'static Schema {
        // Each distinct `(T, N)` pair is its own monomorphization and thus
        // gets its own `static`, exactly like the primitives above.
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            let compiler = SchemaCompiler::new();
            compiler.finish_array::<T>(N as u32)
        })
    }
}

impl<T: Reflect + 'static> Reflect for Vec<T> {
    const CATEGORY: TypeCategory = TypeCategory::Vector;

    fn schema() -> &'static Schema {
        static_schema_for_vector::<T>()
    }
}

impl Reflect for String {
    const CATEGORY: TypeCategory = TypeCategory::Vector;

    fn schema() -> &'static Schema {
        static_schema_for_vector::<u8>()
    }
}

/// Shared builder for `Vec<T>`'s and `String`'s (treated as `Vec<u8>`)
/// schema: a single `Vector` header descriptor, its element descriptor, and
/// one [`VTableEntry`] recording the element size so schema introspection
/// (and tests) can find it without knowing the concrete container type.
///
/// Each monomorphization of this generic function gets its own `static`
/// (per the usual per-instantiation `static`-in-generic-fn rule), so `T =
/// u8` used via `String` and `T = u8` used via `Vec<u8>` share the exact
/// same cached schema -- which is correct, since on the wire they are
/// identical.
fn static_schema_for_vector<T: Reflect + 'static>() -> &'static Schema {
    fn build<T: Reflect + 'static>() -> Schema {
        let mut compiler = SchemaCompiler::new();
        let elem_link = compiler.link::<T>();
        let elem_size = std::mem::size_of::<T>() as u32;

        let mut types = vec![crate::schema::TypeInfo::invalid()];
        types.push(crate::schema::TypeInfo {
            category: T::CATEGORY,
            size_bytes: elem_size,
            payload: crate::schema::Payload::None,
            link_index: if elem_link >= 0 { elem_link + 2 } else { -1 },
        });
        for info in &compiler.types {
            let mut info = *info;
            if info.link_index >= 0 {
                info.link_index += 2;
            }
            types.push(info);
        }

        types[0] = crate::schema::TypeInfo {
            category: TypeCategory::Vector,
            size_bytes: std::mem::size_of::<Vec<T>>() as u32,
            payload: crate::schema::Payload::None,
            link_index: -1,
        };

        let mut vtables: Vec<VTableEntry> = compiler
            .vtables
            .iter()
            .map(|vt| {
                let mut vt = vt.clone();
                vt.link_index += 2;
                vt
            })
            .collect();
        vtables.push(VTableEntry {
            link_index: 0,
            element_size: elem_size as usize,
        });

        Schema { types, vtables }
    }

    // Distinct statics per `T` fall naturally out of generic monomorphization.
    struct Cache<T>(std::marker::PhantomData<T>);
    impl<T: Reflect + 'static> Cache<T> {
        fn get() -> &'static Schema {
            static SCHEMA: OnceLock<Schema> = OnceLock::new();
            // NB: this `OnceLock` is itself monomorphized per `T` since it
            // lives inside a generic associated function.
            SCHEMA.get_or_init(build::<T>)
        }
    }
    Cache::<T>::get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_schema_is_a_single_descriptor() {
        let schema = u32::schema();
        assert_eq!(schema.types.len(), 1);
        assert_eq!(schema.root().category, TypeCategory::U32);
        assert_eq!(schema.root().size_bytes, 4);
    }

    #[test]
    fn fixed_array_schema_reports_array_category_and_element_link() {
        let schema = <[i16; 5]>::schema();
        assert_eq!(<[i16; 5]>::CATEGORY, TypeCategory::Array);
        assert_eq!(schema.root().category, TypeCategory::Array);
        assert!(schema.is_recursively_packed_at(0));
    }

    #[test]
    fn vec_and_string_share_an_identical_vector_schema_shape() {
        let vec_schema = Vec::<u8>::schema();
        let str_schema = String::schema();
        assert_eq!(vec_schema.types.len(), str_schema.types.len());
        assert_eq!(vec_schema.root().category, TypeCategory::Vector);
        assert_eq!(str_schema.root().category, TypeCategory::Vector);
        assert_eq!(vec_schema.vtables.len(), 1);
        assert_eq!(vec_schema.vtables[0].element_size, 1);
    }

    #[test]
    fn vector_of_a_wider_primitive_records_its_element_size() {
        let schema = Vec::<u64>::schema();
        assert_eq!(schema.vtables[0].element_size, 8);
    }

    #[test]
    fn a_vector_is_never_recursively_packed() {
        // Per the wire-format invariant, a Vector's handle size coinciding
        // arithmetically with its element size must never be mistaken for
        // packedness.
        assert!(!Vec::<u32>::schema().is_recursively_packed_at(0));
    }
}
