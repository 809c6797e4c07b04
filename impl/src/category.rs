/// The kind of value a [`crate::schema::TypeInfo`] describes.
///
/// Mirrors the ten fixed-width numeric primitives plus the three
/// structural shapes (`Struct`, `Array`, `Vector`) that a schema can be
/// built from. `Invalid` only ever appears in a placeholder slot while a
/// [`crate::schema::compiler::SchemaCompiler`] is still assembling a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCategory {
    Invalid,
    Struct,
    Array,
    Vector,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl TypeCategory {
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            TypeCategory::U8
                | TypeCategory::U16
                | TypeCategory::U32
                | TypeCategory::U64
                | TypeCategory::I8
                | TypeCategory::I16
                | TypeCategory::I32
                | TypeCategory::I64
                | TypeCategory::F32
                | TypeCategory::F64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, TypeCategory::F32 | TypeCategory::F64)
    }

    pub fn is_signed_int(self) -> bool {
        matches!(
            self,
            TypeCategory::I8 | TypeCategory::I16 | TypeCategory::I32 | TypeCategory::I64
        )
    }

    pub fn is_unsigned_int(self) -> bool {
        matches!(
            self,
            TypeCategory::U8 | TypeCategory::U16 | TypeCategory::U32 | TypeCategory::U64
        )
    }

    /// Size in bytes of this primitive category, or `None` for the
    /// structural categories.
    pub fn primitive_size(self) -> Option<u16> {
        Some(match self {
            TypeCategory::U8 | TypeCategory::I8 => 1,
            TypeCategory::U16 | TypeCategory::I16 => 2,
            TypeCategory::U32 | TypeCategory::I32 | TypeCategory::F32 => 4,
            TypeCategory::U64 | TypeCategory::I64 | TypeCategory::F64 => 8,
            _ => return None,
        })
    }
}
