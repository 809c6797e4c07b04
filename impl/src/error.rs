use crate::category::TypeCategory;

/// Everything that can go wrong while building a schema or running one of the
/// three codecs (exact write, exact read, versioned read).
///
/// All errors are surfaced immediately: none of the codecs in this crate
/// attempt to re-synchronize a [`crate::stream::StreamReader`] after a
/// failure. On a read failure the sink object is left in whatever state the
/// last successful write left it in; discarding it is the caller's
/// responsibility.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A read or `advance` asked for more bytes than the stream had left.
    #[error("stream exhausted: needed {needed} bytes, {available} remained")]
    StreamExhausted { needed: usize, available: usize },

    /// An append to the underlying buffer failed (out of memory, or a
    /// fixed-capacity sink is already full).
    #[error("stream write failed")]
    StreamWriteFailed,

    /// A versioned read found a category pairing it refuses, e.g. a struct
    /// on one side matched against a primitive on the other.
    #[error("schema mismatch: expected {expected:?}, found {found:?}")]
    SchemaMismatch {
        expected: TypeCategory,
        found: TypeCategory,
    },

    /// A numeric conversion would lose information (float -> int, or a
    /// narrowing float-width change) and the caller did not set
    /// `allow_float_to_int_truncation`.
    #[error("numeric conversion from {from:?} to {to:?} requires allow_float_to_int_truncation")]
    NumericConversionRefused {
        from: TypeCategory,
        to: TypeCategory,
    },

    /// The sink's [`crate::container::DynamicContainer::resize`] returned
    /// `false`.
    #[error("container resize to {requested_len} bytes failed")]
    ContainerResizeFailed { requested_len: u64 },

    /// A `Vector`'s length-in-bytes prefix was not a multiple of its
    /// element size.
    #[error("vector length {length_bytes} bytes is not a multiple of element size {element_size}")]
    VectorLengthNotAligned {
        element_size: usize,
        length_bytes: u64,
    },

    /// The top-level type passed to a codec is not a struct.
    #[error("top-level type must be a struct")]
    TypeMismatch,

    /// A versioned read dropped a source struct member or array element
    /// that the sink has no room for, but the relevant `Options` flag
    /// wasn't set.
    #[error("excess {what} present in source but dropping them is not allowed")]
    ExcessNotAllowed { what: &'static str },

    /// Bridges [`StreamReader`](crate::stream::StreamReader) /
    /// [`StreamWriter`](crate::stream::StreamWriter) adapters built over a
    /// real `std::io::Read`/`Write`.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_embed_the_offending_values() {
        let err = Error::SchemaMismatch {
            expected: TypeCategory::Struct,
            found: TypeCategory::U32,
        };
        let msg = err.to_string();
        assert!(msg.contains("Struct"));
        assert!(msg.contains("U32"));
    }

    #[test]
    fn io_error_is_transparent() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk fell out of the computer");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("disk fell out of the computer"));
    }
}
