//! The container vtable table (component B): the Rust rendering of the
//! source spec's function-pointer vtable keyed by schema link index,
//! generalized here as a plain trait (`DynamicContainer`) plus one
//! function-pointer record per distinct container type actually reachable
//! from a schema (`VTableEntry`), matching §3.3 / §4.4 of `SPEC_FULL.md`.

/// Implemented by dynamic (heap-owned) container types whose content is
/// always a flat byte buffer regardless of what it logically holds --
/// `String` is the one shipped here. `Vec<T>`'s own resize/truncate and
/// bulk-copy decisions live directly in `ExactCodec for Vec<T>`
/// (`crate::exact`) instead, since that impl must work for both primitive
/// and structured element types and a single `DynamicContainer` impl
/// bounded to plain-old-data elements couldn't cover the structured case.
///
/// `resize` must leave every element in a constructed, valid state.
/// `resize_uninitialized` may skip initialization and is only sound when
/// the caller immediately overwrites every byte of the returned span --
/// used exclusively by the primitive bulk-read fast path in
/// [`crate::exact`] and [`crate::versioned`].
pub trait DynamicContainer {
    /// The element type's size in bytes, used to convert a byte-length
    /// wire prefix into an element count.
    const ELEMENT_SIZE: usize;

    fn len_bytes(&self) -> usize;

    /// Grow or shrink to exactly `len_bytes` bytes of element storage,
    /// constructing new elements as needed. `drop_excess` controls
    /// whether shrinking below the current length is permitted; for the
    /// containers this crate ships (`Vec`, `String`), shrinking always
    /// succeeds and `drop_excess` is accepted but not required.
    fn resize(&mut self, len_bytes: usize, drop_excess: bool) -> bool;

    /// As `resize`, but when growing, the newly added bytes are left
    /// uninitialized-but-for-the-type's-validity (for primitive numeric
    /// elements, zero-filled -- Rust gives us no real uninitialized
    /// growth path for `Vec<T>` without `unsafe` `set_len` games, so this
    /// default just defers to `resize`; it exists so callers can ask for
    /// the fast path without every container needing to special-case it).
    fn resize_uninitialized(&mut self, len_bytes: usize, drop_excess: bool) -> bool {
        self.resize(len_bytes, drop_excess)
    }

    fn segment_span(&self) -> &[u8];
    fn segment_span_mut(&mut self) -> &mut [u8];
}

impl DynamicContainer for String {
    const ELEMENT_SIZE: usize = 1;

    fn len_bytes(&self) -> usize {
        self.len()
    }

    fn resize(&mut self, len_bytes: usize, drop_excess: bool) -> bool {
        if len_bytes <= self.len() {
            if drop_excess || len_bytes == self.len() {
                self.truncate(len_bytes);
                true
            } else {
                false
            }
        } else {
            self.as_mut_vec().resize(len_bytes, 0);
            true
        }
    }

    fn segment_span(&self) -> &[u8] {
        self.as_bytes()
    }

    fn segment_span_mut(&mut self) -> &mut [u8] {
        // SAFETY: the only writers of this span are the exact/versioned
        // codecs, which only ever copy in bytes read back out of a
        // `String` that was itself written by this crate (UTF-8
        // preserving). A `String` round-tripped through this path that
        // did not originate as valid UTF-8 on the wire is a caller error,
        // exactly as `str::from_utf8_unchecked` document.
        unsafe { self.as_mut_vec() }
    }
}

// `Vec<T>` has no `DynamicContainer` impl: `ExactCodec for Vec<T>`
// (`crate::exact`) is generic over any element type, primitive or
// structured, and its own bulk-copy fast path already decides per-call
// whether the element type is recursively packed -- a `DynamicContainer`
// impl bounded to plain-old-data elements would only ever cover a subset
// of that, and nothing calls it. `String` is the one container type this
// crate's codecs actually reach through `DynamicContainer` for (its
// content is always a flat byte buffer, never itself recursively
// structured), which is why it's the only impl above.

/// One container vtable entry, bound to a schema link index (the index of
/// the `Vector` header descriptor it serves). `resize`/`span` are not
/// literal function pointers here (the descriptor's own Rust type already
/// carries its `DynamicContainer` impl at the call site in `exact` and
/// `versioned`); this record exists so the flat descriptor table can
/// still answer "does this link index have a live container" the way the
/// source spec's table of vtables does, which the schema introspection
/// API (and tests asserting container counts) rely on.
#[derive(Debug, Clone)]
pub struct VTableEntry {
    pub link_index: i32,
    pub element_size: usize,
}
