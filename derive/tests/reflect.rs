//! End-to-end scenarios for `#[derive(Reflect)]`: a struct generated this
//! way should behave identically to a hand-written `Reflect`/`ExactCodec`/
//! `VersionedCodec` impl, exercised through real byte streams rather than
//! by inspecting the generated code.

use flatpack::exact::ExactCodec;
use flatpack::stream::{SliceReader, SliceWriter, StreamReader, StreamWriter};
use flatpack::{Options, Reflect};

// S1 — a flat, packed struct: every field contiguous, no padding.
#[derive(flatpack_derive::Reflect, Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
struct P {
    #[flatpack(tag = 0)]
    a: [u8; 4],
    #[flatpack(tag = 1)]
    b: f32,
    #[flatpack(tag = 2)]
    c: i64,
}

#[test]
fn s1_primitive_struct_is_packed_and_round_trips_in_one_write() {
    assert!(P::schema().is_recursively_packed_at(0));
    let p = P {
        a: [0, 1, 2, 3],
        b: 1.5,
        c: -13,
    };
    let mut w = SliceWriter::new();
    p.write_exact(&mut w).unwrap();
    assert_eq!(w.operations(), 1);
    let bytes = w.into_inner();
    assert_eq!(bytes.len(), 16);
    let mut r = SliceReader::new(&bytes);
    assert_eq!(P::read_exact(&mut r).unwrap(), p);
    assert!(r.is_exhausted());
}

// S2 — nesting two packed `P`s inside a struct that is itself packed, then
// nesting that inside one more layer, to confirm the recursively-packed
// analysis threads through more than one level.
#[derive(flatpack_derive::Reflect, Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
struct N {
    #[flatpack(tag = 0)]
    i: i16,
    #[flatpack(tag = 1)]
    ps: [P; 2],
    #[flatpack(tag = 2)]
    d: f64,
}

#[derive(flatpack_derive::Reflect, Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
struct Top {
    #[flatpack(tag = 0)]
    n: N,
}

#[test]
fn s2_nested_struct_round_trips_bitwise() {
    let top = Top {
        n: N {
            i: 244,
            ps: [
                P { a: [1, 2, 3, 4], b: 0.5, c: 1 },
                P { a: [5, 6, 7, 8], b: -0.5, c: -1 },
            ],
            d: -1.24,
        },
    };
    let mut w = SliceWriter::new();
    top.write_exact(&mut w).unwrap();
    let bytes = w.into_inner();
    let mut r = SliceReader::new(&bytes);
    assert_eq!(Top::read_exact(&mut r).unwrap(), top);
    assert!(r.is_exhausted());
}

// S3 — a dynamic vector of ints, including the empty case.
#[derive(flatpack_derive::Reflect, Debug, Clone, PartialEq, Default)]
#[repr(C)]
struct Ints {
    #[flatpack(tag = 0)]
    empty: Vec<i32>,
    #[flatpack(tag = 1)]
    v: Vec<i32>,
}

#[test]
fn s3_vector_of_ints_round_trips_with_byte_length_prefixes() {
    let value = Ints {
        empty: vec![],
        v: vec![1, 2, 3, 4],
    };
    let mut w = SliceWriter::new();
    value.write_exact(&mut w).unwrap();
    let bytes = w.into_inner();
    // u64(0) + u64(16) + 4 i32s.
    assert_eq!(bytes.len(), 8 + 8 + 16);
    let mut r = SliceReader::new(&bytes);
    assert_eq!(Ints::read_exact(&mut r).unwrap(), value);
}

#[test]
fn versioned_read_of_a_matched_primitive_vector_uses_the_bulk_read_path() {
    // Source and sink element categories are identical (`i32` both sides),
    // so the generated `read_versioned_member` should read the whole
    // element span in one `read_bytes` call rather than one per element.
    let value = Ints {
        empty: vec![],
        v: vec![1, 2, 3, 4],
    };
    let mut w = SliceWriter::new();
    value.write_exact(&mut w).unwrap();
    let bytes = w.into_inner();
    let mut r = SliceReader::new(&bytes);
    let read: Ints = flatpack::versioned::read::<Ints, Ints, _>(&mut r, Options::default()).unwrap();
    assert_eq!(read, value);
    // `empty`: one length-prefix read, no element read (nothing to read).
    // `v`: one length-prefix read plus one bulk element read, not one
    // read per element (which would add 3 more operations).
    assert_eq!(r.operations(), 3);
}

// S4 — a vector of strings (non-packed elements).
#[derive(flatpack_derive::Reflect, Debug, Clone, PartialEq, Default)]
#[repr(C)]
struct Strings {
    #[flatpack(tag = 0)]
    strings: Vec<String>,
}

#[test]
fn s4_vector_of_strings_round_trips() {
    let value = Strings {
        strings: vec!["asdasdasd1".into(), "asdasdasd2".into(), "asdasdasd3".into()],
    };
    let mut w = SliceWriter::new();
    value.write_exact(&mut w).unwrap();
    let bytes = w.into_inner();
    let mut r = SliceReader::new(&bytes);
    assert_eq!(Strings::read_exact(&mut r).unwrap(), value);
}

// S5 — struct evolution: V2 keeps only two of V1's four tags, reordered.
#[derive(flatpack_derive::Reflect, Debug, Clone, PartialEq, Default)]
#[repr(C)]
struct V1 {
    #[flatpack(tag = 0)]
    tag0: f32,
    #[flatpack(tag = 1)]
    tag1: i64,
    #[flatpack(tag = 2)]
    tag2: Vec<String>,
    #[flatpack(tag = 3)]
    tag3: i64,
}

#[derive(flatpack_derive::Reflect, Debug, Clone, PartialEq, Default)]
#[repr(C)]
struct V2 {
    #[flatpack(tag = 3)]
    tag3: i64,
    #[flatpack(tag = 0)]
    tag0: f32,
}

#[test]
fn s5_versioned_struct_evolution_matches_by_tag_not_position() {
    let v1 = V1 {
        tag0: 1.5,
        tag1: 12,
        tag2: vec!["A".into(), "B".into(), "C".into()],
        tag3: -13,
    };
    let mut w = SliceWriter::new();
    v1.write_exact(&mut w).unwrap();
    let bytes = w.into_inner();

    let mut r = SliceReader::new(&bytes);
    let refused = flatpack::versioned::read::<V1, V2, _>(&mut r, Options::default());
    assert!(matches!(refused, Err(flatpack::Error::ExcessNotAllowed { .. })));

    let mut r = SliceReader::new(&bytes);
    let options = Options {
        allow_drop_excess_struct_members: true,
        ..Default::default()
    };
    let v2: V2 = flatpack::versioned::read::<V1, V2, _>(&mut r, options).unwrap();
    assert_eq!(v2, V2 { tag3: -13, tag0: 1.5 });
    assert!(r.is_exhausted());
}

// S6 — versioned array shrink/widen: a dynamic `Vec` of one struct shape
// read into a fixed `Array` of a larger struct shape, and a dynamic
// `Vec<i32>` read into a smaller fixed `[i32; 2]`.
#[derive(flatpack_derive::Reflect, Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
struct Point2D {
    #[flatpack(tag = 0)]
    x: i32,
    #[flatpack(tag = 1)]
    y: i32,
}

#[derive(flatpack_derive::Reflect, Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
struct Point3D {
    #[flatpack(tag = 0)]
    x: i32,
    #[flatpack(tag = 1)]
    y: i32,
    #[flatpack(tag = 2)]
    z: i32,
}

#[derive(flatpack_derive::Reflect, Debug, Clone, PartialEq, Default)]
#[repr(C)]
struct WriterS6 {
    #[flatpack(tag = 0)]
    points: Vec<Point2D>,
    #[flatpack(tag = 1)]
    numbers: Vec<i32>,
}

#[derive(flatpack_derive::Reflect, Debug, Clone, PartialEq, Default)]
#[repr(C)]
struct ReaderS6 {
    #[flatpack(tag = 0)]
    points: [Point3D; 2],
    #[flatpack(tag = 1)]
    numbers: [i32; 2],
}

#[test]
fn s6_versioned_array_shrink_and_widen() {
    let writer = WriterS6 {
        points: vec![Point2D { x: 1, y: 2 }, Point2D { x: 3, y: 4 }, Point2D { x: 5, y: 6 }],
        numbers: vec![1, 2, 3],
    };
    let mut w = SliceWriter::new();
    writer.write_exact(&mut w).unwrap();
    let bytes = w.into_inner();

    let mut r = SliceReader::new(&bytes);
    let refused = flatpack::versioned::read::<WriterS6, ReaderS6, _>(&mut r, Options::default());
    assert!(matches!(refused, Err(flatpack::Error::ExcessNotAllowed { .. })));

    let mut r = SliceReader::new(&bytes);
    let options = Options {
        allow_drop_excess_array_items: true,
        ..Default::default()
    };
    let reader: ReaderS6 = flatpack::versioned::read::<WriterS6, ReaderS6, _>(&mut r, options).unwrap();
    assert_eq!(
        reader.points,
        [
            Point3D { x: 1, y: 2, z: 0 },
            Point3D { x: 3, y: 4, z: 0 },
        ]
    );
    assert_eq!(reader.numbers, [1, 2]);
}

// S7 — primitive conversion across every tag, widening and narrowing,
// float<->int gated by `allow_float_to_int_truncation`.
#[derive(flatpack_derive::Reflect, Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
struct WriterS7 {
    #[flatpack(tag = 0)]
    a: u32,
    #[flatpack(tag = 1)]
    b: f32,
    #[flatpack(tag = 2)]
    c: u16,
    #[flatpack(tag = 3)]
    d: i16,
}

#[derive(flatpack_derive::Reflect, Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
struct ReaderS7 {
    #[flatpack(tag = 0)]
    a: f32,
    #[flatpack(tag = 1)]
    b: u32,
    #[flatpack(tag = 2)]
    c: u32,
    #[flatpack(tag = 3)]
    d: u16,
}

#[test]
fn s7_primitive_conversion_matches_a_direct_numeric_cast() {
    let writer = WriterS7 { a: 1, b: 1.0, c: 1, d: 1 };
    let mut w = SliceWriter::new();
    writer.write_exact(&mut w).unwrap();
    let bytes = w.into_inner();

    let mut r = SliceReader::new(&bytes);
    let refused = flatpack::versioned::read::<WriterS7, ReaderS7, _>(&mut r, Options::default());
    assert!(matches!(refused, Err(flatpack::Error::NumericConversionRefused { .. })));

    let mut r = SliceReader::new(&bytes);
    let options = Options {
        allow_float_to_int_truncation: true,
        ..Default::default()
    };
    let reader: ReaderS7 = flatpack::versioned::read::<WriterS7, ReaderS7, _>(&mut r, options).unwrap();
    assert_eq!(reader, ReaderS7 { a: 1.0, b: 1, c: 1, d: 1 });
}

// A float<->float tag pair: narrowing (and widening) between two float
// categories must still be gated by `allow_float_to_int_truncation`, not
// waved through because both sides are floats.
#[derive(flatpack_derive::Reflect, Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
struct WriterS7Floats {
    #[flatpack(tag = 0)]
    a: f64,
}

#[derive(flatpack_derive::Reflect, Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
struct ReaderS7Floats {
    #[flatpack(tag = 0)]
    a: f32,
}

#[test]
fn s7_float_to_float_narrowing_is_still_gated_by_truncation_option() {
    let writer = WriterS7Floats { a: 1.5 };
    let mut w = SliceWriter::new();
    writer.write_exact(&mut w).unwrap();
    let bytes = w.into_inner();

    let mut r = SliceReader::new(&bytes);
    let refused = flatpack::versioned::read::<WriterS7Floats, ReaderS7Floats, _>(&mut r, Options::default());
    assert!(matches!(refused, Err(flatpack::Error::NumericConversionRefused { .. })));

    let mut r = SliceReader::new(&bytes);
    let options = Options {
        allow_float_to_int_truncation: true,
        ..Default::default()
    };
    let reader: ReaderS7Floats =
        flatpack::versioned::read::<WriterS7Floats, ReaderS7Floats, _>(&mut r, options).unwrap();
    assert_eq!(reader, ReaderS7Floats { a: 1.5 });
}

#[test]
fn stream_position_after_a_successful_read_equals_bytes_written() {
    let value = Strings {
        strings: vec!["x".into(), "yz".into()],
    };
    let mut w = SliceWriter::new();
    value.write_exact(&mut w).unwrap();
    let bytes = w.into_inner();
    let mut r = SliceReader::new(&bytes);
    Strings::read_exact(&mut r).unwrap();
    assert_eq!(r.position(), bytes.len());
}
