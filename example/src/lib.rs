//! A small worked example of `flatpack`: a packed point type, an array of
//! points (demonstrating the whole-struct bulk-copy fast path), and a
//! schema upgrade from a two-field point to a three-field one via the
//! versioned reader.

use flatpack::exact::ExactCodec;
use flatpack::stream::{SliceReader, SliceWriter};

#[derive(flatpack_derive::Reflect, Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct Point2D {
    #[flatpack(tag = 0)]
    pub x: i32,
    #[flatpack(tag = 1)]
    pub y: i32,
}

#[derive(flatpack_derive::Reflect, Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct Point3D {
    #[flatpack(tag = 0)]
    pub x: i32,
    #[flatpack(tag = 1)]
    pub y: i32,
    #[flatpack(tag = 2)]
    pub z: i32,
}

#[derive(flatpack_derive::Reflect, Debug, Clone, PartialEq, Default)]
#[repr(C)]
pub struct Path {
    #[flatpack(tag = 0)]
    pub points: [Point2D; 4],
}

pub fn write_point2d(p: Point2D) -> flatpack::Result<Vec<u8>> {
    let mut w = SliceWriter::new();
    p.write_exact(&mut w)?;
    Ok(w.into_inner())
}

/// Read a `Point2D`-shaped stream into a `Point3D`, with `z` defaulting to
/// whatever `Point3D::default()` put there (0).
pub fn upgrade_point(bytes: &[u8]) -> flatpack::Result<Point3D> {
    let mut r = SliceReader::new(bytes);
    flatpack::versioned::read::<Point2D, Point3D, _>(&mut r, flatpack::Options::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_round_trips_exactly() {
        let p = Point2D { x: -5, y: 12 };
        let bytes = write_point2d(p).unwrap();
        let mut r = SliceReader::new(&bytes);
        assert_eq!(Point2D::read_exact(&mut r).unwrap(), p);
    }

    #[test]
    fn path_is_recursively_packed_and_round_trips() {
        assert!(Path::schema().is_recursively_packed_at(0));
        let path = Path {
            points: [
                Point2D { x: 0, y: 0 },
                Point2D { x: 1, y: 1 },
                Point2D { x: 2, y: 4 },
                Point2D { x: 3, y: 9 },
            ],
        };
        let mut w = SliceWriter::new();
        path.write_exact(&mut w).unwrap();
        let bytes = w.into_inner();
        assert_eq!(bytes.len(), std::mem::size_of::<Path>());
        let mut r = SliceReader::new(&bytes);
        assert_eq!(Path::read_exact(&mut r).unwrap(), path);
    }

    #[test]
    fn upgrading_a_point_defaults_the_new_field() {
        let bytes = write_point2d(Point2D { x: 3, y: 4 }).unwrap();
        let upgraded = upgrade_point(&bytes).unwrap();
        assert_eq!(upgraded, Point3D { x: 3, y: 4, z: 0 });
    }

    #[test]
    fn downgrading_a_point_requires_dropping_excess() {
        let mut w = SliceWriter::new();
        Point3D { x: 1, y: 2, z: 3 }.write_exact(&mut w).unwrap();
        let bytes = w.into_inner();

        let mut r = SliceReader::new(&bytes);
        let refused = flatpack::versioned::read::<Point3D, Point2D, _>(&mut r, flatpack::Options::default());
        assert!(matches!(refused, Err(flatpack::Error::ExcessNotAllowed { .. })));

        let mut r = SliceReader::new(&bytes);
        let options = flatpack::Options {
            allow_drop_excess_struct_members: true,
            ..Default::default()
        };
        let downgraded: Point2D = flatpack::versioned::read::<Point3D, Point2D, _>(&mut r, options).unwrap();
        assert_eq!(downgraded, Point2D { x: 1, y: 2 });
    }
}
