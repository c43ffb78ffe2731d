//! Collision Shapes
//!
//! Converts table geometry into engine collision shapes. Shapes carry no
//! mass or material; several bodies may reference the same shape.

use glam::Vec3;
use rapier3d::prelude::SharedShape;
use serde::{Deserialize, Serialize};

use crate::convert::to_point;
use crate::GeometryError;

/// Half-height shared by the disc and box primitives
pub const SHAPE_HALF_HEIGHT: f32 = 0.1;

/// Stable index of a shape inside a [`PhysicsWorld`](crate::PhysicsWorld)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeHandle(pub(crate) usize);

impl ShapeHandle {
    /// Get the raw index
    pub fn index(&self) -> usize {
        self.0
    }
}

/// What a collision shape was built from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeKind {
    /// Exact per-triangle mesh, static bodies only
    TriangleMesh { triangles: usize },
    /// Flat Y-aligned cylinder
    Disc { radius: f32, half_height: f32 },
    /// Axis-aligned box
    Box { half_extents: Vec3 },
}

impl ShapeKind {
    /// Whether a dynamic body may use this shape
    pub fn supports_dynamic(&self) -> bool {
        !matches!(self, Self::TriangleMesh { .. })
    }
}

/// Collision geometry handed to the engine
#[derive(Clone)]
pub struct CollisionShape {
    kind: ShapeKind,
    shape: SharedShape,
}

impl CollisionShape {
    /// Get the shape description
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    /// Number of triangles, zero for primitives
    pub fn triangle_count(&self) -> usize {
        match self.kind {
            ShapeKind::TriangleMesh { triangles } => triangles,
            _ => 0,
        }
    }

    pub(crate) fn shared(&self) -> &SharedShape {
        &self.shape
    }
}

impl std::fmt::Debug for CollisionShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionShape").field("kind", &self.kind).finish()
    }
}

/// Build the board's triangle mesh from a flat point list.
///
/// Every three consecutive points form one triangle `(v0, v1, v2)`.
pub fn build_board_shape(points: &[Vec3]) -> Result<CollisionShape, GeometryError> {
    let count = points.len();
    if count % 3 != 0 {
        return Err(GeometryError::PointCountNotMultipleOfThree { count });
    }
    if count == 0 {
        return Err(GeometryError::EmptyMesh);
    }
    if let Some(index) = points.iter().position(|p| !p.is_finite()) {
        return Err(GeometryError::NonFinitePoint { index });
    }
    let last = u32::try_from(count - 1).map_err(|_| GeometryError::TooManyPoints { count })?;

    let vertices = points.iter().copied().map(to_point).collect();
    let indices = (0..=last).step_by(3).map(|i| [i, i + 1, i + 2]).collect();
    let triangles = count / 3;

    log::debug!("Board mesh: {} points, {} triangles", count, triangles);

    Ok(CollisionShape {
        kind: ShapeKind::TriangleMesh { triangles },
        shape: SharedShape::trimesh(vertices, indices),
    })
}

/// Build a flat cylinder of the given radius.
pub fn build_disc_shape(radius: f32) -> Result<CollisionShape, GeometryError> {
    check_size("disc radius", radius)?;
    Ok(CollisionShape {
        kind: ShapeKind::Disc {
            radius,
            half_height: SHAPE_HALF_HEIGHT,
        },
        shape: SharedShape::cylinder(SHAPE_HALF_HEIGHT, radius),
    })
}

/// Build a box with half-extents `(half_extent_x, 0.1, half_extent_x)`.
pub fn build_box_shape(half_extent_x: f32) -> Result<CollisionShape, GeometryError> {
    check_size("box half-extent", half_extent_x)?;
    let half_extents = Vec3::new(half_extent_x, SHAPE_HALF_HEIGHT, half_extent_x);
    Ok(CollisionShape {
        kind: ShapeKind::Box { half_extents },
        shape: SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z),
    })
}

fn check_size(what: &'static str, value: f32) -> Result<(), GeometryError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GeometryError::NonPositiveSize { what, value })
    }
}

/// Collision primitive used for the paddles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaddleShape {
    /// Square paddle
    #[default]
    Box,
    /// Round paddle
    Disc,
}

impl PaddleShape {
    /// Build this primitive sized from the paddle's planar size
    pub fn build(&self, size: f32) -> Result<CollisionShape, GeometryError> {
        match self {
            Self::Box => build_box_shape(size),
            Self::Disc => build_disc_shape(size),
        }
    }
}

impl std::str::FromStr for PaddleShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "box" | "square" => Ok(Self::Box),
            "disc" | "circle" => Ok(Self::Disc),
            other => Err(format!("unknown paddle shape '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Vec<Vec3> {
        vec![
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(-1.0, 0.0, 1.0),
        ]
    }

    #[test]
    fn test_board_triangle_count() {
        let shape = build_board_shape(&quad()).unwrap();
        assert_eq!(shape.triangle_count(), 2);
        assert!(!shape.kind().supports_dynamic());

        let trimesh = shape.shared().as_trimesh().unwrap();
        assert_eq!(trimesh.indices().len(), 2);
    }

    #[test]
    fn test_board_rejects_partial_triangles() {
        for count in [1, 2, 4, 5, 7] {
            let points = vec![Vec3::ZERO; count];
            assert_eq!(
                build_board_shape(&points).unwrap_err(),
                GeometryError::PointCountNotMultipleOfThree { count }
            );
        }
    }

    #[test]
    fn test_board_rejects_empty_and_nan() {
        assert_eq!(build_board_shape(&[]).unwrap_err(), GeometryError::EmptyMesh);

        let mut points = quad();
        points[4].y = f32::NAN;
        assert_eq!(
            build_board_shape(&points).unwrap_err(),
            GeometryError::NonFinitePoint { index: 4 }
        );
    }

    #[test]
    fn test_primitives() {
        let disc = build_disc_shape(0.5).unwrap();
        assert_eq!(
            disc.kind(),
            ShapeKind::Disc { radius: 0.5, half_height: SHAPE_HALF_HEIGHT }
        );
        let cylinder = disc.shared().as_cylinder().unwrap();
        assert_eq!(cylinder.radius, 0.5);
        assert_eq!(cylinder.half_height, SHAPE_HALF_HEIGHT);

        let cube = build_box_shape(2.0).unwrap();
        assert_eq!(
            cube.kind(),
            ShapeKind::Box { half_extents: Vec3::new(2.0, SHAPE_HALF_HEIGHT, 2.0) }
        );
        assert!(cube.kind().supports_dynamic());
    }

    #[test]
    fn test_primitives_reject_bad_sizes() {
        assert!(matches!(
            build_disc_shape(0.0),
            Err(GeometryError::NonPositiveSize { what: "disc radius", .. })
        ));
        assert!(build_box_shape(-1.0).is_err());
        assert!(build_box_shape(f32::INFINITY).is_err());
    }

    #[test]
    fn test_paddle_shape_selection() {
        assert_eq!(PaddleShape::default(), PaddleShape::Box);
        assert_eq!("circle".parse::<PaddleShape>(), Ok(PaddleShape::Disc));
        assert!("triangle".parse::<PaddleShape>().is_err());
        assert!(matches!(
            PaddleShape::Disc.build(1.0).unwrap().kind(),
            ShapeKind::Disc { .. }
        ));
    }
}
