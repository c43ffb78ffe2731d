//! Table Assembly
//!
//! Builds the complete table world in one call: infrastructure, then the
//! board, the puck and both paddles. All input is validated and every shape
//! is built before the world exists, so a bad layout never leaves a
//! half-populated world behind.

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::shape::{CollisionShape, build_board_shape, build_disc_shape};
use crate::{
    BodyHandle, GeometryError, MaterialProfile, PhysicsConfig, PhysicsResult, PhysicsWorld,
};

/// Where the board body sits, slightly below the table plane
pub const BOARD_OFFSET: Vec3 = Vec3::new(0.0, -0.1, 0.0);

/// Geometry and placement of everything on the table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableLayout {
    /// Width, rail height and depth of the board
    pub board_size: Vec3,
    /// Planar size of the puck, `x` is its radius
    pub puck_size: Vec2,
    /// Planar size of paddle 1, `x` is its radius or half-extent
    pub paddle1_size: Vec2,
    /// Planar size of paddle 2, `x` is its radius or half-extent
    pub paddle2_size: Vec2,
    /// Reported for renderers; the board body always sits at [`BOARD_OFFSET`]
    pub board_center: Vec3,
    pub puck_center: Vec3,
    pub paddle1_center: Vec3,
    pub paddle2_center: Vec3,
    /// Board triangles, three points per triangle
    pub board_points: Vec<Vec3>,
    /// Puck outline for renderers, not used for collision
    #[serde(default)]
    pub puck_points: Vec<Vec3>,
    /// Paddle outline for renderers, not used for collision
    #[serde(default)]
    pub paddle_points: Vec<Vec3>,
}

impl TableLayout {
    /// A 6 x 12 table with 0.5 high rails, the puck at center court and a
    /// paddle in front of each goal.
    pub fn standard() -> Self {
        let board_size = Vec3::new(6.0, 0.5, 12.0);
        Self {
            board_size,
            puck_size: Vec2::splat(0.3),
            paddle1_size: Vec2::splat(0.4),
            paddle2_size: Vec2::splat(0.4),
            board_center: Vec3::ZERO,
            puck_center: Vec3::ZERO,
            paddle1_center: Vec3::new(0.0, 0.0, -4.0),
            paddle2_center: Vec3::new(0.0, 0.0, 4.0),
            board_points: tray_triangles(board_size),
            puck_points: Vec::new(),
            paddle_points: Vec::new(),
        }
    }

    fn check_centers(&self) -> Result<(), GeometryError> {
        let centers = [
            self.board_center,
            self.puck_center,
            self.paddle1_center,
            self.paddle2_center,
        ];
        match centers.iter().position(|c| !c.is_finite()) {
            Some(index) => Err(GeometryError::NonFinitePoint { index }),
            None => Ok(()),
        }
    }
}

impl Default for TableLayout {
    fn default() -> Self {
        Self::standard()
    }
}

/// Floor plus four rails of a board of the given size, as triangle soup.
pub fn tray_triangles(size: Vec3) -> Vec<Vec3> {
    let (hx, h, hz) = (size.x * 0.5, size.y, size.z * 0.5);
    let quad = |a: Vec3, b: Vec3, c: Vec3, d: Vec3| [a, b, c, a, c, d];

    let floor = quad(
        Vec3::new(-hx, 0.0, -hz),
        Vec3::new(-hx, 0.0, hz),
        Vec3::new(hx, 0.0, hz),
        Vec3::new(hx, 0.0, -hz),
    );
    let mut points = floor.to_vec();
    if h > 0.0 {
        let corners = [
            Vec3::new(-hx, 0.0, -hz),
            Vec3::new(hx, 0.0, -hz),
            Vec3::new(hx, 0.0, hz),
            Vec3::new(-hx, 0.0, hz),
        ];
        for i in 0..4 {
            let a = corners[i];
            let b = corners[(i + 1) % 4];
            let up = Vec3::Y * h;
            points.extend(quad(a, b, b + up, a + up));
        }
    }
    points
}

/// Which paddle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Paddle {
    One,
    Two,
}

impl Paddle {
    pub const ALL: [Paddle; 2] = [Paddle::One, Paddle::Two];

    fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }
}

/// The assembled table: the world plus handles to its bodies
pub struct AirHockeyTable {
    world: PhysicsWorld,
    board: BodyHandle,
    puck: BodyHandle,
    paddles: [BodyHandle; 2],
}

impl AirHockeyTable {
    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.world
    }

    pub fn board(&self) -> BodyHandle {
        self.board
    }

    pub fn puck(&self) -> BodyHandle {
        self.puck
    }

    pub fn paddle(&self, paddle: Paddle) -> BodyHandle {
        self.paddles[paddle.index()]
    }

    /// Triangles in the board's collision mesh
    pub fn board_triangle_count(&self) -> usize {
        self.world
            .body(self.board)
            .and_then(|record| self.world.shape(record.shape()))
            .map_or(0, CollisionShape::triangle_count)
    }

    /// Step the simulation by `dt` seconds
    pub fn step(&mut self, dt: f32) {
        self.world.step(dt);
    }

    /// Put the puck and paddles back on their starting spots
    pub fn reset(&mut self) {
        self.world.reset();
    }
}

/// Build the table with the default [`PhysicsConfig`].
pub fn init(layout: &TableLayout) -> PhysicsResult<AirHockeyTable> {
    init_with_config(layout, PhysicsConfig::default())
}

/// Build the table.
///
/// Fails with a geometry error before touching any world when the board
/// point count is not a multiple of three or a size is not positive.
pub fn init_with_config(
    layout: &TableLayout,
    config: PhysicsConfig,
) -> PhysicsResult<AirHockeyTable> {
    let board_shape = build_board_shape(&layout.board_points)?;
    let puck_shape = build_disc_shape(layout.puck_size.x)?;
    let paddle1_shape = config.paddle_shape.build(layout.paddle1_size.x)?;
    let paddle2_shape = config.paddle_shape.build(layout.paddle2_size.x)?;
    layout.check_centers()?;

    log::debug!(
        "Layout: {} board points, {} puck outline points, {} paddle outline points",
        layout.board_points.len(),
        layout.puck_points.len(),
        layout.paddle_points.len()
    );

    let mut world = PhysicsWorld::new(config)?;

    let board_shape = world.add_shape(board_shape);
    let board = world.build_body(
        board_shape,
        MaterialProfile::BOARD,
        BOARD_OFFSET,
        Quat::IDENTITY,
    )?;

    let puck = build_planar_body(
        &mut world,
        puck_shape,
        MaterialProfile::PUCK,
        layout.puck_center,
    )?;
    let paddle1 = build_planar_paddle(&mut world, paddle1_shape, layout.paddle1_center)?;
    let paddle2 = build_planar_paddle(&mut world, paddle2_shape, layout.paddle2_center)?;

    log::info!(
        "Table ready: {} board triangles, {} bodies, {} constraints",
        layout.board_points.len() / 3,
        world.body_count(),
        world.constraint_count()
    );

    Ok(AirHockeyTable {
        world,
        board,
        puck,
        paddles: [paddle1, paddle2],
    })
}

/// A paddle: dynamic body with the paddle material, held on the table plane.
pub fn build_planar_paddle(
    world: &mut PhysicsWorld,
    shape: CollisionShape,
    center: Vec3,
) -> PhysicsResult<BodyHandle> {
    build_planar_body(world, shape, MaterialProfile::PADDLE, center)
}

fn build_planar_body(
    world: &mut PhysicsWorld,
    shape: CollisionShape,
    material: MaterialProfile,
    center: Vec3,
) -> PhysicsResult<BodyHandle> {
    let shape = world.add_shape(shape);
    let body = world.build_body(shape, material, center, Quat::IDENTITY)?;
    world.lock_to_plane(body)?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PaddleShape, PhysicsError, ShapeKind};

    #[test]
    fn test_standard_layout() {
        let layout = TableLayout::standard();
        assert_eq!(layout.board_points.len() % 3, 0);
        assert_eq!(layout.board_points.len(), 30);

        let table = init(&layout).unwrap();
        assert_eq!(table.board_triangle_count(), 10);
        assert_eq!(table.world().body_count(), 4);
        assert_eq!(table.world().constraint_count(), 3);
    }

    #[test]
    fn test_flat_tray_has_no_rails() {
        assert_eq!(tray_triangles(Vec3::new(2.0, 0.0, 2.0)).len(), 6);
    }

    #[test]
    fn test_paddle_shape_option() {
        let config = PhysicsConfig {
            paddle_shape: PaddleShape::Disc,
            ..Default::default()
        };
        let table = init_with_config(&TableLayout::standard(), config).unwrap();
        for paddle in Paddle::ALL {
            let record = table.world().body(table.paddle(paddle)).unwrap();
            let shape = table.world().shape(record.shape()).unwrap();
            assert!(matches!(shape.kind(), ShapeKind::Disc { radius, .. } if radius == 0.4));
        }
    }

    #[test]
    fn test_bad_sizes_fail() {
        let mut layout = TableLayout::standard();
        layout.paddle2_size = Vec2::new(0.0, 1.0);
        assert!(matches!(
            init(&layout),
            Err(PhysicsError::Geometry(GeometryError::NonPositiveSize { .. }))
        ));

        let mut layout = TableLayout::standard();
        layout.puck_center = Vec3::new(f32::NAN, 0.0, 0.0);
        assert!(matches!(
            init(&layout),
            Err(PhysicsError::Geometry(GeometryError::NonFinitePoint { index: 1 }))
        ));
    }

    #[test]
    fn test_layout_from_json() {
        let json = r#"{
            "board_size": [2.0, 0.0, 2.0],
            "puck_size": [1.0, 1.0],
            "paddle1_size": [2.0, 2.0],
            "paddle2_size": [2.0, 2.0],
            "board_center": [0.0, 0.0, 0.0],
            "puck_center": [0.0, 0.0, 0.0],
            "paddle1_center": [0.0, 0.0, -3.0],
            "paddle2_center": [0.0, 0.0, 3.0],
            "board_points": [
                [-1.0, 0.0, -1.0], [1.0, 0.0, -1.0], [1.0, 0.0, 1.0],
                [-1.0, 0.0, -1.0], [1.0, 0.0, 1.0], [-1.0, 0.0, 1.0]
            ]
        }"#;
        let layout: TableLayout = serde_json::from_str(json).unwrap();
        assert!(layout.puck_points.is_empty());
        assert_eq!(layout.paddle1_center, Vec3::new(0.0, 0.0, -3.0));
        assert_eq!(init(&layout).unwrap().board_triangle_count(), 2);
    }
}
