//! # Air Hockey Physics
//!
//! Rigid-body world for a simulated air-hockey table, driven by `rapier3d`.
//!
//! ## Features
//! - Material profiles for the board, puck and paddles
//! - Collision shapes from board triangle soup and puck/paddle sizes
//! - Rigid body factory registering bodies with the world
//! - Planar constraints holding dynamic bodies on the table plane
//! - One-call table assembly via [`init`]

pub mod body;
pub mod constraint;
mod convert;
pub mod material;
pub mod shape;
pub mod table;
pub mod world;

pub use body::{BodyHandle, BodyRecord};
pub use constraint::{AxisLimit, ConstraintHandle, ConstraintRecord, PlanarLimits, YawMode};
pub use material::MaterialProfile;
pub use shape::{
    CollisionShape, PaddleShape, ShapeHandle, ShapeKind, build_board_shape, build_box_shape,
    build_disc_shape,
};
pub use table::{
    AirHockeyTable, BOARD_OFFSET, Paddle, TableLayout, build_planar_paddle, init,
    init_with_config, tray_triangles,
};
pub use world::{PhysicsConfig, PhysicsWorld};

use thiserror::Error;

/// Malformed geometry or size input
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Board point count {count} is not a multiple of 3")]
    PointCountNotMultipleOfThree { count: usize },

    #[error("Triangle mesh has no triangles")]
    EmptyMesh,

    #[error("Too many points for a triangle mesh: {count}")]
    TooManyPoints { count: usize },

    #[error("Point {index} is not finite")]
    NonFinitePoint { index: usize },

    #[error("{what} must be positive, got {value}")]
    NonPositiveSize { what: &'static str, value: f32 },

    #[error("Triangle meshes can only back static bodies")]
    MeshOnDynamicBody,
}

/// Misuse of the planar constraint builder
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstraintError {
    #[error("Body is already constrained")]
    AlreadyConstrained,

    #[error("Static bodies cannot be constrained")]
    StaticBody,

    #[error("Constraint limits must be finite")]
    NonFiniteLimit,

    #[error("Locked axes must sit at zero, got {value}")]
    OffsetLock { value: f32 },
}

/// Physics errors
#[derive(Error, Debug)]
pub enum PhysicsError {
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("World initialization failed: {0}")]
    WorldInit(String),

    #[error("Constraint error: {0}")]
    Constraint(#[from] ConstraintError),

    #[error("Invalid material {field}: {value}")]
    InvalidMaterial { field: &'static str, value: f32 },

    #[error("Body placement must be finite")]
    NonFinitePlacement,

    #[error("Unknown body handle")]
    UnknownBody,

    #[error("Unknown shape handle")]
    UnknownShape,
}

/// Result type for physics operations
pub type PhysicsResult<T> = Result<T, PhysicsError>;
