//! Material Profiles
//!
//! Per-entity physical constants. A profile is plain data: it is read once
//! when a body is built and never changes while that body lives.

use serde::{Deserialize, Serialize};

use crate::{PhysicsError, PhysicsResult};

/// Mass, friction and restitution of one simulated entity.
///
/// A mass of `0.0` marks the body as immovable (static).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialProfile {
    /// Mass in kilograms, `0.0` for static bodies
    pub mass: f32,
    /// Coulomb friction coefficient of the body's surfaces
    pub friction: f32,
    /// Bounciness, `0.0` absorbs all energy and `1.0` keeps it
    pub restitution: f32,
}

impl MaterialProfile {
    /// The puck: light, moderately grippy, bouncy.
    pub const PUCK: Self = Self {
        mass: 5.0,
        friction: 0.5,
        restitution: 0.8,
    };

    /// A player paddle: heavy and nearly frictionless.
    pub const PADDLE: Self = Self {
        mass: 15.0,
        friction: 0.05,
        restitution: 0.8,
    };

    /// The table surface and rails.
    pub const BOARD: Self = Self {
        mass: 0.0,
        friction: 0.5,
        restitution: 0.8,
    };

    /// Create a custom profile
    pub fn new(mass: f32, friction: f32, restitution: f32) -> Self {
        Self {
            mass,
            friction,
            restitution,
        }
    }

    /// Whether bodies with this profile are immovable
    pub fn is_static(&self) -> bool {
        self.mass == 0.0
    }

    /// Reject non-finite or negative constants.
    pub fn validate(&self) -> PhysicsResult<()> {
        for (field, value) in [
            ("mass", self.mass),
            ("friction", self.friction),
            ("restitution", self.restitution),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PhysicsError::InvalidMaterial { field, value });
            }
        }
        Ok(())
    }
}

impl Default for MaterialProfile {
    fn default() -> Self {
        Self::PUCK
    }
}
