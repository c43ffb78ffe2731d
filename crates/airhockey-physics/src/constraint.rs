//! Planar Constraints
//!
//! A six-degree-of-freedom joint that pins a dynamic body to the horizontal
//! plane it starts on. Each axis carries a `{lower, upper}` limit pair:
//!
//! - `lower == upper`: axis locked
//! - `lower < upper`: motion limited to `[lower, upper]`
//! - `lower > upper`: axis free

use rapier3d::prelude::{
    GenericJoint, GenericJointBuilder, ImpulseJointHandle, Isometry, JointAxesMask, JointAxis,
    Real,
};
use serde::{Deserialize, Serialize};

use crate::convert::from_vector;
use crate::world::PhysicsWorld;
use crate::{BodyHandle, ConstraintError, PhysicsError, PhysicsResult};

/// Debug-draw size given to every planar constraint
pub const DEFAULT_DEBUG_DRAW_SIZE: f32 = 5.0;

/// Stable index of a constraint inside a [`PhysicsWorld`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintHandle(pub(crate) usize);

impl ConstraintHandle {
    /// Get the raw index
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Limit pair for one axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisLimit {
    pub lower: f32,
    pub upper: f32,
}

impl AxisLimit {
    /// Axis pinned at zero
    pub const LOCKED: Self = Self { lower: 0.0, upper: 0.0 };
    /// Axis without limits
    pub const FREE: Self = Self { lower: 1.0, upper: 0.0 };

    /// Axis limited to `[lower, upper]`
    pub fn range(lower: f32, upper: f32) -> Self {
        Self { lower, upper }
    }

    pub fn is_locked(&self) -> bool {
        self.lower == self.upper
    }

    pub fn is_free(&self) -> bool {
        self.lower > self.upper
    }

    pub fn is_limited(&self) -> bool {
        self.lower < self.upper
    }
}

/// Whether paddles and the puck may spin about the vertical axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YawMode {
    /// All rotation locked
    #[default]
    Locked,
    /// Rotation about the vertical axis left free
    Free,
}

impl std::str::FromStr for YawMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "locked" | "lock" => Ok(Self::Locked),
            "free" => Ok(Self::Free),
            other => Err(format!("unknown yaw mode '{}'", other)),
        }
    }
}

/// Per-axis limits of a six-DOF constraint, indexed `[x, y, z]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarLimits {
    pub linear: [AxisLimit; 3],
    pub angular: [AxisLimit; 3],
}

impl PlanarLimits {
    /// Free on X/Z, locked on Y, tilt locked; yaw per `yaw`.
    pub fn xz_plane(yaw: YawMode) -> Self {
        let yaw_limit = match yaw {
            YawMode::Locked => AxisLimit::LOCKED,
            YawMode::Free => AxisLimit::FREE,
        };
        Self {
            linear: [AxisLimit::FREE, AxisLimit::LOCKED, AxisLimit::FREE],
            angular: [AxisLimit::LOCKED, yaw_limit, AxisLimit::LOCKED],
        }
    }

    /// Mask of the axes whose limits lock them
    pub fn locked_axes(&self) -> JointAxesMask {
        const LINEAR: [JointAxesMask; 3] =
            [JointAxesMask::LIN_X, JointAxesMask::LIN_Y, JointAxesMask::LIN_Z];
        const ANGULAR: [JointAxesMask; 3] =
            [JointAxesMask::ANG_X, JointAxesMask::ANG_Y, JointAxesMask::ANG_Z];

        let mut mask = JointAxesMask::empty();
        for (limits, bits) in [(&self.linear, LINEAR), (&self.angular, ANGULAR)] {
            for (limit, bit) in limits.iter().zip(bits) {
                if limit.is_locked() {
                    mask |= bit;
                }
            }
        }
        mask
    }

    fn validate(&self) -> Result<(), ConstraintError> {
        let all = self.linear.iter().chain(self.angular.iter());
        for limit in all {
            if !limit.lower.is_finite() || !limit.upper.is_finite() {
                return Err(ConstraintError::NonFiniteLimit);
            }
            // Locks hold the axis where the anchor sits; move the body instead.
            if limit.is_locked() && limit.lower != 0.0 {
                return Err(ConstraintError::OffsetLock { value: limit.lower });
            }
        }
        Ok(())
    }

    /// Joint from the world anchor to a body whose placement is `frame`.
    ///
    /// Frame 1 is the body's full placement, so locked axes hold both its
    /// starting height and its starting orientation.
    fn to_joint(self, frame: Isometry<Real>) -> GenericJoint {
        const LINEAR: [JointAxis; 3] = [JointAxis::LinX, JointAxis::LinY, JointAxis::LinZ];
        const ANGULAR: [JointAxis; 3] = [JointAxis::AngX, JointAxis::AngY, JointAxis::AngZ];

        let mut builder = GenericJointBuilder::new(self.locked_axes())
            .local_frame1(frame)
            .local_frame2(Isometry::identity());

        for (limits, axes) in [(&self.linear, LINEAR), (&self.angular, ANGULAR)] {
            for (limit, axis) in limits.iter().zip(axes) {
                if limit.is_limited() {
                    builder = builder.limits(axis, [limit.lower, limit.upper]);
                }
            }
        }
        builder.build()
    }
}

/// Bookkeeping for a constraint the world owns
#[derive(Debug, Clone)]
pub struct ConstraintRecord {
    pub(crate) joint: ImpulseJointHandle,
    pub(crate) body: BodyHandle,
    /// Height of the plane the body is held on
    pub plane_height: f32,
    pub limits: PlanarLimits,
    /// Size used by debug renderers
    pub debug_draw_size: f32,
}

impl ConstraintRecord {
    /// The constrained body
    pub fn body(&self) -> BodyHandle {
        self.body
    }
}

impl PhysicsWorld {
    /// Pin `body` to the horizontal plane through its current position.
    ///
    /// Yaw follows the world's [`YawMode`].
    pub fn lock_to_plane(&mut self, body: BodyHandle) -> PhysicsResult<ConstraintHandle> {
        let limits = PlanarLimits::xz_plane(self.config().yaw);
        self.constrain(body, limits)
    }

    /// Attach a six-DOF constraint with explicit limits, anchored at the
    /// body's local origin and current orientation.
    pub fn constrain(
        &mut self,
        body: BodyHandle,
        limits: PlanarLimits,
    ) -> PhysicsResult<ConstraintHandle> {
        let record = self.bodies.get(body.0).ok_or(PhysicsError::UnknownBody)?;
        if record.constraint.is_some() {
            return Err(ConstraintError::AlreadyConstrained.into());
        }
        if record.material.is_static() {
            return Err(ConstraintError::StaticBody.into());
        }
        limits.validate()?;

        let rigid_body = record.rigid_body;
        let frame = *self.rigid_body(body)?.position();
        let anchor = from_vector(&frame.translation.vector);
        let joint = self
            .impulse_joint_set
            .insert(self.anchor, rigid_body, limits.to_joint(frame), true);

        let handle = ConstraintHandle(self.constraints.len());
        let debug_draw_size = self.config().constraint_debug_size;
        self.constraints.push(ConstraintRecord {
            joint,
            body,
            plane_height: anchor.y,
            limits,
            debug_draw_size,
        });
        if let Some(record) = self.bodies.get_mut(body.0) {
            record.constraint = Some(handle);
        }

        log::debug!(
            "Constraint {} holds body {} on plane y={} (locked axes {:?})",
            handle.0,
            body.0,
            anchor.y,
            limits.locked_axes()
        );
        Ok(handle)
    }

    /// Look up a constraint record
    pub fn constraint(&self, handle: ConstraintHandle) -> Option<&ConstraintRecord> {
        self.constraints.get(handle.0)
    }

    /// Constraint holding `body`, if any
    pub fn constraint_of(&self, body: BodyHandle) -> PhysicsResult<Option<&ConstraintRecord>> {
        let record = self.bodies.get(body.0).ok_or(PhysicsError::UnknownBody)?;
        Ok(record.constraint.and_then(|c| self.constraints.get(c.0)))
    }

    /// Number of constraints the world owns
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::build_disc_shape;
    use crate::{MaterialProfile, PhysicsConfig};
    use glam::{Quat, Vec3};

    fn world_with_puck(position: Vec3, orientation: Quat) -> (PhysicsWorld, BodyHandle) {
        let mut world = PhysicsWorld::new(PhysicsConfig::default()).unwrap();
        let shape = world.add_shape(build_disc_shape(0.5).unwrap());
        let body = world
            .build_body(shape, MaterialProfile::PUCK, position, orientation)
            .unwrap();
        (world, body)
    }

    #[test]
    fn test_axis_limit_sentinels() {
        assert!(AxisLimit::LOCKED.is_locked());
        assert!(AxisLimit::FREE.is_free());
        assert!(AxisLimit::range(-1.0, 1.0).is_limited());
        assert!(!AxisLimit::FREE.is_locked());
    }

    #[test]
    fn test_xz_plane_limits() {
        let limits = PlanarLimits::xz_plane(YawMode::Locked);
        assert!(limits.linear[0].is_free());
        assert!(limits.linear[1].is_locked());
        assert!(limits.linear[2].is_free());
        assert!(limits.angular.iter().all(AxisLimit::is_locked));
        assert_eq!(
            limits.locked_axes(),
            JointAxesMask::LIN_Y
                | JointAxesMask::ANG_X
                | JointAxesMask::ANG_Y
                | JointAxesMask::ANG_Z
        );
    }

    #[test]
    fn test_free_yaw() {
        let limits = PlanarLimits::xz_plane(YawMode::Free);
        assert!(limits.angular[1].is_free());
        assert!(!limits.locked_axes().contains(JointAxesMask::ANG_Y));
        assert!(limits.locked_axes().contains(JointAxesMask::ANG_X | JointAxesMask::ANG_Z));
    }

    #[test]
    fn test_yaw_mode_parse() {
        assert_eq!("free".parse::<YawMode>(), Ok(YawMode::Free));
        assert_eq!("Locked".parse::<YawMode>(), Ok(YawMode::Locked));
        assert!("spin".parse::<YawMode>().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_limits() {
        let mut limits = PlanarLimits::xz_plane(YawMode::Locked);
        limits.linear[0] = AxisLimit::range(f32::NAN, 1.0);
        assert_eq!(limits.validate(), Err(ConstraintError::NonFiniteLimit));

        let mut limits = PlanarLimits::xz_plane(YawMode::Locked);
        limits.linear[1] = AxisLimit::range(0.5, 0.5);
        assert_eq!(limits.validate(), Err(ConstraintError::OffsetLock { value: 0.5 }));
    }

    #[test]
    fn test_lock_keeps_starting_orientation() {
        let start = Quat::from_rotation_y(1.0);
        let (mut world, puck) = world_with_puck(Vec3::new(1.0, 0.5, -2.0), start);
        world.lock_to_plane(puck).unwrap();

        for _ in 0..60 {
            world.step(1.0 / 60.0);
        }

        let rotation = world.rotation(puck).unwrap();
        assert!(rotation.angle_between(start) < 1e-2, "{rotation:?}");
        let position = world.translation(puck).unwrap();
        assert!((position.y - 0.5).abs() < 1e-3, "{position:?}");
    }

    #[test]
    fn test_plane_height_recorded() {
        let (mut world, puck) = world_with_puck(Vec3::new(0.0, 0.25, 0.0), Quat::IDENTITY);
        let handle = world.lock_to_plane(puck).unwrap();

        let record = world.constraint(handle).unwrap();
        assert_eq!(record.body(), puck);
        assert_eq!(record.plane_height, 0.25);
        assert_eq!(record.debug_draw_size, DEFAULT_DEBUG_DRAW_SIZE);
        assert_eq!(world.body(puck).unwrap().constraint(), Some(handle));
    }

    #[test]
    fn test_unknown_body() {
        let (mut world, _) = world_with_puck(Vec3::ZERO, Quat::IDENTITY);
        let stray = BodyHandle(7);

        assert!(matches!(world.lock_to_plane(stray), Err(PhysicsError::UnknownBody)));
        assert!(matches!(world.constraint_of(stray), Err(PhysicsError::UnknownBody)));
        assert_eq!(world.constraint_count(), 0);
    }
}
