//! Physics World
//!
//! Owns the engine pipeline together with every shape, body and constraint
//! built for the table. Bodies and constraints refer to each other and to
//! shapes through stable indices; the world tears them down in reverse
//! build order when dropped.

use glam::{Quat, Vec3};
use rapier3d::prelude::{
    CCDSolver, ColliderSet, DefaultBroadPhase, ImpulseJointSet, IntegrationParameters,
    IslandManager, MultibodyJointSet, NarrowPhase, PhysicsPipeline, QueryPipeline, Real,
    RigidBody, RigidBodyBuilder, RigidBodyHandle, RigidBodySet, Vector,
};
use serde::{Deserialize, Serialize};

use crate::body::BodyRecord;
use crate::constraint::{ConstraintRecord, DEFAULT_DEBUG_DRAW_SIZE, YawMode};
use crate::convert::{from_rotation, from_vector, to_isometry, to_vector};
use crate::shape::{CollisionShape, PaddleShape, ShapeHandle};
use crate::{BodyHandle, MaterialProfile, PhysicsError, PhysicsResult};

/// Physics world configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Global gravity
    pub gravity: Vec3,
    /// Fixed simulation step in seconds
    pub timestep: f32,
    /// Maximum number of fixed steps per [`PhysicsWorld::advance`] call
    pub max_substeps: u32,
    /// Rotation policy for planar-constrained bodies
    pub yaw: YawMode,
    /// Collision primitive for the paddles
    pub paddle_shape: PaddleShape,
    /// Debug-draw size recorded on each constraint
    pub constraint_debug_size: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -10.0, 0.0),
            timestep: 1.0 / 60.0,
            max_substeps: 8,
            yaw: YawMode::Locked,
            paddle_shape: PaddleShape::Box,
            constraint_debug_size: DEFAULT_DEBUG_DRAW_SIZE,
        }
    }
}

impl PhysicsConfig {
    /// Check that the world can be built from this configuration
    pub fn validate(&self) -> PhysicsResult<()> {
        if !self.gravity.is_finite() {
            return Err(PhysicsError::WorldInit(format!(
                "gravity must be finite, got {}",
                self.gravity
            )));
        }
        if !self.timestep.is_finite() || self.timestep <= 0.0 {
            return Err(PhysicsError::WorldInit(format!(
                "timestep must be positive, got {}",
                self.timestep
            )));
        }
        if self.max_substeps == 0 {
            return Err(PhysicsError::WorldInit(
                "max_substeps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Rigid-body world for one table
pub struct PhysicsWorld {
    config: PhysicsConfig,

    // -- Engine sets --
    pub(crate) rigid_body_set: RigidBodySet,
    pub(crate) collider_set: ColliderSet,
    pub(crate) impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,

    // -- Pipeline objects --
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    integration_parameters: IntegrationParameters,
    gravity: Vector<Real>,

    /// Fixed body every planar constraint hangs from
    pub(crate) anchor: RigidBodyHandle,

    // -- Registries --
    pub(crate) shapes: Vec<CollisionShape>,
    pub(crate) bodies: Vec<BodyRecord>,
    pub(crate) constraints: Vec<ConstraintRecord>,

    accumulator: f32,
    elapsed: f64,
}

impl PhysicsWorld {
    /// Create an empty world: pipeline, broadphase, narrowphase, solver and
    /// gravity.
    pub fn new(config: PhysicsConfig) -> PhysicsResult<Self> {
        config.validate()?;

        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = config.timestep;

        let mut rigid_body_set = RigidBodySet::new();
        let anchor = rigid_body_set.insert(RigidBodyBuilder::fixed().build());

        log::debug!(
            "Physics world created: gravity={}, timestep={}s",
            config.gravity,
            config.timestep
        );

        Ok(Self {
            gravity: to_vector(config.gravity),
            config,
            rigid_body_set,
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            integration_parameters,
            anchor,
            shapes: Vec::new(),
            bodies: Vec::new(),
            constraints: Vec::new(),
            accumulator: 0.0,
            elapsed: 0.0,
        })
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Global gravity
    pub fn gravity(&self) -> Vec3 {
        from_vector(&self.gravity)
    }

    /// Simulated seconds so far
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    // ---------------------------------------------------------------------
    // Shapes
    // ---------------------------------------------------------------------

    /// Hand a shape to the world and get its handle back
    pub fn add_shape(&mut self, shape: CollisionShape) -> ShapeHandle {
        let handle = ShapeHandle(self.shapes.len());
        self.shapes.push(shape);
        handle
    }

    pub fn shape(&self, handle: ShapeHandle) -> Option<&CollisionShape> {
        self.shapes.get(handle.0)
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    // ---------------------------------------------------------------------
    // Stepping
    // ---------------------------------------------------------------------

    /// Advance the simulation by exactly one engine step of `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            log::warn!("Ignoring step with invalid dt {}", dt);
            return;
        }
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
        self.elapsed += f64::from(dt);
    }

    /// Feed `seconds` of wall time through the fixed timestep.
    ///
    /// Runs at most `max_substeps` steps; leftover time below one step is
    /// carried to the next call, anything beyond the cap is dropped.
    /// Returns the number of steps taken.
    pub fn advance(&mut self, seconds: f32) -> u32 {
        if !seconds.is_finite() || seconds <= 0.0 {
            return 0;
        }
        let step = self.config.timestep;
        self.accumulator += seconds;

        let mut steps = 0;
        while self.accumulator >= step && steps < self.config.max_substeps {
            self.step(step);
            self.accumulator -= step;
            steps += 1;
        }
        if self.accumulator >= step {
            log::warn!(
                "Simulation fell behind, dropping {:.3}s",
                self.accumulator - self.accumulator % step
            );
            self.accumulator %= step;
        }
        steps
    }

    // ---------------------------------------------------------------------
    // Body access
    // ---------------------------------------------------------------------

    pub(crate) fn rigid_body(&self, body: BodyHandle) -> PhysicsResult<&RigidBody> {
        let record = self.bodies.get(body.0).ok_or(PhysicsError::UnknownBody)?;
        self.rigid_body_set
            .get(record.rigid_body)
            .ok_or(PhysicsError::UnknownBody)
    }

    pub(crate) fn rigid_body_mut(&mut self, body: BodyHandle) -> PhysicsResult<&mut RigidBody> {
        let record = self.bodies.get(body.0).ok_or(PhysicsError::UnknownBody)?;
        self.rigid_body_set
            .get_mut(record.rigid_body)
            .ok_or(PhysicsError::UnknownBody)
    }

    /// Current position of a body
    pub fn translation(&self, body: BodyHandle) -> PhysicsResult<Vec3> {
        Ok(from_vector(self.rigid_body(body)?.translation()))
    }

    /// Current orientation of a body
    pub fn rotation(&self, body: BodyHandle) -> PhysicsResult<Quat> {
        Ok(from_rotation(self.rigid_body(body)?.rotation()))
    }

    pub fn linear_velocity(&self, body: BodyHandle) -> PhysicsResult<Vec3> {
        Ok(from_vector(self.rigid_body(body)?.linvel()))
    }

    pub fn angular_velocity(&self, body: BodyHandle) -> PhysicsResult<Vec3> {
        Ok(from_vector(self.rigid_body(body)?.angvel()))
    }

    /// Apply an instantaneous impulse at the center of mass
    pub fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec3) -> PhysicsResult<()> {
        self.rigid_body_mut(body)?.apply_impulse(to_vector(impulse), true);
        Ok(())
    }

    /// Apply an instantaneous angular impulse
    pub fn apply_torque_impulse(&mut self, body: BodyHandle, impulse: Vec3) -> PhysicsResult<()> {
        self.rigid_body_mut(body)?
            .apply_torque_impulse(to_vector(impulse), true);
        Ok(())
    }

    /// Add a force that persists until [`reset_forces`](Self::reset_forces)
    pub fn apply_force(&mut self, body: BodyHandle, force: Vec3) -> PhysicsResult<()> {
        self.rigid_body_mut(body)?.add_force(to_vector(force), true);
        Ok(())
    }

    pub fn reset_forces(&mut self, body: BodyHandle) -> PhysicsResult<()> {
        self.rigid_body_mut(body)?.reset_forces(true);
        Ok(())
    }

    pub fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec3) -> PhysicsResult<()> {
        self.rigid_body_mut(body)?.set_linvel(to_vector(velocity), true);
        Ok(())
    }

    /// Teleport a body.
    ///
    /// Bodies held on a plane keep their plane height whatever `position`
    /// asks for.
    pub fn set_translation(&mut self, body: BodyHandle, position: Vec3) -> PhysicsResult<()> {
        if !position.is_finite() {
            return Err(PhysicsError::NonFinitePlacement);
        }
        let mut position = position;
        if let Some(constraint) = self.constraint_of(body)? {
            if position.y != constraint.plane_height {
                log::warn!(
                    "Body {} pinned to y={}, ignoring requested y={}",
                    body.0,
                    constraint.plane_height,
                    position.y
                );
                position.y = constraint.plane_height;
            }
        }
        self.rigid_body_mut(body)?
            .set_translation(to_vector(position), true);
        Ok(())
    }

    /// Read back the material the engine is simulating with
    pub fn material(&self, body: BodyHandle) -> PhysicsResult<MaterialProfile> {
        let record = self.bodies.get(body.0).ok_or(PhysicsError::UnknownBody)?;
        let rigid_body = self.rigid_body(body)?;
        let collider = self
            .collider_set
            .get(record.collider)
            .ok_or(PhysicsError::UnknownBody)?;

        let mass = if rigid_body.is_fixed() {
            0.0
        } else {
            rigid_body.mass()
        };
        Ok(MaterialProfile::new(
            mass,
            collider.friction(),
            collider.restitution(),
        ))
    }

    /// Put every dynamic body back where it was built, at rest
    pub fn reset(&mut self) {
        for record in &self.bodies {
            if record.material.is_static() {
                continue;
            }
            if let Some(body) = self.rigid_body_set.get_mut(record.rigid_body) {
                body.set_position(
                    to_isometry(record.initial_position, record.initial_orientation),
                    true,
                );
                body.set_linvel(Vector::zeros(), true);
                body.set_angvel(Vector::zeros(), true);
                body.reset_forces(true);
                body.reset_torques(true);
            }
        }
        self.accumulator = 0.0;
        log::debug!("World reset to initial placements");
    }
}

impl PhysicsWorld {
    /// Release constraints, then bodies with their colliders, then shapes,
    /// then the anchor. Safe to call more than once.
    pub(crate) fn release(&mut self) {
        let constraints = self.constraints.len();
        let bodies = self.bodies.len();

        for constraint in self.constraints.drain(..).rev() {
            self.impulse_joint_set.remove(constraint.joint, false);
        }
        for record in self.bodies.drain(..).rev() {
            self.rigid_body_set.remove(
                record.rigid_body,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            );
        }
        self.shapes.clear();
        self.rigid_body_set.remove(
            self.anchor,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );

        log::debug!(
            "Physics world released {} constraints and {} bodies",
            constraints,
            bodies
        );
    }
}

impl Drop for PhysicsWorld {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PhysicsConfig::default();
        assert_eq!(config.gravity, Vec3::new(0.0, -10.0, 0.0));
        assert_eq!(config.yaw, YawMode::Locked);
        assert_eq!(config.paddle_shape, PaddleShape::Box);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let config = PhysicsConfig {
            timestep: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            PhysicsWorld::new(config),
            Err(PhysicsError::WorldInit(_))
        ));

        let config = PhysicsConfig {
            gravity: Vec3::new(0.0, f32::NAN, 0.0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_world() {
        let world = PhysicsWorld::new(PhysicsConfig::default()).unwrap();
        assert_eq!(world.gravity(), Vec3::new(0.0, -10.0, 0.0));
        assert_eq!(world.body_count(), 0);
        assert_eq!(world.shape_count(), 0);
        assert_eq!(world.constraint_count(), 0);
    }

    #[test]
    fn test_advance_caps_substeps() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default()).unwrap();
        assert_eq!(world.advance(1.0 / 60.0 + 1e-4), 1);
        assert_eq!(world.advance(1.0), 8);
        assert_eq!(world.advance(-1.0), 0);
        assert!(world.elapsed() > 0.0);
    }

    #[test]
    fn test_unknown_body() {
        let world = PhysicsWorld::new(PhysicsConfig::default()).unwrap();
        assert!(matches!(
            world.translation(BodyHandle(3)),
            Err(PhysicsError::UnknownBody)
        ));
    }

    #[test]
    fn test_release_empties_engine_sets() {
        let mut table = crate::init(&crate::TableLayout::standard()).unwrap();
        let world = table.world_mut();
        assert_eq!(world.rigid_body_set.len(), 5);
        assert_eq!(world.collider_set.len(), 4);
        assert_eq!(world.impulse_joint_set.len(), 3);

        world.release();
        assert_eq!(world.constraint_count(), 0);
        assert_eq!(world.body_count(), 0);
        assert_eq!(world.shape_count(), 0);
        assert_eq!(world.impulse_joint_set.len(), 0);
        assert_eq!(world.collider_set.len(), 0);
        assert_eq!(world.rigid_body_set.len(), 0);

        world.release();
        assert_eq!(world.rigid_body_set.len(), 0);
    }
}
