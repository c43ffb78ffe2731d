//! Rigid Body Factory
//!
//! Turns a registered shape, a material profile and a placement into a body
//! the engine simulates. The factory never hands out a body that is not
//! already part of the world.

use glam::{Quat, Vec3};
use rapier3d::prelude::{ColliderBuilder, ColliderHandle, RigidBodyBuilder, RigidBodyHandle};

use crate::constraint::ConstraintHandle;
use crate::convert::to_isometry;
use crate::shape::ShapeHandle;
use crate::world::PhysicsWorld;
use crate::{GeometryError, MaterialProfile, PhysicsError, PhysicsResult};

/// Stable index of a body inside a [`PhysicsWorld`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub(crate) usize);

impl BodyHandle {
    /// Get the raw index
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Bookkeeping for a body the world owns
#[derive(Debug, Clone)]
pub struct BodyRecord {
    pub(crate) rigid_body: RigidBodyHandle,
    pub(crate) collider: ColliderHandle,
    pub(crate) shape: ShapeHandle,
    /// Profile the body was built with
    pub material: MaterialProfile,
    pub(crate) constraint: Option<ConstraintHandle>,
    pub(crate) initial_position: Vec3,
    pub(crate) initial_orientation: Quat,
}

impl BodyRecord {
    pub fn shape(&self) -> ShapeHandle {
        self.shape
    }

    pub fn constraint(&self) -> Option<ConstraintHandle> {
        self.constraint
    }

    /// Where the body was placed when built
    pub fn initial_position(&self) -> Vec3 {
        self.initial_position
    }
}

impl PhysicsWorld {
    /// Build a body and register it with the world.
    ///
    /// A zero mass makes the body static: no inertia, never moved by the
    /// solver. Any positive mass makes it dynamic, with inertia derived from
    /// the shape, sleeping disabled and vertical translation disabled.
    pub fn build_body(
        &mut self,
        shape: ShapeHandle,
        material: MaterialProfile,
        position: Vec3,
        orientation: Quat,
    ) -> PhysicsResult<BodyHandle> {
        material.validate()?;
        if !position.is_finite()
            || !orientation.is_finite()
            || orientation.length_squared() == 0.0
        {
            return Err(PhysicsError::NonFinitePlacement);
        }
        let collision = self.shapes.get(shape.0).ok_or(PhysicsError::UnknownShape)?;
        if !material.is_static() && !collision.kind().supports_dynamic() {
            return Err(GeometryError::MeshOnDynamicBody.into());
        }
        let shared = collision.shared().clone();
        let orientation = orientation.normalize();
        let placement = to_isometry(position, orientation);

        let builder = if material.is_static() {
            RigidBodyBuilder::fixed().position(placement)
        } else {
            RigidBodyBuilder::dynamic()
                .position(placement)
                .can_sleep(false)
                .enabled_translations(true, false, true)
        };
        let rigid_body = self.rigid_body_set.insert(builder.build());

        let mut collider = ColliderBuilder::new(shared)
            .friction(material.friction)
            .restitution(material.restitution);
        if !material.is_static() {
            collider = collider.mass(material.mass);
        }
        let collider = self.collider_set.insert_with_parent(
            collider.build(),
            rigid_body,
            &mut self.rigid_body_set,
        );
        self.rigid_body_set[rigid_body]
            .recompute_mass_properties_from_colliders(&self.collider_set);

        let handle = BodyHandle(self.bodies.len());
        self.bodies.push(BodyRecord {
            rigid_body,
            collider,
            shape,
            material,
            constraint: None,
            initial_position: position,
            initial_orientation: orientation,
        });

        log::debug!(
            "Body {}: {} at {} (mass={}, friction={}, restitution={})",
            handle.0,
            if material.is_static() { "static" } else { "dynamic" },
            position,
            material.mass,
            material.friction,
            material.restitution
        );
        Ok(handle)
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&BodyRecord> {
        self.bodies.get(handle.0)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }
}
