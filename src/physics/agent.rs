use bevy::math::{Quat, Vec3};

use crate::physics::{Aabb, PhysicsParams};

/// Cylinder-shaped body moved by the physics step.
///
/// `position` is the centre of the cylinder. `velocity` is kept in the
/// agent's local frame (rotated by `yaw` to reach world space); `input` is the
/// planar walking velocity in that same frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub position: Vec3,
    pub velocity: Vec3,
    pub yaw: f32,
    pub radius: f32,
    pub height: f32,
    pub jump_speed: f32,
    pub on_ground: bool,
    pub input: Vec3,
}

impl Agent {
    pub fn new(position: Vec3, radius: f32, height: f32) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            yaw: 0.0,
            radius,
            height,
            jump_speed: 0.0,
            on_ground: false,
            input: Vec3::ZERO,
        }
    }

    pub fn from_params(params: &PhysicsParams) -> Self {
        Self {
            jump_speed: params.jump_speed,
            ..Self::new(params.spawn_position, params.agent_radius, params.agent_height)
        }
    }

    fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw)
    }

    /// Velocity expressed in world space.
    pub fn world_velocity(&self) -> Vec3 {
        self.rotation() * self.velocity
    }

    /// Adds a world-space velocity change, converting it back to the local frame.
    pub fn apply_world_velocity_delta(&mut self, delta: Vec3) {
        self.velocity += self.rotation().inverse() * delta;
    }

    /// Jumps only while standing on something.
    pub fn jump(&mut self) -> bool {
        if !self.on_ground {
            return false;
        }
        self.velocity.y += self.jump_speed;
        self.on_ground = false;
        true
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(
            self.position,
            Vec3::new(self.radius, self.height / 2.0, self.radius),
        )
    }

    /// Lowest point of the cylinder.
    pub fn feet(&self) -> Vec3 {
        self.position - Vec3::Y * (self.height / 2.0)
    }
}
