//! Broad/narrow phase collision between the agent cylinder and voxel cubes.
//!
//! Voxel `(x, y, z)` occupies the unit cube `[x, x+1] x [y, y+1] x [z, z+1]`.

use bevy::math::{IVec3, Vec3};

use crate::physics::{Agent, VoxelQuery};

/// Contacts this close to the cylinder surface still count, so a resting
/// agent keeps touching the ground it stands on.
pub const CONTACT_EPSILON: f32 = 1e-3;

const AXIS_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionRecord {
    pub block: IVec3,
    pub contact_point: Vec3,
    pub normal: Vec3,
    pub overlap: f32,
}

impl CollisionRecord {
    fn is_vertical(&self) -> bool {
        self.normal.y != 0.0
    }
}

/// Every voxel touched by the agent's bounding box that blocks movement.
pub fn broad_phase(agent: &Agent, world: &impl VoxelQuery) -> Vec<IVec3> {
    let bounds = agent.bounds();
    let min = (bounds.min - Vec3::splat(CONTACT_EPSILON)).floor().as_ivec3();
    let max = (bounds.max + Vec3::splat(CONTACT_EPSILON)).floor().as_ivec3();

    let mut candidates = Vec::new();
    for x in min.x..=max.x {
        for y in min.y..=max.y {
            for z in min.z..=max.z {
                let pos = IVec3::new(x, y, z);
                if world.block_kind(pos).is_some_and(|kind| kind.collides()) {
                    candidates.push(pos);
                }
            }
        }
    }
    candidates
}

/// Closest point of the voxel cube to `point`.
fn closest_point(block: IVec3, point: Vec3) -> Vec3 {
    let min = block.as_vec3();
    point.clamp(min, min + Vec3::ONE)
}

fn in_cylinder(agent: &Agent, point: Vec3) -> bool {
    let d = point - agent.position;
    let radial = (d.x * d.x + d.z * d.z).sqrt();
    d.y.abs() <= agent.height / 2.0 + CONTACT_EPSILON && radial <= agent.radius + CONTACT_EPSILON
}

/// Picks the smaller of vertical and radial overlap for each touching voxel.
pub fn narrow_phase(agent: &Agent, candidates: &[IVec3]) -> Vec<CollisionRecord> {
    let mut records = Vec::new();
    for &block in candidates {
        let contact_point = closest_point(block, agent.position);
        if !in_cylinder(agent, contact_point) {
            continue;
        }

        let d = contact_point - agent.position;
        let radial = (d.x * d.x + d.z * d.z).sqrt();
        let overlap_y = agent.height / 2.0 - d.y.abs();
        let overlap_xz = agent.radius - radial;

        let (normal, overlap) = if overlap_y <= overlap_xz || radial < AXIS_EPSILON {
            let ny = if d.y > 0.0 { -1.0 } else { 1.0 };
            (Vec3::new(0.0, ny, 0.0), overlap_y)
        } else {
            (Vec3::new(-d.x, 0.0, -d.z) / radial, overlap_xz)
        };

        records.push(CollisionRecord {
            block,
            contact_point,
            normal,
            overlap: overlap.max(0.0),
        });
    }
    records
}

/// Applies records smallest correction first.
///
/// Each push is recomputed from the agent's current position, so records
/// sharing a normal do not correct the same penetration twice.
pub fn resolve(agent: &mut Agent, mut records: Vec<CollisionRecord>) {
    records.sort_by(|a, b| a.overlap.total_cmp(&b.overlap));

    for record in records {
        if !in_cylinder(agent, record.contact_point) {
            continue;
        }

        let d = record.contact_point - agent.position;
        let overlap = if record.is_vertical() {
            agent.height / 2.0 - d.y.abs()
        } else {
            agent.radius - (d.x * d.x + d.z * d.z).sqrt()
        }
        .max(0.0);
        agent.position += record.normal * overlap;

        if record.normal.y > 0.0 {
            // a bare touch while moving up (jump take-off) is not a landing
            if overlap > 0.0 || agent.velocity.y <= 0.0 {
                agent.velocity.y = 0.0;
                agent.on_ground = true;
            }
        } else {
            let magnitude = agent.world_velocity().dot(record.normal);
            // only the approaching component
            if magnitude < 0.0 {
                agent.apply_world_velocity_delta(-record.normal * magnitude);
            }
        }
    }
}
