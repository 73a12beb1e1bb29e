use bevy::prelude::*;

use terravox::voxel::{BlockKind, VoxelWorld, World};

use crate::player::PlayerCamera;

/// Blocks further than this from the eye cannot be targeted.
const REACH: f32 = 8.0;

#[derive(Debug, Clone, Copy)]
pub struct VoxelHit {
    pub pos: IVec3,
    pub kind: BlockKind,
    pub distance: f32,
}

#[derive(Resource, Default)]
pub struct HighlightState {
    pub current: Option<VoxelHit>,
}

pub struct RaycastPlugin;

impl Plugin for RaycastPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<HighlightState>().add_systems(
            Update,
            (raycast_voxels, remove_targeted_block, draw_highlight_gizmo).chain(),
        );
    }
}

fn raycast_voxels(
    world: Res<VoxelWorld>,
    camera_q: Query<&GlobalTransform, With<PlayerCamera>>,
    mut highlight: ResMut<HighlightState>,
) {
    let Ok(camera_transform) = camera_q.single() else {
        highlight.current = None;
        return;
    };

    let origin = camera_transform.translation();
    let dir = camera_transform.forward().as_vec3();

    highlight.current = dda_raycast(&world, origin, dir, REACH);
}

/// Left click removes the highlighted block.
fn remove_targeted_block(
    mouse: Res<ButtonInput<MouseButton>>,
    mut world: ResMut<VoxelWorld>,
    mut highlight: ResMut<HighlightState>,
) {
    if !mouse.just_pressed(MouseButton::Left) {
        return;
    }
    let Some(hit) = highlight.current else {
        return;
    };
    if world.remove_block(hit.pos.x, hit.pos.y, hit.pos.z) {
        highlight.current = None;
    }
}

/// Fast voxel traversal using DDA algorithm; stops at the first block that
/// collides (water and air are passed through).
fn dda_raycast(world: &World, origin: Vec3, dir: Vec3, max_dist: f32) -> Option<VoxelHit> {
    // Current voxel position
    let mut pos = origin.floor().as_ivec3();

    // Direction to step in each axis
    let step = IVec3::new(
        if dir.x >= 0.0 { 1 } else { -1 },
        if dir.y >= 0.0 { 1 } else { -1 },
        if dir.z >= 0.0 { 1 } else { -1 },
    );

    // Distance along ray to cross one voxel in each axis
    let delta = Vec3::new(
        if dir.x.abs() < 1e-10 { f32::MAX } else { (1.0 / dir.x).abs() },
        if dir.y.abs() < 1e-10 { f32::MAX } else { (1.0 / dir.y).abs() },
        if dir.z.abs() < 1e-10 { f32::MAX } else { (1.0 / dir.z).abs() },
    );

    // Distance to next voxel boundary in each axis
    let mut t_max = Vec3::new(
        if dir.x >= 0.0 {
            ((pos.x + 1) as f32 - origin.x) * delta.x
        } else {
            (origin.x - pos.x as f32) * delta.x
        },
        if dir.y >= 0.0 {
            ((pos.y + 1) as f32 - origin.y) * delta.y
        } else {
            (origin.y - pos.y as f32) * delta.y
        },
        if dir.z >= 0.0 {
            ((pos.z + 1) as f32 - origin.z) * delta.z
        } else {
            (origin.z - pos.z as f32) * delta.z
        },
    );

    let mut distance = 0.0;

    while distance < max_dist {
        if let Some(voxel) = world.get_block(pos.x, pos.y, pos.z)
            && voxel.kind.collides()
        {
            return Some(VoxelHit {
                pos,
                kind: voxel.kind,
                distance,
            });
        }

        // Move to next voxel (step along the axis with smallest t_max)
        if t_max.x < t_max.y && t_max.x < t_max.z {
            distance = t_max.x;
            t_max.x += delta.x;
            pos.x += step.x;
        } else if t_max.y < t_max.z {
            distance = t_max.y;
            t_max.y += delta.y;
            pos.y += step.y;
        } else {
            distance = t_max.z;
            t_max.z += delta.z;
            pos.z += step.z;
        }
    }

    None
}

fn draw_highlight_gizmo(mut gizmos: Gizmos, highlight: Res<HighlightState>) {
    if let Some(hit) = highlight.current {
        let center = hit.pos.as_vec3() + Vec3::splat(0.5);
        let transform = Transform::from_translation(center).with_scale(Vec3::splat(1.02));
        gizmos.cube(transform, Color::srgb(1.0, 0.95, 0.2));
    }
}
