//! Fixed-timestep physics for the player agent.
//!
//! - **aabb**: axis-aligned boxes for structure soft collision
//! - **agent**: the cylinder body and its local velocity frame
//! - **collision**: broad phase, narrow phase and resolution against voxels

pub mod aabb;
pub mod agent;
pub mod collision;

pub use aabb::Aabb;
pub use agent::Agent;
pub use collision::{CONTACT_EPSILON, CollisionRecord};

use bevy::math::{IVec3, Vec3};

use crate::voxel::{BlockKind, World};

/// Read access to the voxel grid in world coordinates.
pub trait VoxelQuery {
    /// Block at `pos`, or `None` when that position is not loaded.
    fn block_kind(&self, pos: IVec3) -> Option<BlockKind>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsParams {
    /// Steps per second.
    pub simulation_rate: f32,
    pub gravity: f32,
    pub agent_radius: f32,
    pub agent_height: f32,
    pub jump_speed: f32,
    pub walk_speed: f32,
    pub spawn_position: Vec3,
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            simulation_rate: 200.0,
            gravity: 32.0,
            agent_radius: 0.5,
            agent_height: 1.75,
            jump_speed: 10.0,
            walk_speed: 3.0,
            spawn_position: Vec3::new(24.0, 20.0, 24.0),
        }
    }
}

/// Accumulates frame time and advances the agent in whole timeslices.
#[derive(Debug, Clone)]
pub struct PhysicsSystem {
    timeslice: f32,
    gravity: f32,
    accumulated: f32,
}

impl PhysicsSystem {
    pub fn new(params: &PhysicsParams) -> Self {
        Self {
            timeslice: 1.0 / params.simulation_rate.max(1.0),
            gravity: params.gravity,
            accumulated: 0.0,
        }
    }

    pub fn timeslice(&self) -> f32 {
        self.timeslice
    }

    /// Runs as many steps as the accumulated time allows and returns how many ran.
    pub fn update(&mut self, dt: f32, agent: &mut Agent, world: &impl VoxelQuery) -> u32 {
        if !dt.is_finite() || dt <= 0.0 {
            return 0;
        }
        self.accumulated += dt;

        let mut steps = 0;
        while self.accumulated >= self.timeslice {
            self.step(agent, world);
            self.accumulated -= self.timeslice;
            steps += 1;
        }
        steps
    }

    /// One timeslice: integrate, detect, resolve, then fall if unsupported.
    pub fn step(&self, agent: &mut Agent, world: &impl VoxelQuery) {
        let dt = self.timeslice;

        agent.velocity.y -= self.gravity * dt;
        agent.velocity.x = agent.input.x;
        agent.velocity.z = agent.input.z;
        let planar = agent.world_velocity() * Vec3::new(1.0, 0.0, 1.0);
        agent.position += planar * dt;

        agent.on_ground = false;
        let candidates = collision::broad_phase(agent, world);
        let records = collision::narrow_phase(agent, &candidates);
        collision::resolve(agent, records);

        if !agent.on_ground {
            agent.position.y += agent.velocity.y * dt;
        }
    }
}

/// Soft collision with trees and buildings: when the agent walks into a
/// structure box it steps back against its direction of travel and loses its
/// horizontal motion. Walking away from a box it already overlaps is allowed.
pub fn reject_structure_contact(agent: &mut Agent, world: &World) -> bool {
    let velocity = agent.world_velocity();
    let planar = Vec3::new(velocity.x, 0.0, velocity.z).normalize_or_zero();
    if planar == Vec3::ZERO {
        return false;
    }

    let bounds = agent.bounds();
    let entering = world.structure_contacts(&bounds).any(|placed| {
        let away = agent.position - placed.center();
        planar.dot(Vec3::new(away.x, 0.0, away.z)) < 0.0
    });
    if !entering {
        return false;
    }

    agent.position -= planar * 0.5;
    agent.velocity.x = 0.0;
    agent.velocity.z = 0.0;
    true
}


#[cfg(test)]
mod tests {
    use super::testing::BlockGrid;
    use super::*;
    use std::sync::Arc;

    use noise::Constant;

    use crate::voxel::structure::{StructureBlock, StructurePlacer};
    use crate::voxel::{ChunkCoord, ChunkRequest, Structure, StructureLibrary, TerrainNoise, WorldParams};

    fn flat_layer(top: i32) -> BlockGrid {
        let mut grid = BlockGrid::default();
        for x in -3..=3 {
            for z in -3..=3 {
                grid.set(IVec3::new(x, top - 1, z), BlockKind::Stone);
            }
        }
        grid
    }

    #[test]
    fn test_accumulator_runs_whole_steps() {
        let params = PhysicsParams::default();
        let mut physics = PhysicsSystem::new(&params);
        let mut agent = Agent::from_params(&params);
        let grid = BlockGrid::default();

        assert_eq!(physics.update(0.012, &mut agent, &grid), 2);
        assert_eq!(physics.update(0.002, &mut agent, &grid), 0);
        assert_eq!(physics.update(0.002, &mut agent, &grid), 1);
        assert_eq!(physics.update(f32::NAN, &mut agent, &grid), 0);
    }

    #[test]
    fn test_free_fall_accelerates() {
        let params = PhysicsParams::default();
        let physics = PhysicsSystem::new(&params);
        let mut agent = Agent::new(Vec3::new(0.5, 50.0, 0.5), 0.5, 1.75);
        let grid = BlockGrid::default();

        for _ in 0..200 {
            physics.step(&mut agent, &grid);
        }
        assert!((agent.velocity.y + 32.0).abs() < 1e-2);
        assert!(agent.position.y < 50.0 - 15.0);
        assert!(!agent.on_ground);
    }

    #[test]
    fn test_falling_agent_settles_on_layer() {
        let params = PhysicsParams::default();
        let mut physics = PhysicsSystem::new(&params);
        let mut agent = Agent::new(Vec3::new(0.5, 14.0, 0.5), params.agent_radius, params.agent_height);
        // top face of the layer at y = 10
        let grid = flat_layer(10);

        for _ in 0..180 {
            physics.update(1.0 / 60.0, &mut agent, &grid);
        }

        assert!(agent.on_ground);
        assert!((agent.position.y - (10.0 + agent.height / 2.0)).abs() < 1e-4);
        assert_eq!(agent.velocity.y, 0.0);
    }

    #[test]
    fn test_resting_agent_stays_put() {
        let params = PhysicsParams::default();
        let physics = PhysicsSystem::new(&params);
        let mut agent = Agent::new(Vec3::new(0.5, 10.875, 0.5), 0.5, 1.75);
        let grid = flat_layer(10);

        for _ in 0..50 {
            physics.step(&mut agent, &grid);
            assert!(agent.on_ground);
        }
        assert!((agent.position.y - 10.875).abs() < 1e-4);
    }

    #[test]
    fn test_walking_into_column_keeps_parallel_velocity() {
        let params = PhysicsParams::default();
        let physics = PhysicsSystem::new(&params);
        let mut grid = BlockGrid::default();
        for y in -10..20 {
            grid.set(IVec3::new(1, y, 0), BlockKind::Stone);
        }

        let mut agent = Agent::new(Vec3::new(0.52, 5.5, 0.5), 0.5, 1.75);
        agent.input = Vec3::new(3.0, 0.0, 1.0);
        physics.step(&mut agent, &grid);

        assert!(agent.velocity.x.abs() < 1e-5);
        assert!((agent.velocity.z - 1.0).abs() < 1e-5);
        assert!(agent.position.x <= 0.5 + 1e-4);
        assert!(agent.position.z > 0.5);
    }

    #[test]
    fn test_water_does_not_block() {
        let params = PhysicsParams::default();
        let physics = PhysicsSystem::new(&params);
        let mut grid = BlockGrid::default();
        for x in -3..=3 {
            for z in -3..=3 {
                grid.set(IVec3::new(x, 9, z), BlockKind::Water);
            }
        }

        let mut agent = Agent::new(Vec3::new(0.5, 10.875, 0.5), 0.5, 1.75);
        for _ in 0..40 {
            physics.step(&mut agent, &grid);
        }
        assert!(!agent.on_ground);
        assert!(agent.position.y < 10.875);
    }

    #[test]
    fn test_jump_leaves_ground() {
        let params = PhysicsParams::default();
        let physics = PhysicsSystem::new(&params);
        let mut agent = Agent::from_params(&params);
        agent.position = Vec3::new(0.5, 10.875, 0.5);
        let grid = flat_layer(10);

        physics.step(&mut agent, &grid);
        assert!(agent.jump());
        for _ in 0..20 {
            physics.step(&mut agent, &grid);
        }
        assert!(agent.position.y > 11.0);
    }

    /// Flat world with one tree whose box spans [-1, 4] x [5, 8] x [1, 2].
    fn world_with_tree() -> World {
        let mut params = WorldParams::default();
        params.chunk_width = 4;
        params.chunk_height = 8;
        params.terrain.max_height = 8;
        params.terrain.water_level = 0;
        params.draw_distance = 0;
        let mut world = World::new(
            params,
            TerrainNoise::new(Constant::new(0.0), Constant::new(0.0)),
            Arc::new(StructureLibrary::default()),
        );

        let tree = Structure::from_blocks(vec![
            StructureBlock {
                kind: BlockKind::Log,
                offset: IVec3::new(0, 0, 0),
            },
            StructureBlock {
                kind: BlockKind::Leaves,
                offset: IVec3::new(-2, 2, 0),
            },
            StructureBlock {
                kind: BlockKind::Leaves,
                offset: IVec3::new(2, 2, 0),
            },
        ])
        .unwrap();
        let library = StructureLibrary::new(vec![tree], None);

        let mut chunk = world.generator().generate(ChunkRequest {
            coord: ChunkCoord::new(0, 0),
            has_building: false,
        });
        chunk.record_sapling(IVec3::new(1, 4, 1));
        StructurePlacer::new(&library, &world.params().building).place(&mut chunk, false);
        assert!(world.insert_chunk(chunk));
        world
    }

    #[test]
    fn test_walking_into_structure_is_rejected() {
        let world = world_with_tree();
        let mut agent = Agent::new(Vec3::new(4.4, 6.0, 1.5), 0.5, 1.75);
        agent.velocity = Vec3::new(-3.0, 0.0, 0.0);

        assert!(reject_structure_contact(&mut agent, &world));
        assert!((agent.position.x - 4.9).abs() < 1e-5);
        assert_eq!(agent.velocity.x, 0.0);
        assert_eq!(agent.velocity.z, 0.0);
    }

    #[test]
    fn test_walking_out_of_structure_is_allowed() {
        let world = world_with_tree();
        let mut agent = Agent::new(Vec3::new(3.3, 6.0, 1.5), 0.5, 1.75);
        agent.velocity = Vec3::new(3.0, 0.0, 0.0);

        for _ in 0..120 {
            assert!(!reject_structure_contact(&mut agent, &world));
            agent.position += agent.world_velocity() / 60.0;
        }
        assert!(agent.position.x > 9.0);
        assert_eq!(agent.velocity.x, 3.0);

        // Standing still inside the box is left alone
        let mut idle = Agent::new(Vec3::new(1.5, 6.0, 1.5), 0.5, 1.75);
        assert!(!reject_structure_contact(&mut idle, &world));
        assert_eq!(idle.position, Vec3::new(1.5, 6.0, 1.5));
    }
}
