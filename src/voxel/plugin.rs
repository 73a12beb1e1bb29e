//! 体素系统插件

use std::path::PathBuf;
use std::sync::Arc;

use bevy::prelude::*;

use crate::voxel::components::{ChunkEntities, ChunkLoadQueue, VoxelWorld};
use crate::voxel::config::WorldParams;
use crate::voxel::materials::setup_materials;
use crate::voxel::seed::WorldSeed;
use crate::voxel::structure::StructureLibrary;
use crate::voxel::systems::{
    adjust_draw_distance, evict_chunks, handle_completed_chunk_tasks, sync_chunk_meshes,
    update_chunk_loading,
};
use crate::voxel::world::World;

/// 体素系统插件 - 负责注册体素相关的资源和系统
pub struct VoxelPlugin {
    pub params: WorldParams,
    pub seed: WorldSeed,
    /// 结构文件目录
    pub structure_dir: PathBuf,
}

impl Default for VoxelPlugin {
    fn default() -> Self {
        Self {
            params: WorldParams::default(),
            seed: WorldSeed::default(),
            structure_dir: PathBuf::from("assets/structures"),
        }
    }
}

impl Plugin for VoxelPlugin {
    fn build(&self, app: &mut App) {
        let library = StructureLibrary::load(&self.structure_dir);
        info!(
            "Building world: seed {}, draw distance {}, {} tree models, building {}",
            self.seed.seed,
            self.params.draw_distance,
            library.trees.len(),
            if library.building.is_some() { "loaded" } else { "missing" }
        );
        let world = World::new(self.params, self.seed.terrain_noise(), Arc::new(library));

        app.insert_resource(VoxelWorld(world))
            .insert_resource(self.seed)
            .init_resource::<ChunkLoadQueue>()
            .init_resource::<ChunkEntities>()
            .add_systems(Startup, setup_materials)
            .add_systems(
                Update,
                (
                    adjust_draw_distance,
                    update_chunk_loading,
                    handle_completed_chunk_tasks,
                    evict_chunks,
                    sync_chunk_meshes,
                )
                    .chain(),
            );
    }
}
