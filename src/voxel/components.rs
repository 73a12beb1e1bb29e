//! 体素相关组件与资源

use std::collections::{HashMap, HashSet};

use bevy::prelude::*;
use bevy::tasks::Task;

use crate::voxel::chunk::{Chunk, ChunkCoord};
use crate::voxel::world::World;

/// 体素世界资源
#[derive(Resource, Deref, DerefMut)]
pub struct VoxelWorld(pub World);

/// 区块渲染实体标记
#[derive(Component, Debug, Clone, Copy)]
pub struct ChunkMarker {
    pub coord: ChunkCoord,
}

/// 区块流式加载围绕这个实体进行（通常是玩家摄像机）
#[derive(Component, Debug, Default)]
pub struct StreamingAnchor;

/// 异步区块生成任务
#[derive(Component)]
pub struct ChunkGenerationTask {
    pub task: Task<Chunk>,
    pub coord: ChunkCoord,
}

/// 区块加载队列 - 限制同时进行的生成任务数
#[derive(Resource)]
pub struct ChunkLoadQueue {
    pub max_concurrent_tasks: usize,
    pub in_flight: HashSet<ChunkCoord>,
}

impl Default for ChunkLoadQueue {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 8,
            in_flight: HashSet::new(),
        }
    }
}

/// 每个区块当前拥有的渲染实体
#[derive(Resource, Default)]
pub struct ChunkEntities {
    pub map: HashMap<ChunkCoord, Vec<Entity>>,
}
