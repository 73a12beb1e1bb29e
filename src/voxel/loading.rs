//! 区块生成任务 - 每个区块的生成是一个可独立等待的原子单元

use std::sync::Arc;

use crate::voxel::chunk::{Chunk, ChunkCoord};
use crate::voxel::config::WorldParams;
use crate::voxel::seed::TerrainNoise;
use crate::voxel::structure::{StructureLibrary, StructurePlacer};
use crate::voxel::terrain::TerrainGenerator;

/// 区块生成请求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRequest {
    pub coord: ChunkCoord,
    /// 是否在该区块放置建筑（由世界的生成计数器决定）
    pub has_building: bool,
}

/// 区块生成器 - 参数、噪声与结构库的可克隆组合，可以移入异步任务
#[derive(Clone)]
pub struct ChunkGenerator {
    params: WorldParams,
    noise: TerrainNoise,
    structures: Arc<StructureLibrary>,
}

impl ChunkGenerator {
    pub fn new(params: WorldParams, noise: TerrainNoise, structures: Arc<StructureLibrary>) -> Self {
        Self {
            params,
            noise,
            structures,
        }
    }

    pub fn params(&self) -> &WorldParams {
        &self.params
    }

    /// 同步生成完整区块：地形 → 实例列表 → 结构
    pub fn generate(&self, request: ChunkRequest) -> Chunk {
        let mut chunk = TerrainGenerator::new(&self.params, &self.noise).generate_chunk(request.coord);
        StructurePlacer::new(&self.structures, &self.params.building)
            .place(&mut chunk, request.has_building);
        chunk
    }

    /// 异步生成，结果在完成之前对外不可见
    pub async fn generate_async(self, request: ChunkRequest) -> Chunk {
        self.generate(request)
    }
}
