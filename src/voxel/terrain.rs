//! 地形生成器

use bevy::math::IVec3;

use crate::voxel::block::BlockKind;
use crate::voxel::chunk::{Chunk, ChunkCoord};
use crate::voxel::config::WorldParams;
use crate::voxel::seed::TerrainNoise;

/// 地形生成器 - 由高度场、土层场和树木噪声确定每个体素的类型
pub struct TerrainGenerator<'a> {
    params: &'a WorldParams,
    noise: &'a TerrainNoise,
}

impl<'a> TerrainGenerator<'a> {
    pub fn new(params: &'a WorldParams, noise: &'a TerrainNoise) -> Self {
        Self { params, noise }
    }

    /// 计算指定世界坐标的地表高度
    /// h = floor((noise + 1) * maxHeight / 2)
    pub fn get_height(&self, gx: i32, gz: i32) -> i32 {
        let terrain = &self.params.terrain;
        let n = self
            .noise
            .height(gx as f64 / terrain.scale, gz as f64 / terrain.scale);
        ((n + 1.0) * terrain.max_height as f64 / 2.0).floor() as i32
    }

    /// 泥土层的起始高度，由低频土层噪声调制
    pub fn layer_start(&self, gx: i32, gz: i32, height: i32) -> i32 {
        let scale = self.params.terrain.scale * 2.0;
        let layer = self.noise.layer(gx as f64 / scale, gz as f64 / scale);
        height - 3 + (layer * 2.0).floor() as i32
    }

    /// 树木噪声是否超过阈值
    pub fn tree_noise_passes(&self, gx: i32, gz: i32) -> bool {
        let trees = &self.params.trees;
        let value = self
            .noise
            .tree((gx as f64 + trees.factor) / 10.0, (gz as f64 + trees.factor) / 10.0);
        value > trees.threshold
    }

    /// 地表以外各层的方块类型（按优先级依次判断）
    fn layer_block(&self, y: i32, height: i32, layer_start: i32) -> BlockKind {
        if y < height && y >= layer_start {
            BlockKind::Dirt
        } else if y < layer_start {
            BlockKind::Stone
        } else if y <= self.params.terrain.water_level {
            BlockKind::Water
        } else {
            BlockKind::Empty
        }
    }

    /// 生成指定区块的完整地形数据
    /// 遍历顺序：x 外层，z 内层，y 最内层；树苗按扫描先后占位
    pub fn generate_chunk(&self, coord: ChunkCoord) -> Chunk {
        let mut chunk = Chunk::empty(coord, self.params);
        let origin = chunk.origin();
        let min_distance = self.params.trees.min_distance;
        let water_level = self.params.terrain.water_level;

        for x in 0..self.params.chunk_width {
            for z in 0..self.params.chunk_width {
                let gx = origin.x + x;
                let gz = origin.z + z;
                let height = self.get_height(gx, gz);
                let layer_start = self.layer_start(gx, gz, height);

                for y in 0..self.params.chunk_height {
                    let kind = if y == height {
                        if y <= water_level {
                            BlockKind::Sand
                        } else if self.tree_noise_passes(gx, gz)
                            && !chunk.saplings().iter().any(|s| {
                                let dx = (s.x - x) as f64;
                                let dz = (s.z - z) as f64;
                                (dx * dx + dz * dz).sqrt() < min_distance
                            })
                        {
                            chunk.record_sapling(IVec3::new(x, y, z));
                            BlockKind::Sapling
                        } else {
                            BlockKind::Grass
                        }
                    } else {
                        self.layer_block(y, height, layer_start)
                    };

                    if kind != BlockKind::Empty {
                        chunk.set_kind(x, y, z, kind);
                    }
                }
            }
        }

        chunk.rebuild_instances();
        chunk
    }
}
