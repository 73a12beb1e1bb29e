//! 世界参数配置
//!
//! 所有参数通过显式结构体传入 World / Chunk，不使用全局单例

/// 区块宽度上限
pub const MAX_CHUNK_WIDTH: i32 = 256;
/// 区块高度上限
pub const MAX_CHUNK_HEIGHT: i32 = 256;
/// 渲染距离上限
pub const MAX_DRAW_DISTANCE: i32 = 64;

/// 地形参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainParams {
    /// 最大地表高度
    pub max_height: i32,
    /// 噪声缩放（越大地形越平缓）
    pub scale: f64,
    /// 水位
    pub water_level: i32,
}

/// 树木参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    /// 树木噪声采样偏移
    pub factor: f64,
    /// 噪声阈值，超过才放置树苗
    pub threshold: f64,
    /// 同一区块内树苗的最小间距
    pub min_distance: f64,
}

/// 建筑参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildingParams {
    /// 每生成多少个区块放置一次建筑
    pub interval: u64,
    /// 建筑顶部允许的最大高度
    pub max_top: i32,
}

/// 世界参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldParams {
    /// 渲染距离（单位：区块数，切比雪夫半径）
    pub draw_distance: i32,
    /// 区块宽度（X 与 Z）
    pub chunk_width: i32,
    /// 区块高度（Y）
    pub chunk_height: i32,
    pub terrain: TerrainParams,
    pub trees: TreeParams,
    pub building: BuildingParams,
}

impl Default for WorldParams {
    fn default() -> Self {
        Self {
            draw_distance: 4,
            chunk_width: 35,
            chunk_height: 20,
            terrain: TerrainParams {
                max_height: 20,
                scale: 100.0,
                water_level: 4,
            },
            trees: TreeParams {
                factor: 1000.0,
                threshold: 0.9,
                min_distance: 5.0,
            },
            building: BuildingParams {
                interval: 20,
                max_top: 16,
            },
        }
    }
}

impl WorldParams {
    /// 修正退化参数，返回可安全使用的配置
    pub fn validate(mut self) -> Self {
        self.draw_distance = self.draw_distance.clamp(0, MAX_DRAW_DISTANCE);
        self.chunk_width = self.chunk_width.clamp(1, MAX_CHUNK_WIDTH);
        self.chunk_height = self.chunk_height.clamp(1, MAX_CHUNK_HEIGHT);
        if !(self.terrain.scale.is_finite() && self.terrain.scale > 0.0) {
            self.terrain.scale = 1.0;
        }
        self.building.interval = self.building.interval.max(1);
        self
    }

    /// 区块内体素总数
    pub fn voxel_count(&self) -> usize {
        let width = self.chunk_width.max(0) as usize;
        let height = self.chunk_height.max(0) as usize;
        width.saturating_mul(width).saturating_mul(height)
    }
}
