//! 世界种子与噪声生成器

use std::sync::Arc;

use bevy::prelude::Resource;
use noise::{NoiseFn, Perlin};

/// 二维噪声采样器 - 在线程间共享，供异步区块生成使用
pub type NoiseSampler = Arc<dyn NoiseFn<f64, 2> + Send + Sync>;

/// 地形噪声 - 高度场与土层场两个相互独立的确定性采样器
#[derive(Clone)]
pub struct TerrainNoise {
    height: NoiseSampler,
    layer: NoiseSampler,
}

impl TerrainNoise {
    /// 由任意两个噪声函数构造（测试可注入平坦噪声）
    pub fn new<H, L>(height: H, layer: L) -> Self
    where
        H: NoiseFn<f64, 2> + Send + Sync + 'static,
        L: NoiseFn<f64, 2> + Send + Sync + 'static,
    {
        Self {
            height: Arc::new(height),
            layer: Arc::new(layer),
        }
    }

    /// 高度场采样，非有限值视为 -1（对应高度 0）
    pub fn height(&self, x: f64, z: f64) -> f64 {
        let value = self.height.get([x, z]);
        if value.is_finite() { value } else { -1.0 }
    }

    /// 土层场采样，非有限值视为 0
    pub fn layer(&self, x: f64, z: f64) -> f64 {
        let value = self.layer.get([x, z]);
        if value.is_finite() { value } else { 0.0 }
    }

    /// 树木噪声 - 在高度场的偏移坐标上采样，非有限值视为不放置
    pub fn tree(&self, x: f64, z: f64) -> f64 {
        let value = self.height.get([x, z]);
        if value.is_finite() { value } else { f64::NEG_INFINITY }
    }
}

/// 世界种子 - 相同的种子生成相同的世界
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldSeed {
    /// 主种子值
    pub seed: u32,
}

impl WorldSeed {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }

    /// 从字符串创建世界种子
    /// 通过简单的哈希算法将字符串转换为数字种子
    pub fn from_string(s: &str) -> Self {
        let seed = s
            .bytes()
            .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
        Self::new(seed)
    }

    /// 创建地形噪声，土层场使用偏移种子保证独立
    pub fn terrain_noise(&self) -> TerrainNoise {
        TerrainNoise::new(
            Perlin::new(self.seed),
            Perlin::new(self.seed.wrapping_add(1000)),
        )
    }
}

impl Default for WorldSeed {
    fn default() -> Self {
        Self::new(12345)
    }
}
