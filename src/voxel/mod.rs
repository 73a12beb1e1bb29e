//! 体素世界模块
//!
//! 这个模块包含了体素世界的核心数据与 Bevy 渲染桥接：
//!
//! - **flags**: 方块属性标志位
//! - **block**: 方块目录（ID、属性、渲染描述）
//! - **config**: 世界参数（渲染距离、区块尺寸、地形、树木、建筑）
//! - **seed**: 世界种子与噪声采样器
//! - **chunk**: 区块数据结构（体素存储、可见实例列表）
//! - **terrain**: 地形生成器（高度、土层、水、树苗）
//! - **structure**: 预制结构（树木与建筑）的加载与放置
//! - **loading**: 区块生成请求与可移入异步任务的生成器
//! - **change**: 区块变更记录
//! - **world**: 世界管理（流式加载、方块查询与移除）
//! - **mesh**: 网格构建（合并立方体网格）
//! - **systems**: ECS系统函数（区块加载、卸载、渲染同步）
//! - **materials**: 材质系统（不透明/透明材质）
//! - **components**: 体素相关组件与资源
//! - **plugin**: Bevy插件

pub mod block;
pub mod change;
pub mod chunk;
pub mod components;
pub mod config;
pub mod flags;
pub mod loading;
pub mod materials;
pub mod mesh;
pub mod plugin;
pub mod seed;
pub mod structure;
pub mod systems;
pub mod terrain;
pub mod world;

// 重新导出常用类型，方便外部使用
pub use block::BlockKind;
pub use change::ChunkChange;
pub use chunk::{Chunk, ChunkCoord, Voxel};
pub use components::{ChunkMarker, StreamingAnchor, VoxelWorld};
pub use config::{BuildingParams, TerrainParams, TreeParams, WorldParams};
pub use flags::BlockFlags;
pub use loading::{ChunkGenerator, ChunkRequest};
pub use plugin::VoxelPlugin;
pub use seed::{TerrainNoise, WorldSeed};
pub use structure::{PlacedStructure, Structure, StructureError, StructureLibrary};
pub use terrain::TerrainGenerator;
pub use world::World;
