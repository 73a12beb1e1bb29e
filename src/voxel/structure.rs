//! 预制结构（树木、建筑）的加载与放置
//!
//! 结构以附加几何体的形式挂在区块上，不写入体素数组，
//! 因此不参与遮挡剔除，也不能被挖掘。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bevy::log::{debug, warn};
use bevy::math::IVec3;
use serde::Deserialize;
use thiserror::Error;

use crate::physics::Aabb;
use crate::voxel::block::BlockKind;
use crate::voxel::chunk::Chunk;
use crate::voxel::config::BuildingParams;

/// 结构加载错误
#[derive(Debug, Error)]
pub enum StructureError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed structure {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("structure {} contains no known blocks", path.display())]
    Empty { path: PathBuf },
    #[error("structure {} has coordinates out of range", path.display())]
    OutOfRange { path: PathBuf },
}

/// 结构文件中坐标分量的绝对值上限
pub const MAX_STRUCTURE_OFFSET: f64 = 4096.0;

#[derive(Debug, Deserialize)]
struct RawPosition {
    x: f64,
    y: f64,
    z: f64,
}

/// 结构文件中的一个方块：`{ "type": id, "position": { "x", "y", "z" } }`
#[derive(Debug, Deserialize)]
struct RawBlock {
    #[serde(rename = "type")]
    kind: u8,
    position: RawPosition,
}

/// 结构中的单个方块（相对坐标）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructureBlock {
    pub kind: BlockKind,
    pub offset: IVec3,
}

/// 四舍五入到整数格；非有限值或超出范围返回 None
fn offset_axis(value: f64) -> Option<i32> {
    let rounded = value.round();
    (rounded.is_finite() && rounded.abs() <= MAX_STRUCTURE_OFFSET).then_some(rounded as i32)
}

/// 预制结构 - 已归一化，最小 x/y/z 均为 0
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    blocks: Vec<StructureBlock>,
    size: IVec3,
}

impl Structure {
    /// 归一化方块列表；空列表或尺寸超出 i32 时返回 None
    pub fn from_blocks(blocks: Vec<StructureBlock>) -> Option<Self> {
        let min = blocks.iter().map(|b| b.offset).reduce(IVec3::min)?;
        let max = blocks.iter().map(|b| b.offset).reduce(IVec3::max)?;
        let extent = |hi: i32, lo: i32| hi.checked_sub(lo)?.checked_add(1);
        let size = IVec3::new(
            extent(max.x, min.x)?,
            extent(max.y, min.y)?,
            extent(max.z, min.z)?,
        );
        let blocks = blocks
            .into_iter()
            .map(|b| StructureBlock {
                kind: b.kind,
                offset: b.offset - min,
            })
            .collect();
        Some(Self { blocks, size })
    }

    /// 从 JSON 文本解析，未知方块 ID 会被跳过
    pub fn from_json_str(text: &str, path: &Path) -> Result<Self, StructureError> {
        let raw: Vec<RawBlock> = serde_json::from_str(text).map_err(|source| StructureError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let mut blocks = Vec::with_capacity(raw.len());
        for block in raw {
            let Some(kind) = BlockKind::from_id(block.kind).filter(|k| !k.is_empty()) else {
                warn!("Skipping unknown block id {} in {}", block.kind, path.display());
                continue;
            };
            let p = block.position;
            let (Some(x), Some(y), Some(z)) = (offset_axis(p.x), offset_axis(p.y), offset_axis(p.z)) else {
                return Err(StructureError::OutOfRange {
                    path: path.to_path_buf(),
                });
            };
            blocks.push(StructureBlock {
                kind,
                offset: IVec3::new(x, y, z),
            });
        }

        Self::from_blocks(blocks).ok_or_else(|| StructureError::Empty {
            path: path.to_path_buf(),
        })
    }

    /// 从文件加载
    pub fn load(path: &Path) -> Result<Self, StructureError> {
        let text = std::fs::read_to_string(path).map_err(|source| StructureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text, path)
    }

    pub fn blocks(&self) -> &[StructureBlock] {
        &self.blocks
    }

    /// 包围尺寸（格数）
    pub fn size(&self) -> IVec3 {
        self.size
    }
}

/// 结构库 - 可用的树木模型与唯一的建筑
#[derive(Debug, Clone, Default)]
pub struct StructureLibrary {
    pub trees: Vec<Arc<Structure>>,
    pub building: Option<Arc<Structure>>,
}

impl StructureLibrary {
    pub fn new(trees: Vec<Structure>, building: Option<Structure>) -> Self {
        Self {
            trees: trees.into_iter().map(Arc::new).collect(),
            building: building.map(Arc::new),
        }
    }

    /// 从资源目录加载：`trees/index.json` 列出树木文件，`building.json` 为建筑
    ///
    /// 任何加载失败都只记录警告并跳过对应结构
    pub fn load(dir: &Path) -> Self {
        let mut library = Self::default();

        match Self::tree_files(dir) {
            Ok(files) => {
                for file in files {
                    match Structure::load(&dir.join("trees").join(&file)) {
                        Ok(tree) => library.trees.push(Arc::new(tree)),
                        Err(err) => warn!("Tree model omitted: {}", err),
                    }
                }
            }
            Err(err) => warn!("No tree models loaded: {}", err),
        }

        match Structure::load(&dir.join("building.json")) {
            Ok(building) => library.building = Some(Arc::new(building)),
            Err(err) => warn!("Building omitted: {}", err),
        }

        library
    }

    fn tree_files(dir: &Path) -> Result<Vec<String>, StructureError> {
        let path = dir.join("trees").join("index.json");
        let text = std::fs::read_to_string(&path).map_err(|source| StructureError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| StructureError::Parse { path, source })
    }
}

/// 结构类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureKind {
    Tree,
    Building,
}

/// 已放置的结构
#[derive(Debug, Clone)]
pub struct PlacedStructure {
    pub kind: StructureKind,
    /// 结构最小角在区块内的局部坐标
    pub origin: IVec3,
    pub structure: Arc<Structure>,
    /// 世界坐标包围盒
    pub bounds: Aabb,
}

impl PlacedStructure {
    fn new(kind: StructureKind, chunk: &Chunk, origin: IVec3, structure: Arc<Structure>) -> Self {
        let min = (chunk.origin() + origin).as_vec3();
        let bounds = Aabb::new(min, min + structure.size().as_vec3());
        Self {
            kind,
            origin,
            structure,
            bounds,
        }
    }
}

/// 由世界坐标派生的随机种子，保证重新生成时选中相同的树
fn position_seed(pos: IVec3) -> u64 {
    (pos.x as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (pos.z as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
        ^ (pos.y as u64).wrapping_mul(0x1656_67B1_9E37_79F9)
}

/// 结构放置器 - 在地形生成后把树木和建筑挂到区块上
pub struct StructurePlacer<'a> {
    library: &'a StructureLibrary,
    building: &'a BuildingParams,
}

impl<'a> StructurePlacer<'a> {
    pub fn new(library: &'a StructureLibrary, building: &'a BuildingParams) -> Self {
        Self { library, building }
    }

    /// 每个树苗上方放一棵树（水平居中）；带建筑的区块在第一棵树附近放置建筑
    pub fn place(&self, chunk: &mut Chunk, has_building: bool) {
        let saplings = chunk.saplings().to_vec();

        if !self.library.trees.is_empty() {
            for sapling in &saplings {
                let mut rng = fastrand::Rng::with_seed(position_seed(chunk.origin() + *sapling));
                let tree = self.library.trees[rng.usize(..self.library.trees.len())].clone();
                let size = tree.size();
                // 树干对准树苗，最低层位于树苗上方一格
                let origin = *sapling + IVec3::new(-(size.x / 2), 1, -(size.z / 2));
                let placed = PlacedStructure::new(StructureKind::Tree, chunk, origin, tree);
                chunk.attach_structure(placed);
            }
        }

        if !has_building {
            return;
        }
        let (Some(anchor), Some(building)) = (saplings.first(), &self.library.building) else {
            return;
        };
        let origin = self.building_origin(*anchor, building.size());
        debug!(
            "Placing building in chunk ({}, {}) at {}",
            chunk.coord().x,
            chunk.coord().z,
            origin
        );
        let placed = PlacedStructure::new(StructureKind::Building, chunk, origin, building.clone());
        chunk.attach_structure(placed);
    }

    /// 建筑位置：相对树苗偏移 (5, 3, 7)，并压低使顶部不超过最大高度
    pub fn building_origin(&self, sapling: IVec3, size: IVec3) -> IVec3 {
        let base = (sapling.y + 3).min(self.building.max_top - size.y).max(0);
        IVec3::new(sapling.x + 5, base, sapling.z + 7)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::chunk::ChunkCoord;
    use crate::voxel::config::WorldParams;
    use bevy::math::Vec3;

    fn block(kind: BlockKind, x: i32, y: i32, z: i32) -> StructureBlock {
        StructureBlock {
            kind,
            offset: IVec3::new(x, y, z),
        }
    }

    fn small_tree() -> Structure {
        Structure::from_blocks(vec![
            block(BlockKind::Log, 0, 0, 0),
            block(BlockKind::Log, 0, 1, 0),
            block(BlockKind::Leaves, -1, 2, -1),
            block(BlockKind::Leaves, 1, 2, 1),
        ])
        .unwrap()
    }

    fn chunk_with_saplings(saplings: &[IVec3]) -> Chunk {
        let mut params = WorldParams::default();
        params.chunk_width = 16;
        params.chunk_height = 16;
        let mut chunk = Chunk::empty(ChunkCoord::new(1, -1), &params);
        for s in saplings {
            chunk.set_kind(s.x, s.y, s.z, BlockKind::Sapling);
            chunk.record_sapling(*s);
        }
        chunk
    }

    #[test]
    fn test_normalize_moves_minimum_to_origin() {
        let tree = small_tree();
        let min = tree.blocks().iter().map(|b| b.offset).reduce(IVec3::min).unwrap();
        assert_eq!(min, IVec3::ZERO);
        assert_eq!(tree.size(), IVec3::new(3, 3, 3));
        assert_eq!(tree.blocks()[0].offset, IVec3::new(1, 0, 1));
    }

    #[test]
    fn test_empty_structure_is_rejected() {
        assert!(Structure::from_blocks(Vec::new()).is_none());
        let err = Structure::from_json_str("[]", Path::new("empty.json")).unwrap_err();
        assert!(matches!(err, StructureError::Empty { .. }));
    }

    #[test]
    fn test_parse_json_skips_unknown_ids() {
        let text = r#"[
            { "type": 4, "position": { "x": 10, "y": 5, "z": -3 } },
            { "type": 99, "position": { "x": 0, "y": 0, "z": 0 } },
            { "type": 5, "position": { "x": 11, "y": 6, "z": -3 } }
        ]"#;
        let tree = Structure::from_json_str(text, Path::new("tree.json")).unwrap();
        assert_eq!(tree.blocks().len(), 2);
        assert_eq!(tree.blocks()[0], block(BlockKind::Log, 0, 0, 0));
        assert_eq!(tree.blocks()[1], block(BlockKind::Leaves, 1, 1, 0));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let err = Structure::from_json_str("{ not json", Path::new("bad.json")).unwrap_err();
        assert!(matches!(err, StructureError::Parse { .. }));
    }

    #[test]
    fn test_huge_coordinates_are_rejected() {
        let json = r#"[
            { "type": 4, "position": { "x": -3e9, "y": 0, "z": 0 } },
            { "type": 4, "position": { "x": 3e9, "y": 0, "z": 0 } }
        ]"#;
        let err = Structure::from_json_str(json, Path::new("huge.json")).unwrap_err();
        assert!(matches!(err, StructureError::OutOfRange { .. }));

        // 直接构造时跨度溢出也不会崩溃
        let blocks = vec![
            block(BlockKind::Log, i32::MIN, 0, 0),
            block(BlockKind::Log, i32::MAX, 0, 0),
        ];
        assert!(Structure::from_blocks(blocks).is_none());
    }

    #[test]
    fn test_missing_directory_loads_nothing() {
        let library = StructureLibrary::load(Path::new("/nonexistent/terravox/structures"));
        assert!(library.trees.is_empty());
        assert!(library.building.is_none());
    }

    #[test]
    fn test_trees_anchor_above_saplings() {
        let library = StructureLibrary::new(vec![small_tree()], None);
        let params = BuildingParams {
            interval: 20,
            max_top: 16,
        };
        let mut chunk = chunk_with_saplings(&[IVec3::new(2, 5, 3), IVec3::new(9, 6, 9)]);
        StructurePlacer::new(&library, &params).place(&mut chunk, false);

        assert_eq!(chunk.structures().len(), 2);
        let first = &chunk.structures()[0];
        assert_eq!(first.kind, StructureKind::Tree);
        assert_eq!(first.origin, IVec3::new(1, 6, 2));
        // 区块 (1, -1) 的原点为 (16, 0, -16)
        assert_eq!(first.bounds.min, Vec3::new(17.0, 6.0, -14.0));
        assert_eq!(first.bounds.max, Vec3::new(20.0, 9.0, -11.0));
        // 树苗本身留在体素数组中
        assert_eq!(chunk.get_block(2, 5, 3).unwrap().kind, BlockKind::Sapling);
    }

    #[test]
    fn test_tree_choice_is_reproducible() {
        let library = StructureLibrary::new(vec![small_tree(), small_tree(), small_tree()], None);
        let params = BuildingParams {
            interval: 20,
            max_top: 16,
        };
        let saplings = [IVec3::new(1, 4, 1), IVec3::new(7, 4, 7), IVec3::new(12, 4, 2)];
        let mut a = chunk_with_saplings(&saplings);
        let mut b = chunk_with_saplings(&saplings);
        StructurePlacer::new(&library, &params).place(&mut a, false);
        StructurePlacer::new(&library, &params).place(&mut b, false);
        for (pa, pb) in a.structures().iter().zip(b.structures()) {
            assert!(Arc::ptr_eq(&pa.structure, &pb.structure));
        }
    }

    #[test]
    fn test_building_is_clamped_below_max_top() {
        let building = Structure::from_blocks(vec![
            block(BlockKind::Stone, 0, 0, 0),
            block(BlockKind::Stone, 0, 5, 0),
        ])
        .unwrap();
        let library = StructureLibrary::new(vec![small_tree()], Some(building));
        let params = BuildingParams {
            interval: 20,
            max_top: 16,
        };

        let mut chunk = chunk_with_saplings(&[IVec3::new(1, 12, 1), IVec3::new(8, 3, 8)]);
        StructurePlacer::new(&library, &params).place(&mut chunk, true);

        let buildings: Vec<_> = chunk
            .structures()
            .iter()
            .filter(|s| s.kind == StructureKind::Building)
            .collect();
        assert_eq!(buildings.len(), 1);
        // 12 + 3 + 6 > 16，基座压低到 16 - 6
        assert_eq!(buildings[0].origin, IVec3::new(6, 10, 8));
        assert!(buildings[0].bounds.max.y <= 16.0);
    }

    #[test]
    fn test_low_building_keeps_offset() {
        let placer_params = BuildingParams {
            interval: 20,
            max_top: 16,
        };
        let library = StructureLibrary::default();
        let placer = StructurePlacer::new(&library, &placer_params);
        assert_eq!(
            placer.building_origin(IVec3::new(2, 4, 2), IVec3::new(3, 5, 3)),
            IVec3::new(7, 7, 9)
        );
    }

    #[test]
    fn test_no_building_without_flag_or_saplings() {
        let building = small_tree();
        let library = StructureLibrary::new(Vec::new(), Some(building));
        let params = BuildingParams {
            interval: 20,
            max_top: 16,
        };

        let mut chunk = chunk_with_saplings(&[IVec3::new(1, 2, 1)]);
        StructurePlacer::new(&library, &params).place(&mut chunk, false);
        assert!(chunk.structures().is_empty());

        let mut bare = chunk_with_saplings(&[]);
        StructurePlacer::new(&library, &params).place(&mut bare, true);
        assert!(bare.structures().is_empty());
    }
}
