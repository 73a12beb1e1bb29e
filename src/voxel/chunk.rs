//! 区块数据结构

use std::collections::HashMap;

use bevy::math::IVec3;

use crate::voxel::block::BlockKind;
use crate::voxel::config::WorldParams;
use crate::voxel::structure::PlacedStructure;

/// 六个轴向邻居方向
pub const NEIGHBOR_OFFSETS: [IVec3; 6] = [
    IVec3::new(1, 0, 0),
    IVec3::new(-1, 0, 0),
    IVec3::new(0, 1, 0),
    IVec3::new(0, -1, 0),
    IVec3::new(0, 0, 1),
    IVec3::new(0, 0, -1),
];

/// 区块坐标 - 用于标识世界中区块的位置
/// 注意：这是区块坐标，不是体素（方块）坐标；一个单位等于一个区块宽度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub z: i32,
}

impl ChunkCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// 从世界坐标转换为区块坐标与区块内局部坐标
    /// 使用欧几里德除法确保负坐标向负无穷取整
    pub fn from_world(world_x: i32, world_z: i32, width: i32) -> (Self, i32, i32) {
        let coord = Self {
            x: world_x.div_euclid(width),
            z: world_z.div_euclid(width),
        };
        (coord, world_x.rem_euclid(width), world_z.rem_euclid(width))
    }

    /// 获取区块在世界坐标系中的起始位置
    pub fn world_origin(&self, width: i32) -> IVec3 {
        IVec3::new(self.x * width, 0, self.z * width)
    }

    /// 切比雪夫距离（正方形渲染范围判断）
    pub fn chebyshev_distance_to(&self, other: &ChunkCoord) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }

    /// 欧几里德距离平方（用于加载优先级排序）
    pub fn distance_squared_to(&self, other: &ChunkCoord) -> i32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        dx * dx + dz * dz
    }
}

/// 体素 - 方块类型与渲染实例槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Voxel {
    pub kind: BlockKind,
    /// 在所属区块该类型实例列表中的下标，被遮挡或为空气时为 None
    pub instance_slot: Option<u32>,
}

/// 区块 - 固定尺寸 W×H×W 的体素容器
#[derive(Debug, Clone)]
pub struct Chunk {
    coord: ChunkCoord,
    width: i32,
    height: i32,
    /// 一维体素数组，通过 index() 计算下标
    voxels: Vec<Voxel>,
    /// 每种方块一个实例列表，元素为区块内局部坐标
    instances: HashMap<BlockKind, Vec<IVec3>>,
    /// 地形生成阶段记录的树苗位置（扫描顺序）
    saplings: Vec<IVec3>,
    /// 附着在区块上的树木与建筑几何体
    structures: Vec<PlacedStructure>,
}

impl Chunk {
    /// 创建一个全部为空气的区块
    pub fn empty(coord: ChunkCoord, params: &WorldParams) -> Self {
        let params = params.validate();
        Self {
            coord,
            width: params.chunk_width,
            height: params.chunk_height,
            voxels: vec![Voxel::default(); params.voxel_count()],
            instances: HashMap::new(),
            saplings: Vec::new(),
            structures: Vec::new(),
        }
    }

    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// 区块原点（世界坐标）
    pub fn origin(&self) -> IVec3 {
        self.coord.world_origin(self.width)
    }

    /// 坐标是否位于区块内
    #[inline]
    pub fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        (0..self.width).contains(&x) && (0..self.height).contains(&y) && (0..self.width).contains(&z)
    }

    /// 将三维坐标转换为一维数组索引（Y-Z-X 顺序），越界返回 None
    #[inline]
    fn index(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        let width = self.width as usize;
        self.contains(x, y, z)
            .then(|| (y as usize * width + z as usize) * width + x as usize)
    }

    /// 查询体素；越界返回 None（与空气区分）
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> Option<&Voxel> {
        self.index(x, y, z).map(|i| &self.voxels[i])
    }

    /// 全部体素（按内部索引顺序）
    pub fn voxels(&self) -> &[Voxel] {
        &self.voxels
    }

    /// 地形生成时写入方块类型，不维护实例列表
    pub(crate) fn set_kind(&mut self, x: i32, y: i32, z: i32, kind: BlockKind) {
        if let Some(i) = self.index(x, y, z) {
            self.voxels[i].kind = kind;
        }
    }

    pub(crate) fn record_sapling(&mut self, pos: IVec3) {
        self.saplings.push(pos);
    }

    /// 本区块生成时放置的树苗（局部坐标，扫描顺序）
    pub fn saplings(&self) -> &[IVec3] {
        &self.saplings
    }

    /// 越界视为空
    fn is_solid_at(&self, pos: IVec3) -> bool {
        self.get_block(pos.x, pos.y, pos.z)
            .is_some_and(|voxel| voxel.kind.is_solid())
    }

    /// 六个轴向邻居全部为实心时该位置被遮挡（区块外视为空）
    pub fn is_obscured(&self, x: i32, y: i32, z: i32) -> bool {
        let pos = IVec3::new(x, y, z);
        NEIGHBOR_OFFSETS
            .iter()
            .all(|offset| self.is_solid_at(pos + *offset))
    }

    /// 重建全部实例列表：实心且未被遮挡的体素获得一个实例
    pub fn rebuild_instances(&mut self) {
        self.instances.clear();
        for voxel in &mut self.voxels {
            voxel.instance_slot = None;
        }

        for y in 0..self.height {
            for z in 0..self.width {
                for x in 0..self.width {
                    let Some(i) = self.index(x, y, z) else {
                        continue;
                    };
                    if self.voxels[i].kind.is_solid() && !self.is_obscured(x, y, z) {
                        self.push_instance(i, IVec3::new(x, y, z));
                    }
                }
            }
        }
    }

    fn push_instance(&mut self, i: usize, pos: IVec3) {
        let kind = self.voxels[i].kind;
        let list = self.instances.entry(kind).or_default();
        self.voxels[i].instance_slot = Some(list.len() as u32);
        list.push(pos);
    }

    /// 指定方块类型的实例变换（局部坐标）
    pub fn instances(&self, kind: BlockKind) -> &[IVec3] {
        self.instances.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 遍历所有非空实例列表
    pub fn instance_lists(&self) -> impl Iterator<Item = (BlockKind, &[IVec3])> {
        self.instances
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(kind, list)| (*kind, list.as_slice()))
    }

    /// 移除方块
    ///
    /// 空气、水和越界坐标不做任何操作并返回 false。
    /// 若方块有渲染实例，将该类型列表的最后一个实例交换到空出的槽位，
    /// 并更新被移动体素的槽位。邻居的可见性由调用方负责重新计算。
    pub fn remove_block(&mut self, x: i32, y: i32, z: i32) -> bool {
        let Some(i) = self.index(x, y, z) else {
            return false;
        };
        let voxel = self.voxels[i];
        if !voxel.kind.is_removable() {
            return false;
        }

        if let Some(slot) = voxel.instance_slot {
            let slot = slot as usize;
            if let Some(list) = self.instances.get_mut(&voxel.kind) {
                list.swap_remove(slot);
                if let Some(&moved) = list.get(slot)
                    && let Some(j) = self.index(moved.x, moved.y, moved.z)
                {
                    self.voxels[j].instance_slot = Some(slot as u32);
                }
            }
        }

        self.voxels[i] = Voxel::default();
        true
    }

    /// 若该位置是缺少实例的实心方块，则为其添加渲染实例
    ///
    /// 在相邻方块被移除前调用，返回是否新增了实例
    pub fn reveal_if_obscured(&mut self, x: i32, y: i32, z: i32) -> bool {
        let Some(i) = self.index(x, y, z) else {
            return false;
        };
        let voxel = self.voxels[i];
        if !voxel.kind.is_solid() || voxel.instance_slot.is_some() {
            return false;
        }
        self.push_instance(i, IVec3::new(x, y, z));
        true
    }

    /// 该列最高的可碰撞方块高度
    pub fn surface_height(&self, x: i32, z: i32) -> Option<i32> {
        (0..self.height).rev().find(|&y| {
            self.get_block(x, y, z)
                .is_some_and(|voxel| voxel.kind.collides())
        })
    }

    /// 附加结构几何体（不写入体素数组）
    pub fn attach_structure(&mut self, structure: PlacedStructure) {
        self.structures.push(structure);
    }

    /// 附着在本区块上的结构
    pub fn structures(&self) -> &[PlacedStructure] {
        &self.structures
    }
}
