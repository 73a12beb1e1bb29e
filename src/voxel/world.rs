//! 体素世界 - 管理已加载区块，按玩家位置流式生成与卸载

use std::collections::HashMap;
use std::sync::Arc;

use bevy::log::{debug, info, warn};
use bevy::math::{IVec3, Vec3};

use crate::physics::{Aabb, VoxelQuery};
use crate::voxel::block::BlockKind;
use crate::voxel::change::{ChangeLog, ChunkChange};
use crate::voxel::chunk::{Chunk, ChunkCoord, NEIGHBOR_OFFSETS, Voxel};
use crate::voxel::config::{MAX_DRAW_DISTANCE, WorldParams};
use crate::voxel::loading::{ChunkGenerator, ChunkRequest};
use crate::voxel::seed::TerrainNoise;
use crate::voxel::structure::StructureLibrary;

/// 体素世界
pub struct World {
    params: WorldParams,
    generator: ChunkGenerator,
    /// 已加载区块，坐标唯一
    chunks: HashMap<ChunkCoord, Chunk>,
    /// 最近一次更新时玩家所在的区块
    agent_chunk: Option<ChunkCoord>,
    /// 累计生成次数，用于决定建筑位置
    generation_counter: u64,
    changes: ChangeLog,
}

impl World {
    pub fn new(params: WorldParams, noise: TerrainNoise, structures: Arc<StructureLibrary>) -> Self {
        let params = params.validate();
        Self {
            params,
            generator: ChunkGenerator::new(params, noise, structures),
            chunks: HashMap::new(),
            agent_chunk: None,
            generation_counter: 0,
            changes: ChangeLog::default(),
        }
    }

    pub fn params(&self) -> &WorldParams {
        &self.params
    }

    /// 生成器副本可以移入异步任务
    pub fn generator(&self) -> &ChunkGenerator {
        &self.generator
    }

    // ========================================================================
    // 坐标转换
    // ========================================================================

    /// 世界坐标 → (区块坐标, 局部 x, 局部 z)，负坐标向负无穷取整
    pub fn world_to_chunk(&self, x: i32, z: i32) -> (ChunkCoord, i32, i32) {
        ChunkCoord::from_world(x, z, self.params.chunk_width)
    }

    /// 区块原点的世界坐标
    pub fn chunk_to_world(&self, coord: ChunkCoord) -> IVec3 {
        coord.world_origin(self.params.chunk_width)
    }

    // ========================================================================
    // 区块流式加载
    // ========================================================================

    pub fn agent_chunk(&self) -> Option<ChunkCoord> {
        self.agent_chunk
    }

    /// 记录玩家所在区块
    pub fn retarget(&mut self, agent_position: Vec3) -> ChunkCoord {
        let (coord, _, _) = self.world_to_chunk(
            agent_position.x.floor() as i32,
            agent_position.z.floor() as i32,
        );
        self.agent_chunk = Some(coord);
        coord
    }

    /// 渲染距离内的全部区块（正方形范围），近的在前
    pub fn desired_chunks(&self) -> Vec<ChunkCoord> {
        let Some(center) = self.agent_chunk else {
            return Vec::new();
        };
        let d = self.params.draw_distance;
        let mut desired: Vec<ChunkCoord> = (-d..=d)
            .flat_map(|dx| (-d..=d).map(move |dz| ChunkCoord::new(center.x + dx, center.z + dz)))
            .collect();
        desired.sort_by_key(|coord| (coord.distance_squared_to(&center), *coord));
        desired
    }

    /// 尚未加载的目标区块
    pub fn missing_chunks(&self) -> Vec<ChunkCoord> {
        self.desired_chunks()
            .into_iter()
            .filter(|coord| !self.chunks.contains_key(coord))
            .collect()
    }

    /// 发出一次生成请求：计数器先加一，每 interval 次带一座建筑
    pub fn request_chunk(&mut self, coord: ChunkCoord) -> ChunkRequest {
        self.generation_counter += 1;
        ChunkRequest {
            coord,
            has_building: self.generation_counter % self.params.building.interval == 0,
        }
    }

    pub fn generation_count(&self) -> u64 {
        self.generation_counter
    }

    /// 加入一个生成完毕的区块；坐标已存在时丢弃
    pub fn insert_chunk(&mut self, chunk: Chunk) -> bool {
        let coord = chunk.coord();
        if self.chunks.contains_key(&coord) {
            return false;
        }
        debug!("Chunk ({}, {}) generated", coord.x, coord.z);
        self.chunks.insert(coord, chunk);
        self.changes.record(ChunkChange::Generated(coord));
        true
    }

    /// 卸载所有不在目标集合中的区块
    pub fn evict_undesired(&mut self) -> Vec<ChunkCoord> {
        let center = self.agent_chunk;
        let d = self.params.draw_distance;
        let mut evicted: Vec<ChunkCoord> = self
            .chunks
            .keys()
            .filter(|coord| center.is_none_or(|c| coord.chebyshev_distance_to(&c) > d))
            .copied()
            .collect();
        evicted.sort();

        for coord in &evicted {
            self.chunks.remove(coord);
            self.changes.record(ChunkChange::Evicted(*coord));
            debug!("Chunk ({}, {}) evicted", coord.x, coord.z);
        }
        evicted
    }

    /// 异步驱动的卸载入口：仍有任务在途或区块缺失时不卸载
    pub fn evict_when_settled(&mut self, generation_pending: bool) -> Vec<ChunkCoord> {
        if generation_pending || !self.missing_chunks().is_empty() {
            return Vec::new();
        }
        self.evict_undesired()
    }

    /// 同步更新：先生成缺失区块，再卸载多余区块
    pub fn tick(&mut self, agent_position: Vec3) {
        self.retarget(agent_position);
        for coord in self.missing_chunks() {
            let request = self.request_chunk(coord);
            let chunk = self.generator.generate(request);
            self.insert_chunk(chunk);
        }
        self.evict_undesired();
    }

    /// 修改渲染距离会丢弃全部区块，下一次更新时重新生成
    pub fn set_draw_distance(&mut self, distance: i32) {
        let distance = distance.clamp(0, MAX_DRAW_DISTANCE);
        if distance == self.params.draw_distance {
            return;
        }
        info!(
            "Draw distance {} -> {}, rebuilding world",
            self.params.draw_distance, distance
        );
        self.params.draw_distance = distance;

        let mut coords: Vec<ChunkCoord> = self.chunks.keys().copied().collect();
        coords.sort();
        self.chunks.clear();
        for coord in coords {
            self.changes.record(ChunkChange::Evicted(coord));
        }
        self.agent_chunk = None;
    }

    // ========================================================================
    // 查询
    // ========================================================================

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn is_loaded(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    /// 世界坐标处的体素；区块未加载或越界返回 None
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> Option<Voxel> {
        let (coord, lx, lz) = self.world_to_chunk(x, z);
        self.chunks.get(&coord)?.get_block(lx, y, lz).copied()
    }

    /// 该列最高的可碰撞方块
    pub fn surface_height(&self, x: i32, z: i32) -> Option<i32> {
        let (coord, lx, lz) = self.world_to_chunk(x, z);
        self.chunks.get(&coord)?.surface_height(lx, lz)
    }

    /// 玩家包围盒是否碰到任何树木或建筑
    pub fn collides_with_structure(&self, bounds: &Aabb) -> bool {
        self.structure_contacts(bounds).next().is_some()
    }

    /// 与给定包围盒相交的所有结构包围盒
    pub fn structure_contacts<'a>(&'a self, bounds: &'a Aabb) -> impl Iterator<Item = &'a Aabb> + 'a {
        self.chunks
            .values()
            .flat_map(|chunk| chunk.structures())
            .map(|placed| &placed.bounds)
            .filter(move |placed| placed.intersects(bounds))
    }

    /// 取走自上次调用以来的区块变更
    pub fn take_changes(&mut self) -> Vec<ChunkChange> {
        self.changes.drain()
    }

    // ========================================================================
    // 修改
    // ========================================================================

    /// 移除世界坐标处的方块
    ///
    /// y = 0 的地板层不可移除；空气、水与未加载位置不做任何操作。
    /// 删除前先让六个邻居（可能位于其他区块）补上渲染实例。
    pub fn remove_block(&mut self, x: i32, y: i32, z: i32) -> bool {
        if y == 0 {
            warn!("Refusing to remove floor block at ({}, {}, {})", x, y, z);
            return false;
        }
        let Some(voxel) = self.get_block(x, y, z) else {
            return false;
        };
        if !voxel.kind.is_removable() {
            return false;
        }

        let pos = IVec3::new(x, y, z);
        for offset in NEIGHBOR_OFFSETS {
            self.reveal_if_obscured(pos + offset);
        }

        let (coord, lx, lz) = self.world_to_chunk(x, z);
        let removed = self
            .chunks
            .get_mut(&coord)
            .is_some_and(|chunk| chunk.remove_block(lx, y, lz));
        if removed {
            debug!("Removed {:?} at ({}, {}, {})", voxel.kind, x, y, z);
            self.changes.record(ChunkChange::Mutated(coord));
        }
        removed
    }

    fn reveal_if_obscured(&mut self, pos: IVec3) {
        let (coord, lx, lz) = self.world_to_chunk(pos.x, pos.z);
        let revealed = self
            .chunks
            .get_mut(&coord)
            .is_some_and(|chunk| chunk.reveal_if_obscured(lx, pos.y, lz));
        if revealed {
            self.changes.record(ChunkChange::Mutated(coord));
        }
    }
}

impl VoxelQuery for World {
    fn block_kind(&self, pos: IVec3) -> Option<BlockKind> {
        self.get_block(pos.x, pos.y, pos.z).map(|voxel| voxel.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use crate::voxel::structure::{Structure, StructureBlock, StructurePlacer};
    use noise::Constant;

    /// 宽 4、高 8 的平坦世界，地表 y = 4
    fn flat_world(draw_distance: i32) -> World {
        let mut params = WorldParams::default();
        params.chunk_width = 4;
        params.chunk_height = 8;
        params.terrain.max_height = 8;
        params.terrain.water_level = 0;
        params.draw_distance = draw_distance;
        World::new(
            params,
            TerrainNoise::new(Constant::new(0.0), Constant::new(0.0)),
            Arc::new(StructureLibrary::default()),
        )
    }

    fn loaded(world: &World) -> HashSet<ChunkCoord> {
        world.chunks().map(Chunk::coord).collect()
    }

    fn square(center: ChunkCoord, d: i32) -> HashSet<ChunkCoord> {
        (-d..=d)
            .flat_map(|dx| (-d..=d).map(move |dz| ChunkCoord::new(center.x + dx, center.z + dz)))
            .collect()
    }

    #[test]
    fn test_tick_loads_exact_square() {
        let mut world = flat_world(2);
        world.tick(Vec3::new(1.0, 10.0, 1.0));
        assert_eq!(loaded(&world), square(ChunkCoord::new(0, 0), 2));

        // 向负方向移动到区块 (-3, -1)
        world.tick(Vec3::new(-9.5, 10.0, -0.5));
        assert_eq!(world.agent_chunk(), Some(ChunkCoord::new(-3, -1)));
        assert_eq!(loaded(&world), square(ChunkCoord::new(-3, -1), 2));
        assert!(world.missing_chunks().is_empty());
    }

    #[test]
    fn test_generation_precedes_eviction() {
        let mut world = flat_world(1);
        world.tick(Vec3::new(1.0, 10.0, 1.0));
        world.take_changes();

        world.tick(Vec3::new(5.0, 10.0, 1.0));
        let changes = world.take_changes();
        let first_eviction = changes
            .iter()
            .position(|c| matches!(c, ChunkChange::Evicted(_)))
            .unwrap();
        assert!(changes[..first_eviction]
            .iter()
            .all(|c| matches!(c, ChunkChange::Generated(_))));
        assert_eq!(changes.len(), 6);
    }

    #[test]
    fn test_eviction_waits_for_pending_generation() {
        let mut world = flat_world(1);
        world.tick(Vec3::new(1.0, 10.0, 1.0));
        let before = loaded(&world);

        // 移动到区块 (1, 0)：x = 2 这一列缺失
        world.retarget(Vec3::new(5.0, 10.0, 1.0));
        let missing = world.missing_chunks();
        assert_eq!(missing.len(), 3);
        assert!(world.evict_when_settled(false).is_empty());
        assert_eq!(loaded(&world), before);

        // 请求全部发出，但只有部分结果返回
        let requests: Vec<ChunkRequest> = missing.iter().map(|c| world.request_chunk(*c)).collect();
        for request in &requests[..2] {
            let chunk = world.generator().generate(*request);
            world.insert_chunk(chunk);
        }
        assert!(world.evict_when_settled(true).is_empty());
        assert_eq!(world.chunks().count(), 11);

        // 结果全部到达但仍有任务在途
        let chunk = world.generator().generate(requests[2]);
        world.insert_chunk(chunk);
        assert!(world.evict_when_settled(true).is_empty());
        assert_eq!(world.chunks().count(), 12);

        let evicted = world.evict_when_settled(false);
        assert_eq!(
            evicted,
            vec![ChunkCoord::new(-1, -1), ChunkCoord::new(-1, 0), ChunkCoord::new(-1, 1)]
        );
        assert_eq!(loaded(&world), square(ChunkCoord::new(1, 0), 1));
    }

    #[test]
    fn test_get_block_negative_world_coordinates() {
        let mut world = flat_world(1);
        world.tick(Vec3::new(0.0, 10.0, 0.0));

        assert_eq!(world.get_block(-1, 4, -1).unwrap().kind, BlockKind::Grass);
        assert_eq!(world.get_block(-4, 5, -4).unwrap().kind, BlockKind::Empty);
        // 区块 (-2, 0) 未加载
        assert!(world.get_block(-5, 4, 0).is_none());
        // 高度越界
        assert!(world.get_block(0, 8, 0).is_none());
        assert_eq!(world.block_kind(IVec3::new(-1, 3, -1)), Some(BlockKind::Dirt));
    }

    #[test]
    fn test_world_to_chunk_round_trip() {
        let world = flat_world(1);
        for x in -20..20 {
            for z in [-13, -4, -1, 0, 3, 17] {
                let (coord, lx, lz) = world.world_to_chunk(x, z);
                let origin = world.chunk_to_world(coord);
                assert_eq!((origin.x + lx, origin.z + lz), (x, z));
            }
        }
    }

    #[test]
    fn test_remove_block_reveals_neighbor() {
        let mut world = flat_world(1);
        world.tick(Vec3::new(2.0, 10.0, 2.0));
        world.take_changes();

        let coord = ChunkCoord::new(0, 0);
        let grass = world.chunk(coord).unwrap().instances(BlockKind::Grass).len();
        assert_eq!(world.get_block(1, 3, 1).unwrap().instance_slot, None);

        assert!(world.remove_block(1, 4, 1));
        assert_eq!(world.get_block(1, 4, 1).unwrap().kind, BlockKind::Empty);
        assert_eq!(
            world.chunk(coord).unwrap().instances(BlockKind::Grass).len(),
            grass - 1
        );
        assert!(world.get_block(1, 3, 1).unwrap().instance_slot.is_some());
        assert_eq!(world.take_changes(), vec![ChunkChange::Mutated(coord)]);
    }

    #[test]
    fn test_remove_block_across_chunk_border() {
        let mut world = flat_world(1);
        world.tick(Vec3::new(2.0, 10.0, 2.0));

        // 区块 (-1, 0) 的局部 x = 3，挖到下面一层
        assert!(world.remove_block(-1, 4, 1));
        assert!(world.remove_block(-1, 3, 1));
        assert!(world.get_block(-1, 2, 1).unwrap().instance_slot.is_some());
        assert!(world.get_block(-2, 3, 1).unwrap().instance_slot.is_some());
    }

    #[test]
    fn test_floor_and_noop_removals() {
        let mut world = flat_world(1);
        world.tick(Vec3::new(2.0, 10.0, 2.0));
        world.take_changes();

        assert!(!world.remove_block(1, 0, 1));
        assert_eq!(world.get_block(1, 0, 1).unwrap().kind, BlockKind::Stone);
        assert!(!world.remove_block(1, 6, 1));
        assert!(!world.remove_block(100, 4, 100));
        assert!(world.take_changes().is_empty());
    }

    #[test]
    fn test_building_counter() {
        let mut world = flat_world(1);
        let flags: Vec<bool> = (0..6)
            .map(|i| world.request_chunk(ChunkCoord::new(i, 0)).has_building)
            .collect();
        let expected: Vec<bool> = (1..=6).map(|n| n % 20 == 0).collect();
        assert_eq!(flags, expected);

        let mut params = *world.params();
        params.building.interval = 3;
        let mut world = World::new(
            params,
            TerrainNoise::new(Constant::new(0.0), Constant::new(0.0)),
            Arc::new(StructureLibrary::default()),
        );
        let flags: Vec<bool> = (0..6)
            .map(|i| world.request_chunk(ChunkCoord::new(i, 0)).has_building)
            .collect();
        assert_eq!(flags, vec![false, false, true, false, false, true]);
    }

    #[test]
    fn test_draw_distance_change_rebuilds() {
        let mut world = flat_world(1);
        world.tick(Vec3::new(2.0, 10.0, 2.0));
        world.take_changes();
        assert_eq!(world.chunks().count(), 9);

        world.set_draw_distance(2);
        assert_eq!(world.chunks().count(), 0);
        let changes = world.take_changes();
        assert_eq!(changes.len(), 9);
        assert!(changes.iter().all(|c| matches!(c, ChunkChange::Evicted(_))));

        world.tick(Vec3::new(2.0, 10.0, 2.0));
        assert_eq!(loaded(&world), square(ChunkCoord::new(0, 0), 2));
        assert_eq!(world.generation_count(), 9 + 25);
    }

    #[test]
    fn test_surface_height() {
        let mut world = flat_world(0);
        world.tick(Vec3::new(2.0, 10.0, 2.0));
        assert_eq!(world.surface_height(3, 3), Some(4));
        assert_eq!(world.surface_height(9, 9), None);
    }

    #[test]
    fn test_collides_with_structure() {
        let mut world = flat_world(0);
        let tree = Structure::from_blocks(vec![
            StructureBlock {
                kind: BlockKind::Log,
                offset: IVec3::ZERO,
            },
            StructureBlock {
                kind: BlockKind::Leaves,
                offset: IVec3::new(0, 2, 0),
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

        // 树干位于 [1, 2] x [5, 8] x [1, 2]
        let touching = Aabb::from_center(Vec3::new(1.5, 6.0, 2.4), Vec3::new(0.5, 0.875, 0.5));
        let clear = Aabb::from_center(Vec3::new(3.5, 6.0, 3.5), Vec3::new(0.25, 0.875, 0.25));
        assert!(world.collides_with_structure(&touching));
        assert!(!world.collides_with_structure(&clear));
    }
}
