//! 体素世界的系统函数

use std::collections::HashSet;

use bevy::prelude::*;
use bevy::tasks::AsyncComputeTaskPool;
use futures_lite::future;

use crate::voxel::chunk::ChunkCoord;
use crate::voxel::components::{
    ChunkEntities, ChunkGenerationTask, ChunkLoadQueue, ChunkMarker, StreamingAnchor, VoxelWorld,
};
use crate::voxel::materials::ChunkMaterials;
use crate::voxel::mesh::{build_instance_mesh, build_structure_meshes};

// ============================================================================
// 区块加载系统
// ============================================================================

/// 更新区块加载
/// 根据锚点位置确定目标区块，按距离从近到远派发异步生成任务
pub fn update_chunk_loading(
    mut commands: Commands,
    anchor_query: Query<&Transform, With<StreamingAnchor>>,
    mut world: ResMut<VoxelWorld>,
    mut queue: ResMut<ChunkLoadQueue>,
) {
    let Ok(anchor) = anchor_query.single() else {
        return;
    };

    let previous = world.agent_chunk();
    let center = world.retarget(anchor.translation);
    if previous != Some(center) {
        debug!("Streaming anchor entered chunk ({}, {})", center.x, center.z);
    }

    // 限制并发任务数
    let available_slots = queue
        .max_concurrent_tasks
        .saturating_sub(queue.in_flight.len());
    if available_slots == 0 {
        return;
    }

    let to_spawn: Vec<ChunkCoord> = world
        .missing_chunks()
        .into_iter()
        .filter(|coord| !queue.in_flight.contains(coord))
        .take(available_slots)
        .collect();

    let task_pool = AsyncComputeTaskPool::get();
    for coord in to_spawn {
        let request = world.request_chunk(coord);
        let generator = world.generator().clone();
        let task = task_pool.spawn(generator.generate_async(request));

        commands.spawn(ChunkGenerationTask { task, coord });
        queue.in_flight.insert(coord);
    }
}

/// 处理完成的生成任务，结果整体加入世界
pub fn handle_completed_chunk_tasks(
    mut commands: Commands,
    mut world: ResMut<VoxelWorld>,
    mut queue: ResMut<ChunkLoadQueue>,
    mut pending_query: Query<(Entity, &mut ChunkGenerationTask)>,
) {
    for (entity, mut task) in pending_query.iter_mut() {
        // 非阻塞地检查任务是否完成
        if let Some(chunk) = future::block_on(future::poll_once(&mut task.task)) {
            commands.entity(entity).despawn();
            queue.in_flight.remove(&task.coord);
            world.insert_chunk(chunk);
        }
    }
}

/// 目标区块全部到位后再卸载多余区块
pub fn evict_chunks(mut world: ResMut<VoxelWorld>, queue: Res<ChunkLoadQueue>) {
    world.evict_when_settled(!queue.in_flight.is_empty());
}

/// `[` / `]` 调整渲染距离，整个世界随之重建
pub fn adjust_draw_distance(keyboard: Res<ButtonInput<KeyCode>>, mut world: ResMut<VoxelWorld>) {
    let current = world.params().draw_distance;
    if keyboard.just_pressed(KeyCode::BracketLeft) && current > 0 {
        world.set_draw_distance(current - 1);
    } else if keyboard.just_pressed(KeyCode::BracketRight) {
        world.set_draw_distance(current + 1);
    }
}

// ============================================================================
// 渲染同步
// ============================================================================

/// 取走世界的区块变更，重建对应区块的渲染实体
pub fn sync_chunk_meshes(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    materials: Res<ChunkMaterials>,
    mut world: ResMut<VoxelWorld>,
    mut entities: ResMut<ChunkEntities>,
) {
    let changes = world.take_changes();
    let mut handled = HashSet::new();

    for change in changes {
        let coord = change.coord();
        // 同一区块只按最终状态处理一次
        if !handled.insert(coord) {
            continue;
        }

        if let Some(old) = entities.map.remove(&coord) {
            for entity in old {
                commands.entity(entity).despawn();
            }
        }

        let Some(chunk) = world.chunk(coord) else {
            continue;
        };
        let origin = chunk.origin().as_vec3();
        let mut spawned = Vec::new();

        for (kind, instances) in chunk.instance_lists() {
            let entity = commands
                .spawn((
                    Mesh3d(meshes.add(build_instance_mesh(kind, instances))),
                    MeshMaterial3d(materials.for_kind(kind)),
                    Transform::from_translation(origin),
                    ChunkMarker { coord },
                ))
                .id();
            spawned.push(entity);
        }

        for placed in chunk.structures() {
            let translation = origin + placed.origin.as_vec3();
            let (opaque, translucent) = build_structure_meshes(&placed.structure);
            let parts = [
                (opaque, materials.opaque.clone()),
                (translucent, materials.transparent.clone()),
            ];
            for (mesh, material) in parts {
                let Some(mesh) = mesh else {
                    continue;
                };
                let entity = commands
                    .spawn((
                        Mesh3d(meshes.add(mesh)),
                        MeshMaterial3d(material),
                        Transform::from_translation(translation),
                        ChunkMarker { coord },
                    ))
                    .id();
                spawned.push(entity);
            }
        }

        entities.map.insert(coord, spawned);
    }
}
