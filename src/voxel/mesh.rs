//! 网格构建 - 把实例列表和结构方块合并成带顶点色的立方体网格

use bevy::mesh::{Indices, Mesh, PrimitiveTopology, VertexAttributeValues};
use bevy::prelude::*;

use crate::voxel::block::BlockKind;
use crate::voxel::chunk::NEIGHBOR_OFFSETS;
use crate::voxel::structure::Structure;

// ============================================================================
// 立方体网格构建器
// ============================================================================

/// 合并立方体网格构建器
#[derive(Default)]
pub struct CubeMeshBuilder {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    colors: Vec<[f32; 4]>,
    indices: Vec<u32>,
}

impl CubeMeshBuilder {
    pub fn with_capacity(cubes: usize) -> Self {
        Self {
            positions: Vec::with_capacity(cubes * 24),
            normals: Vec::with_capacity(cubes * 24),
            colors: Vec::with_capacity(cubes * 24),
            indices: Vec::with_capacity(cubes * 36),
        }
    }

    /// 添加一个面片（两个三角形）
    fn add_face(&mut self, vertices: [[f32; 3]; 4], normal: [f32; 3], color: [f32; 4]) {
        let base = self.positions.len() as u32;
        for pos in vertices {
            self.positions.push(pos);
            self.normals.push(normal);
            self.colors.push(color);
        }
        self.indices
            .extend_from_slice(&[base, base + 2, base + 1, base, base + 3, base + 2]);
    }

    /// 在 `pos` 处添加一个单位立方体，顶面使用方块的顶面颜色
    pub fn add_cube(&mut self, pos: IVec3, kind: BlockKind) {
        let render = kind.def().render;
        let (x, y, z) = (pos.x as f32, pos.y as f32, pos.z as f32);
        for dir in NEIGHBOR_OFFSETS {
            let color = if dir == IVec3::Y {
                render.top()
            } else {
                render.color
            };
            self.add_face(get_face_vertices(x, y, z, dir), dir.as_vec3().to_array(), color);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn build(self) -> Mesh {
        let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, default());
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, self.positions);
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, self.normals);
        mesh.insert_attribute(
            Mesh::ATTRIBUTE_COLOR,
            VertexAttributeValues::Float32x4(self.colors),
        );
        mesh.insert_indices(Indices::U32(self.indices));
        mesh
    }
}

/// 一种方块类型的全部实例合并为一个网格（区块局部坐标）
pub fn build_instance_mesh(kind: BlockKind, instances: &[IVec3]) -> Mesh {
    let mut builder = CubeMeshBuilder::with_capacity(instances.len());
    for &pos in instances {
        builder.add_cube(pos, kind);
    }
    builder.build()
}

/// 结构网格（结构局部坐标），按透明与否分成两份
pub fn build_structure_meshes(structure: &Structure) -> (Option<Mesh>, Option<Mesh>) {
    let mut opaque = CubeMeshBuilder::default();
    let mut translucent = CubeMeshBuilder::default();
    for block in structure.blocks() {
        if block.kind.is_translucent() {
            translucent.add_cube(block.offset, block.kind);
        } else {
            opaque.add_cube(block.offset, block.kind);
        }
    }
    let finish = |builder: CubeMeshBuilder| (!builder.is_empty()).then(|| builder.build());
    (finish(opaque), finish(translucent))
}

// ============================================================================
// 面片顶点计算
// ============================================================================

/// 根据方向获取面片的4个顶点坐标
/// 顶点顺序确保逆时针环绕（用于正确的面剔除）
pub fn get_face_vertices(x: f32, y: f32, z: f32, dir: IVec3) -> [[f32; 3]; 4] {
    match (dir.x, dir.y, dir.z) {
        // 右面 (+X)
        (1, 0, 0) => [
            [x + 1.0, y, z],
            [x + 1.0, y, z + 1.0],
            [x + 1.0, y + 1.0, z + 1.0],
            [x + 1.0, y + 1.0, z],
        ],
        // 左面 (-X)
        (-1, 0, 0) => [
            [x, y, z + 1.0],
            [x, y, z],
            [x, y + 1.0, z],
            [x, y + 1.0, z + 1.0],
        ],
        // 上面 (+Y)
        (0, 1, 0) => [
            [x, y + 1.0, z],
            [x + 1.0, y + 1.0, z],
            [x + 1.0, y + 1.0, z + 1.0],
            [x, y + 1.0, z + 1.0],
        ],
        // 下面 (-Y)
        (0, -1, 0) => [
            [x, y, z + 1.0],
            [x + 1.0, y, z + 1.0],
            [x + 1.0, y, z],
            [x, y, z],
        ],
        // 前面 (+Z)
        (0, 0, 1) => [
            [x + 1.0, y, z + 1.0],
            [x, y, z + 1.0],
            [x, y + 1.0, z + 1.0],
            [x + 1.0, y + 1.0, z + 1.0],
        ],
        // 后面 (-Z)
        (0, 0, -1) => [
            [x, y, z],
            [x + 1.0, y, z],
            [x + 1.0, y + 1.0, z],
            [x, y + 1.0, z],
        ],
        _ => [[0.0; 3]; 4],
    }
}
