//! 材质系统

use bevy::prelude::*;

use crate::voxel::block::BlockKind;

/// 区块材质资源 - 颜色来自顶点色，材质本身为白色
#[derive(Resource)]
pub struct ChunkMaterials {
    /// 不透明材质（用于大多数方块）
    pub opaque: Handle<StandardMaterial>,
    /// 透明材质（用于水和树叶）
    pub transparent: Handle<StandardMaterial>,
}

impl ChunkMaterials {
    pub fn for_kind(&self, kind: BlockKind) -> Handle<StandardMaterial> {
        if kind.is_translucent() {
            self.transparent.clone()
        } else {
            self.opaque.clone()
        }
    }
}

/// 初始化材质系统
pub fn setup_materials(mut commands: Commands, mut materials: ResMut<Assets<StandardMaterial>>) {
    let opaque = materials.add(StandardMaterial {
        base_color: Color::WHITE,
        perceptual_roughness: 0.9,
        ..default()
    });

    let transparent = materials.add(StandardMaterial {
        base_color: Color::WHITE,
        perceptual_roughness: 0.3,
        alpha_mode: AlphaMode::Blend,
        ..default()
    });

    commands.insert_resource(ChunkMaterials { opaque, transparent });
}
