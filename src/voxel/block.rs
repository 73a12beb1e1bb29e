//! 方块目录 - 方块类型标识、渲染描述与固体属性

use crate::voxel::flags::BlockFlags;

/// 方块种类枚举 - 判别值即方块类型 ID（0 保留给空气）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum BlockKind {
    #[default]
    Empty = 0,
    Grass = 1,
    Dirt = 2,
    Stone = 3,
    Log = 4,
    Leaves = 5,
    Sapling = 6,
    Sand = 7,
    AzaleaLeaves = 8,
    JungleLog = 9,
    Water = 10,
}

/// 渲染描述 - 渲染层据此创建材质
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderDescriptor {
    /// 侧面与底面颜色（sRGBA）
    pub color: [f32; 4],
    /// 顶面颜色，缺省时与侧面相同
    pub top_color: Option<[f32; 4]>,
}

impl RenderDescriptor {
    const fn solid(r: f32, g: f32, b: f32) -> Self {
        Self {
            color: [r, g, b, 1.0],
            top_color: None,
        }
    }

    /// 顶面使用的颜色
    pub fn top(&self) -> [f32; 4] {
        self.top_color.unwrap_or(self.color)
    }
}

/// 方块定义 - 包含方块的所有基础信息
#[derive(Debug, Clone, Copy)]
pub struct BlockDef {
    /// 方块名称
    pub name: &'static str,
    /// 属性标志位
    pub flags: BlockFlags,
    /// 渲染描述
    pub render: RenderDescriptor,
}

const GRASS_TOP: [f32; 4] = [0.36, 0.62, 0.22, 1.0];

impl BlockKind {
    /// 目录中的全部方块（按 ID 排序）
    pub const ALL: [BlockKind; 11] = [
        BlockKind::Empty,
        BlockKind::Grass,
        BlockKind::Dirt,
        BlockKind::Stone,
        BlockKind::Log,
        BlockKind::Leaves,
        BlockKind::Sapling,
        BlockKind::Sand,
        BlockKind::AzaleaLeaves,
        BlockKind::JungleLog,
        BlockKind::Water,
    ];

    /// 方块类型 ID
    pub fn id(self) -> u8 {
        self as u8
    }

    /// 根据 ID 查找方块种类，未知 ID 返回 None
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    /// 获取当前方块种类的完整定义信息
    pub fn def(self) -> BlockDef {
        match self {
            BlockKind::Empty => BlockDef {
                name: "empty",
                flags: BlockFlags::NONE,
                render: RenderDescriptor {
                    color: [0.0; 4],
                    top_color: None,
                },
            },
            BlockKind::Grass => BlockDef {
                name: "grass",
                flags: BlockFlags::TERRAIN,
                render: RenderDescriptor {
                    color: [0.45, 0.32, 0.2, 1.0],
                    top_color: Some(GRASS_TOP),
                },
            },
            BlockKind::Dirt => BlockDef {
                name: "dirt",
                flags: BlockFlags::TERRAIN,
                render: RenderDescriptor::solid(0.45, 0.32, 0.2),
            },
            BlockKind::Stone => BlockDef {
                name: "stone",
                flags: BlockFlags::TERRAIN,
                render: RenderDescriptor::solid(0.5, 0.5, 0.52),
            },
            BlockKind::Log => BlockDef {
                name: "tree_side",
                flags: BlockFlags::TERRAIN,
                render: RenderDescriptor::solid(0.4, 0.27, 0.14),
            },
            BlockKind::Leaves => BlockDef {
                name: "leaves",
                flags: BlockFlags::FOLIAGE,
                render: RenderDescriptor {
                    color: [0.2, 0.5, 0.15, 0.85],
                    top_color: None,
                },
            },
            // 树苗沿用草方块外观
            BlockKind::Sapling => BlockDef {
                name: "sapling",
                flags: BlockFlags::TERRAIN,
                render: RenderDescriptor {
                    color: [0.45, 0.32, 0.2, 1.0],
                    top_color: Some(GRASS_TOP),
                },
            },
            BlockKind::Sand => BlockDef {
                name: "sand",
                flags: BlockFlags::TERRAIN,
                render: RenderDescriptor::solid(0.86, 0.8, 0.55),
            },
            BlockKind::AzaleaLeaves => BlockDef {
                name: "azalea_leaves",
                flags: BlockFlags::FOLIAGE,
                render: RenderDescriptor {
                    color: [0.35, 0.55, 0.2, 0.85],
                    top_color: None,
                },
            },
            BlockKind::JungleLog => BlockDef {
                name: "jungle_tree_side",
                flags: BlockFlags::TERRAIN,
                render: RenderDescriptor::solid(0.34, 0.26, 0.12),
            },
            BlockKind::Water => BlockDef {
                name: "water",
                flags: BlockFlags::FLUID,
                render: RenderDescriptor {
                    color: [0.2, 0.4, 0.85, 0.6],
                    top_color: None,
                },
            },
        }
    }

    /// 是否占据体素格（遮挡剔除使用）
    pub fn is_solid(self) -> bool {
        self.def().flags.contains(BlockFlags::SOLID)
    }

    /// 是否为空气
    pub fn is_empty(self) -> bool {
        self == BlockKind::Empty
    }

    /// 是否为水
    pub fn is_water(self) -> bool {
        self == BlockKind::Water
    }

    /// 是否可被玩家移除（空气与水不可移除）
    pub fn is_removable(self) -> bool {
        self.def().flags.contains(BlockFlags::REMOVABLE)
    }

    /// 是否参与玩家碰撞
    pub fn collides(self) -> bool {
        self.def().flags.collides()
    }

    /// 是否半透明渲染
    pub fn is_translucent(self) -> bool {
        self.def().flags.contains(BlockFlags::TRANSLUCENT)
    }
}
