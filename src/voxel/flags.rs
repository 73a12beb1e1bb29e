//! 方块类型属性标志位
//!
//! 使用 bitflags 描述方块目录中每种方块的静态属性

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BlockFlags: u8 {
        const NONE = 0;

        /// 占据体素格（参与遮挡判断）
        const SOLID = 1 << 0;
        /// 半透明渲染（水、树叶）
        const TRANSLUCENT = 1 << 1;
        /// 液体（不参与碰撞，不可挖掘）
        const LIQUID = 1 << 2;
        /// 可被玩家移除
        const REMOVABLE = 1 << 3;
    }
}

impl Default for BlockFlags {
    fn default() -> Self {
        Self::NONE
    }
}

impl BlockFlags {
    /// 普通实心方块
    pub const TERRAIN: Self = Self::SOLID.union(Self::REMOVABLE);
    /// 半透明实心方块（树叶）
    pub const FOLIAGE: Self = Self::TERRAIN.union(Self::TRANSLUCENT);
    /// 水体
    pub const FLUID: Self = Self::SOLID.union(Self::TRANSLUCENT).union(Self::LIQUID);

    /// 是否为碰撞体（实心且非液体）
    pub fn collides(self) -> bool {
        self.contains(Self::SOLID) && !self.contains(Self::LIQUID)
    }
}
