//! 区块变更记录
//!
//! 世界把区块的生成、修改与卸载记录下来，渲染层按需批量取走

use super::chunk::ChunkCoord;

/// 单个区块的变更
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkChange {
    /// 新生成并加入世界
    Generated(ChunkCoord),
    /// 方块被移除，实例列表有变化
    Mutated(ChunkCoord),
    /// 已从世界卸载
    Evicted(ChunkCoord),
}

impl ChunkChange {
    /// 获取影响的区块坐标
    pub fn coord(&self) -> ChunkCoord {
        match self {
            ChunkChange::Generated(coord)
            | ChunkChange::Mutated(coord)
            | ChunkChange::Evicted(coord) => *coord,
        }
    }

    /// 判断是否需要重建网格
    pub fn needs_remesh(&self) -> bool {
        matches!(self, ChunkChange::Generated(_) | ChunkChange::Mutated(_))
    }
}

/// 变更日志
#[derive(Debug, Default)]
pub struct ChangeLog {
    changes: Vec<ChunkChange>,
}

impl ChangeLog {
    /// 记录变更；与上一条相同的变更会被合并
    pub fn record(&mut self, change: ChunkChange) {
        if self.changes.last() != Some(&change) {
            self.changes.push(change);
        }
    }

    /// 取走全部变更（按发生顺序）
    pub fn drain(&mut self) -> Vec<ChunkChange> {
        std::mem::take(&mut self.changes)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
