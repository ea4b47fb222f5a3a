//! 面向优化器的 chunk 范围统计接口
//!
//! 优化器通过本接口读取"当前未被裁剪"的 chunk 在某一列上的
//! min/max 范围。统计由存储层在 chunk 封存时产生，这里只做查询。

use std::collections::BTreeSet;

use crate::core::types::{ChunkId, ColumnId, DataType};
use crate::core::value::Value;
use crate::core::StorageError;

/// 一个未被裁剪 chunk 在某列上的取值范围
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRangeStatistic {
    pub chunk_id: ChunkId,
    pub min: Value,
    pub max: Value,
}

/// 范围统计提供者
///
/// 优化器规则通过依赖注入获得本能力，而不是读取进程级全局状态。
/// 实现方需要保证返回的集合按 chunk 编号升序，且只包含
/// `pruned_chunk_ids` 之外、并且有统计可用的 chunk。
pub trait RangeStatisticsSource: Send + Sync {
    /// 给定表、列与当前已裁剪 chunk 集合，返回剩余 chunk 的范围统计
    fn chunk_range_statistics(
        &self,
        table_name: &str,
        column_id: ColumnId,
        pruned_chunk_ids: &BTreeSet<ChunkId>,
    ) -> Result<Vec<ChunkRangeStatistic>, StorageError>;

    /// 列的静态数据类型
    fn column_data_type(
        &self,
        table_name: &str,
        column_id: ColumnId,
    ) -> Result<DataType, StorageError>;
}
