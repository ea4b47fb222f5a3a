//! 基础标识类型与数据类型定义

use serde::{Deserialize, Serialize};

/// Chunk 标识符，表中水平分区的位置编号
pub type ChunkId = u32;

/// 列标识符，表内列的位置编号
pub type ColumnId = u16;

/// 列的静态数据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Bool,
    Int,
    Float,
    String,
}

impl DataType {
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Bool => "Bool",
            DataType::Int => "Int",
            DataType::Float => "Float",
            DataType::String => "String",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
