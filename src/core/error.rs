//! 统一错误处理系统 for ColumnDB
//!
//! ## 设计理念
//!
//! 1. **按需设计**：根据错误复杂度选择合适的结构
//!    - 存储错误使用枚举设计，携带定位问题所需的表/列/chunk 信息
//!    - 优化器错误定义在优化器模块内，贴近产生错误的代码
//!
//! 2. **分层转换**：
//!    - 核心错误使用 `#[from]` 注解自动转换，保留完整错误信息
//!    - 外部模块错误使用自定义 `From` 实现转换为字符串，降低模块耦合
//!
//! 3. **统一接口**：`DBResult<T>` 提供统一的返回类型，简化错误传播

use thiserror::Error;

use super::types::{ColumnId, DataType};

/// 统一的数据库错误类型
#[derive(Error, Debug)]
pub enum DBError {
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),

    #[error("优化器错误: {0}")]
    Optimize(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 统一的结果类型
pub type DBResult<T> = Result<T, DBError>;

/// 存储层错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("表不存在: {0}")]
    TableNotFound(String),

    #[error("表已存在: {0}")]
    TableAlreadyExists(String),

    #[error("列不存在: 表 {table} 没有列 {column}")]
    ColumnNotFound { table: String, column: ColumnId },

    #[error("行宽不匹配: 期望 {expected} 列，实际 {actual} 列")]
    RowArityMismatch { expected: usize, actual: usize },

    #[error("类型不匹配: 列 {column} 期望 {expected}，实际 {actual}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },
}
