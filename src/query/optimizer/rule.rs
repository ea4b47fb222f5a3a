//! 优化规则接口与错误定义

use std::fmt;

use crate::core::error::DBError;
use crate::core::StorageError;
use crate::query::plan::LogicalPlan;

use super::config::OptimizationConfig;
use super::optimizer::OptContext;

/// 优化器错误
///
/// `InternalConsistency` 表示上游不变量被破坏，规则必须放弃当前
/// 计划的处理；其余跳过场景（不支持的连接类型、非等值谓词、含环
/// 连接图等）不是错误，只是少做裁剪。
#[derive(Debug, thiserror::Error)]
pub enum OptimizerError {
    #[error("内部一致性错误: {0}")]
    InternalConsistency(String),

    #[error("计划转换错误: {0}")]
    PlanConversion(String),

    #[error("规则应用错误: {rule}: {reason}")]
    RuleApplication { rule: String, reason: String },

    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),
}

impl OptimizerError {
    pub fn internal_consistency(message: impl Into<String>) -> Self {
        OptimizerError::InternalConsistency(message.into())
    }
}

// 跨模块边界转换为字符串，避免核心错误类型依赖优化器
impl From<OptimizerError> for DBError {
    fn from(error: OptimizerError) -> Self {
        DBError::Optimize(error.to_string())
    }
}

/// 优化规则接口
///
/// 规则对整个逻辑计划做一次同步处理；对计划的修改仅限于
/// 基表引用上的注解。
pub trait OptRule: fmt::Debug {
    fn name(&self) -> &str;

    /// 当前配置下规则是否启用
    fn is_enabled(&self, _config: &OptimizationConfig) -> bool {
        true
    }

    fn apply(&self, ctx: &mut OptContext, plan: &LogicalPlan) -> Result<(), OptimizerError>;
}
