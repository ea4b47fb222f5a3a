//! 引擎配置
//!
//! 使用 toml 文件持久化的引擎配置，启动时加载，缺省值见 `Default` 实现

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::DBError;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_dir: String,
    /// 新建表封存 chunk 时的目标行数
    pub default_chunk_size: usize,
    pub optimizer: OptimizerSection,
}

/// 优化器相关的配置段
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OptimizerSection {
    pub enable_dips_pruning: bool,
    pub max_iteration_rounds: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: "logs".to_string(),
            default_chunk_size: 65536,
            optimizer: OptimizerSection::default(),
        }
    }
}

impl Default for OptimizerSection {
    fn default() -> Self {
        Self {
            enable_dips_pruning: true,
            max_iteration_rounds: 5,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DBError> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| DBError::Config(format!("配置解析失败: {}", e)))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), DBError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DBError::Config(format!("配置序列化失败: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }
}
