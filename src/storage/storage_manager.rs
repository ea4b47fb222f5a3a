//! 存储管理器：表目录
//!
//! 持有全部已注册的表，并作为范围统计提供者接入优化器。

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::core::types::{ChunkId, ColumnId, DataType};
use crate::core::StorageError;

use super::statistics::{ChunkRangeStatistic, RangeStatisticsSource};
use super::table::Table;

#[derive(Debug, Default)]
pub struct StorageManager {
    tables: RwLock<HashMap<String, Arc<Table>>>,
}

impl StorageManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一张构建完成的表，同名表已存在时报错
    pub fn add_table(&self, table: Table) -> Result<(), StorageError> {
        let mut tables = self.tables.write();
        if tables.contains_key(table.name()) {
            return Err(StorageError::TableAlreadyExists(table.name().to_string()));
        }
        tables.insert(table.name().to_string(), Arc::new(table));
        Ok(())
    }

    pub fn table(&self, name: &str) -> Result<Arc<Table>, StorageError> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.read().contains_key(name)
    }

    pub fn drop_table(&self, name: &str) -> Result<(), StorageError> {
        self.tables
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.read().keys().cloned().collect()
    }
}

impl RangeStatisticsSource for StorageManager {
    fn chunk_range_statistics(
        &self,
        table_name: &str,
        column_id: ColumnId,
        pruned_chunk_ids: &BTreeSet<ChunkId>,
    ) -> Result<Vec<ChunkRangeStatistic>, StorageError> {
        let table = self.table(table_name)?;
        if table.schema().column(column_id).is_none() {
            return Err(StorageError::ColumnNotFound {
                table: table_name.to_string(),
                column: column_id,
            });
        }

        let mut statistics = Vec::new();
        for (position, chunk) in table.chunks().iter().enumerate() {
            let chunk_id = position as ChunkId;
            if pruned_chunk_ids.contains(&chunk_id) {
                continue;
            }
            // 没有统计的段（空 chunk、全空列）不参与范围裁剪
            if let Some(segment) = chunk.segment(column_id) {
                if let Some(segment_statistics) = segment.statistics() {
                    statistics.push(ChunkRangeStatistic {
                        chunk_id,
                        min: segment_statistics.min.clone(),
                        max: segment_statistics.max.clone(),
                    });
                }
            }
        }
        Ok(statistics)
    }

    fn column_data_type(
        &self,
        table_name: &str,
        column_id: ColumnId,
    ) -> Result<DataType, StorageError> {
        let table = self.table(table_name)?;
        table
            .schema()
            .column(column_id)
            .map(|column| column.data_type)
            .ok_or_else(|| StorageError::ColumnNotFound {
                table: table_name.to_string(),
                column: column_id,
            })
    }
}
