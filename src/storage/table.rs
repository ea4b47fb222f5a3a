//! 表与表结构定义

use crate::core::types::{ChunkId, ColumnId, DataType};
use crate::core::value::Value;
use crate::core::StorageError;

use super::chunk::Chunk;

/// 列定义
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// 表结构，列的有序集合
#[derive(Debug, Clone, Default)]
pub struct Schema {
    columns: Vec<ColumnDefinition>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDefinition>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn column(&self, column_id: ColumnId) -> Option<&ColumnDefinition> {
        self.columns.get(column_id as usize)
    }

    pub fn column_id(&self, name: &str) -> Option<ColumnId> {
        self.columns
            .iter()
            .position(|column| column.name == name)
            .map(|position| position as ColumnId)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// 内存列存表：表结构加 chunk 的有序集合
///
/// 表在注册进存储管理器之前构建完成，此后只读。
#[derive(Debug)]
pub struct Table {
    name: String,
    schema: Schema,
    chunks: Vec<Chunk>,
}

impl Table {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            chunks: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// 以行集追加并封存一个新 chunk，返回其编号
    pub fn append_chunk(&mut self, rows: Vec<Vec<Value>>) -> Result<ChunkId, StorageError> {
        let chunk = Chunk::from_rows(&self.schema, rows)?;
        let chunk_id = self.chunks.len() as ChunkId;
        self.chunks.push(chunk);
        Ok(chunk_id)
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk(&self, chunk_id: ChunkId) -> Option<&Chunk> {
        self.chunks.get(chunk_id as usize)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn row_count(&self) -> usize {
        self.chunks.iter().map(Chunk::row_count).sum()
    }
}
