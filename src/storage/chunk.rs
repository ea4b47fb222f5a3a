//! Chunk：表的水平分区
//!
//! chunk 一经封存即不可变，封存时逐列计算段级统计。

use crate::core::types::ColumnId;
use crate::core::value::Value;
use crate::core::StorageError;

use super::table::Schema;

/// 段级 min/max 统计，在 chunk 封存时对非空值计算
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentStatistics {
    pub min: Value,
    pub max: Value,
}

/// 单列在一个 chunk 内的取值段
#[derive(Debug, Clone)]
pub struct ColumnSegment {
    values: Vec<Value>,
    statistics: Option<SegmentStatistics>,
}

impl ColumnSegment {
    pub fn new(values: Vec<Value>) -> Self {
        let statistics = Self::compute_statistics(&values);
        Self { values, statistics }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// 段统计；全空列或空段没有统计
    pub fn statistics(&self) -> Option<&SegmentStatistics> {
        self.statistics.as_ref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn compute_statistics(values: &[Value]) -> Option<SegmentStatistics> {
        let mut non_null = values.iter().filter(|value| !value.is_null());
        let first = non_null.next()?;
        let mut min = first;
        let mut max = first;
        for value in non_null {
            if value < min {
                min = value;
            }
            if value > max {
                max = value;
            }
        }
        Some(SegmentStatistics {
            min: min.clone(),
            max: max.clone(),
        })
    }
}

/// 表的一个水平分区
#[derive(Debug, Clone)]
pub struct Chunk {
    segments: Vec<ColumnSegment>,
    row_count: usize,
}

impl Chunk {
    /// 从行集构建 chunk，校验行宽与列类型后按列重组并计算统计
    pub fn from_rows(schema: &Schema, rows: Vec<Vec<Value>>) -> Result<Self, StorageError> {
        let column_count = schema.column_count();
        let row_count = rows.len();
        let mut columns: Vec<Vec<Value>> = vec![Vec::with_capacity(row_count); column_count];

        for row in rows {
            if row.len() != column_count {
                return Err(StorageError::RowArityMismatch {
                    expected: column_count,
                    actual: row.len(),
                });
            }
            for (column_id, value) in row.into_iter().enumerate() {
                let definition = &schema.columns()[column_id];
                if let Some(data_type) = value.data_type() {
                    if data_type != definition.data_type {
                        return Err(StorageError::TypeMismatch {
                            column: definition.name.clone(),
                            expected: definition.data_type,
                            actual: data_type,
                        });
                    }
                }
                columns[column_id].push(value);
            }
        }

        let segments = columns.into_iter().map(ColumnSegment::new).collect();
        Ok(Self {
            segments,
            row_count,
        })
    }

    pub fn segment(&self, column_id: ColumnId) -> Option<&ColumnSegment> {
        self.segments.get(column_id as usize)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DataType;
    use crate::storage::table::ColumnDefinition;

    fn int_schema() -> Schema {
        Schema::new(vec![ColumnDefinition::new("a", DataType::Int)])
    }

    #[test]
    fn test_segment_statistics() {
        let segment = ColumnSegment::new(vec![Value::Int(5), Value::Int(1), Value::Int(9)]);
        let statistics = segment.statistics().expect("非空段应该有统计");
        assert_eq!(statistics.min, Value::Int(1));
        assert_eq!(statistics.max, Value::Int(9));
    }

    #[test]
    fn test_segment_statistics_skip_null() {
        let segment = ColumnSegment::new(vec![Value::Null, Value::Int(3), Value::Null]);
        let statistics = segment.statistics().expect("含非空值的段应该有统计");
        assert_eq!(statistics.min, Value::Int(3));
        assert_eq!(statistics.max, Value::Int(3));
    }

    #[test]
    fn test_all_null_segment_has_no_statistics() {
        let segment = ColumnSegment::new(vec![Value::Null, Value::Null]);
        assert!(segment.statistics().is_none());
    }

    #[test]
    fn test_chunk_rejects_arity_mismatch() {
        let result = Chunk::from_rows(&int_schema(), vec![vec![Value::Int(1), Value::Int(2)]]);
        assert!(matches!(
            result,
            Err(StorageError::RowArityMismatch { .. })
        ));
    }

    #[test]
    fn test_chunk_rejects_type_mismatch() {
        let result = Chunk::from_rows(&int_schema(), vec![vec![Value::Float(1.0)]]);
        assert!(matches!(result, Err(StorageError::TypeMismatch { .. })));
    }

    #[test]
    fn test_chunk_accepts_null_values() {
        let chunk = Chunk::from_rows(&int_schema(), vec![vec![Value::Null], vec![Value::Int(2)]])
            .expect("chunk构建应该成功");
        assert_eq!(chunk.row_count(), 2);
    }
}
