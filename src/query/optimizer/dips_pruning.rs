//! Chunk 裁剪规则
//!
//! 在查询执行之前，利用每表每 chunk 的 min/max 范围统计，沿等值
//! 连接图横向传播裁剪决策：一张表当前未被裁剪的取值范围约束其
//! 连接伙伴，伙伴中取值区间完全落在范围之外的 chunk 不可能产出
//! 连接结果，可以直接标记裁剪。
//!
//! 传播在树形连接图上进行：先自底向上、再自顶向下各扫一遍。每条
//! 边的裁剪依赖两侧"当前"未裁剪 chunk 的范围，而这个范围会被同
//! 一趟里先处理的相邻边收缩，所以两趟的固定顺序让裁剪决策沿树
//! 双向传递。两趟之后不再迭代到不动点，这是精度与代价的取舍。
//!
//! 含环的连接图跳过不处理，交给正常的连接执行。

use std::collections::BTreeSet;

use crate::core::types::{ChunkId, ColumnId, DataType};
use crate::core::value::RangeValue;
use crate::query::plan::{ColumnExpression, Expression, LogicalPlan, PlanNodeEnum, StoredTableRef};

use super::config::OptimizationConfig;
use super::join_graph::{JoinGraph, JoinGraphNodeId};
use super::join_graph_builder::JoinGraphBuilder;
use super::optimizer::OptContext;
use super::rule::{OptRule, OptimizerError};

/// 某个 chunk 在一列上的类型化取值区间
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRange<T> {
    pub chunk_id: ChunkId,
    pub min: T,
    pub max: T,
}

/// 等值谓词的一侧：基表引用加列号
struct PredicateSide {
    table: StoredTableRef,
    column_id: ColumnId,
}

#[derive(Debug, Default)]
pub struct DipsPruningRule;

impl OptRule for DipsPruningRule {
    fn name(&self) -> &str {
        "DipsPruningRule"
    }

    fn is_enabled(&self, config: &OptimizationConfig) -> bool {
        config.enable_dips_pruning
    }

    fn apply(&self, ctx: &mut OptContext, plan: &LogicalPlan) -> Result<(), OptimizerError> {
        match plan.root.as_ref() {
            Some(root) => self.apply_to_plan(ctx, root),
            None => Ok(()),
        }
    }
}

impl DipsPruningRule {
    fn apply_to_plan(
        &self,
        ctx: &mut OptContext,
        plan_root: &PlanNodeEnum,
    ) -> Result<(), OptimizerError> {
        let mut join_graph = JoinGraphBuilder::build(plan_root)?;

        if join_graph.is_empty() {
            return Ok(());
        }

        if !join_graph.is_tree() {
            // 含环连接图由正常的连接执行兜底，这里不做任何裁剪
            log::debug!("连接图含环，跳过 chunk 裁剪");
            return Ok(());
        }

        // 传播对每条边对称，根可以任意选择
        let root = 0;
        join_graph.set_root(root)?;
        log::trace!("连接图:\n{}", join_graph);

        self.bottom_up_traversal(ctx, &join_graph, root)?;
        self.top_down_traversal(ctx, &join_graph, root)?;
        Ok(())
    }

    /// 自底向上：先递归处理全部子节点，再处理当前节点到父节点的边
    fn bottom_up_traversal(
        &self,
        ctx: &mut OptContext,
        join_graph: &JoinGraph,
        node_id: JoinGraphNodeId,
    ) -> Result<(), OptimizerError> {
        for &child in join_graph.node(node_id).children() {
            self.bottom_up_traversal(ctx, join_graph, child)?;
        }
        if let Some(parent) = join_graph.node(node_id).parent() {
            self.process_edge(ctx, join_graph, node_id, parent)?;
        }
        Ok(())
    }

    /// 自顶向下：先处理当前节点到父节点的边，再递归处理子节点
    fn top_down_traversal(
        &self,
        ctx: &mut OptContext,
        join_graph: &JoinGraph,
        node_id: JoinGraphNodeId,
    ) -> Result<(), OptimizerError> {
        if let Some(parent) = join_graph.node(node_id).parent() {
            self.process_edge(ctx, join_graph, node_id, parent)?;
        }
        for &child in join_graph.node(node_id).children() {
            self.top_down_traversal(ctx, join_graph, child)?;
        }
        Ok(())
    }

    /// 处理一条父子边：对边上每条等值谓词做两个方向的成对裁剪
    fn process_edge(
        &self,
        ctx: &mut OptContext,
        join_graph: &JoinGraph,
        node_id: JoinGraphNodeId,
        parent_id: JoinGraphNodeId,
    ) -> Result<(), OptimizerError> {
        let edge = join_graph
            .node(node_id)
            .edge_for_partner(parent_id)
            .ok_or_else(|| {
                OptimizerError::internal_consistency("树中父子节点之间缺少连接边")
            })?;

        for predicate in edge.predicates() {
            let (left, right) = Self::resolve_predicate_sides(predicate)?;

            // 左侧约束右侧
            self.dips_pruning(ctx, &left, &right)?;
            // 右侧约束左侧
            self.dips_pruning(ctx, &right, &left)?;
        }
        Ok(())
    }

    /// 解析谓词两侧的基表列
    ///
    /// 进图的谓词在构建阶段已经过滤，这里解析失败意味着上游
    /// 不变量被破坏，直接报内部一致性错误。
    fn resolve_predicate_sides(
        predicate: &Expression,
    ) -> Result<(PredicateSide, PredicateSide), OptimizerError> {
        let (left, right) = match predicate {
            Expression::Binary { left, right, .. } => (left.as_ref(), right.as_ref()),
            _ => {
                return Err(OptimizerError::internal_consistency(format!(
                    "连接图边上出现非二元谓词: {}",
                    predicate.description()
                )));
            }
        };
        Ok((
            Self::resolve_column_side(left)?,
            Self::resolve_column_side(right)?,
        ))
    }

    fn resolve_column_side(operand: &Expression) -> Result<PredicateSide, OptimizerError> {
        let column: &ColumnExpression = match operand {
            Expression::Column(column) => column,
            _ => {
                return Err(OptimizerError::internal_consistency(format!(
                    "期望列表达式作为连接谓词的操作数: {}",
                    operand.description()
                )));
            }
        };
        let table = column.original_node().ok_or_else(|| {
            OptimizerError::internal_consistency("列表达式的来源基表引用已失效")
        })?;
        Ok(PredicateSide {
            table,
            column_id: column.original_column_id(),
        })
    }

    /// 成对裁剪步骤：用 source 侧未裁剪 chunk 的范围裁剪 target 侧
    ///
    /// 按列的静态类型分发到泛型实现，比较始终在列的实际类型上进行。
    fn dips_pruning(
        &self,
        ctx: &mut OptContext,
        source: &PredicateSide,
        target: &PredicateSide,
    ) -> Result<(), OptimizerError> {
        let data_type = {
            let table = source.table.borrow();
            ctx.range_statistics
                .column_data_type(table.table_name(), source.column_id)?
        };

        match data_type {
            DataType::Bool => self.prune_join_partner::<bool>(ctx, source, target),
            DataType::Int => self.prune_join_partner::<i64>(ctx, source, target),
            DataType::Float => self.prune_join_partner::<f64>(ctx, source, target),
            DataType::String => self.prune_join_partner::<String>(ctx, source, target),
        }
    }

    fn prune_join_partner<T: RangeValue>(
        &self,
        ctx: &mut OptContext,
        source: &PredicateSide,
        target: &PredicateSide,
    ) -> Result<(), OptimizerError> {
        let base_ranges = Self::not_pruned_range_statistics::<T>(ctx, source)?;
        let partner_ranges = Self::not_pruned_range_statistics::<T>(ctx, target)?;
        let pruned_chunk_ids = Self::calculate_pruned_chunks(&base_ranges, &partner_ranges);

        if pruned_chunk_ids.is_empty() {
            return Ok(());
        }

        ctx.stats.record_pruned_chunks(pruned_chunk_ids.len());
        log::debug!(
            "表 {} 新增 {} 个被裁剪的 chunk",
            target.table.borrow().table_name(),
            pruned_chunk_ids.len()
        );
        Self::extend_pruned_chunks(&target.table, pruned_chunk_ids);
        Ok(())
    }

    /// 读取一侧当前未被裁剪 chunk 的类型化范围集合
    ///
    /// 每次裁剪步骤都重新读取，这样同一趟里先前步骤的裁剪结果
    /// 立即对后续步骤生效。
    fn not_pruned_range_statistics<T: RangeValue>(
        ctx: &OptContext,
        side: &PredicateSide,
    ) -> Result<Vec<ChunkRange<T>>, OptimizerError> {
        let table = side.table.borrow();
        let statistics = ctx.range_statistics.chunk_range_statistics(
            table.table_name(),
            side.column_id,
            table.pruned_chunk_ids(),
        )?;

        let mut ranges = Vec::with_capacity(statistics.len());
        for statistic in statistics {
            let min = T::from_value(&statistic.min).ok_or_else(|| {
                OptimizerError::internal_consistency(format!(
                    "chunk {} 的范围统计与列类型不一致",
                    statistic.chunk_id
                ))
            })?;
            let max = T::from_value(&statistic.max).ok_or_else(|| {
                OptimizerError::internal_consistency(format!(
                    "chunk {} 的范围统计与列类型不一致",
                    statistic.chunk_id
                ))
            })?;
            ranges.push(ChunkRange {
                chunk_id: statistic.chunk_id,
                min,
                max,
            });
        }
        Ok(ranges)
    }

    /// 计算与 base 侧所有区间都不相交的 partner chunk 集合
    ///
    /// 等值连接下，取值区间与对侧任何可能取值都不相交的 chunk
    /// 不可能产出匹配。任一侧没有区间时没有可裁剪的 chunk。
    fn calculate_pruned_chunks<T: RangeValue>(
        base_ranges: &[ChunkRange<T>],
        partner_ranges: &[ChunkRange<T>],
    ) -> BTreeSet<ChunkId> {
        if base_ranges.is_empty() || partner_ranges.is_empty() {
            return BTreeSet::new();
        }
        partner_ranges
            .iter()
            .filter(|partner| {
                !base_ranges
                    .iter()
                    .any(|base| Self::ranges_overlap(base, partner))
            })
            .map(|partner| partner.chunk_id)
            .collect()
    }

    fn ranges_overlap<T: RangeValue>(a: &ChunkRange<T>, b: &ChunkRange<T>) -> bool {
        a.min <= b.max && b.min <= a.max
    }

    /// 把新发现的可裁剪 chunk 并入基表引用的持久裁剪集合
    fn extend_pruned_chunks(table: &StoredTableRef, pruned_chunk_ids: BTreeSet<ChunkId>) {
        table.borrow_mut().extend_pruned_chunk_ids(pruned_chunk_ids);
    }
}
