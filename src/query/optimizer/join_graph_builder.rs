//! 连接图构建器
//!
//! 对逻辑计划做一次后序遍历，收集受支持连接的等值谓词并填充
//! 连接图。图连接的是基表，不是计划节点，所以图的形状与计划树
//! 的形状无关。

use std::rc::Rc;

use crate::query::plan::{BinaryOperator, Expression, JoinMode, PlanNodeEnum};

use super::join_graph::JoinGraph;
use super::rule::OptimizerError;

/// 本规则只支持内连接与半连接
pub const SUPPORTED_JOIN_MODES: [JoinMode; 2] = [JoinMode::Inner, JoinMode::Semi];

#[derive(Debug)]
pub struct JoinGraphBuilder;

impl JoinGraphBuilder {
    pub fn build(plan_root: &PlanNodeEnum) -> Result<JoinGraph, OptimizerError> {
        let mut join_graph = JoinGraph::new();
        Self::visit(plan_root, &mut join_graph)?;
        Ok(join_graph)
    }

    fn visit(node: &PlanNodeEnum, join_graph: &mut JoinGraph) -> Result<(), OptimizerError> {
        // 集合操作是图的边界：越过它传播裁剪是不可靠的，其下的连接
        // 不进入本图
        if matches!(
            node,
            PlanNodeEnum::Union(_) | PlanNodeEnum::Intersect(_) | PlanNodeEnum::Except(_)
        ) {
            return Ok(());
        }

        for input in node.inputs() {
            Self::visit(input, join_graph)?;
        }

        if let PlanNodeEnum::Join(join) = node {
            // 不支持的连接类型不贡献谓词，但其子树里的连接已在上面
            // 的递归中处理过
            if !SUPPORTED_JOIN_MODES.contains(&join.join_mode()) {
                return Ok(());
            }
            for predicate in join.join_predicates() {
                Self::collect_predicate(predicate, join_graph)?;
            }
        }

        Ok(())
    }

    /// 把一条连接谓词登记进图：两侧都能回溯到基表列的等值谓词
    /// 产生（或累积到）一条镜像边，其余谓词按场景跳过或报错
    fn collect_predicate(
        predicate: &Expression,
        join_graph: &mut JoinGraph,
    ) -> Result<(), OptimizerError> {
        let (op, left, right) = match predicate {
            Expression::Binary { op, left, right } => (*op, left.as_ref(), right.as_ref()),
            _ => {
                return Err(OptimizerError::internal_consistency(format!(
                    "连接谓词必须是二元谓词表达式: {}",
                    predicate.description()
                )));
            }
        };

        if op != BinaryOperator::Equal {
            return Ok(());
        }

        let (Expression::Column(left_column), Expression::Column(right_column)) = (left, right)
        else {
            // 操作数不是直接的基表列（例如来自计算表达式），不产生边
            return Ok(());
        };

        let left_table = left_column.original_node().ok_or_else(|| {
            OptimizerError::internal_consistency("列表达式的来源基表引用已失效")
        })?;
        let right_table = right_column.original_node().ok_or_else(|| {
            OptimizerError::internal_consistency("列表达式的来源基表引用已失效")
        })?;

        if Rc::ptr_eq(&left_table, &right_table) {
            log::debug!(
                "跳过同一基表引用上的自比较谓词: {}",
                predicate.description()
            );
            return Ok(());
        }

        let left_node = join_graph.get_or_create_node(&left_table);
        let right_node = join_graph.get_or_create_node(&right_table);
        join_graph.append_predicate(left_node, right_node, predicate.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::plan::{
        IntersectNode, JoinNode, LimitNode, PredicateNode, ProjectionNode, SortNode,
        StoredTableNode, StoredTableRef, StoredTableScanNode, UnionNode,
    };
    use crate::core::value::Value;

    fn scan(table: &StoredTableRef) -> PlanNodeEnum {
        PlanNodeEnum::StoredTable(StoredTableScanNode::new(Rc::clone(table)))
    }

    fn equi_join(
        left_plan: PlanNodeEnum,
        right_plan: PlanNodeEnum,
        left: &StoredTableRef,
        right: &StoredTableRef,
        mode: JoinMode,
    ) -> PlanNodeEnum {
        PlanNodeEnum::Join(JoinNode::new(
            left_plan,
            right_plan,
            mode,
            vec![Expression::equals(
                Expression::column(left, 0),
                Expression::column(right, 0),
            )],
        ))
    }

    #[test]
    fn test_build_from_single_inner_join() {
        let a = StoredTableNode::new_ref("a");
        let b = StoredTableNode::new_ref("b");
        let plan = equi_join(scan(&a), scan(&b), &a, &b, JoinMode::Inner);

        let graph = JoinGraphBuilder::build(&plan).expect("构建连接图应该成功");
        assert_eq!(graph.nodes().len(), 2);
        assert!(graph.is_tree());
    }

    #[test]
    fn test_unsupported_join_mode_contributes_no_edge() {
        let a = StoredTableNode::new_ref("a");
        let b = StoredTableNode::new_ref("b");
        let plan = equi_join(scan(&a), scan(&b), &a, &b, JoinMode::Left);

        let graph = JoinGraphBuilder::build(&plan).expect("构建连接图应该成功");
        assert!(graph.is_empty());
    }

    #[test]
    fn test_supported_join_below_unsupported_join_is_collected() {
        let a = StoredTableNode::new_ref("a");
        let b = StoredTableNode::new_ref("b");
        let c = StoredTableNode::new_ref("c");
        let inner = equi_join(scan(&a), scan(&b), &a, &b, JoinMode::Inner);
        let outer = equi_join(inner, scan(&c), &b, &c, JoinMode::FullOuter);

        let graph = JoinGraphBuilder::build(&outer).expect("构建连接图应该成功");
        // 外层全外连接被跳过，只有内层连接进图
        assert_eq!(graph.nodes().len(), 2);
    }

    #[test]
    fn test_set_operation_is_a_boundary() {
        let a = StoredTableNode::new_ref("a");
        let b = StoredTableNode::new_ref("b");
        let c = StoredTableNode::new_ref("c");
        let d = StoredTableNode::new_ref("d");
        let below_union = equi_join(scan(&a), scan(&b), &a, &b, JoinMode::Inner);
        let union = PlanNodeEnum::Union(UnionNode::new(below_union, scan(&c)));
        let above = equi_join(union, scan(&d), &c, &d, JoinMode::Inner);

        let graph = JoinGraphBuilder::build(&above).expect("构建连接图应该成功");
        // 并集之下的 a-b 连接被排除，只剩 c-d
        assert_eq!(graph.nodes().len(), 2);
        let names: Vec<String> = graph
            .nodes()
            .iter()
            .map(|node| node.table().borrow().table_name().to_string())
            .collect();
        assert!(names.contains(&"c".to_string()));
        assert!(names.contains(&"d".to_string()));
    }

    #[test]
    fn test_intersect_is_a_boundary() {
        let a = StoredTableNode::new_ref("a");
        let b = StoredTableNode::new_ref("b");
        let join = equi_join(scan(&a), scan(&b), &a, &b, JoinMode::Inner);
        let plan = PlanNodeEnum::Intersect(IntersectNode::new(join, scan(&b)));

        let graph = JoinGraphBuilder::build(&plan).expect("构建连接图应该成功");
        assert!(graph.is_empty());
    }

    #[test]
    fn test_non_equality_predicate_is_skipped() {
        let a = StoredTableNode::new_ref("a");
        let b = StoredTableNode::new_ref("b");
        let plan = PlanNodeEnum::Join(JoinNode::new(
            scan(&a),
            scan(&b),
            JoinMode::Inner,
            vec![Expression::binary(
                BinaryOperator::LessThan,
                Expression::column(&a, 0),
                Expression::column(&b, 0),
            )],
        ));

        let graph = JoinGraphBuilder::build(&plan).expect("构建连接图应该成功");
        assert!(graph.is_empty());
    }

    #[test]
    fn test_non_column_operand_is_skipped() {
        let a = StoredTableNode::new_ref("a");
        let b = StoredTableNode::new_ref("b");
        let plan = PlanNodeEnum::Join(JoinNode::new(
            scan(&a),
            scan(&b),
            JoinMode::Inner,
            vec![Expression::equals(
                Expression::column(&a, 0),
                Expression::literal(Value::Int(1)),
            )],
        ));

        let graph = JoinGraphBuilder::build(&plan).expect("构建连接图应该成功");
        assert!(graph.is_empty());
    }

    #[test]
    fn test_non_binary_join_predicate_is_fatal() {
        let a = StoredTableNode::new_ref("a");
        let b = StoredTableNode::new_ref("b");
        let plan = PlanNodeEnum::Join(JoinNode::new(
            scan(&a),
            scan(&b),
            JoinMode::Inner,
            vec![Expression::literal(Value::Bool(true))],
        ));

        let result = JoinGraphBuilder::build(&plan);
        assert!(matches!(
            result,
            Err(OptimizerError::InternalConsistency(_))
        ));
    }

    #[test]
    fn test_traversal_passes_through_other_nodes() {
        let a = StoredTableNode::new_ref("a");
        let b = StoredTableNode::new_ref("b");
        let join = equi_join(scan(&a), scan(&b), &a, &b, JoinMode::Semi);
        let filtered = PlanNodeEnum::Predicate(PredicateNode::new(
            join,
            Expression::equals(Expression::column(&a, 1), Expression::literal(Value::Int(7))),
        ));
        let projected = PlanNodeEnum::Projection(ProjectionNode::new(
            filtered,
            vec![Expression::column(&a, 0)],
        ));
        let sorted = PlanNodeEnum::Sort(SortNode::new(projected, vec![Expression::column(&a, 0)]));
        let plan = PlanNodeEnum::Limit(LimitNode::new(sorted, 10));

        let graph = JoinGraphBuilder::build(&plan).expect("构建连接图应该成功");
        assert_eq!(graph.nodes().len(), 2);
    }
}
