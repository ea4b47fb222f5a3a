//! 计划节点实现
//!
//! 各节点结构体持有自己的输入，统一封装进 `PlanNodeEnum`。
//! 集合操作节点由宏生成，结构完全一致。

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::core::types::ChunkId;

use super::expression::Expression;

/// 基表引用
///
/// 同一个基表在计划中的每次出现对应一个独立的 `StoredTableNode`
/// 实例（自连接的两侧是两个实例）。实例按 `Rc` 指针身份区分。
/// `pruned_chunk_ids` 是本次查询中该引用已被裁剪的 chunk 注解，
/// 只增不减，由执行层消费。
#[derive(Debug)]
pub struct StoredTableNode {
    table_name: String,
    pruned_chunk_ids: BTreeSet<ChunkId>,
}

/// 计划与表达式之间共享的基表引用别名
pub type StoredTableRef = Rc<RefCell<StoredTableNode>>;

impl StoredTableNode {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            pruned_chunk_ids: BTreeSet::new(),
        }
    }

    /// 包装为计划叶子与列表达式共享的引用形式
    pub fn new_ref(table_name: impl Into<String>) -> StoredTableRef {
        Rc::new(RefCell::new(Self::new(table_name)))
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn pruned_chunk_ids(&self) -> &BTreeSet<ChunkId> {
        &self.pruned_chunk_ids
    }

    /// 并入新发现的可裁剪 chunk 集合
    ///
    /// 只做并集，既有成员永不移除；重复并入同一集合是幂等的。
    pub fn extend_pruned_chunk_ids(&mut self, pruned_chunk_ids: BTreeSet<ChunkId>) {
        self.pruned_chunk_ids.extend(pruned_chunk_ids);
    }

    pub fn description(&self) -> String {
        format!(
            "[StoredTable] {} ({} pruned chunks)",
            self.table_name,
            self.pruned_chunk_ids.len()
        )
    }
}

/// 连接类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinMode {
    Inner,
    Left,
    Right,
    FullOuter,
    Cross,
    Semi,
    Anti,
}

impl JoinMode {
    pub fn name(&self) -> &'static str {
        match self {
            JoinMode::Inner => "Inner",
            JoinMode::Left => "Left",
            JoinMode::Right => "Right",
            JoinMode::FullOuter => "FullOuter",
            JoinMode::Cross => "Cross",
            JoinMode::Semi => "Semi",
            JoinMode::Anti => "Anti",
        }
    }
}

/// 基表扫描叶子节点
#[derive(Debug)]
pub struct StoredTableScanNode {
    table: StoredTableRef,
}

impl StoredTableScanNode {
    pub fn new(table: StoredTableRef) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &StoredTableRef {
        &self.table
    }
}

/// 连接节点
#[derive(Debug)]
pub struct JoinNode {
    left: Box<PlanNodeEnum>,
    right: Box<PlanNodeEnum>,
    join_mode: JoinMode,
    join_predicates: Vec<Expression>,
}

impl JoinNode {
    pub fn new(
        left: PlanNodeEnum,
        right: PlanNodeEnum,
        join_mode: JoinMode,
        join_predicates: Vec<Expression>,
    ) -> Self {
        Self {
            left: Box::new(left),
            right: Box::new(right),
            join_mode,
            join_predicates,
        }
    }

    pub fn left_input(&self) -> &PlanNodeEnum {
        &self.left
    }

    pub fn right_input(&self) -> &PlanNodeEnum {
        &self.right
    }

    pub fn join_mode(&self) -> JoinMode {
        self.join_mode
    }

    pub fn join_predicates(&self) -> &[Expression] {
        &self.join_predicates
    }
}

/// 过滤节点
#[derive(Debug)]
pub struct PredicateNode {
    input: Box<PlanNodeEnum>,
    predicate: Expression,
}

impl PredicateNode {
    pub fn new(input: PlanNodeEnum, predicate: Expression) -> Self {
        Self {
            input: Box::new(input),
            predicate,
        }
    }

    pub fn input(&self) -> &PlanNodeEnum {
        &self.input
    }

    pub fn predicate(&self) -> &Expression {
        &self.predicate
    }
}

/// 投影节点
#[derive(Debug)]
pub struct ProjectionNode {
    input: Box<PlanNodeEnum>,
    expressions: Vec<Expression>,
}

impl ProjectionNode {
    pub fn new(input: PlanNodeEnum, expressions: Vec<Expression>) -> Self {
        Self {
            input: Box::new(input),
            expressions,
        }
    }

    pub fn input(&self) -> &PlanNodeEnum {
        &self.input
    }

    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }
}

/// 排序节点
#[derive(Debug)]
pub struct SortNode {
    input: Box<PlanNodeEnum>,
    sort_keys: Vec<Expression>,
}

impl SortNode {
    pub fn new(input: PlanNodeEnum, sort_keys: Vec<Expression>) -> Self {
        Self {
            input: Box::new(input),
            sort_keys,
        }
    }

    pub fn input(&self) -> &PlanNodeEnum {
        &self.input
    }

    pub fn sort_keys(&self) -> &[Expression] {
        &self.sort_keys
    }
}

/// 限制节点
#[derive(Debug)]
pub struct LimitNode {
    input: Box<PlanNodeEnum>,
    limit: usize,
}

impl LimitNode {
    pub fn new(input: PlanNodeEnum, limit: usize) -> Self {
        Self {
            input: Box::new(input),
            limit,
        }
    }

    pub fn input(&self) -> &PlanNodeEnum {
        &self.input
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

macro_rules! define_set_operation_node {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name {
            left: Box<PlanNodeEnum>,
            right: Box<PlanNodeEnum>,
        }

        impl $name {
            pub fn new(left: PlanNodeEnum, right: PlanNodeEnum) -> Self {
                Self {
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }

            pub fn left_input(&self) -> &PlanNodeEnum {
                &self.left
            }

            pub fn right_input(&self) -> &PlanNodeEnum {
                &self.right
            }
        }
    };
}

define_set_operation_node! {
    /// 并集节点
    UnionNode
}

define_set_operation_node! {
    /// 交集节点
    IntersectNode
}

define_set_operation_node! {
    /// 差集节点
    ExceptNode
}

/// 计划节点的封闭枚举
#[derive(Debug)]
pub enum PlanNodeEnum {
    StoredTable(StoredTableScanNode),
    Predicate(PredicateNode),
    Projection(ProjectionNode),
    Join(JoinNode),
    Union(UnionNode),
    Intersect(IntersectNode),
    Except(ExceptNode),
    Sort(SortNode),
    Limit(LimitNode),
}

impl PlanNodeEnum {
    pub fn name(&self) -> &'static str {
        match self {
            PlanNodeEnum::StoredTable(_) => "StoredTable",
            PlanNodeEnum::Predicate(_) => "Predicate",
            PlanNodeEnum::Projection(_) => "Projection",
            PlanNodeEnum::Join(_) => "Join",
            PlanNodeEnum::Union(_) => "Union",
            PlanNodeEnum::Intersect(_) => "Intersect",
            PlanNodeEnum::Except(_) => "Except",
            PlanNodeEnum::Sort(_) => "Sort",
            PlanNodeEnum::Limit(_) => "Limit",
        }
    }

    /// 节点的输入，按左右顺序
    pub fn inputs(&self) -> Vec<&PlanNodeEnum> {
        match self {
            PlanNodeEnum::StoredTable(_) => Vec::new(),
            PlanNodeEnum::Predicate(node) => vec![node.input()],
            PlanNodeEnum::Projection(node) => vec![node.input()],
            PlanNodeEnum::Join(node) => vec![node.left_input(), node.right_input()],
            PlanNodeEnum::Union(node) => vec![node.left_input(), node.right_input()],
            PlanNodeEnum::Intersect(node) => vec![node.left_input(), node.right_input()],
            PlanNodeEnum::Except(node) => vec![node.left_input(), node.right_input()],
            PlanNodeEnum::Sort(node) => vec![node.input()],
            PlanNodeEnum::Limit(node) => vec![node.input()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(name: &str) -> PlanNodeEnum {
        PlanNodeEnum::StoredTable(StoredTableScanNode::new(StoredTableNode::new_ref(name)))
    }

    #[test]
    fn test_stored_table_node_pruning_is_monotonic() {
        let mut node = StoredTableNode::new("orders");
        node.extend_pruned_chunk_ids(BTreeSet::from([1, 3]));
        node.extend_pruned_chunk_ids(BTreeSet::from([3, 5]));
        assert_eq!(node.pruned_chunk_ids(), &BTreeSet::from([1, 3, 5]));
        // 重复并入不改变集合
        node.extend_pruned_chunk_ids(BTreeSet::from([1, 3, 5]));
        assert_eq!(node.pruned_chunk_ids().len(), 3);
    }

    #[test]
    fn test_plan_node_names_and_inputs() {
        let join = PlanNodeEnum::Join(JoinNode::new(
            scan("a"),
            scan("b"),
            JoinMode::Inner,
            Vec::new(),
        ));
        assert_eq!(join.name(), "Join");
        assert_eq!(join.inputs().len(), 2);

        let union = PlanNodeEnum::Union(UnionNode::new(scan("a"), scan("b")));
        assert_eq!(union.name(), "Union");
        assert_eq!(union.inputs().len(), 2);

        let leaf = scan("a");
        assert!(leaf.inputs().is_empty());
    }
}
