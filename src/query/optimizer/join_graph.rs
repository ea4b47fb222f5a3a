//! 等值连接图数据结构
//!
//! 节点与参与受支持等值连接的基表引用一一对应，边携带连接两表的
//! 等值谓词。节点保存在 arena 里，以下标作为稳定标识；父子关系是
//! 普通的下标字段，在确定根之后一次性赋值，没有所有权环。
//!
//! 无向边以两个方向视图表示：A 到 B 的边总有一条 B 到 A 的镜像边，
//! 两个视图按同样顺序携带同样的谓词。

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use crate::query::plan::{Expression, StoredTableRef};

use super::rule::OptimizerError;

/// 连接图节点的 arena 下标
pub type JoinGraphNodeId = usize;

/// 某一节点指向伙伴节点的边视图
#[derive(Debug)]
pub struct JoinGraphEdge {
    partner: JoinGraphNodeId,
    predicates: Vec<Expression>,
}

impl JoinGraphEdge {
    pub fn partner(&self) -> JoinGraphNodeId {
        self.partner
    }

    pub fn predicates(&self) -> &[Expression] {
        &self.predicates
    }

    fn append_predicate(&mut self, predicate: Expression) {
        self.predicates.push(predicate);
    }
}

/// 连接图节点：一个基表引用在图中的化身
#[derive(Debug)]
pub struct JoinGraphNode {
    table: StoredTableRef,
    parent: Option<JoinGraphNodeId>,
    children: Vec<JoinGraphNodeId>,
    edges: Vec<JoinGraphEdge>,
}

impl JoinGraphNode {
    pub fn table(&self) -> &StoredTableRef {
        &self.table
    }

    /// 确定根之前恒为 None
    pub fn parent(&self) -> Option<JoinGraphNodeId> {
        self.parent
    }

    pub fn children(&self) -> &[JoinGraphNodeId] {
        &self.children
    }

    pub fn edges(&self) -> &[JoinGraphEdge] {
        &self.edges
    }

    pub fn edge_for_partner(&self, partner: JoinGraphNodeId) -> Option<&JoinGraphEdge> {
        self.edges.iter().find(|edge| edge.partner == partner)
    }
}

/// 等值连接图
#[derive(Debug, Default)]
pub struct JoinGraph {
    nodes: Vec<JoinGraphNode>,
    // 按基表引用的指针身份索引节点
    node_index: HashMap<usize, JoinGraphNodeId>,
}

impl JoinGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[JoinGraphNode] {
        &self.nodes
    }

    pub fn node(&self, node_id: JoinGraphNodeId) -> &JoinGraphNode {
        &self.nodes[node_id]
    }

    fn table_key(table: &StoredTableRef) -> usize {
        Rc::as_ptr(table) as usize
    }

    /// 查找或创建基表引用对应的节点
    ///
    /// 每个基表引用恰有一个节点：同一引用参与多个连接也不会产生
    /// 重复节点。
    pub fn get_or_create_node(&mut self, table: &StoredTableRef) -> JoinGraphNodeId {
        let key = Self::table_key(table);
        if let Some(&node_id) = self.node_index.get(&key) {
            return node_id;
        }
        let node_id = self.nodes.len();
        self.nodes.push(JoinGraphNode {
            table: Rc::clone(table),
            parent: None,
            children: Vec::new(),
            edges: Vec::new(),
        });
        self.node_index.insert(key, node_id);
        node_id
    }

    /// 在两个节点之间追加一条等值谓词
    ///
    /// 两个方向的边视图按需惰性创建，谓词同时追加到两个视图，
    /// 维持镜像不变量。无序节点对之间至多存在一对边视图。
    pub fn append_predicate(
        &mut self,
        left: JoinGraphNodeId,
        right: JoinGraphNodeId,
        predicate: Expression,
    ) {
        self.edge_mut(left, right).append_predicate(predicate.clone());
        self.edge_mut(right, left).append_predicate(predicate);
    }

    fn edge_mut(&mut self, from: JoinGraphNodeId, to: JoinGraphNodeId) -> &mut JoinGraphEdge {
        let node = &mut self.nodes[from];
        let position = match node.edges.iter().position(|edge| edge.partner == to) {
            Some(position) => position,
            None => {
                node.edges.push(JoinGraphEdge {
                    partner: to,
                    predicates: Vec::new(),
                });
                node.edges.len() - 1
            }
        };
        &mut node.edges[position]
    }

    /// 没找到任何受支持的连接时图为空，规则不做裁剪
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 图是否为树：边数等于节点数减一，且连通
    pub fn is_tree(&self) -> bool {
        if self.nodes.is_empty() {
            return false;
        }
        let directed_edge_count: usize = self.nodes.iter().map(|node| node.edges.len()).sum();
        if directed_edge_count != 2 * (self.nodes.len() - 1) {
            return false;
        }
        self.reachable_count(0) == self.nodes.len()
    }

    fn reachable_count(&self, start: JoinGraphNodeId) -> usize {
        let mut visited = vec![false; self.nodes.len()];
        let mut queue = VecDeque::from([start]);
        visited[start] = true;
        let mut count = 0;
        while let Some(node_id) = queue.pop_front() {
            count += 1;
            for edge in &self.nodes[node_id].edges {
                if !visited[edge.partner] {
                    visited[edge.partner] = true;
                    queue.push_back(edge.partner);
                }
            }
        }
        count
    }

    /// 以给定节点为根，通过一次连通遍历为全部节点赋父子关系
    ///
    /// 根的选择是任意的：传播协议对每条边对称，任何根产生同样的
    /// 裁剪效果。调用前图必须已确认为树；若仍有节点不可达，说明
    /// 之前的树形判定被破坏，报内部一致性错误。
    pub fn set_root(&mut self, root: JoinGraphNodeId) -> Result<(), OptimizerError> {
        for node in &mut self.nodes {
            node.parent = None;
            node.children.clear();
        }

        let mut visited = vec![false; self.nodes.len()];
        let mut queue = VecDeque::from([root]);
        visited[root] = true;

        while let Some(node_id) = queue.pop_front() {
            let partners: Vec<JoinGraphNodeId> = self.nodes[node_id]
                .edges
                .iter()
                .map(|edge| edge.partner)
                .collect();
            for partner in partners {
                if visited[partner] {
                    continue;
                }
                visited[partner] = true;
                self.nodes[partner].parent = Some(node_id);
                self.nodes[node_id].children.push(partner);
                queue.push_back(partner);
            }
        }

        if visited.iter().all(|seen| *seen) {
            Ok(())
        } else {
            Err(OptimizerError::internal_consistency(
                "确认过树形结构后仍存在不可达的连接图节点",
            ))
        }
    }
}

impl fmt::Display for JoinGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "==== Vertices ====")?;
        if self.nodes.is_empty() {
            writeln!(f, "<none>")?;
            return Ok(());
        }
        for (node_id, node) in self.nodes.iter().enumerate() {
            writeln!(f, "[{}] {}", node_id, node.table.borrow().description())?;
            match node.parent {
                Some(parent) => writeln!(f, "    parent: [{}]", parent)?,
                None => writeln!(f, "    parent: <none>")?,
            }
            if !node.children.is_empty() {
                writeln!(f, "    children: {:?}", node.children)?;
            }
            for edge in &node.edges {
                writeln!(f, "    edge -> [{}]", edge.partner)?;
                for predicate in &edge.predicates {
                    writeln!(f, "        {}", predicate.description())?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::plan::StoredTableNode;

    fn predicate(left: &StoredTableRef, right: &StoredTableRef) -> Expression {
        Expression::equals(Expression::column(left, 0), Expression::column(right, 0))
    }

    #[test]
    fn test_node_identity_per_table_reference() {
        let mut graph = JoinGraph::new();
        let a = StoredTableNode::new_ref("a");
        let b = StoredTableNode::new_ref("b");

        let first = graph.get_or_create_node(&a);
        let second = graph.get_or_create_node(&a);
        let third = graph.get_or_create_node(&b);
        assert_eq!(first, second);
        assert_ne!(first, third);
        assert_eq!(graph.nodes().len(), 2);
    }

    #[test]
    fn test_mirrored_edges_accumulate_predicates() {
        let mut graph = JoinGraph::new();
        let a = StoredTableNode::new_ref("a");
        let b = StoredTableNode::new_ref("b");
        let left = graph.get_or_create_node(&a);
        let right = graph.get_or_create_node(&b);

        graph.append_predicate(left, right, predicate(&a, &b));
        graph.append_predicate(left, right, predicate(&a, &b));

        // 同一无序节点对只存在一对边视图，谓词累积在同一条边上
        assert_eq!(graph.node(left).edges().len(), 1);
        assert_eq!(graph.node(right).edges().len(), 1);
        assert_eq!(graph.node(left).edges()[0].predicates().len(), 2);
        assert_eq!(graph.node(right).edges()[0].predicates().len(), 2);
        assert_eq!(graph.node(left).edges()[0].partner(), right);
        assert_eq!(graph.node(right).edges()[0].partner(), left);
    }

    #[test]
    fn test_tree_detection() {
        let mut graph = JoinGraph::new();
        let a = StoredTableNode::new_ref("a");
        let b = StoredTableNode::new_ref("b");
        let c = StoredTableNode::new_ref("c");
        let na = graph.get_or_create_node(&a);
        let nb = graph.get_or_create_node(&b);
        let nc = graph.get_or_create_node(&c);

        graph.append_predicate(na, nb, predicate(&a, &b));
        graph.append_predicate(nb, nc, predicate(&b, &c));
        assert!(graph.is_tree());

        // 闭合成环后不再是树
        graph.append_predicate(na, nc, predicate(&a, &c));
        assert!(!graph.is_tree());
    }

    #[test]
    fn test_empty_graph_is_not_a_tree() {
        let graph = JoinGraph::new();
        assert!(graph.is_empty());
        assert!(!graph.is_tree());
    }

    #[test]
    fn test_set_root_assigns_parents_and_children() {
        let mut graph = JoinGraph::new();
        let a = StoredTableNode::new_ref("a");
        let b = StoredTableNode::new_ref("b");
        let c = StoredTableNode::new_ref("c");
        let na = graph.get_or_create_node(&a);
        let nb = graph.get_or_create_node(&b);
        let nc = graph.get_or_create_node(&c);
        graph.append_predicate(na, nb, predicate(&a, &b));
        graph.append_predicate(nb, nc, predicate(&b, &c));

        graph.set_root(na).expect("设根应该成功");
        assert_eq!(graph.node(na).parent(), None);
        assert_eq!(graph.node(nb).parent(), Some(na));
        assert_eq!(graph.node(nc).parent(), Some(nb));
        assert_eq!(graph.node(na).children(), &[nb]);
        assert_eq!(graph.node(nb).children(), &[nc]);
        assert!(graph.node(nc).children().is_empty());

        // 换根重新赋值
        graph.set_root(nc).expect("换根应该成功");
        assert_eq!(graph.node(nc).parent(), None);
        assert_eq!(graph.node(na).parent(), Some(nb));
    }
}
