//! 表达式定义
//!
//! 逻辑计划使用的封闭表达式枚举。连接谓词是 `Expression::Binary`，
//! 其操作数在等值连接场景下应当是可回溯到基表的列表达式。

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::core::types::ColumnId;
use crate::core::value::Value;

use super::node::StoredTableNode;

/// 二元操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // 算术操作
    Add,
    Subtract,
    Multiply,
    Divide,

    // 比较操作
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,

    // 逻辑操作
    And,
    Or,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        }
    }
}

/// 列表达式
///
/// 通过弱引用回溯到来源基表节点。弱引用在规则运行期间应当始终
/// 可升级（计划叶子持有强引用）；升级失败说明上游不变量被破坏。
#[derive(Debug, Clone)]
pub struct ColumnExpression {
    original_node: Weak<RefCell<StoredTableNode>>,
    original_column_id: ColumnId,
}

impl ColumnExpression {
    pub fn new(original_node: &Rc<RefCell<StoredTableNode>>, column_id: ColumnId) -> Self {
        Self {
            original_node: Rc::downgrade(original_node),
            original_column_id: column_id,
        }
    }

    /// 升级到来源基表节点，计划已被释放时返回 None
    pub fn original_node(&self) -> Option<Rc<RefCell<StoredTableNode>>> {
        self.original_node.upgrade()
    }

    pub fn original_column_id(&self) -> ColumnId {
        self.original_column_id
    }

    pub fn description(&self) -> String {
        match self.original_node.upgrade() {
            Some(node) => format!(
                "{}.column#{}",
                node.borrow().table_name(),
                self.original_column_id
            ),
            None => format!("<expired>.column#{}", self.original_column_id),
        }
    }
}

/// 表达式
#[derive(Debug, Clone)]
pub enum Expression {
    Column(ColumnExpression),
    Literal(Value),
    Binary {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

impl Expression {
    pub fn column(original_node: &Rc<RefCell<StoredTableNode>>, column_id: ColumnId) -> Self {
        Expression::Column(ColumnExpression::new(original_node, column_id))
    }

    pub fn literal(value: Value) -> Self {
        Expression::Literal(value)
    }

    pub fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// 等值谓词的便捷构造
    pub fn equals(left: Expression, right: Expression) -> Self {
        Self::binary(BinaryOperator::Equal, left, right)
    }

    pub fn description(&self) -> String {
        match self {
            Expression::Column(column) => column.description(),
            Expression::Literal(value) => value.to_string(),
            Expression::Binary { op, left, right } => format!(
                "{} {} {}",
                left.description(),
                op.symbol(),
                right.description()
            ),
        }
    }
}
