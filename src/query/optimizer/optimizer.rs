//! 优化器入口
//! 提供 Optimizer 结构体、规则集合与优化上下文

use std::sync::Arc;

use crate::query::plan::LogicalPlan;
use crate::storage::RangeStatisticsSource;

use super::config::{OptimizationConfig, OptimizationStats};
use super::dips_pruning::DipsPruningRule;
use super::rule::{OptRule, OptimizerError};

/// 优化上下文
///
/// 持有注入的范围统计能力、配置与统计计数。同一上下文只服务
/// 一个计划的一次优化；不同计划各自创建上下文即可并发优化。
pub struct OptContext {
    pub range_statistics: Arc<dyn RangeStatisticsSource>,
    pub config: OptimizationConfig,
    pub stats: OptimizationStats,
}

impl OptContext {
    pub fn new(range_statistics: Arc<dyn RangeStatisticsSource>) -> Self {
        Self {
            range_statistics,
            config: OptimizationConfig::default(),
            stats: OptimizationStats::default(),
        }
    }

    pub fn with_config(
        range_statistics: Arc<dyn RangeStatisticsSource>,
        config: OptimizationConfig,
    ) -> Self {
        Self {
            range_statistics,
            config,
            stats: OptimizationStats::default(),
        }
    }
}

impl std::fmt::Debug for OptContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptContext")
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish()
    }
}

#[derive(Debug)]
pub struct RuleSet {
    pub name: String,
    rules: Vec<Box<dyn OptRule>>,
}

impl RuleSet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rules: Vec::new(),
        }
    }

    pub fn add_rule(&mut self, rule: Box<dyn OptRule>) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Box<dyn OptRule>] {
        &self.rules
    }
}

#[derive(Debug)]
pub struct Optimizer {
    rule_sets: Vec<RuleSet>,
}

impl Optimizer {
    pub fn new(rule_sets: Vec<RuleSet>) -> Self {
        Self { rule_sets }
    }

    /// 注册默认规则集合
    pub fn with_default_rules() -> Self {
        let mut annotation_rules = RuleSet::new("annotation");
        annotation_rules.add_rule(Box::new(DipsPruningRule));

        Self::new(vec![annotation_rules])
    }

    /// 依次在计划上应用全部规则集合
    pub fn optimize(
        &self,
        ctx: &mut OptContext,
        plan: &LogicalPlan,
    ) -> Result<(), OptimizerError> {
        for rule_set in &self.rule_sets {
            for rule in rule_set.rules() {
                if !rule.is_enabled(&ctx.config) {
                    log::debug!("规则 {} 被配置禁用，跳过", rule.name());
                    continue;
                }
                rule.apply(ctx, plan)?;
                ctx.stats.record_rule_application();
                log::debug!("已应用规则 {}", rule.name());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageManager;

    #[test]
    fn test_rule_set_registration() {
        let optimizer = Optimizer::with_default_rules();
        assert_eq!(optimizer.rule_sets.len(), 1);
        assert_eq!(optimizer.rule_sets[0].rules().len(), 1);
        assert_eq!(optimizer.rule_sets[0].rules()[0].name(), "DipsPruningRule");
    }

    #[test]
    fn test_optimize_empty_plan() {
        let optimizer = Optimizer::with_default_rules();
        let mut ctx = OptContext::new(Arc::new(StorageManager::new()));
        let plan = LogicalPlan::new(None);
        optimizer.optimize(&mut ctx, &plan).expect("空计划优化应该成功");
        assert_eq!(ctx.stats.rules_applied, 1);
        assert_eq!(ctx.stats.chunks_pruned, 0);
    }

    #[test]
    fn test_disabled_rule_is_skipped() {
        let optimizer = Optimizer::with_default_rules();
        let config = OptimizationConfig {
            enable_dips_pruning: false,
            ..OptimizationConfig::default()
        };
        let mut ctx = OptContext::with_config(Arc::new(StorageManager::new()), config);
        let plan = LogicalPlan::new(None);
        optimizer.optimize(&mut ctx, &plan).expect("优化应该成功");
        assert_eq!(ctx.stats.rules_applied, 0);
    }
}
