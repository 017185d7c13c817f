//! 路由：把路由决策映射为执行计划
//!
//! Complex -> Delegated；Direct / Simple 单 Worker -> Direct，多 Worker -> Parallel。

use serde::Serialize;

use crate::core::OrchestratorError;
use crate::decision::{RoutingDecision, RoutingPattern};
use crate::execution::{StrategyKind, WorkerId};

/// 执行计划
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutePlan {
    pub strategy: StrategyKind,
    pub workers: Vec<WorkerId>,
}

pub struct Router {
    default_worker: WorkerId,
}

impl Router {
    pub fn new(default_worker: impl Into<String>) -> Self {
        Self {
            default_worker: default_worker.into(),
        }
    }

    /// 空 Worker 集替换为默认 Worker；默认 Worker 为空时返回 ContractViolation
    pub fn route(&self, decision: &RoutingDecision) -> Result<RoutePlan, OrchestratorError> {
        let workers = if decision.target_workers.is_empty() {
            let fallback = self.default_worker.trim();
            if fallback.is_empty() {
                return Err(OrchestratorError::ContractViolation(
                    "decision has no target workers and no default worker is configured".into(),
                ));
            }
            vec![fallback.to_string()]
        } else {
            decision.target_workers.clone()
        };

        let strategy = match decision.pattern {
            RoutingPattern::Complex => StrategyKind::Delegated,
            RoutingPattern::Direct | RoutingPattern::Simple if workers.len() == 1 => {
                StrategyKind::Direct
            }
            RoutingPattern::Direct | RoutingPattern::Simple => StrategyKind::Parallel,
        };

        Ok(RoutePlan { strategy, workers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(pattern: RoutingPattern, workers: &[&str]) -> RoutingDecision {
        RoutingDecision::new(pattern, workers.iter().map(|w| w.to_string()).collect())
    }

    #[test]
    fn test_pattern_to_strategy_mapping() {
        let router = Router::new("general");
        let cases = [
            (RoutingPattern::Complex, vec!["a"], StrategyKind::Delegated),
            (RoutingPattern::Complex, vec!["a", "b"], StrategyKind::Delegated),
            (RoutingPattern::Simple, vec!["a"], StrategyKind::Direct),
            (RoutingPattern::Direct, vec!["a"], StrategyKind::Direct),
            (RoutingPattern::Simple, vec!["a", "b"], StrategyKind::Parallel),
            (RoutingPattern::Direct, vec!["a", "b", "c"], StrategyKind::Parallel),
        ];
        for (pattern, workers, expected) in cases {
            let plan = router.route(&decision(pattern, &workers)).unwrap();
            assert_eq!(plan.strategy, expected, "{pattern} with {workers:?}");
            assert_eq!(plan.workers, workers);
        }
    }

    #[test]
    fn test_empty_workers_use_default() {
        let plan = Router::new("general")
            .route(&decision(RoutingPattern::Simple, &[]))
            .unwrap();
        assert_eq!(plan.strategy, StrategyKind::Direct);
        assert_eq!(plan.workers, vec!["general"]);
    }

    #[test]
    fn test_blank_default_is_contract_violation() {
        let err = Router::new("  ")
            .route(&decision(RoutingPattern::Complex, &[]))
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::ContractViolation(_)));
    }
}
