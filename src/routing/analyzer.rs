//! 任务分析：调用决策模块得到路由决策，失败或超时退化为启发式
//!
//! 输出总是规范化的：置信度夹到 [0, 1]，丢弃未知 Worker，按声明顺序去重。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::decision::{DecisionError, DecisionModule, HeuristicDecisionModule, RoutingDecision};
use crate::execution::WorkerProfile;
use crate::observability::Metrics;
use crate::task::Task;

pub struct TaskAnalyzer {
    timeout: Duration,
    fallback: HeuristicDecisionModule,
    metrics: Arc<Metrics>,
}

impl TaskAnalyzer {
    pub fn new(timeout: Duration, metrics: Arc<Metrics>) -> Self {
        Self {
            timeout,
            fallback: HeuristicDecisionModule::new(),
            metrics,
        }
    }

    /// 产出路由决策；从不返回错误
    pub async fn analyze(
        &self,
        task: &Task,
        module: &dyn DecisionModule,
        catalog: &[WorkerProfile],
    ) -> RoutingDecision {
        let outcome = match timeout(self.timeout, module.classify(task, catalog)).await {
            Ok(inner) => inner,
            Err(_) => Err(DecisionError::Timeout),
        };

        let decision = match outcome {
            Ok(decision) => {
                self.metrics.module_decision();
                decision
            }
            Err(e) => {
                self.metrics.heuristic_decision();
                tracing::warn!(module = module.name(), error = %e, "classification fell back to heuristic");
                self.fallback.decide(task, catalog)
            }
        };

        normalize(decision, catalog)
    }
}

fn normalize(mut decision: RoutingDecision, catalog: &[WorkerProfile]) -> RoutingDecision {
    decision.confidence = if decision.confidence.is_finite() {
        decision.confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };

    let known: HashSet<&str> = catalog.iter().map(|w| w.id.as_str()).collect();
    let mut seen = HashSet::new();
    let before = decision.target_workers.len();
    decision
        .target_workers
        .retain(|w| known.contains(w.as_str()) && seen.insert(w.clone()));
    if decision.target_workers.len() != before {
        tracing::debug!(
            dropped = before - decision.target_workers.len(),
            "unknown or duplicate workers removed from decision"
        );
    }
    decision
}
