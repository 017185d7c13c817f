//! Parallel 策略（fan-out / fan-in）
//!
//! 同一请求并发发给所有目标 Worker，等待全部结束（硬 join，不取最快者）；
//! 合并顺序按 Worker 声明顺序，与完成先后无关。单个 Worker 失败只在合并结果中标记为 error。

use async_trait::async_trait;
use futures_util::future::join_all;

use crate::execution::{
    ExecutionResult, ExecutionStatus, ExecutionStrategy, StrategyKind, WorkerExecutor, WorkerId,
    WorkerRequest,
};

pub struct ParallelStrategy {
    executor: WorkerExecutor,
}

impl ParallelStrategy {
    pub fn new(executor: WorkerExecutor) -> Self {
        Self { executor }
    }
}

/// 按声明顺序合并各 Worker 结果，附带归属标题
pub fn merge_results(results: &[(WorkerId, ExecutionResult)]) -> ExecutionResult {
    let mut sections = Vec::with_capacity(results.len());
    let mut artifacts = Vec::new();
    let mut tool_usage = Vec::new();
    let mut remaining = Vec::new();
    let mut reported = false;
    let mut succeeded = 0usize;

    for (worker, result) in results {
        if result.is_error() {
            sections.push(format!("### {worker} (error)\n{}", result.content.trim()));
        } else {
            succeeded += 1;
            sections.push(format!("### {worker}\n{}", result.content.trim()));
        }
        artifacts.extend(result.artifacts.iter().cloned());
        tool_usage.extend(result.tool_usage.iter().cloned());
        if let Some(objectives) = &result.remaining_objectives {
            reported = true;
            remaining.extend(objectives.iter().cloned());
        }
    }

    let status = if succeeded == results.len() && !results.is_empty() {
        ExecutionStatus::Success
    } else if succeeded > 0 {
        ExecutionStatus::Partial
    } else {
        ExecutionStatus::Error
    };

    ExecutionResult {
        status,
        content: sections.join("\n\n"),
        artifacts,
        tool_usage,
        remaining_objectives: reported.then_some(remaining),
    }
}

#[async_trait]
impl ExecutionStrategy for ParallelStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Parallel
    }

    async fn execute(&self, request: &WorkerRequest, workers: &[WorkerId]) -> ExecutionResult {
        tracing::debug!(workers = workers.len(), "fan-out");
        let futures = workers.iter().map(|w| self.executor.invoke(w, request));
        let outputs = join_all(futures).await;

        let paired: Vec<(WorkerId, ExecutionResult)> =
            workers.iter().cloned().zip(outputs).collect();
        merge_results(&paired)
    }
}
