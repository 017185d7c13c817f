//! Delegated 策略（交接链）
//!
//! Worker 按声明顺序轮流执行；每步之后 ProgressEvaluator 评估剩余目标，HandoffManager 构建交接上下文
//! 作为下一步输入。没有剩余目标时提前结束（沿用最后一步的状态），达到最大链长时以 partial 结束；
//! 任何一步失败则整条链以 error 结束，由编排器整体重试。

use async_trait::async_trait;

use crate::evaluation::ProgressEvaluator;
use crate::execution::{
    ExecutionResult, ExecutionStatus, ExecutionStrategy, HandoffContext, HandoffManager,
    StrategyKind, WorkerExecutor, WorkerId, WorkerRequest,
};

pub struct DelegatedStrategy {
    executor: WorkerExecutor,
    progress: ProgressEvaluator,
    handoff: HandoffManager,
    max_chain_length: usize,
}

impl DelegatedStrategy {
    pub fn new(executor: WorkerExecutor, max_chain_length: usize) -> Self {
        Self {
            executor,
            progress: ProgressEvaluator::new(),
            handoff: HandoffManager::new(),
            max_chain_length: max_chain_length.max(1),
        }
    }
}

#[async_trait]
impl ExecutionStrategy for DelegatedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Delegated
    }

    async fn execute(&self, request: &WorkerRequest, workers: &[WorkerId]) -> ExecutionResult {
        if workers.is_empty() {
            return ExecutionResult::error("delegated strategy invoked without workers");
        }

        let task = request.task.as_ref();
        let mut sections: Vec<String> = Vec::new();
        let mut artifacts: Vec<String> = Vec::new();
        let mut tool_usage = Vec::new();
        let mut context: Option<HandoffContext> = None;
        let mut remaining = Vec::new();

        for step in 1..=self.max_chain_length {
            let worker = &workers[(step - 1) % workers.len()];
            let step_request = match &context {
                Some(ctx) => request.clone().with_handoff(ctx.clone()),
                None => request.clone(),
            };

            let result = self.executor.invoke(worker, &step_request).await;
            tool_usage.extend(result.tool_usage.iter().cloned());
            HandoffManager::absorb_artifacts(&mut artifacts, &result);

            if result.is_error() {
                sections.push(format!("### step {step} · {worker} (error)\n{}", result.content.trim()));
                tracing::warn!(step, worker = %worker, "handoff chain aborted");
                return ExecutionResult {
                    status: ExecutionStatus::Error,
                    content: sections.join("\n\n"),
                    artifacts,
                    tool_usage,
                    remaining_objectives: None,
                };
            }

            sections.push(format!("### step {step} · {worker}\n{}", result.content.trim()));
            let report = self.progress.evaluate(task, &result);
            tracing::debug!(
                step,
                worker = %worker,
                remaining = report.remaining_objectives.len(),
                "handoff step finished"
            );

            if report.complete {
                return ExecutionResult {
                    status: result.status,
                    content: sections.join("\n\n"),
                    artifacts,
                    tool_usage,
                    remaining_objectives: Some(Vec::new()),
                };
            }

            remaining = report.remaining_objectives.clone();
            context = Some(self.handoff.build(
                task,
                step,
                &sections.join("\n\n"),
                &artifacts,
                &report,
            ));
        }

        tracing::info!(
            max_chain_length = self.max_chain_length,
            remaining = remaining.len(),
            "handoff chain reached its length limit"
        );
        ExecutionResult {
            status: ExecutionStatus::Partial,
            content: sections.join("\n\n"),
            artifacts,
            tool_usage,
            remaining_objectives: Some(remaining),
        }
    }
}
