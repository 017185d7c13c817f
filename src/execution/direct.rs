//! Direct 策略：单个 Worker，结果原样返回

use async_trait::async_trait;

use crate::execution::{
    ExecutionResult, ExecutionStrategy, StrategyKind, WorkerExecutor, WorkerId, WorkerRequest,
};

pub struct DirectStrategy {
    executor: WorkerExecutor,
}

impl DirectStrategy {
    pub fn new(executor: WorkerExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl ExecutionStrategy for DirectStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Direct
    }

    async fn execute(&self, request: &WorkerRequest, workers: &[WorkerId]) -> ExecutionResult {
        let Some(worker) = workers.first() else {
            return ExecutionResult::error("direct strategy invoked without a worker");
        };
        self.executor.invoke(worker, request).await
    }
}
