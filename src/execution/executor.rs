//! Worker 执行器
//!
//! 持有 WorkerPool 与单次调用超时，invoke(worker, request) 在超时内调用池，
//! 失败或超时都转成 ExecutionResult{Error}；每次调用输出结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::execution::{ExecutionResult, WorkerError, WorkerPool, WorkerRequest};
use crate::observability::Metrics;

/// Worker 执行器：对每次调用施加超时，并把错误收敛为带类型的结果
#[derive(Clone)]
pub struct WorkerExecutor {
    pool: Arc<dyn WorkerPool>,
    timeout: Duration,
    metrics: Arc<Metrics>,
}

impl WorkerExecutor {
    pub fn new(pool: Arc<dyn WorkerPool>, timeout: Duration, metrics: Arc<Metrics>) -> Self {
        Self {
            pool,
            timeout,
            metrics,
        }
    }

    /// 调用原始接口：超时返回 WorkerError::Timeout
    pub async fn try_invoke(
        &self,
        worker_id: &str,
        request: &WorkerRequest,
    ) -> Result<ExecutionResult, WorkerError> {
        let start = Instant::now();
        let result = timeout(self.timeout, self.pool.invoke(worker_id, request)).await;

        let outcome = match &result {
            Ok(Ok(_)) => "ok",
            Ok(Err(_)) => "error",
            Err(_) => "timeout",
        };
        let audit = serde_json::json!({
            "event": "worker_audit",
            "worker": worker_id,
            "task_id": request.task.id,
            "attempt": request.attempt,
            "ok": outcome == "ok",
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
        });
        tracing::info!(audit = %audit, "worker");

        match result {
            Ok(inner) => inner,
            Err(_) => Err(WorkerError::Timeout(worker_id.to_string())),
        }
    }

    /// 调用并收敛：任何错误都变成 ExecutionResult{Error}
    pub async fn invoke(&self, worker_id: &str, request: &WorkerRequest) -> ExecutionResult {
        match self.try_invoke(worker_id, request).await {
            Ok(result) => result,
            Err(e) => {
                self.metrics.worker_failure();
                tracing::warn!(worker = worker_id, error = %e, "worker invocation failed");
                ExecutionResult::error(e.to_string())
            }
        }
    }
}
