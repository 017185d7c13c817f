//! 执行层：Worker 池契约、三种执行策略（Direct / Parallel / Delegated）与交接上下文

pub mod delegated;
pub mod direct;
pub mod executor;
pub mod handoff;
pub mod parallel;
pub mod result;
pub mod worker;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use delegated::DelegatedStrategy;
pub use direct::DirectStrategy;
pub use executor::WorkerExecutor;
pub use handoff::{HandoffContext, HandoffManager};
pub use parallel::{merge_results, ParallelStrategy};
pub use result::{best_effort, ExecutionResult, ExecutionStatus, ToolCallRecord};
pub use worker::{
    EchoWorker, RetryFeedback, Worker, WorkerError, WorkerId, WorkerPool, WorkerProfile,
    WorkerRegistry, WorkerRequest,
};

/// 执行策略种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Direct,
    Parallel,
    Delegated,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StrategyKind::Direct => "direct",
            StrategyKind::Parallel => "parallel",
            StrategyKind::Delegated => "delegated",
        };
        f.write_str(s)
    }
}

/// 执行策略：把一次请求分派给一组 Worker，返回唯一的 ExecutionResult（从不返回 Err）
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn execute(&self, request: &WorkerRequest, workers: &[WorkerId]) -> ExecutionResult;
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;
    use crate::observability::Metrics;
    use crate::task::Task;

    /// 按 Worker 预设结果与延迟，并记录收到的请求
    #[derive(Default)]
    struct ScriptedPool {
        order: Vec<String>,
        replies: HashMap<String, Vec<Result<ExecutionResult, WorkerError>>>,
        delays_ms: HashMap<String, u64>,
        calls: Mutex<Vec<(String, WorkerRequest)>>,
        cursor: Mutex<HashMap<String, usize>>,
        finished: AtomicUsize,
    }

    impl ScriptedPool {
        fn worker(
            mut self,
            id: &str,
            delay_ms: u64,
            replies: Vec<Result<ExecutionResult, WorkerError>>,
        ) -> Self {
            self.order.push(id.to_string());
            self.replies.insert(id.to_string(), replies);
            self.delays_ms.insert(id.to_string(), delay_ms);
            self
        }
    }

    #[async_trait]
    impl WorkerPool for ScriptedPool {
        fn catalog(&self) -> Vec<WorkerProfile> {
            self.order
                .iter()
                .map(|id| WorkerProfile::new(id.clone(), "scripted"))
                .collect()
        }

        async fn invoke(
            &self,
            worker_id: &str,
            request: &WorkerRequest,
        ) -> Result<ExecutionResult, WorkerError> {
            self.calls
                .lock()
                .unwrap()
                .push((worker_id.to_string(), request.clone()));
            let delay = self.delays_ms.get(worker_id).copied().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.finished.fetch_add(1, Ordering::SeqCst);

            let replies = self
                .replies
                .get(worker_id)
                .ok_or_else(|| WorkerError::UnknownWorker(worker_id.to_string()))?;
            let idx = {
                let mut cursor = self.cursor.lock().unwrap();
                let entry = cursor.entry(worker_id.to_string()).or_insert(0);
                let idx = (*entry).min(replies.len() - 1);
                *entry += 1;
                idx
            };
            replies[idx].clone()
        }
    }

    fn executor(pool: Arc<ScriptedPool>) -> WorkerExecutor {
        WorkerExecutor::new(pool, Duration::from_secs(2), Arc::new(Metrics::new()))
    }

    fn ids(list: &[&str]) -> Vec<WorkerId> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn request(text: &str) -> WorkerRequest {
        WorkerRequest::new(Arc::new(Task::new(text)))
    }

    #[tokio::test]
    async fn test_direct_returns_worker_result_unchanged() {
        let reply = ExecutionResult::success("answer")
            .with_artifacts(vec!["out.txt".into()])
            .with_remaining_objectives(Vec::new());
        let pool = Arc::new(ScriptedPool::default().worker("general", 0, vec![Ok(reply.clone())]));
        let strategy = DirectStrategy::new(executor(pool.clone()));

        let result = strategy.execute(&request("q"), &ids(&["general"])).await;
        assert_eq!(result, reply);
        assert_eq!(pool.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_direct_worker_failure_becomes_error() {
        let pool = Arc::new(ScriptedPool::default().worker(
            "general",
            0,
            vec![Err(WorkerError::Failed("rate limited".into()))],
        ));
        let result = DirectStrategy::new(executor(pool))
            .execute(&request("q"), &ids(&["general"]))
            .await;
        assert!(result.is_error());
        assert!(result.content.contains("rate limited"));
    }

    #[tokio::test]
    async fn test_parallel_merge_follows_declaration_order() {
        // 第一个 Worker 最慢：合并顺序仍按声明顺序
        let pool = Arc::new(
            ScriptedPool::default()
                .worker("a", 120, vec![Ok(ExecutionResult::success("from a"))])
                .worker("b", 60, vec![Ok(ExecutionResult::success("from b"))])
                .worker("c", 0, vec![Ok(ExecutionResult::success("from c"))]),
        );
        let strategy = ParallelStrategy::new(executor(pool.clone()));
        let result = strategy.execute(&request("fan out"), &ids(&["a", "b", "c"])).await;

        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(result.content, "### a\nfrom a\n\n### b\nfrom b\n\n### c\nfrom c");
        assert_eq!(pool.finished.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_parallel_single_failure_is_partial() {
        let pool = Arc::new(
            ScriptedPool::default()
                .worker("a", 0, vec![Ok(ExecutionResult::success("ok a"))])
                .worker("b", 0, vec![Err(WorkerError::Failed("crashed".into()))]),
        );
        let result = ParallelStrategy::new(executor(pool))
            .execute(&request("fan out"), &ids(&["a", "b"]))
            .await;
        assert_eq!(result.status, ExecutionStatus::Partial);
        assert!(result.content.contains("### a\nok a"));
        assert!(result.content.contains("### b (error)"));
    }

    #[tokio::test]
    async fn test_delegated_stops_when_objectives_empty() {
        let pool = Arc::new(
            ScriptedPool::default()
                .worker(
                    "planner",
                    0,
                    vec![Ok(ExecutionResult::success("outline done")
                        .with_remaining_objectives(vec!["write body".into()]))],
                )
                .worker(
                    "writer",
                    0,
                    vec![Ok(ExecutionResult::success("body written")
                        .with_remaining_objectives(Vec::new()))],
                ),
        );
        let strategy = DelegatedStrategy::new(executor(pool.clone()), 5);
        let result = strategy
            .execute(&request("Write a report"), &ids(&["planner", "writer"]))
            .await;

        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(
            result.content,
            "### step 1 · planner\noutline done\n\n### step 2 · writer\nbody written"
        );

        let calls = pool.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].1.handoff.is_none());
        let handoff = calls[1].1.handoff.as_ref().unwrap();
        assert_eq!(handoff.step, 1);
        assert_eq!(handoff.remaining_objectives, vec!["write body"]);
        assert!(calls[1].1.render_prompt().contains("Handoff after step 1"));
    }

    #[tokio::test]
    async fn test_delegated_keeps_partial_status_of_last_step() {
        let pool = Arc::new(ScriptedPool::default().worker(
            "solo",
            0,
            vec![Ok(ExecutionResult::partial("half done").with_remaining_objectives(Vec::new()))],
        ));
        let result = DelegatedStrategy::new(executor(pool.clone()), 4)
            .execute(&request("finish it"), &ids(&["solo"]))
            .await;

        assert_eq!(result.status, ExecutionStatus::Partial);
        assert_eq!(result.remaining_objectives, Some(Vec::new()));
        assert_eq!(pool.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delegated_max_length_is_partial() {
        let pool = Arc::new(ScriptedPool::default().worker(
            "solo",
            0,
            vec![Ok(ExecutionResult::success("- [ ] more work"))],
        ));
        let result = DelegatedStrategy::new(executor(pool.clone()), 3)
            .execute(&request("endless"), &ids(&["solo"]))
            .await;

        assert_eq!(result.status, ExecutionStatus::Partial);
        assert_eq!(result.remaining_objectives, Some(vec!["more work".to_string()]));
        assert_eq!(pool.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_delegated_step_failure_aborts_chain() {
        let pool = Arc::new(
            ScriptedPool::default()
                .worker(
                    "a",
                    0,
                    vec![Ok(ExecutionResult::success("x").with_remaining_objectives(vec!["y".into()]))],
                )
                .worker("b", 0, vec![Err(WorkerError::Failed("down".into()))]),
        );
        let result = DelegatedStrategy::new(executor(pool.clone()), 4)
            .execute(&request("t"), &ids(&["a", "b"]))
            .await;
        assert!(result.is_error());
        assert!(result.content.contains("### step 2 · b (error)"));
        assert_eq!(pool.calls.lock().unwrap().len(), 2);
    }
}
