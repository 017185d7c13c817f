//! Worker 注册表
//!
//! 所有 Worker 实现 Worker trait（id / description / keywords / invoke），由 WorkerRegistry 按声明顺序注册，
//! 对外以 WorkerPool 暴露给编排器；WorkerExecutor 在调用时加超时并统一转成 ExecutionResult。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::execution::{ExecutionResult, HandoffContext};
use crate::task::Task;

/// Worker ID
pub type WorkerId = String;

/// Worker 画像：供决策模块匹配
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerProfile {
    pub id: WorkerId,
    pub description: String,
    /// 命中这些关键词的任务倾向于路由到此 Worker
    pub keywords: Vec<String>,
}

impl WorkerProfile {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            keywords: Vec::new(),
        }
    }

    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords = keywords.iter().map(|k| k.to_string()).collect();
        self
    }
}

/// 上一次尝试被拒后折叠进下一次输入的反馈
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetryFeedback {
    pub previous: ExecutionResult,
    pub missing_elements: Vec<String>,
}

/// 发给 Worker 的请求：任务本身，加上可选的重试反馈与交接上下文
#[derive(Debug, Clone)]
pub struct WorkerRequest {
    pub task: Arc<Task>,
    /// 第几次执行尝试（从 0 开始）
    pub attempt: u32,
    pub feedback: Option<RetryFeedback>,
    pub handoff: Option<HandoffContext>,
}

impl WorkerRequest {
    pub fn new(task: Arc<Task>) -> Self {
        Self {
            task,
            attempt: 0,
            feedback: None,
            handoff: None,
        }
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    pub fn with_feedback(mut self, feedback: RetryFeedback) -> Self {
        self.feedback = Some(feedback);
        self
    }

    pub fn with_handoff(mut self, handoff: HandoffContext) -> Self {
        self.handoff = Some(handoff);
        self
    }

    /// 拼出 Worker 看到的完整输入文本
    pub fn render_prompt(&self) -> String {
        let mut prompt = format!("Task: {}", self.task.text());
        if let Some(feedback) = &self.feedback {
            prompt.push_str("\n\nPrevious attempt:\n");
            prompt.push_str(feedback.previous.content.trim());
            if !feedback.missing_elements.is_empty() {
                prompt.push_str("\n\nStill missing:\n");
                for item in &feedback.missing_elements {
                    prompt.push_str(&format!("- {item}\n"));
                }
            }
        }
        if let Some(handoff) = &self.handoff {
            prompt.push_str("\n\n");
            prompt.push_str(&handoff.render());
        }
        prompt
    }
}

/// Worker 调用错误（在执行边界被转成 ExecutionResult{Error}）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkerError {
    #[error("Unknown worker: {0}")]
    UnknownWorker(String),

    #[error("Worker failed: {0}")]
    Failed(String),

    #[error("Worker timed out: {0}")]
    Timeout(String),
}

/// 单个 Worker
#[async_trait]
pub trait Worker: Send + Sync {
    fn id(&self) -> &str;

    fn description(&self) -> &str;

    fn keywords(&self) -> Vec<String> {
        Vec::new()
    }

    async fn invoke(&self, request: &WorkerRequest) -> Result<ExecutionResult, WorkerError>;
}

/// Worker 池：由宿主应用提供
#[async_trait]
pub trait WorkerPool: Send + Sync {
    /// 可用 Worker 画像（声明顺序）
    fn catalog(&self) -> Vec<WorkerProfile>;

    async fn invoke(
        &self,
        worker_id: &str,
        request: &WorkerRequest,
    ) -> Result<ExecutionResult, WorkerError>;
}

/// Worker 注册表：保留注册顺序，按 id 查找
#[derive(Default)]
pub struct WorkerRegistry {
    order: Vec<WorkerId>,
    workers: HashMap<WorkerId, Arc<dyn Worker>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册 Worker；同 id 重复注册时替换实现但保留原顺序
    pub fn register(&mut self, worker: impl Worker + 'static) {
        let id = worker.id().to_string();
        if !self.workers.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.workers.insert(id, Arc::new(worker));
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Worker>> {
        self.workers.get(id).cloned()
    }

    pub fn worker_ids(&self) -> Vec<WorkerId> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[async_trait]
impl WorkerPool for WorkerRegistry {
    fn catalog(&self) -> Vec<WorkerProfile> {
        self.order
            .iter()
            .filter_map(|id| self.workers.get(id))
            .map(|w| WorkerProfile {
                id: w.id().to_string(),
                description: w.description().to_string(),
                keywords: w.keywords(),
            })
            .collect()
    }

    async fn invoke(
        &self,
        worker_id: &str,
        request: &WorkerRequest,
    ) -> Result<ExecutionResult, WorkerError> {
        let worker = self
            .workers
            .get(worker_id)
            .ok_or_else(|| WorkerError::UnknownWorker(worker_id.to_string()))?;
        worker.invoke(request).await
    }
}

/// Echo Worker：回显任务文本并报告已完成（演示与测试用）
pub struct EchoWorker {
    id: String,
    description: String,
    keywords: Vec<String>,
}

impl EchoWorker {
    pub fn new(id: impl Into<String>, description: impl Into<String>, keywords: &[&str]) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[async_trait]
impl Worker for EchoWorker {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn keywords(&self) -> Vec<String> {
        self.keywords.clone()
    }

    async fn invoke(&self, request: &WorkerRequest) -> Result<ExecutionResult, WorkerError> {
        Ok(
            ExecutionResult::success(format!("[{}] {}", self.id, request.task.text()))
                .with_remaining_objectives(Vec::new()),
        )
    }
}
