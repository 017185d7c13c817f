//! 执行结果：一次策略调用的产出，供进度评估与质量控制消费

use serde::{Deserialize, Serialize};

/// 执行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    /// 部分完成（并行中部分 Worker 失败，或委派链达到长度上限）
    Partial,
    Error,
}

/// 单次工具调用记录（由 Worker 上报，并行时跨 Worker 聚合）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub worker: String,
    pub tool: String,
    pub ok: bool,
    pub duration_ms: u64,
}

/// 执行结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub content: String,
    pub artifacts: Vec<String>,
    pub tool_usage: Vec<ToolCallRecord>,
    /// Worker 显式上报的剩余目标：Some(空) 表示已完成，None 表示未上报
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_objectives: Option<Vec<String>>,
}

impl ExecutionResult {
    fn with_status(status: ExecutionStatus, content: impl Into<String>) -> Self {
        Self {
            status,
            content: content.into(),
            artifacts: Vec::new(),
            tool_usage: Vec::new(),
            remaining_objectives: None,
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self::with_status(ExecutionStatus::Success, content)
    }

    pub fn partial(content: impl Into<String>) -> Self {
        Self::with_status(ExecutionStatus::Partial, content)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_status(ExecutionStatus::Error, message)
    }

    pub fn with_artifacts(mut self, artifacts: Vec<String>) -> Self {
        self.artifacts = artifacts;
        self
    }

    pub fn with_tool_usage(mut self, tool_usage: Vec<ToolCallRecord>) -> Self {
        self.tool_usage = tool_usage;
        self
    }

    pub fn with_remaining_objectives(mut self, objectives: Vec<String>) -> Self {
        self.remaining_objectives = Some(objectives);
        self
    }

    pub fn is_error(&self) -> bool {
        self.status == ExecutionStatus::Error
    }

    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// 从历次结果中挑出最佳可交付输出：最近一次非 Error 且有内容的结果，否则最近一次结果
pub fn best_effort(history: &[ExecutionResult]) -> Option<ExecutionResult> {
    history
        .iter()
        .rev()
        .find(|r| !r.is_error() && r.has_content())
        .or_else(|| history.last())
        .cloned()
}
