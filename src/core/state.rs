//! 工作流状态机：阶段、合法迁移与会话状态
//!
//! 迁移只沿以下边进行：
//! Admitted -> Analyzing | Completed（快速通道）
//! Analyzing -> Routing -> Executing -> Evaluating -> AssessingQuality
//! AssessingQuality -> Completed | Retrying | Failed
//! Retrying -> Executing
//! 任一非终态 -> Cancelled；任一非终态 -> Failed（仅契约违例）

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::core::OrchestratorError;
use crate::execution::ExecutionResult;
use crate::task::Task;

/// 会话 ID
pub type SessionId = String;

/// 工作流阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    Admitted,
    Analyzing,
    Routing,
    Executing,
    Evaluating,
    AssessingQuality,
    Retrying,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkflowPhase::Completed | WorkflowPhase::Failed | WorkflowPhase::Cancelled
        )
    }

    pub fn can_transition_to(self, next: WorkflowPhase) -> bool {
        use WorkflowPhase::*;

        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (_, Cancelled)
                | (_, Failed)
                | (Admitted, Analyzing)
                | (Admitted, Completed)
                | (Analyzing, Routing)
                | (Routing, Executing)
                | (Executing, Evaluating)
                | (Evaluating, AssessingQuality)
                | (AssessingQuality, Completed)
                | (AssessingQuality, Retrying)
                | (Retrying, Executing)
        )
    }
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowPhase::Admitted => "admitted",
            WorkflowPhase::Analyzing => "analyzing",
            WorkflowPhase::Routing => "routing",
            WorkflowPhase::Executing => "executing",
            WorkflowPhase::Evaluating => "evaluating",
            WorkflowPhase::AssessingQuality => "assessing_quality",
            WorkflowPhase::Retrying => "retrying",
            WorkflowPhase::Completed => "completed",
            WorkflowPhase::Failed => "failed",
            WorkflowPhase::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// 会话结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    /// 质量评估通过
    Approved,
    /// 快速通道直接回复
    FastPath,
    RetryBudgetExhausted,
    Cancelled,
    ContractViolation,
}

impl fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TerminalReason::Approved => "approved",
            TerminalReason::FastPath => "fast_path",
            TerminalReason::RetryBudgetExhausted => "retry_budget_exhausted",
            TerminalReason::Cancelled => "cancelled",
            TerminalReason::ContractViolation => "contract_violation",
        };
        f.write_str(s)
    }
}

/// 单个任务的运行状态，只由所属会话任务修改
#[derive(Debug)]
pub struct WorkflowSession {
    pub session_id: SessionId,
    pub task: Arc<Task>,
    phase: WorkflowPhase,
    pub retry_count: u32,
    cancel_token: CancellationToken,
    /// 已产出的执行结果（用于尽力输出）
    pub history: Vec<ExecutionResult>,
}

impl WorkflowSession {
    pub fn new(session_id: SessionId, task: Arc<Task>, cancel_token: CancellationToken) -> Self {
        Self {
            session_id,
            task,
            phase: WorkflowPhase::Admitted,
            retry_count: 0,
            cancel_token,
            history: Vec::new(),
        }
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.phase
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// 沿合法边迁移，返回迁移前的阶段
    pub fn transition(&mut self, next: WorkflowPhase) -> Result<WorkflowPhase, OrchestratorError> {
        if !self.phase.can_transition_to(next) {
            return Err(OrchestratorError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        let prev = self.phase;
        self.phase = next;
        tracing::debug!(session_id = %self.session_id, from = %prev, to = %next, "phase transition");
        Ok(prev)
    }
}
