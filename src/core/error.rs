//! 编排器错误类型
//!
//! 协作方的错误（DecisionError / WorkerError）在各自边界内降级处理，不会出现在这里；
//! 这里只有需要调用方感知的错误：准入拒绝、契约违例、非法状态迁移、事件流重复获取、会话异常中止。

use thiserror::Error;

use crate::core::WorkflowPhase;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrchestratorError {
    #[error("Admission rejected: {limit} sessions already running")]
    AdmissionRejected { limit: usize },

    #[error("Contract violation: {0}")]
    ContractViolation(String),

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: WorkflowPhase,
        to: WorkflowPhase,
    },

    #[error("Event stream already taken")]
    EventsAlreadyTaken,

    /// 会话任务异常退出（panic 或被运行时中止），没有产出结果
    #[error("Session aborted: {0}")]
    SessionAborted(String),

    #[error("Config error: {0}")]
    Config(String),
}
