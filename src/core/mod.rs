//! 核心编排层：错误、状态机、事件、准入、会话监管与主控循环

pub mod admission;
pub mod builder;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod quick_reply;
pub mod session_supervisor;
pub mod state;

pub use admission::AdmissionControl;
pub use builder::OrchestratorBuilder;
pub use error::OrchestratorError;
pub use events::{EventKind, EventStream, SessionEvent};
pub use orchestrator::{Orchestrator, SessionHandle, SessionOutcome};
pub use quick_reply::{LlmQuickResponder, QuickResponder};
pub use session_supervisor::SessionSupervisor;
pub use state::{SessionId, TerminalReason, WorkflowPhase, WorkflowSession};
