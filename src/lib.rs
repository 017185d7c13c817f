//! Hive - Rust 任务路由与执行编排引擎
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 状态机、会话监管、准入控制、事件流、编排主循环
//! - **decision**: 可插拔决策模块（启发式 / 编译型评分配置 / 提示型）与热替换句柄
//! - **evaluation**: 进度评估与质量控制
//! - **execution**: Worker 池契约与 Direct / Parallel / Delegated 执行策略
//! - **llm**: 最小 LLM 客户端抽象（供提示型决策模块与快速回复使用）
//! - **observability**: 日志初始化与计数器
//! - **routing**: 快速通道、任务分析、策略路由

pub mod config;
pub mod core;
pub mod decision;
pub mod evaluation;
pub mod execution;
pub mod llm;
pub mod observability;
pub mod routing;
pub mod task;

pub use crate::core::{
    Orchestrator, OrchestratorBuilder, OrchestratorError, SessionEvent, SessionHandle,
    SessionOutcome, TerminalReason, WorkflowPhase,
};
pub use crate::task::Task;
