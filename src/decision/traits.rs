//! 决策模块抽象
//!
//! 所有实现（启发式 / 编译型评分配置 / 基于 LLM 的提示模块）实现 DecisionModule：
//! classify（路由决策）与 assess（质量评估）。实现必须可被多个会话并发调用，推理期间不修改共享状态。

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::execution::{ExecutionResult, WorkerId, WorkerProfile};
use crate::task::Task;

/// 路由模式：决定用哪种执行策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingPattern {
    Direct,
    Simple,
    Complex,
}

impl fmt::Display for RoutingPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoutingPattern::Direct => "direct",
            RoutingPattern::Simple => "simple",
            RoutingPattern::Complex => "complex",
        };
        f.write_str(s)
    }
}

impl FromStr for RoutingPattern {
    type Err = DecisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "direct" => Ok(RoutingPattern::Direct),
            "simple" => Ok(RoutingPattern::Simple),
            "complex" => Ok(RoutingPattern::Complex),
            other => Err(DecisionError::Malformed(format!("unknown pattern: {other}"))),
        }
    }
}

/// 决策来源（区分模块决策与启发式兜底）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    Module,
    Heuristic,
}

/// 路由决策：每个任务至多产生一次，产生后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub pattern: RoutingPattern,
    /// 目标 Worker，按声明顺序去重
    pub target_workers: Vec<WorkerId>,
    /// 置信度，范围 [0, 1]
    pub confidence: f32,
    pub rationale: String,
    pub source: DecisionSource,
}

impl RoutingDecision {
    pub fn new(pattern: RoutingPattern, target_workers: Vec<WorkerId>) -> Self {
        Self {
            pattern,
            target_workers,
            confidence: 0.5,
            rationale: String::new(),
            source: DecisionSource::Module,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    pub fn with_source(mut self, source: DecisionSource) -> Self {
        self.source = source;
        self
    }
}

/// 质量评估来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentSource {
    Module,
    Heuristic,
    /// 执行阶段本身失败（Worker 错误或超时），未调用模块
    ExecutionFailure,
}

/// 质量评估：每次尝试产生一次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    /// 分数，范围 [0, 10]
    pub score: f32,
    pub approved: bool,
    pub missing_elements: Vec<String>,
    pub source: AssessmentSource,
}

impl QualityAssessment {
    pub fn approved(score: f32) -> Self {
        Self {
            score,
            approved: true,
            missing_elements: Vec::new(),
            source: AssessmentSource::Module,
        }
    }

    pub fn rejected(score: f32, missing_elements: Vec<String>) -> Self {
        Self {
            score,
            approved: false,
            missing_elements,
            source: AssessmentSource::Module,
        }
    }

    pub fn with_source(mut self, source: AssessmentSource) -> Self {
        self.source = source;
        self
    }
}

/// 决策模块错误：只在模块边界内出现，由分析器与质量控制器降级处理
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecisionError {
    #[error("Decision module unavailable: {0}")]
    Unavailable(String),

    #[error("Decision module timed out")]
    Timeout,

    #[error("Malformed decision output: {0}")]
    Malformed(String),
}

/// 可插拔决策模块
#[async_trait]
pub trait DecisionModule: Send + Sync {
    /// 模块名（日志与事件中使用）
    fn name(&self) -> &str;

    /// 路由决策：catalog 为当前可用的 Worker 列表（声明顺序）
    async fn classify(
        &self,
        task: &Task,
        catalog: &[WorkerProfile],
    ) -> Result<RoutingDecision, DecisionError>;

    /// 质量评估
    async fn assess(
        &self,
        result: &ExecutionResult,
        task: &Task,
    ) -> Result<QualityAssessment, DecisionError>;
}
