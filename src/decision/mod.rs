//! 决策层：可插拔决策模块（启发式 / 编译型评分配置 / 提示型）与可热替换句柄

pub mod handle;
pub mod heuristic;
pub mod profile;
pub mod prompted;
pub mod traits;

pub use handle::{DecisionHandle, ModuleSlot};
pub use heuristic::HeuristicDecisionModule;
pub use profile::{ArtifactRule, ProfileError, ScoringProfile};
pub use prompted::PromptedDecisionModule;
pub use traits::{
    AssessmentSource, DecisionError, DecisionModule, DecisionSource, QualityAssessment,
    RoutingDecision, RoutingPattern,
};
