//! 评估层：进度评估与质量控制

pub mod progress;
pub mod quality;

pub use progress::{EffortLevel, ProgressEvaluator, ProgressReport};
pub use quality::QualityController;
