//! 路由层：快速通道、任务分析与策略选择

pub mod analyzer;
pub mod fast_path;
pub mod router;

pub use analyzer::TaskAnalyzer;
pub use fast_path::FastPathClassifier;
pub use router::{RoutePlan, Router};
