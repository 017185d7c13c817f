//! 可观测性：日志初始化与编排计数器
//!
//! Metrics 由每个编排器实例持有（Arc 共享给分析器、质量控制器与执行器），
//! 可导出为 JSON 或 Prometheus 文本。

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 安装全局 tracing 订阅者：默认 info，可通过 RUST_LOG 覆盖
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

/// 编排计数器（单调递增）
#[derive(Debug, Default)]
pub struct Metrics {
    sessions_admitted: AtomicU64,
    sessions_rejected: AtomicU64,
    sessions_completed: AtomicU64,
    sessions_failed: AtomicU64,
    sessions_cancelled: AtomicU64,
    fast_path_hits: AtomicU64,
    /// 决策模块给出的路由决策
    module_decisions: AtomicU64,
    /// 模块失败或超时后由启发式兜底的路由决策
    heuristic_decisions: AtomicU64,
    module_assessments: AtomicU64,
    heuristic_assessments: AtomicU64,
    retries: AtomicU64,
    phase_timeouts: AtomicU64,
    worker_failures: AtomicU64,
}

/// 某一时刻的计数快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub sessions_admitted: u64,
    pub sessions_rejected: u64,
    pub sessions_completed: u64,
    pub sessions_failed: u64,
    pub sessions_cancelled: u64,
    pub fast_path_hits: u64,
    pub module_decisions: u64,
    pub heuristic_decisions: u64,
    pub module_assessments: u64,
    pub heuristic_assessments: u64,
    pub retries: u64,
    pub phase_timeouts: u64,
    pub worker_failures: u64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_admitted(&self) {
        bump(&self.sessions_admitted);
    }

    pub fn session_rejected(&self) {
        bump(&self.sessions_rejected);
    }

    pub fn session_completed(&self) {
        bump(&self.sessions_completed);
    }

    pub fn session_failed(&self) {
        bump(&self.sessions_failed);
    }

    pub fn session_cancelled(&self) {
        bump(&self.sessions_cancelled);
    }

    pub fn fast_path_hit(&self) {
        bump(&self.fast_path_hits);
    }

    pub fn module_decision(&self) {
        bump(&self.module_decisions);
    }

    pub fn heuristic_decision(&self) {
        bump(&self.heuristic_decisions);
    }

    pub fn module_assessment(&self) {
        bump(&self.module_assessments);
    }

    pub fn heuristic_assessment(&self) {
        bump(&self.heuristic_assessments);
    }

    pub fn retry_scheduled(&self) {
        bump(&self.retries);
    }

    pub fn phase_timeout(&self) {
        bump(&self.phase_timeouts);
    }

    pub fn worker_failure(&self) {
        bump(&self.worker_failures);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            sessions_admitted: get(&self.sessions_admitted),
            sessions_rejected: get(&self.sessions_rejected),
            sessions_completed: get(&self.sessions_completed),
            sessions_failed: get(&self.sessions_failed),
            sessions_cancelled: get(&self.sessions_cancelled),
            fast_path_hits: get(&self.fast_path_hits),
            module_decisions: get(&self.module_decisions),
            heuristic_decisions: get(&self.heuristic_decisions),
            module_assessments: get(&self.module_assessments),
            heuristic_assessments: get(&self.heuristic_assessments),
            retries: get(&self.retries),
            phase_timeouts: get(&self.phase_timeouts),
            worker_failures: get(&self.worker_failures),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or(serde_json::Value::Null)
    }

    /// Prometheus 文本格式，每个计数器一行 `hive_<name>_total`
    pub fn to_prometheus(&self) -> String {
        let json = self.to_json();
        let mut out = String::new();
        if let Some(map) = json.as_object() {
            for (name, value) in map {
                out.push_str(&format!("# TYPE hive_{name}_total counter\n"));
                out.push_str(&format!("hive_{name}_total {value}\n"));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_exports() {
        let metrics = Metrics::new();
        metrics.module_decision();
        metrics.heuristic_decision();
        metrics.heuristic_decision();
        metrics.retry_scheduled();

        let snap = metrics.snapshot();
        assert_eq!(snap.module_decisions, 1);
        assert_eq!(snap.heuristic_decisions, 2);
        assert_eq!(snap.retries, 1);

        assert_eq!(metrics.to_json()["heuristic_decisions"], 2);
        let prom = metrics.to_prometheus();
        assert!(prom.contains("hive_heuristic_decisions_total 2"));
        assert!(prom.contains("# TYPE hive_retries_total counter"));
    }
}
