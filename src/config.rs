//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `HIVE__*` 覆盖（双下划线表示嵌套，如 `HIVE__ORCHESTRATOR__MAX_REFINEMENT_ROUNDS=3`）。
//! 编排核心只读取这些值，运行期间不修改。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub orchestrator: OrchestratorSection,
    pub timeouts: TimeoutsSection,
    pub fast_path: FastPathSection,
    pub decision: DecisionSection,
}

/// [orchestrator] 段：并发上限、重试轮数、委派链长度、默认 Worker
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorSection {
    /// 同时运行的会话上限，超出时 submit 直接拒绝
    #[serde(default = "default_max_concurrent_sessions")]
    pub max_concurrent_sessions: usize,
    #[serde(default = "default_max_refinement_rounds")]
    pub max_refinement_rounds: u32,
    /// 委派链最多执行的步数，达到后以 partial 结束
    #[serde(default = "default_max_chain_length")]
    pub max_chain_length: usize,
    /// 路由结果没有目标 Worker 时使用的通用 Worker
    #[serde(default = "default_worker")]
    pub default_worker: String,
    /// 全局事件广播通道容量
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

fn default_max_concurrent_sessions() -> usize {
    8
}

fn default_max_refinement_rounds() -> u32 {
    2
}

fn default_max_chain_length() -> usize {
    4
}

fn default_worker() -> String {
    "general".to_string()
}

fn default_event_channel_capacity() -> usize {
    64
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: default_max_concurrent_sessions(),
            max_refinement_rounds: default_max_refinement_rounds(),
            max_chain_length: default_max_chain_length(),
            default_worker: default_worker(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// [timeouts] 段：各阶段与单个 Worker 调用的超时（毫秒）
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutsSection {
    #[serde(default = "default_analysis_ms")]
    pub analysis_ms: u64,
    #[serde(default = "default_execution_ms")]
    pub execution_ms: u64,
    #[serde(default = "default_worker_ms")]
    pub worker_ms: u64,
    #[serde(default = "default_assessment_ms")]
    pub assessment_ms: u64,
    #[serde(default = "default_fast_path_ms")]
    pub fast_path_ms: u64,
}

fn default_analysis_ms() -> u64 {
    10_000
}

fn default_execution_ms() -> u64 {
    120_000
}

fn default_worker_ms() -> u64 {
    60_000
}

fn default_assessment_ms() -> u64 {
    10_000
}

fn default_fast_path_ms() -> u64 {
    2_000
}

impl Default for TimeoutsSection {
    fn default() -> Self {
        Self {
            analysis_ms: default_analysis_ms(),
            execution_ms: default_execution_ms(),
            worker_ms: default_worker_ms(),
            assessment_ms: default_assessment_ms(),
            fast_path_ms: default_fast_path_ms(),
        }
    }
}

impl TimeoutsSection {
    pub fn analysis(&self) -> Duration {
        Duration::from_millis(self.analysis_ms)
    }

    pub fn execution(&self) -> Duration {
        Duration::from_millis(self.execution_ms)
    }

    pub fn worker(&self) -> Duration {
        Duration::from_millis(self.worker_ms)
    }

    pub fn assessment(&self) -> Duration {
        Duration::from_millis(self.assessment_ms)
    }

    pub fn fast_path(&self) -> Duration {
        Duration::from_millis(self.fast_path_ms)
    }
}

/// [fast_path] 段：快速通道阈值、确认词表、复杂度关键词
#[derive(Debug, Clone, Deserialize)]
pub struct FastPathSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 字符数低于此值且不含复杂度关键词时直接走快速通道
    #[serde(default = "default_fast_path_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_acknowledgments")]
    pub acknowledgments: Vec<String>,
    #[serde(default = "default_complexity_keywords")]
    pub complexity_keywords: Vec<String>,
    #[serde(default = "default_canned_response")]
    pub canned_response: String,
}

fn default_true() -> bool {
    true
}

fn default_fast_path_max_chars() -> usize {
    12
}

fn default_acknowledgments() -> Vec<String> {
    vec![
        "ok".into(),
        "okay".into(),
        "thanks".into(),
        "thank you".into(),
        "got it".into(),
        "yes".into(),
        "no".into(),
        "sure".into(),
        "cool".into(),
        "great".into(),
        "好的".into(),
        "谢谢".into(),
        "收到".into(),
    ]
}

fn default_complexity_keywords() -> Vec<String> {
    vec![
        "implement".into(),
        "analyze".into(),
        "analyse".into(),
        "compare".into(),
        "design".into(),
        "research".into(),
        "refactor".into(),
        "debug".into(),
        "plan".into(),
        "write".into(),
        "build".into(),
        "explain".into(),
        "分析".into(),
        "实现".into(),
        "设计".into(),
    ]
}

fn default_canned_response() -> String {
    "Acknowledged.".to_string()
}

impl Default for FastPathSection {
    fn default() -> Self {
        Self {
            enabled: true,
            max_chars: default_fast_path_max_chars(),
            acknowledgments: default_acknowledgments(),
            complexity_keywords: default_complexity_keywords(),
            canned_response: default_canned_response(),
        }
    }
}

/// [decision] 段：启动时加载的编译型评分配置（TOML）
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DecisionSection {
    pub profile_path: Option<PathBuf>,
}

/// 加载配置：config/default.toml（可选）、显式文件（必须存在）、环境变量 HIVE__*
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder()
        .add_source(config::File::with_name("config/default").required(false));

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder
        .add_source(
            config::Environment::with_prefix("HIVE")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

/// 重新从磁盘与环境变量加载配置（调用方决定是否据此重建编排器）
pub fn reload_config() -> Result<AppConfig, config::ConfigError> {
    load_config(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.orchestrator.max_concurrent_sessions, 8);
        assert_eq!(cfg.orchestrator.max_refinement_rounds, 2);
        assert_eq!(cfg.orchestrator.default_worker, "general");
        assert!(cfg.fast_path.enabled);
        assert!(cfg.fast_path.acknowledgments.iter().any(|a| a == "ok"));
        assert_eq!(cfg.timeouts.worker(), Duration::from_millis(60_000));
        assert!(cfg.decision.profile_path.is_none());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hive.toml");
        std::fs::write(
            &path,
            r#"
[orchestrator]
max_refinement_rounds = 5
default_worker = "generalist"

[timeouts]
worker_ms = 250
"#,
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.orchestrator.max_refinement_rounds, 5);
        assert_eq!(cfg.orchestrator.default_worker, "generalist");
        assert_eq!(cfg.orchestrator.max_chain_length, 4);
        assert_eq!(cfg.timeouts.worker_ms, 250);
        assert_eq!(cfg.timeouts.analysis_ms, 10_000);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(dir.path().join("absent.toml"))).is_err());
    }
}
