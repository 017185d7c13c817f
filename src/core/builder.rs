//! 编排器构建器：统一的初始化逻辑
//!
//! 宿主应用只需提供配置与 Worker 池；决策模块默认为启发式，配置了 decision.profile_path 时
//! 改用从 TOML 评分配置编译出的模块。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::{Orchestrator, OrchestratorError, QuickResponder};
use crate::decision::{DecisionHandle, DecisionModule, HeuristicDecisionModule, ScoringProfile};
use crate::execution::{WorkerPool, WorkerRegistry};

pub struct OrchestratorBuilder {
    config: AppConfig,
    pool: Option<Arc<dyn WorkerPool>>,
    decision: Option<DecisionHandle>,
    responder: Option<Arc<dyn QuickResponder>>,
}

impl OrchestratorBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            pool: None,
            decision: None,
            responder: None,
        }
    }

    pub fn with_pool(mut self, pool: Arc<dyn WorkerPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_registry(self, registry: WorkerRegistry) -> Self {
        self.with_pool(Arc::new(registry))
    }

    /// 指定初始决策模块（覆盖 decision.profile_path）
    pub fn with_decision_module(mut self, module: Arc<dyn DecisionModule>) -> Self {
        self.decision = Some(DecisionHandle::new(module));
        self
    }

    /// 共享外部已有的决策句柄（多个编排器共用一份热替换槽位）
    pub fn with_decision_handle(mut self, handle: DecisionHandle) -> Self {
        self.decision = Some(handle);
        self
    }

    pub fn with_quick_responder(mut self, responder: Arc<dyn QuickResponder>) -> Self {
        self.responder = Some(responder);
        self
    }

    fn build_decision_handle(&self) -> Result<DecisionHandle, OrchestratorError> {
        if let Some(handle) = &self.decision {
            return Ok(handle.clone());
        }
        match &self.config.decision.profile_path {
            Some(path) => {
                let profile = ScoringProfile::load(path)
                    .map_err(|e| OrchestratorError::Config(e.to_string()))?;
                tracing::info!(profile = %profile.name, path = %path.display(), "scoring profile loaded");
                Ok(DecisionHandle::new(Arc::new(
                    HeuristicDecisionModule::from_profile(profile),
                )))
            }
            None => Ok(DecisionHandle::heuristic()),
        }
    }

    pub fn build(self) -> Result<Orchestrator, OrchestratorError> {
        let decision = self.build_decision_handle()?;
        let pool = self
            .pool
            .ok_or_else(|| OrchestratorError::Config("no worker pool configured".into()))?;
        if pool.catalog().is_empty() {
            tracing::warn!("worker pool is empty; every routed task will fail");
        }
        Ok(Orchestrator::new(&self.config, pool, decision, self.responder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::EchoWorker;

    fn registry() -> WorkerRegistry {
        let mut registry = WorkerRegistry::new();
        registry.register(EchoWorker::new("general", "general purpose", &[]));
        registry
    }

    #[tokio::test]
    async fn test_build_requires_pool() {
        let err = OrchestratorBuilder::new(AppConfig::default()).build().err();
        assert!(matches!(err, Some(OrchestratorError::Config(_))));
    }

    #[tokio::test]
    async fn test_profile_path_selects_compiled_module() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.toml");
        std::fs::write(&path, "name = \"house\"\n").unwrap();

        let mut config = AppConfig::default();
        config.decision.profile_path = Some(path);
        let orchestrator = OrchestratorBuilder::new(config)
            .with_registry(registry())
            .build()
            .unwrap();
        assert_eq!(orchestrator.decision_handle().current().await.name(), "compiled:house");
    }

    #[tokio::test]
    async fn test_missing_profile_is_config_error() {
        let mut config = AppConfig::default();
        config.decision.profile_path = Some("/definitely/not/here.toml".into());
        let err = OrchestratorBuilder::new(config)
            .with_registry(registry())
            .build()
            .err();
        assert!(matches!(err, Some(OrchestratorError::Config(_))));
    }
}
