//! 决策模块句柄：可原子热替换的共享只读引用
//!
//! 槽位为 `RwLock<Arc<ModuleSlot>>`：读取时只克隆 Arc（每次进入阶段捕获一次），
//! 替换时整体换掉槽位并递增版本号。进行中的会话继续使用自己捕获的实例，不会读到半替换状态。

use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::decision::{DecisionModule, HeuristicDecisionModule, ProfileError, ScoringProfile};

/// 某一版本的决策模块
pub struct ModuleSlot {
    pub version: u64,
    pub module: Arc<dyn DecisionModule>,
}

/// 共享句柄（Clone 共享同一槽位）
#[derive(Clone)]
pub struct DecisionHandle {
    slot: Arc<RwLock<Arc<ModuleSlot>>>,
}

impl DecisionHandle {
    pub fn new(module: Arc<dyn DecisionModule>) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Arc::new(ModuleSlot { version: 1, module }))),
        }
    }

    /// 以默认启发式模块初始化
    pub fn heuristic() -> Self {
        Self::new(Arc::new(HeuristicDecisionModule::new()))
    }

    /// 捕获当前版本（模块与版本号一起读出）
    pub async fn snapshot(&self) -> Arc<ModuleSlot> {
        self.slot.read().await.clone()
    }

    pub async fn current(&self) -> Arc<dyn DecisionModule> {
        self.snapshot().await.module.clone()
    }

    pub async fn version(&self) -> u64 {
        self.snapshot().await.version
    }

    /// 替换模块，返回新版本号
    pub async fn swap(&self, module: Arc<dyn DecisionModule>) -> u64 {
        let mut guard = self.slot.write().await;
        let version = guard.version + 1;
        tracing::info!(module = module.name(), version, "decision module swapped");
        *guard = Arc::new(ModuleSlot { version, module });
        version
    }

    /// 从 TOML 评分配置构建编译型模块并替换；加载失败时保留现有模块
    pub async fn reload_profile(&self, path: &Path) -> Result<u64, ProfileError> {
        let profile = ScoringProfile::load(path)?;
        Ok(self
            .swap(Arc::new(HeuristicDecisionModule::from_profile(profile)))
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_swap_bumps_version_and_keeps_captured_instance() {
        let handle = DecisionHandle::heuristic();
        let captured = handle.snapshot().await;
        assert_eq!(captured.version, 1);
        assert_eq!(captured.module.name(), "heuristic");

        let profile = ScoringProfile {
            name: "v2".into(),
            ..ScoringProfile::default()
        };
        let version = handle
            .swap(Arc::new(HeuristicDecisionModule::from_profile(profile)))
            .await;
        assert_eq!(version, 2);
        assert_eq!(handle.current().await.name(), "compiled:v2");
        // 已捕获的实例不受影响
        assert_eq!(captured.module.name(), "heuristic");
    }

    #[tokio::test]
    async fn test_reload_profile_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.toml");
        std::fs::write(&path, "name = \"tuned\"\ncomplex_threshold = 3.0\n").unwrap();

        let handle = DecisionHandle::heuristic();
        let clone = handle.clone();
        assert_eq!(handle.reload_profile(&path).await.unwrap(), 2);
        assert_eq!(clone.current().await.name(), "compiled:tuned");

        std::fs::write(&path, "simple_threshold = 9.0\ncomplex_threshold = 1.0\n").unwrap();
        assert!(handle.reload_profile(&path).await.is_err());
        assert_eq!(handle.version().await, 2);
    }
}
