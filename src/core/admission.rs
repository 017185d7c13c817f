//! 准入控制：限制同时运行的会话数
//!
//! 没有空闲许可时立即拒绝（不排队）；许可随会话任务结束释放。

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::core::OrchestratorError;

pub struct AdmissionControl {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl AdmissionControl {
    pub fn new(max_concurrent_sessions: usize) -> Self {
        let limit = max_concurrent_sessions.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// 获取会话许可
    pub fn try_admit(&self) -> Result<OwnedSemaphorePermit, OrchestratorError> {
        self.semaphore
            .clone()
            .try_acquire_owned()
            .map_err(|_| OrchestratorError::AdmissionRejected { limit: self.limit })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_when_full_and_recovers_on_release() {
        let admission = AdmissionControl::new(2);
        let a = admission.try_admit().unwrap();
        let _b = admission.try_admit().unwrap();
        assert_eq!(
            admission.try_admit().unwrap_err(),
            OrchestratorError::AdmissionRejected { limit: 2 }
        );
        drop(a);
        assert_eq!(admission.available(), 1);
        assert!(admission.try_admit().is_ok());
    }
}
