//! 会话监管：每个会话一个取消令牌，均为根令牌的子令牌
//!
//! 取消幂等；shutdown 取消根令牌，所有进行中的会话一起结束。

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;

use crate::core::SessionId;

#[derive(Debug, Default)]
pub struct SessionSupervisor {
    root: CancellationToken,
    sessions: Mutex<HashMap<SessionId, CancellationToken>>,
}

impl SessionSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, CancellationToken>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 登记会话，返回它的取消令牌
    pub fn register(&self, session_id: &str) -> CancellationToken {
        let token = self.root.child_token();
        self.sessions().insert(session_id.to_string(), token.clone());
        token
    }

    /// 会话结束后移除
    pub fn release(&self, session_id: &str) {
        self.sessions().remove(session_id);
    }

    /// 取消指定会话；会话仍在运行时返回 true
    pub fn cancel(&self, session_id: &str) -> bool {
        match self.sessions().get(session_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// 取消所有会话
    pub fn shutdown(&self) {
        self.root.cancel();
    }

    pub fn active(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions().keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_idempotent_and_scoped() {
        let supervisor = SessionSupervisor::new();
        let a = supervisor.register("a");
        let b = supervisor.register("b");

        assert!(supervisor.cancel("a"));
        assert!(supervisor.cancel("a"));
        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());

        supervisor.release("a");
        assert!(!supervisor.cancel("a"));
        assert_eq!(supervisor.active(), vec!["b".to_string()]);
    }

    #[test]
    fn test_shutdown_cancels_everything() {
        let supervisor = SessionSupervisor::new();
        let a = supervisor.register("a");
        supervisor.shutdown();
        assert!(a.is_cancelled());
        assert!(supervisor.register("late").is_cancelled());
    }
}
