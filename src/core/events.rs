//! 会话事件：每个会话一条有序、一次性的事件流，另有进程级广播供外部观察者订阅
//!
//! 事件按会话内 seq 递增编号，严格按阶段顺序发出。

use futures_util::stream::{self, BoxStream, StreamExt};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};

use crate::core::{SessionId, TerminalReason, WorkflowPhase};

/// 会话事件
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionEvent {
    pub session_id: SessionId,
    pub seq: u64,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    PhaseEntered {
        phase: WorkflowPhase,
        attempt: u32,
    },
    PhaseCompleted {
        phase: WorkflowPhase,
        elapsed_ms: u64,
    },
    RetryScheduled {
        retry_count: u32,
        missing_elements: Vec<String>,
    },
    SessionTerminal {
        phase: WorkflowPhase,
        reason: TerminalReason,
        retry_count: u32,
    },
}

/// 会话事件流（惰性、有序、只能获取一次）
pub type EventStream = BoxStream<'static, SessionEvent>;

pub(crate) fn into_stream(rx: mpsc::UnboundedReceiver<SessionEvent>) -> EventStream {
    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|event| (event, rx)) }).boxed()
}

/// 会话内的事件发送端：编号并同时写入会话通道与全局广播
pub(crate) struct EventEmitter {
    session_id: SessionId,
    seq: u64,
    session_tx: mpsc::UnboundedSender<SessionEvent>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
}

impl EventEmitter {
    pub fn new(
        session_id: SessionId,
        session_tx: mpsc::UnboundedSender<SessionEvent>,
        broadcast_tx: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            session_id,
            seq: 0,
            session_tx,
            broadcast_tx,
        }
    }

    pub fn emit(&mut self, kind: EventKind) {
        self.seq += 1;
        let event = SessionEvent {
            session_id: self.session_id.clone(),
            seq: self.seq,
            kind,
        };
        // 没有订阅者或事件流已被丢弃都不影响会话推进
        let _ = self.broadcast_tx.send(event.clone());
        let _ = self.session_tx.send(event);
    }
}
