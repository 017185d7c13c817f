//! 快速通道回复：命中快速通道时可选的轻量回复者
//!
//! 未配置、失败或超时时使用固定回复。

use std::sync::Arc;

use async_trait::async_trait;

use crate::llm::{LlmClient, Message};
use crate::task::Task;

#[async_trait]
pub trait QuickResponder: Send + Sync {
    async fn respond(&self, task: &Task) -> Result<String, String>;
}

/// 用 LLM 生成一句话回复
pub struct LlmQuickResponder {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl LlmQuickResponder {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            system_prompt: "Reply to the user in one short, friendly sentence.".to_string(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }
}

#[async_trait]
impl QuickResponder for LlmQuickResponder {
    async fn respond(&self, task: &Task) -> Result<String, String> {
        let reply = self
            .llm
            .complete(&[
                Message::system(self.system_prompt.clone()),
                Message::user(task.text()),
            ])
            .await?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err("empty reply".to_string());
        }
        Ok(reply.to_string())
    }
}
