//! LLM 客户端抽象
//!
//! 编排核心不绑定具体后端：宿主应用实现 LlmClient 并注入 PromptedDecisionModule。

use async_trait::async_trait;

use crate::llm::Message;

/// LLM 客户端 trait：非流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, String>;
}
