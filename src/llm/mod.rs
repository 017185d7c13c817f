//! LLM 层：最小客户端抽象与 Mock 实现（供提示型决策模块使用）

pub mod message;
pub mod mock;
pub mod traits;

pub use message::{Message, Role};
pub use mock::MockLlmClient;
pub use traits::LlmClient;
