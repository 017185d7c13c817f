//! 任务：一次编排运行的输入
//!
//! 创建后不可变，编排期间以 `Arc<Task>` 在各阶段间共享。

use serde::{Deserialize, Serialize};

/// 任务 ID
pub type TaskId = String;

/// 提交给编排器的任务
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// 任务原文
    pub description: String,
    /// 作用域标签（如 "code"、"docs"），供决策模块参考
    pub scope_tags: Vec<String>,
    /// 创建时间（毫秒时间戳）
    pub created_at: i64,
}

impl Task {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: format!("task_{}", uuid::Uuid::new_v4()),
            description: description.into(),
            scope_tags: Vec::new(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn with_scope_tags(mut self, tags: Vec<String>) -> Self {
        self.scope_tags = tags;
        self
    }

    /// 去掉首尾空白后的任务文本
    pub fn text(&self) -> &str {
        self.description.trim()
    }
}
