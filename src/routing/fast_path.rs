//! 快速通道：极短或纯确认类输入直接回复，不进入分析与执行
//!
//! 纯函数、同步、无 I/O。命中后会话 Admitted -> Completed，不调用决策模块。

use crate::config::FastPathSection;
use crate::task::Task;

const TRAILING_PUNCTUATION: &[char] = &['.', '!', '?', ',', '~', '。', '！', '？', '，', '…'];

pub struct FastPathClassifier {
    enabled: bool,
    max_chars: usize,
    acknowledgments: Vec<String>,
    complexity_keywords: Vec<String>,
    canned_response: String,
}

impl FastPathClassifier {
    pub fn from_config(section: &FastPathSection) -> Self {
        Self {
            enabled: section.enabled,
            max_chars: section.max_chars,
            acknowledgments: section.acknowledgments.iter().map(|a| normalize(a)).collect(),
            complexity_keywords: section
                .complexity_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            canned_response: section.canned_response.clone(),
        }
    }

    /// 命中时返回固定回复
    pub fn classify_fast(&self, task: &Task) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let text = task.text();
        if text.is_empty() {
            return None;
        }

        let lower = text.to_lowercase();
        if self.complexity_keywords.iter().any(|k| lower.contains(k.as_str())) {
            return None;
        }

        let short = text.chars().count() < self.max_chars;
        let acknowledged = self.acknowledgments.contains(&normalize(text));
        (short || acknowledged).then(|| self.canned_response.clone())
    }
}

/// 小写并去掉末尾标点
fn normalize(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .trim_end_matches(TRAILING_PUNCTUATION)
        .trim()
        .to_string()
}
