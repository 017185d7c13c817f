//! 进度评估：从部分结果推断剩余目标与工作量
//!
//! Worker 显式上报的 remaining_objectives 优先；否则从内容中提取未勾选清单项（`- [ ] …`）
//! 和 `TODO:` / `Remaining:` / `Next:` 开头的行。

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::execution::ExecutionResult;
use crate::task::Task;

/// 预估剩余工作量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffortLevel {
    Low,
    Medium,
    High,
}

impl EffortLevel {
    pub fn from_remaining(count: usize) -> Self {
        match count {
            0 => EffortLevel::Low,
            1..=2 => EffortLevel::Medium,
            _ => EffortLevel::High,
        }
    }
}

/// 一次进度评估的结论
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    pub remaining_objectives: Vec<String>,
    pub completed_objectives: Vec<String>,
    pub estimated_effort: EffortLevel,
    /// 没有剩余目标且结果不是 Error
    pub complete: bool,
}

fn unchecked_item() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*[-*]\s*\[\s\]\s*(.+)$").expect("valid regex"))
}

fn checked_item() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*[-*]\s*\[[xX]\]\s*(.+)$").expect("valid regex"))
}

fn followup_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:todo|remaining|next)\s*:\s*(.+)$").expect("valid regex")
    })
}

/// 进度评估器（无状态）
#[derive(Debug, Default, Clone, Copy)]
pub struct ProgressEvaluator;

impl ProgressEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, _task: &Task, result: &ExecutionResult) -> ProgressReport {
        let mut completed = Vec::new();
        let mut derived = Vec::new();
        for line in result.content.lines() {
            if let Some(c) = checked_item().captures(line) {
                completed.push(c[1].trim().to_string());
            } else if let Some(c) = unchecked_item().captures(line) {
                derived.push(c[1].trim().to_string());
            } else if let Some(c) = followup_line().captures(line) {
                derived.push(c[1].trim().to_string());
            }
        }

        let remaining = match &result.remaining_objectives {
            Some(reported) => reported.clone(),
            None => derived,
        };

        ProgressReport {
            estimated_effort: EffortLevel::from_remaining(remaining.len()),
            complete: remaining.is_empty() && !result.is_error(),
            remaining_objectives: remaining,
            completed_objectives: completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derives_objectives_from_content() {
        let result = ExecutionResult::partial(
            "Progress so far:\n- [x] outline\n- [ ] write intro\n* [ ] add references\nTODO: proofread\nnotes: none",
        );
        let report = ProgressEvaluator::new().evaluate(&Task::new("write a paper"), &result);
        assert_eq!(
            report.remaining_objectives,
            vec!["write intro", "add references", "proofread"]
        );
        assert_eq!(report.completed_objectives, vec!["outline"]);
        assert_eq!(report.estimated_effort, EffortLevel::High);
        assert!(!report.complete);
    }

    #[test]
    fn test_reported_objectives_take_precedence() {
        let result = ExecutionResult::success("- [ ] ignored because the worker reported")
            .with_remaining_objectives(Vec::new());
        let report = ProgressEvaluator::new().evaluate(&Task::new("x"), &result);
        assert!(report.remaining_objectives.is_empty());
        assert_eq!(report.estimated_effort, EffortLevel::Low);
        assert!(report.complete);
    }

    #[test]
    fn test_error_result_is_never_complete() {
        let report = ProgressEvaluator::new().evaluate(&Task::new("x"), &ExecutionResult::error("boom"));
        assert!(report.remaining_objectives.is_empty());
        assert!(!report.complete);
    }
}
