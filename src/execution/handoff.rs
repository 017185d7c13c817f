//! 交接上下文：委派链中相邻两步之间传递的结构化摘要
//!
//! 由 HandoffManager 在每一步之后构建，仅在一条委派链的生命周期内存在。

use serde::Serialize;

use crate::evaluation::{EffortLevel, ProgressReport};
use crate::execution::ExecutionResult;
use crate::task::Task;

/// 已完成摘要的最大字符数
const SUMMARY_MAX_CHARS: usize = 400;

const CRITERIA_MARKERS: &[&str] = &["must", "should", "ensure", "need", "必须", "需要"];

/// 交接上下文
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandoffContext {
    /// 在第几步（从 1 开始）之后构建
    pub step: usize,
    pub completed_summary: String,
    pub remaining_objectives: Vec<String>,
    pub success_criteria: Vec<String>,
    pub artifacts: Vec<String>,
    pub quality_checklist: Vec<String>,
    pub estimated_effort: EffortLevel,
}

impl HandoffContext {
    /// 渲染成下一个 Worker 看到的文本块
    pub fn render(&self) -> String {
        let mut out = format!("Handoff after step {}:\n", self.step);
        out.push_str("Completed so far:\n");
        out.push_str(&self.completed_summary);
        out.push('\n');
        push_list(&mut out, "Remaining objectives", &self.remaining_objectives);
        push_list(&mut out, "Success criteria", &self.success_criteria);
        push_list(&mut out, "Artifacts", &self.artifacts);
        push_list(&mut out, "Quality checklist", &self.quality_checklist);
        out.push_str(&format!("Estimated effort: {:?}\n", self.estimated_effort));
        out
    }
}

fn push_list(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(title);
    out.push_str(":\n");
    for item in items {
        out.push_str(&format!("- {item}\n"));
    }
}

/// 交接管理器
#[derive(Debug, Default, Clone, Copy)]
pub struct HandoffManager;

impl HandoffManager {
    pub fn new() -> Self {
        Self
    }

    /// 从任务句子中提取成功标准；没有显式要求时以任务本身为标准
    pub fn success_criteria(task: &Task) -> Vec<String> {
        let criteria: Vec<String> = task
            .text()
            .split(['.', '\n', '。', ';'])
            .map(str::trim)
            .filter(|s| {
                let lower = s.to_lowercase();
                !s.is_empty() && CRITERIA_MARKERS.iter().any(|m| lower.contains(m))
            })
            .map(str::to_string)
            .collect();
        if criteria.is_empty() {
            vec![task.text().to_string()]
        } else {
            criteria
        }
    }

    /// 第 step 步之后构建交接上下文；accumulated 为到目前为止所有步骤的拼接输出
    pub fn build(
        &self,
        task: &Task,
        step: usize,
        accumulated: &str,
        artifacts: &[String],
        report: &ProgressReport,
    ) -> HandoffContext {
        let success_criteria = Self::success_criteria(task);
        let mut quality_checklist = success_criteria.clone();
        quality_checklist.extend(
            report
                .remaining_objectives
                .iter()
                .map(|o| format!("Resolve: {o}")),
        );

        HandoffContext {
            step,
            completed_summary: summarize(accumulated),
            remaining_objectives: report.remaining_objectives.clone(),
            success_criteria,
            artifacts: artifacts.to_vec(),
            quality_checklist,
            estimated_effort: report.estimated_effort,
        }
    }

    /// 将一步结果的产物并入累计列表（去重，保持顺序）
    pub fn absorb_artifacts(artifacts: &mut Vec<String>, result: &ExecutionResult) {
        for a in &result.artifacts {
            if !artifacts.contains(a) {
                artifacts.push(a.clone());
            }
        }
    }
}

fn summarize(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() > SUMMARY_MAX_CHARS {
        format!("{}...", trimmed.chars().take(SUMMARY_MAX_CHARS).collect::<String>())
    } else {
        trimmed.to_string()
    }
}
