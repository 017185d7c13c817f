//! 启发式决策模块（零样本兜底 / 编译型评分配置）
//!
//! 复杂度 = 关键词权重 + 句数 + 长度；Worker 按画像关键词匹配。
//! 完全确定、无 I/O，分析器与质量控制器在模块失败时直接调用其同步版本。

use async_trait::async_trait;

use crate::decision::{
    AssessmentSource, DecisionError, DecisionModule, DecisionSource, QualityAssessment,
    RoutingDecision, RoutingPattern, ScoringProfile,
};
use crate::execution::{ExecutionResult, ExecutionStatus, WorkerId, WorkerProfile};
use crate::task::Task;

const SENTENCE_TERMINATORS: &[char] = &['.', '?', '!', '。', '？', '！', '\n'];

/// 启发式决策模块
#[derive(Debug, Clone)]
pub struct HeuristicDecisionModule {
    name: String,
    profile: ScoringProfile,
}

impl Default for HeuristicDecisionModule {
    fn default() -> Self {
        Self::new()
    }
}

impl HeuristicDecisionModule {
    /// 使用内置默认参数
    pub fn new() -> Self {
        Self {
            name: "heuristic".to_string(),
            profile: ScoringProfile::default(),
        }
    }

    /// 使用加载的评分配置（编译型模块）
    pub fn from_profile(profile: ScoringProfile) -> Self {
        Self {
            name: format!("compiled:{}", profile.name),
            profile,
        }
    }

    pub fn profile(&self) -> &ScoringProfile {
        &self.profile
    }

    /// 任务复杂度分数
    pub fn complexity_score(&self, text: &str) -> f32 {
        let lower = text.to_lowercase();
        let keyword_score: f32 = self
            .profile
            .complexity_keywords
            .iter()
            .filter(|(k, _)| lower.contains(k.as_str()))
            .map(|(_, w)| *w)
            .sum();

        let sentences = lower
            .split(SENTENCE_TERMINATORS)
            .filter(|s| !s.trim().is_empty())
            .count();
        let sentence_score = self.profile.sentence_weight * sentences.saturating_sub(1) as f32;
        let length_score = self.profile.length_weight * (text.chars().count() as f32 / 100.0);

        keyword_score + sentence_score + length_score
    }

    fn pattern_for(&self, score: f32) -> RoutingPattern {
        if score >= self.profile.complex_threshold {
            RoutingPattern::Complex
        } else if score >= self.profile.simple_threshold {
            RoutingPattern::Simple
        } else {
            RoutingPattern::Direct
        }
    }

    /// 按画像关键词或作用域标签匹配 Worker，保持 catalog 顺序
    fn match_workers(task: &Task, catalog: &[WorkerProfile]) -> Vec<WorkerId> {
        let lower = task.text().to_lowercase();
        catalog
            .iter()
            .filter(|w| {
                task.scope_tags.iter().any(|t| t.eq_ignore_ascii_case(&w.id))
                    || w.keywords.iter().any(|k| lower.contains(&k.to_lowercase()))
            })
            .map(|w| w.id.clone())
            .collect()
    }

    /// 同步路由决策（总能产出合法决策）
    pub fn decide(&self, task: &Task, catalog: &[WorkerProfile]) -> RoutingDecision {
        let score = self.complexity_score(task.text());
        let pattern = self.pattern_for(score);
        let mut workers = Self::match_workers(task, catalog);
        if pattern == RoutingPattern::Direct {
            workers.truncate(1);
        }

        let margin = match pattern {
            RoutingPattern::Complex => score - self.profile.complex_threshold,
            RoutingPattern::Simple => (score - self.profile.simple_threshold)
                .min(self.profile.complex_threshold - score),
            RoutingPattern::Direct => self.profile.simple_threshold - score,
        };
        let confidence = (0.5 + margin * 0.1).clamp(0.3, 0.9);

        RoutingDecision::new(pattern, workers)
            .with_confidence(confidence)
            .with_rationale(format!(
                "{}: complexity score {score:.2} -> {pattern}",
                self.name
            ))
            .with_source(DecisionSource::Heuristic)
    }

    /// 同步质量评估：仅空内容被拒绝（除非配置了 approval_threshold）
    pub fn evaluate(&self, result: &ExecutionResult, task: &Task) -> QualityAssessment {
        if !result.has_content() {
            return QualityAssessment::rejected(0.0, vec!["non-empty content".to_string()])
                .with_source(AssessmentSource::Heuristic);
        }

        let lower_task = task.text().to_lowercase();
        let missing: Vec<String> = self
            .profile
            .artifact_rules
            .iter()
            .filter(|rule| lower_task.contains(&rule.keyword.to_lowercase()))
            .filter(|rule| {
                !result.content.contains(&rule.marker)
                    && !result.artifacts.iter().any(|a| a.contains(&rule.marker))
            })
            .map(|rule| rule.label.clone())
            .collect();

        let chars = result.content.trim().chars().count();
        let length_ratio = (chars as f32 / self.profile.min_content_chars.max(1) as f32).min(1.0);
        let mut score = 5.0 + 4.0 * length_ratio - 1.5 * missing.len() as f32;
        if result.status == ExecutionStatus::Partial {
            score -= 1.0;
        }
        let score = score.clamp(0.0, 10.0);

        let approved = match self.profile.approval_threshold {
            Some(threshold) => score >= threshold,
            None => true,
        };

        QualityAssessment {
            score,
            approved,
            missing_elements: missing,
            source: AssessmentSource::Heuristic,
        }
    }
}

#[async_trait]
impl DecisionModule for HeuristicDecisionModule {
    fn name(&self) -> &str {
        &self.name
    }

    async fn classify(
        &self,
        task: &Task,
        catalog: &[WorkerProfile],
    ) -> Result<RoutingDecision, DecisionError> {
        Ok(self.decide(task, catalog))
    }

    async fn assess(
        &self,
        result: &ExecutionResult,
        task: &Task,
    ) -> Result<QualityAssessment, DecisionError> {
        Ok(self.evaluate(result, task))
    }
}
