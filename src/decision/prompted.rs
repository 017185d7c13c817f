//! 提示型决策模块：由 LLM 给出路由与质量判断
//!
//! 发送 system + user 两条消息，从回复中提取 JSON（```json 代码块或首个 `{` 到最后一个 `}`）。
//! 解析失败返回 Malformed，LLM 调用失败返回 Unavailable，上层据此退化为启发式。

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::decision::{
    AssessmentSource, DecisionError, DecisionModule, DecisionSource, QualityAssessment,
    RoutingDecision, RoutingPattern,
};
use crate::execution::{ExecutionResult, WorkerProfile};
use crate::llm::{LlmClient, Message};
use crate::task::Task;

const CLASSIFY_PROMPT: &str = "You route tasks to workers. Reply with JSON only: \
{\"pattern\": \"direct|simple|complex\", \"target_workers\": [\"id\"], \"confidence\": 0.0-1.0, \"rationale\": \"...\"}. \
direct = answer in one step, simple = independent parts that can run in parallel, complex = multi-step work with handoffs.";

const ASSESS_PROMPT: &str = "You review worker output against the task. Reply with JSON only: \
{\"score\": 0-10, \"approved\": true|false, \"missing_elements\": [\"...\"]}.";

/// 回复中送审的内容上限（字符）
const MAX_CONTENT_CHARS: usize = 4000;

#[derive(Debug, Deserialize)]
struct ClassifyReply {
    pattern: String,
    #[serde(default)]
    target_workers: Vec<String>,
    #[serde(default = "default_confidence")]
    confidence: f32,
    #[serde(default)]
    rationale: String,
}

fn default_confidence() -> f32 {
    0.5
}

#[derive(Debug, Deserialize)]
struct AssessReply {
    score: f32,
    approved: bool,
    #[serde(default)]
    missing_elements: Vec<String>,
}

/// 从 LLM 回复中截出 JSON 文本
fn extract_json(output: &str) -> Option<&str> {
    let trimmed = output.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()));
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

fn parse_reply<T: for<'de> Deserialize<'de>>(output: &str) -> Result<T, DecisionError> {
    let json = extract_json(output)
        .ok_or_else(|| DecisionError::Malformed(format!("no JSON object in: {}", output.trim())))?;
    serde_json::from_str(json).map_err(|e| DecisionError::Malformed(format!("{}: {}", e, json)))
}

/// 基于任意 LlmClient 的决策模块
pub struct PromptedDecisionModule {
    name: String,
    llm: Arc<dyn LlmClient>,
}

impl PromptedDecisionModule {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            name: "prompted".to_string(),
            llm,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    async fn ask(&self, system: &str, user: String) -> Result<String, DecisionError> {
        self.llm
            .complete(&[Message::system(system), Message::user(user)])
            .await
            .map_err(DecisionError::Unavailable)
    }
}

fn render_catalog(catalog: &[WorkerProfile]) -> String {
    catalog
        .iter()
        .map(|w| {
            if w.keywords.is_empty() {
                format!("- {}: {}", w.id, w.description)
            } else {
                format!("- {}: {} (keywords: {})", w.id, w.description, w.keywords.join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl DecisionModule for PromptedDecisionModule {
    fn name(&self) -> &str {
        &self.name
    }

    async fn classify(
        &self,
        task: &Task,
        catalog: &[WorkerProfile],
    ) -> Result<RoutingDecision, DecisionError> {
        let mut user = format!("Task: {}\n", task.text());
        if !task.scope_tags.is_empty() {
            user.push_str(&format!("Scope: {}\n", task.scope_tags.join(", ")));
        }
        user.push_str(&format!("Workers:\n{}", render_catalog(catalog)));

        let output = self.ask(CLASSIFY_PROMPT, user).await?;
        let reply: ClassifyReply = parse_reply(&output)?;
        let pattern: RoutingPattern = reply.pattern.parse()?;

        Ok(RoutingDecision::new(pattern, reply.target_workers)
            .with_confidence(reply.confidence)
            .with_rationale(reply.rationale)
            .with_source(DecisionSource::Module))
    }

    async fn assess(
        &self,
        result: &ExecutionResult,
        task: &Task,
    ) -> Result<QualityAssessment, DecisionError> {
        let content: String = result.content.chars().take(MAX_CONTENT_CHARS).collect();
        let mut user = format!("Task: {}\n\nOutput ({:?}):\n{}", task.text(), result.status, content);
        if !result.artifacts.is_empty() {
            user.push_str(&format!("\n\nArtifacts: {}", result.artifacts.join(", ")));
        }

        let output = self.ask(ASSESS_PROMPT, user).await?;
        let reply: AssessReply = parse_reply(&output)?;
        if !reply.score.is_finite() {
            return Err(DecisionError::Malformed(format!("score is not finite: {}", reply.score)));
        }

        Ok(QualityAssessment {
            score: reply.score,
            approved: reply.approved,
            missing_elements: reply.missing_elements,
            source: AssessmentSource::Module,
        })
    }
}
