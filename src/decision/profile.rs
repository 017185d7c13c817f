//! 评分配置（编译型决策模块的参数）
//!
//! 离线调好的关键词权重、阈值与产物规则保存在 TOML 文件中，运行时加载为 ScoringProfile，
//! 再包装成 HeuristicDecisionModule 热替换进 DecisionHandle。

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 任务命中 keyword 时，结果中应出现 marker（内容或产物名中）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRule {
    pub keyword: String,
    pub marker: String,
    /// 缺失时写入 missing_elements 的描述
    pub label: String,
}

/// 评分参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringProfile {
    pub name: String,
    /// 复杂度关键词 -> 权重（命中即累加）
    pub complexity_keywords: BTreeMap<String, f32>,
    /// 第一句之后每多一句增加的分数
    pub sentence_weight: f32,
    /// 每 100 字符增加的分数
    pub length_weight: f32,
    /// 分数 >= simple_threshold 视为 simple
    pub simple_threshold: f32,
    /// 分数 >= complex_threshold 视为 complex
    pub complex_threshold: f32,
    /// 结果内容达到该长度才拿满长度分
    pub min_content_chars: usize,
    /// 设置后，分数低于阈值的结果不予通过；未设置时仅拒绝空内容
    pub approval_threshold: Option<f32>,
    pub artifact_rules: Vec<ArtifactRule>,
}

impl Default for ScoringProfile {
    fn default() -> Self {
        let complexity_keywords = [
            ("implement", 2.0),
            ("design", 2.0),
            ("architecture", 2.5),
            ("refactor", 2.0),
            ("analyze", 1.5),
            ("analyse", 1.5),
            ("compare", 1.5),
            ("research", 1.5),
            ("investigate", 1.5),
            ("plan", 1.0),
            ("step by step", 1.5),
            ("then", 0.5),
            ("and also", 0.5),
            ("multiple", 1.0),
            ("分析", 1.5),
            ("设计", 2.0),
            ("实现", 2.0),
        ]
        .into_iter()
        .map(|(k, w)| (k.to_string(), w))
        .collect();

        Self {
            name: "default".to_string(),
            complexity_keywords,
            sentence_weight: 0.75,
            length_weight: 0.5,
            simple_threshold: 1.0,
            complex_threshold: 4.0,
            min_content_chars: 40,
            approval_threshold: None,
            artifact_rules: vec![
                ArtifactRule {
                    keyword: "code".to_string(),
                    marker: "```".to_string(),
                    label: "code block".to_string(),
                },
                ArtifactRule {
                    keyword: "table".to_string(),
                    marker: "|".to_string(),
                    label: "table".to_string(),
                },
            ],
        }
    }
}

/// 评分配置加载错误
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Failed to read profile {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid profile: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid thresholds: simple {simple} must be below complex {complex}")]
    Thresholds { simple: f32, complex: f32 },
}

impl ScoringProfile {
    pub fn from_toml_str(raw: &str) -> Result<Self, ProfileError> {
        let profile: ScoringProfile = toml::from_str(raw)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    fn validate(&self) -> Result<(), ProfileError> {
        if self.simple_threshold >= self.complex_threshold {
            return Err(ProfileError::Thresholds {
                simple: self.simple_threshold,
                complex: self.complex_threshold,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let profile = ScoringProfile::from_toml_str(
            r#"
name = "tuned-v2"
complex_threshold = 6.0
approval_threshold = 7.5

[complexity_keywords]
migrate = 3.0
"#,
        )
        .unwrap();

        assert_eq!(profile.name, "tuned-v2");
        assert_eq!(profile.complex_threshold, 6.0);
        assert_eq!(profile.simple_threshold, 1.0);
        assert_eq!(profile.approval_threshold, Some(7.5));
        assert_eq!(profile.complexity_keywords.get("migrate"), Some(&3.0));
        assert!(!profile.complexity_keywords.contains_key("implement"));
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let err = ScoringProfile::from_toml_str("simple_threshold = 5.0\ncomplex_threshold = 2.0")
            .unwrap_err();
        assert!(matches!(err, ProfileError::Thresholds { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ScoringProfile::load(Path::new("/nonexistent/profile.toml")).unwrap_err();
        assert!(matches!(err, ProfileError::Io { .. }));
    }
}
