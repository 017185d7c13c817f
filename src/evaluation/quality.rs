//! 质量控制：评估执行结果，并决定完成 / 重试 / 失败
//!
//! Error 结果（Worker 失败或超时）直接拒绝，不调用模块，这样超时和质量拒绝走同一条重试路径。
//! 模块失败或超时时退化为启发式评估（仅空内容被拒），质量闸门只降级、不阻塞。

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::core::WorkflowPhase;
use crate::decision::{
    AssessmentSource, DecisionError, DecisionModule, HeuristicDecisionModule, QualityAssessment,
};
use crate::execution::ExecutionResult;
use crate::observability::Metrics;
use crate::task::Task;

pub struct QualityController {
    max_refinement_rounds: u32,
    timeout: Duration,
    fallback: HeuristicDecisionModule,
    metrics: Arc<Metrics>,
}

impl QualityController {
    pub fn new(max_refinement_rounds: u32, timeout: Duration, metrics: Arc<Metrics>) -> Self {
        Self {
            max_refinement_rounds,
            timeout,
            fallback: HeuristicDecisionModule::new(),
            metrics,
        }
    }

    pub fn max_refinement_rounds(&self) -> u32 {
        self.max_refinement_rounds
    }

    /// 评估结果；从不返回错误
    pub async fn assess(
        &self,
        result: &ExecutionResult,
        task: &Task,
        module: &dyn DecisionModule,
    ) -> QualityAssessment {
        if result.is_error() {
            return QualityAssessment::rejected(
                0.0,
                vec![format!("execution failed: {}", result.content.trim())],
            )
            .with_source(AssessmentSource::ExecutionFailure);
        }

        let outcome = match timeout(self.timeout, module.assess(result, task)).await {
            Ok(inner) => inner,
            Err(_) => Err(DecisionError::Timeout),
        };

        match outcome {
            Ok(mut assessment) => {
                self.metrics.module_assessment();
                assessment.score = assessment.score.clamp(0.0, 10.0);
                assessment
            }
            Err(e) => {
                self.metrics.heuristic_assessment();
                tracing::warn!(module = module.name(), error = %e, "assessment fell back to heuristic");
                self.fallback.evaluate(result, task)
            }
        }
    }

    /// 通过 -> Completed；未通过时本次拒绝消耗一轮，消耗后仍低于上限 -> Retrying，否则 -> Failed
    pub fn next_phase(&self, approved: bool, retry_count: u32) -> WorkflowPhase {
        if approved {
            WorkflowPhase::Completed
        } else if retry_count + 1 < self.max_refinement_rounds {
            WorkflowPhase::Retrying
        } else {
            WorkflowPhase::Failed
        }
    }

    pub async fn assess_and_decide(
        &self,
        result: &ExecutionResult,
        task: &Task,
        retry_count: u32,
        module: &dyn DecisionModule,
    ) -> (QualityAssessment, WorkflowPhase) {
        let assessment = self.assess(result, task, module).await;
        let next = self.next_phase(assessment.approved, retry_count);
        (assessment, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::RoutingDecision;
    use crate::execution::WorkerProfile;
    use async_trait::async_trait;

    struct BrokenModule;

    #[async_trait]
    impl DecisionModule for BrokenModule {
        fn name(&self) -> &str {
            "broken"
        }

        async fn classify(
            &self,
            _task: &Task,
            _catalog: &[WorkerProfile],
        ) -> Result<RoutingDecision, DecisionError> {
            Err(DecisionError::Unavailable("offline".into()))
        }

        async fn assess(
            &self,
            _result: &ExecutionResult,
            _task: &Task,
        ) -> Result<QualityAssessment, DecisionError> {
            Err(DecisionError::Unavailable("offline".into()))
        }
    }

    struct HarshModule;

    #[async_trait]
    impl DecisionModule for HarshModule {
        fn name(&self) -> &str {
            "harsh"
        }

        async fn classify(
            &self,
            _task: &Task,
            _catalog: &[WorkerProfile],
        ) -> Result<RoutingDecision, DecisionError> {
            Err(DecisionError::Unavailable("n/a".into()))
        }

        async fn assess(
            &self,
            _result: &ExecutionResult,
            _task: &Task,
        ) -> Result<QualityAssessment, DecisionError> {
            Ok(QualityAssessment::rejected(42.0, vec!["citations".into()]))
        }
    }

    fn controller(rounds: u32) -> (QualityController, Arc<Metrics>) {
        let metrics = Arc::new(Metrics::new());
        (
            QualityController::new(rounds, Duration::from_millis(200), metrics.clone()),
            metrics,
        )
    }

    #[tokio::test]
    async fn test_module_failure_degrades_to_heuristic() {
        let (qc, metrics) = controller(2);
        let task = Task::new("say something");

        let (assessment, next) = qc
            .assess_and_decide(&ExecutionResult::success("something"), &task, 0, &BrokenModule)
            .await;
        assert!(assessment.approved);
        assert_eq!(assessment.source, AssessmentSource::Heuristic);
        assert_eq!(next, WorkflowPhase::Completed);

        let (empty, next) = qc
            .assess_and_decide(&ExecutionResult::success(""), &task, 0, &BrokenModule)
            .await;
        assert!(!empty.approved);
        assert_eq!(next, WorkflowPhase::Retrying);
        assert_eq!(metrics.snapshot().heuristic_assessments, 2);
    }

    #[tokio::test]
    async fn test_error_result_rejected_without_module() {
        let (qc, metrics) = controller(1);
        let (assessment, next) = qc
            .assess_and_decide(&ExecutionResult::error("timed out"), &Task::new("t"), 1, &HarshModule)
            .await;
        assert_eq!(assessment.source, AssessmentSource::ExecutionFailure);
        assert_eq!(assessment.missing_elements, vec!["execution failed: timed out"]);
        assert_eq!(next, WorkflowPhase::Failed);
        assert_eq!(metrics.snapshot().module_assessments, 0);
    }

    #[tokio::test]
    async fn test_module_score_is_clamped() {
        let (qc, _) = controller(2);
        let (assessment, next) = qc
            .assess_and_decide(&ExecutionResult::success("draft"), &Task::new("t"), 2, &HarshModule)
            .await;
        assert_eq!(assessment.score, 10.0);
        assert_eq!(assessment.missing_elements, vec!["citations"]);
        assert_eq!(next, WorkflowPhase::Failed);
    }

    #[test]
    fn test_next_phase_bound() {
        let (qc, _) = controller(2);
        // 两轮：第一次拒绝后重试，第二次拒绝即失败
        assert_eq!(qc.next_phase(false, 0), WorkflowPhase::Retrying);
        assert_eq!(qc.next_phase(false, 1), WorkflowPhase::Failed);
        assert_eq!(qc.next_phase(true, 1), WorkflowPhase::Completed);

        let (none, _) = controller(0);
        assert_eq!(none.next_phase(false, 0), WorkflowPhase::Failed);
    }
}
