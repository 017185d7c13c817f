//! 编排器：准入、会话任务与状态机主循环
//!
//! submit 获取准入许可后为每个任务 spawn 一个会话任务；会话任务依次经过
//! 快速通道 -> 分析 -> 路由 -> 执行 -> 进度评估 -> 质量评估，被拒时带着反馈回到执行，直到通过、
//! 重试额度耗尽、被取消或出现契约违例。每个阶段开始前检查取消，阶段内与取消令牌竞速。

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, OwnedSemaphorePermit};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, TimeoutsSection};
use crate::core::events::{into_stream, EventEmitter};
use crate::core::{
    AdmissionControl, EventKind, EventStream, OrchestratorError, QuickResponder, SessionEvent,
    SessionId, SessionSupervisor, TerminalReason, WorkflowPhase, WorkflowSession,
};
use crate::decision::{DecisionHandle, QualityAssessment, RoutingDecision};
use crate::evaluation::{ProgressEvaluator, QualityController};
use crate::execution::{
    best_effort, DelegatedStrategy, DirectStrategy, ExecutionResult, ExecutionStrategy,
    ParallelStrategy, RetryFeedback, StrategyKind, WorkerExecutor, WorkerPool, WorkerProfile,
    WorkerRequest,
};
use crate::observability::Metrics;
use crate::routing::{FastPathClassifier, Router, TaskAnalyzer};
use crate::task::Task;

/// 会话共享的只读组件
struct Components {
    pool: Arc<dyn WorkerPool>,
    decision: DecisionHandle,
    fast_path: FastPathClassifier,
    analyzer: TaskAnalyzer,
    router: Router,
    direct: DirectStrategy,
    parallel: ParallelStrategy,
    delegated: DelegatedStrategy,
    progress: ProgressEvaluator,
    quality: QualityController,
    responder: Option<Arc<dyn QuickResponder>>,
    timeouts: TimeoutsSection,
    metrics: Arc<Metrics>,
}

impl Components {
    fn strategy(&self, kind: StrategyKind) -> &dyn ExecutionStrategy {
        match kind {
            StrategyKind::Direct => &self.direct,
            StrategyKind::Parallel => &self.parallel,
            StrategyKind::Delegated => &self.delegated,
        }
    }
}

/// 会话结束时的结果
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    pub session_id: SessionId,
    pub task_id: String,
    pub phase: WorkflowPhase,
    pub reason: TerminalReason,
    pub retry_count: u32,
    pub strategy: Option<StrategyKind>,
    pub decision: Option<RoutingDecision>,
    /// 通过时为被批准的结果，否则为尽力输出
    pub result: Option<ExecutionResult>,
    pub assessment: Option<QualityAssessment>,
}

impl SessionOutcome {
    pub fn is_success(&self) -> bool {
        self.phase == WorkflowPhase::Completed
    }
}

/// 调用方持有的会话句柄
pub struct SessionHandle {
    session_id: SessionId,
    task_id: String,
    cancel_token: CancellationToken,
    events: Option<mpsc::UnboundedReceiver<SessionEvent>>,
    join: JoinHandle<SessionOutcome>,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// 获取事件流；只能获取一次
    pub fn stream_events(&mut self) -> Result<EventStream, OrchestratorError> {
        self.events
            .take()
            .map(into_stream)
            .ok_or(OrchestratorError::EventsAlreadyTaken)
    }

    /// 请求取消（幂等）
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// 等待会话结束
    pub async fn outcome(self) -> Result<SessionOutcome, OrchestratorError> {
        self.join
            .await
            .map_err(|e| OrchestratorError::SessionAborted(e.to_string()))
    }
}

/// 会话任务结束（含 panic）时释放准入许可并注销会话
struct SessionGuard {
    supervisor: Arc<SessionSupervisor>,
    session_id: SessionId,
    _permit: OwnedSemaphorePermit,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.supervisor.release(&self.session_id);
    }
}

/// 编排器（Clone 共享同一组件、准入与监管）
#[derive(Clone)]
pub struct Orchestrator {
    components: Arc<Components>,
    admission: Arc<AdmissionControl>,
    supervisor: Arc<SessionSupervisor>,
    events_tx: broadcast::Sender<SessionEvent>,
}

impl Orchestrator {
    pub fn new(
        config: &AppConfig,
        pool: Arc<dyn WorkerPool>,
        decision: DecisionHandle,
        responder: Option<Arc<dyn QuickResponder>>,
    ) -> Self {
        let metrics = Arc::new(Metrics::new());
        let timeouts = config.timeouts.clone();
        let executor = WorkerExecutor::new(pool.clone(), timeouts.worker(), metrics.clone());
        let (events_tx, _) = broadcast::channel(config.orchestrator.event_channel_capacity.max(1));

        let components = Components {
            pool,
            decision,
            fast_path: FastPathClassifier::from_config(&config.fast_path),
            analyzer: TaskAnalyzer::new(timeouts.analysis(), metrics.clone()),
            router: Router::new(config.orchestrator.default_worker.clone()),
            direct: DirectStrategy::new(executor.clone()),
            parallel: ParallelStrategy::new(executor.clone()),
            delegated: DelegatedStrategy::new(executor, config.orchestrator.max_chain_length),
            progress: ProgressEvaluator::new(),
            quality: QualityController::new(
                config.orchestrator.max_refinement_rounds,
                timeouts.assessment(),
                metrics.clone(),
            ),
            responder,
            timeouts,
            metrics,
        };

        Self {
            components: Arc::new(components),
            admission: Arc::new(AdmissionControl::new(
                config.orchestrator.max_concurrent_sessions,
            )),
            supervisor: Arc::new(SessionSupervisor::new()),
            events_tx,
        }
    }

    /// 提交任务：无空闲许可时立即返回 AdmissionRejected
    pub fn submit(&self, task: Task) -> Result<SessionHandle, OrchestratorError> {
        let metrics = &self.components.metrics;
        let permit = match self.admission.try_admit() {
            Ok(permit) => permit,
            Err(e) => {
                metrics.session_rejected();
                tracing::warn!(task_id = %task.id, error = %e, "session rejected");
                return Err(e);
            }
        };
        metrics.session_admitted();

        let session_id = format!("sess_{}", uuid::Uuid::new_v4());
        let task_id = task.id.clone();
        let cancel_token = self.supervisor.register(&session_id);
        let (session_tx, session_rx) = mpsc::unbounded_channel();
        let emitter = EventEmitter::new(session_id.clone(), session_tx, self.events_tx.clone());
        let session = WorkflowSession::new(session_id.clone(), Arc::new(task), cancel_token.clone());
        let guard = SessionGuard {
            supervisor: self.supervisor.clone(),
            session_id: session_id.clone(),
            _permit: permit,
        };
        tracing::info!(session_id = %session_id, task_id = %task_id, "session admitted");

        let components = self.components.clone();
        let join = tokio::spawn(async move {
            let _guard = guard;
            SessionRun::new(components, session, emitter).run().await
        });

        Ok(SessionHandle {
            session_id,
            task_id,
            cancel_token,
            events: Some(session_rx),
            join,
        })
    }

    /// 取消会话（幂等）；会话仍在运行时返回 true
    pub fn cancel(&self, session_id: &str) -> bool {
        self.supervisor.cancel(session_id)
    }

    /// 取消所有进行中的会话
    pub fn shutdown(&self) {
        tracing::info!(active = self.supervisor.active().len(), "orchestrator shutting down");
        self.supervisor.shutdown();
    }

    pub fn decision_handle(&self) -> DecisionHandle {
        self.components.decision.clone()
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.components.metrics.clone()
    }

    pub fn active_sessions(&self) -> Vec<SessionId> {
        self.supervisor.active()
    }

    /// 订阅所有会话的事件
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }

    pub fn catalog(&self) -> Vec<WorkerProfile> {
        self.components.pool.catalog()
    }
}

/// 会话推进被打断的原因
enum Halt {
    Cancelled,
    Violation(String),
}

impl From<OrchestratorError> for Halt {
    fn from(e: OrchestratorError) -> Self {
        Halt::Violation(e.to_string())
    }
}

/// 与取消令牌竞速
async fn until_cancelled<F: Future>(token: &CancellationToken, fut: F) -> Result<F::Output, Halt> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Halt::Cancelled),
        out = fut => Ok(out),
    }
}

/// 单个会话的运行状态（只在会话任务内使用）
struct SessionRun {
    components: Arc<Components>,
    session: WorkflowSession,
    events: EventEmitter,
    phase_started: Instant,
    decision: Option<RoutingDecision>,
    strategy: Option<StrategyKind>,
    assessment: Option<QualityAssessment>,
}

impl SessionRun {
    fn new(components: Arc<Components>, session: WorkflowSession, events: EventEmitter) -> Self {
        Self {
            components,
            session,
            events,
            phase_started: Instant::now(),
            decision: None,
            strategy: None,
            assessment: None,
        }
    }

    async fn run(mut self) -> SessionOutcome {
        self.events.emit(EventKind::PhaseEntered {
            phase: WorkflowPhase::Admitted,
            attempt: 0,
        });

        let reason = match self.drive().await {
            Ok(reason) => reason,
            Err(Halt::Cancelled) => {
                self.terminate(WorkflowPhase::Cancelled);
                TerminalReason::Cancelled
            }
            Err(Halt::Violation(message)) => {
                tracing::error!(
                    session_id = %self.session.session_id,
                    phase = %self.session.phase(),
                    error = %message,
                    "session aborted by contract violation"
                );
                self.terminate(WorkflowPhase::Failed);
                TerminalReason::ContractViolation
            }
        };
        self.finish(reason)
    }

    async fn drive(&mut self) -> Result<TerminalReason, Halt> {
        let components = self.components.clone();
        let task = self.session.task.clone();
        let token = self.session.cancel_token().clone();

        self.checkpoint()?;
        if let Some(canned) = components.fast_path.classify_fast(&task) {
            components.metrics.fast_path_hit();
            let reply = until_cancelled(&token, quick_reply(&components, &task, canned)).await?;
            self.session.history.push(ExecutionResult::success(reply));
            self.checkpoint()?;
            self.session.transition(WorkflowPhase::Completed)?;
            return Ok(TerminalReason::FastPath);
        }

        self.enter(WorkflowPhase::Analyzing)?;
        let module = components.decision.current().await;
        let catalog = components.pool.catalog();
        let decision = until_cancelled(
            &token,
            components.analyzer.analyze(&task, module.as_ref(), &catalog),
        )
        .await?;
        tracing::info!(
            session_id = %self.session.session_id,
            module = module.name(),
            pattern = %decision.pattern,
            workers = ?decision.target_workers,
            confidence = decision.confidence,
            source = ?decision.source,
            "routing decision"
        );
        self.complete();

        self.enter(WorkflowPhase::Routing)?;
        let plan = components.router.route(&decision)?;
        self.decision = Some(decision);
        self.strategy = Some(plan.strategy);
        self.complete();

        let strategy = components.strategy(plan.strategy);
        let mut feedback: Option<RetryFeedback> = None;
        loop {
            self.enter(WorkflowPhase::Executing)?;
            let mut request = WorkerRequest::new(task.clone()).with_attempt(self.session.retry_count);
            if let Some(previous) = feedback.take() {
                request = request.with_feedback(previous);
            }
            let execution_timeout = components.timeouts.execution();
            let result = match until_cancelled(
                &token,
                timeout(execution_timeout, strategy.execute(&request, &plan.workers)),
            )
            .await?
            {
                Ok(result) => result,
                Err(_) => {
                    components.metrics.phase_timeout();
                    tracing::warn!(
                        session_id = %self.session.session_id,
                        strategy = %plan.strategy,
                        "execution phase timed out"
                    );
                    ExecutionResult::error(format!(
                        "execution phase timed out after {} ms",
                        execution_timeout.as_millis()
                    ))
                }
            };
            self.session.history.push(result.clone());
            self.complete();

            self.enter(WorkflowPhase::Evaluating)?;
            let report = components.progress.evaluate(&task, &result);
            self.complete();

            self.enter(WorkflowPhase::AssessingQuality)?;
            let module = components.decision.current().await;
            let (assessment, next) = until_cancelled(
                &token,
                components.quality.assess_and_decide(
                    &result,
                    &task,
                    self.session.retry_count,
                    module.as_ref(),
                ),
            )
            .await?;
            self.complete();

            let mut missing = assessment.missing_elements.clone();
            for objective in &report.remaining_objectives {
                if !missing.contains(objective) {
                    missing.push(objective.clone());
                }
            }
            tracing::info!(
                session_id = %self.session.session_id,
                attempt = self.session.retry_count,
                score = assessment.score,
                approved = assessment.approved,
                source = ?assessment.source,
                "quality assessed"
            );
            self.assessment = Some(assessment);

            match next {
                WorkflowPhase::Completed => {
                    self.session.transition(WorkflowPhase::Completed)?;
                    return Ok(TerminalReason::Approved);
                }
                WorkflowPhase::Failed => {
                    let max_rounds = components.quality.max_refinement_rounds();
                    self.session.retry_count = (self.session.retry_count + 1).min(max_rounds);
                    self.session.transition(WorkflowPhase::Failed)?;
                    return Ok(TerminalReason::RetryBudgetExhausted);
                }
                WorkflowPhase::Retrying => {
                    self.session.retry_count += 1;
                    components.metrics.retry_scheduled();
                    self.enter(WorkflowPhase::Retrying)?;
                    self.events.emit(EventKind::RetryScheduled {
                        retry_count: self.session.retry_count,
                        missing_elements: missing.clone(),
                    });
                    self.complete();
                    feedback = Some(RetryFeedback {
                        previous: result,
                        missing_elements: missing,
                    });
                }
                other => {
                    return Err(Halt::Violation(format!(
                        "quality gate returned non-decision phase {other}"
                    )))
                }
            }
        }
    }

    fn checkpoint(&self) -> Result<(), Halt> {
        if self.session.is_cancelled() {
            Err(Halt::Cancelled)
        } else {
            Ok(())
        }
    }

    /// 阶段边界：检查取消、迁移并发出 phase_entered
    fn enter(&mut self, phase: WorkflowPhase) -> Result<(), Halt> {
        self.checkpoint()?;
        self.session.transition(phase)?;
        self.phase_started = Instant::now();
        self.events.emit(EventKind::PhaseEntered {
            phase,
            attempt: self.session.retry_count,
        });
        Ok(())
    }

    fn complete(&mut self) {
        self.events.emit(EventKind::PhaseCompleted {
            phase: self.session.phase(),
            elapsed_ms: self.phase_started.elapsed().as_millis() as u64,
        });
    }

    fn terminate(&mut self, phase: WorkflowPhase) {
        if let Err(e) = self.session.transition(phase) {
            tracing::error!(session_id = %self.session.session_id, error = %e, "terminal transition refused");
        }
    }

    fn finish(mut self, reason: TerminalReason) -> SessionOutcome {
        let phase = self.session.phase();
        let metrics = &self.components.metrics;
        match phase {
            WorkflowPhase::Completed => metrics.session_completed(),
            WorkflowPhase::Cancelled => metrics.session_cancelled(),
            _ => metrics.session_failed(),
        }

        self.events.emit(EventKind::SessionTerminal {
            phase,
            reason,
            retry_count: self.session.retry_count,
        });
        tracing::info!(
            session_id = %self.session.session_id,
            phase = %phase,
            reason = %reason,
            retry_count = self.session.retry_count,
            "session finished"
        );

        let result = match reason {
            TerminalReason::Approved | TerminalReason::FastPath => self.session.history.last().cloned(),
            _ => best_effort(&self.session.history),
        };

        SessionOutcome {
            session_id: self.session.session_id.clone(),
            task_id: self.session.task.id.clone(),
            phase,
            reason,
            retry_count: self.session.retry_count,
            strategy: self.strategy,
            decision: self.decision.take(),
            result,
            assessment: self.assessment.take(),
        }
    }
}

/// 快速通道回复：有回复者时在超时内调用，否则或失败时用固定回复
async fn quick_reply(components: &Components, task: &Task, canned: String) -> String {
    let Some(responder) = &components.responder else {
        return canned;
    };
    match timeout(components.timeouts.fast_path(), responder.respond(task)).await {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => {
            tracing::warn!(task_id = %task.id, error = %e, "quick responder failed, using canned reply");
            canned
        }
        Err(_) => {
            components.metrics.phase_timeout();
            tracing::warn!(task_id = %task.id, "quick responder timed out, using canned reply");
            canned
        }
    }
}
