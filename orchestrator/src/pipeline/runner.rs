// Pipeline runner: executes steps strictly in order with a run-level retry budget

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::metrics::Metrics;
use crate::pipeline::executor::{failed, StepExecutor};
use crate::pipeline::report::{AbortReason, Disposition, PipelineReport, RunStatus, StepResult};
use crate::pipeline::step::{ContextScope, Parameters, RunContext, StepDefinition};

/// Longest single wait between retries.
pub const MAX_BACKOFF: Duration = Duration::from_secs(600);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("duplicate step name: {0}")]
    DuplicateStep(String),

    #[error("step '{step}' depends on unknown step '{dependency}'")]
    UnknownDependency { step: String, dependency: String },

    #[error("step '{step}' depends on later step '{dependency}'")]
    ForwardDependency { step: String, dependency: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    /// `base * 2^(k-1)` before the k-th retry of a run.
    Exponential(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries shared by every step of one run.
    pub budget: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(budget: u32, backoff: Backoff) -> Self {
        Self { budget, backoff }
    }

    /// Wait before the `retry`-th retry of a run (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let delay = match self.backoff {
            Backoff::Fixed(wait) => wait,
            Backoff::Exponential(base) => {
                let factor = 2u32.saturating_pow(retry.saturating_sub(1));
                base.checked_mul(factor).unwrap_or(MAX_BACKOFF)
            }
        };
        delay.min(MAX_BACKOFF)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Backoff::Fixed(Duration::from_secs(20)))
    }
}

#[derive(Debug)]
enum RunState {
    Pending,
    Running { step_index: usize },
    Completed,
    Aborted(AbortReason),
}

/// What came out of the attempts at one step.
enum StepOutcome {
    Finished(StepResult),
    /// The run was cancelled while backing off; holds the last failed attempt.
    Cancelled(StepResult),
}

/// Mutable state of one run, threaded through the state machine.
struct RunProgress {
    context: RunContext,
    results: Vec<StepResult>,
    retries_used: u32,
}

pub struct Pipeline {
    steps: Vec<StepDefinition>,
    executor: StepExecutor,
    retry: RetryPolicy,
    metrics: Option<Metrics>,
}

impl Pipeline {
    /// Checks that step names are unique and that every declared context
    /// dependency names an earlier step.
    pub fn new(steps: Vec<StepDefinition>, executor: StepExecutor, retry: RetryPolicy) -> Result<Self, PipelineError> {
        let all: HashSet<&str> = steps.iter().map(|s| s.name()).collect();
        let mut seen = HashSet::new();

        for step in &steps {
            if let ContextScope::Steps(deps) = step.context() {
                for dep in deps {
                    if !seen.contains(dep.as_str()) {
                        let err = if all.contains(dep.as_str()) {
                            PipelineError::ForwardDependency {
                                step: step.name().to_string(),
                                dependency: dep.clone(),
                            }
                        } else {
                            PipelineError::UnknownDependency {
                                step: step.name().to_string(),
                                dependency: dep.clone(),
                            }
                        };
                        return Err(err);
                    }
                }
            }
            if !seen.insert(step.name()) {
                return Err(PipelineError::DuplicateStep(step.name().to_string()));
            }
        }

        Ok(Self {
            steps,
            executor,
            retry,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub async fn run(&self, parameters: Parameters) -> PipelineReport {
        self.run_with_cancel(parameters, &CancellationToken::new()).await
    }

    /// Runs every step in order. `cancel` is honoured between steps and
    /// during retry backoff; a model call already in flight finishes.
    #[instrument(skip_all, fields(run_id = tracing::field::Empty))]
    pub async fn run_with_cancel(&self, parameters: Parameters, cancel: &CancellationToken) -> PipelineReport {
        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));
        let started_at = Utc::now();
        info!("Pipeline run started with {} steps", self.steps.len());

        let mut progress = RunProgress {
            context: RunContext::new(parameters),
            results: Vec::with_capacity(self.steps.len()),
            retries_used: 0,
        };

        let mut state = RunState::Pending;
        let status = loop {
            state = match state {
                RunState::Pending => RunState::Running { step_index: 0 },
                RunState::Running { step_index } => self.advance(step_index, &mut progress, cancel).await,
                RunState::Completed => break RunStatus::Completed,
                RunState::Aborted(reason) => break RunStatus::Aborted(reason),
            };
            debug!(?state, "Run state transition");
        };

        let report = PipelineReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            status,
            results: progress.results,
        };
        let duration_ms = report.duration().num_milliseconds();
        match report.abort_reason() {
            None => info!(duration_ms, "Pipeline run completed"),
            Some(reason) => warn!(duration_ms, reason = %reason, "Pipeline run aborted"),
        }
        if let Some(metrics) = &self.metrics {
            let label = if report.is_completed() { "completed" } else { "aborted" };
            metrics.runs.with_label_values(&[label]).inc();
        }
        report
    }

    /// Runs the step at `step_index` and decides the next state.
    async fn advance(&self, step_index: usize, progress: &mut RunProgress, cancel: &CancellationToken) -> RunState {
        let Some(step) = self.steps.get(step_index) else {
            return RunState::Completed;
        };
        if cancel.is_cancelled() {
            return RunState::Aborted(AbortReason::Cancelled {
                step: step.name().to_string(),
            });
        }

        let outcome = match step.render(progress.context.parameters(), progress.context.prior_outputs()) {
            Ok(prompt) => {
                let prompt = self.executor.research(step, progress.context.parameters(), prompt).await;
                self.attempt_step(step, &prompt, &mut progress.retries_used, cancel).await
            }
            Err(e) => {
                warn!(step = step.name(), error = %e, "Prompt rendering failed");
                StepOutcome::Finished(failed(step, e.into()))
            }
        };

        match outcome {
            StepOutcome::Cancelled(result) => {
                progress.results.push(result);
                RunState::Aborted(AbortReason::Cancelled {
                    step: step.name().to_string(),
                })
            }
            StepOutcome::Finished(result) => match result.error().cloned() {
                Some(error) => {
                    progress.results.push(result);
                    RunState::Aborted(AbortReason::StepFailed {
                        step: step.name().to_string(),
                        error,
                    })
                }
                None => {
                    progress.context.record(step.name(), &result.normalized_text);
                    progress.results.push(result);
                    RunState::Running {
                        step_index: step_index + 1,
                    }
                }
            },
        }
    }

    /// Executes one step, re-sending the same prompt while retryable failures
    /// keep occurring and the run still has budget.
    async fn attempt_step(
        &self,
        step: &StepDefinition,
        prompt: &str,
        retries_used: &mut u32,
        cancel: &CancellationToken,
    ) -> StepOutcome {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let result = self.executor.execute(step, prompt).await.with_attempts(attempts);
            self.record_attempt(step, &result);

            match result.disposition() {
                Disposition::Retryable if *retries_used < self.retry.budget => {
                    *retries_used += 1;
                    let delay = self.retry.delay(*retries_used);
                    warn!(
                        step = step.name(),
                        attempt = attempts,
                        retries_left = self.retry.budget - *retries_used,
                        delay_ms = delay.as_millis() as u64,
                        error = result.error().map(|e| e.kind()).unwrap_or_default(),
                        "Retryable step failure, backing off"
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics.retries.inc();
                    }
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancel.cancelled() => {
                            info!(step = step.name(), "Run cancelled during backoff");
                            return StepOutcome::Cancelled(result);
                        }
                    }
                }
                _ => return StepOutcome::Finished(result),
            }
        }
    }

    fn record_attempt(&self, step: &StepDefinition, result: &StepResult) {
        let outcome = result.error().map(|e| e.kind()).unwrap_or("success");
        debug!(step = step.name(), outcome, "Step attempt finished");
        if let Some(metrics) = &self.metrics {
            metrics
                .step_attempts
                .with_label_values(&[step.name(), outcome])
                .inc();
        }
    }
}
