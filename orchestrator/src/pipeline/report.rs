// Step results, the run report and the human-facing assembly of both

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::backend::BackendError;
use crate::pipeline::step::TemplateError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("{0}")]
    Template(#[from] TemplateError),

    #[error("model backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("model backend timed out")]
    Timeout,

    #[error("model backend is rate limiting requests")]
    RateLimited,

    #[error("model backend returned an empty response")]
    EmptyResponse,

    #[error("model backend rejected the request: {0}")]
    BackendRejected(String),
}

impl From<BackendError> for StepError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unavailable(msg) => StepError::BackendUnavailable(msg),
            BackendError::RateLimited => StepError::RateLimited,
            BackendError::Timeout => StepError::Timeout,
            BackendError::Rejected(msg) => StepError::BackendRejected(msg),
            BackendError::Malformed(_) => StepError::EmptyResponse,
        }
    }
}

impl StepError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StepError::BackendUnavailable(_)
                | StepError::Timeout
                | StepError::RateLimited
                | StepError::EmptyResponse
        )
    }

    /// Message safe to show end users: no backend payloads or addresses.
    pub fn summary(&self) -> String {
        match self {
            StepError::Template(TemplateError::MissingParameter(name)) => {
                format!("the prompt is missing the '{}' parameter", name)
            }
            StepError::BackendUnavailable(_) => "the language model service is unavailable".to_string(),
            StepError::Timeout => "the language model timed out".to_string(),
            StepError::RateLimited => "the language model is rate limiting requests".to_string(),
            StepError::EmptyResponse => "the language model returned no answer".to_string(),
            StepError::BackendRejected(_) => "the language model rejected the request".to_string(),
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StepError::Template(_) => "template",
            StepError::BackendUnavailable(_) => "unavailable",
            StepError::Timeout => "timeout",
            StepError::RateLimited => "rate_limited",
            StepError::EmptyResponse => "empty_response",
            StepError::BackendRejected(_) => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Success,
    Failed(StepError),
}

/// How the runner should treat a finished step attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Success,
    Retryable,
    Fatal,
}

/// Outcome of one step, built by the executor and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub step_name: String,
    pub role: String,
    pub raw_text: String,
    pub normalized_text: String,
    pub attempts: u32,
    pub status: StepStatus,
}

impl StepResult {
    pub fn disposition(&self) -> Disposition {
        match &self.status {
            StepStatus::Success => Disposition::Success,
            StepStatus::Failed(err) if err.is_retryable() => Disposition::Retryable,
            StepStatus::Failed(_) => Disposition::Fatal,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }

    pub fn error(&self) -> Option<&StepError> {
        match &self.status {
            StepStatus::Failed(err) => Some(err),
            StepStatus::Success => None,
        }
    }

    pub(crate) fn with_attempts(self, attempts: u32) -> Self {
        Self { attempts, ..self }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    #[error("step '{step}' failed: {error}")]
    StepFailed { step: String, error: StepError },

    /// `step` is the first step that did not finish.
    #[error("run cancelled at step '{step}'")]
    Cancelled { step: String },
}

impl AbortReason {
    pub fn summary(&self) -> String {
        match self {
            AbortReason::StepFailed { step, error } => {
                format!("the {} step failed: {}", step, error.summary())
            }
            AbortReason::Cancelled { .. } => "the request was cancelled".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Aborted(AbortReason),
}

/// One entry of the assembled plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentSection {
    pub agent: String,
    pub content: String,
}

/// Everything a run produced, in execution order.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,
    pub results: Vec<StepResult>,
}

impl PipelineReport {
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn abort_reason(&self) -> Option<&AbortReason> {
        match &self.status {
            RunStatus::Aborted(reason) => Some(reason),
            RunStatus::Completed => None,
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    pub fn sections(&self) -> Vec<AgentSection> {
        assemble(&self.results)
    }

    /// Renders the assembled plan as one markdown document.
    pub fn to_markdown(&self) -> String {
        self.sections()
            .iter()
            .map(|section| format!("## {}\n\n{}", section.agent, section.content))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    }
}

/// Keeps `(role, normalized text)` for every successful, non-empty step, in order.
pub fn assemble(results: &[StepResult]) -> Vec<AgentSection> {
    results
        .iter()
        .filter(|result| result.is_success() && !result.normalized_text.is_empty())
        .map(|result| AgentSection {
            agent: result.role.clone(),
            content: result.normalized_text.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, role: &str, text: &str, status: StepStatus) -> StepResult {
        StepResult {
            step_name: name.into(),
            role: role.into(),
            raw_text: text.into(),
            normalized_text: text.into(),
            attempts: 1,
            status,
        }
    }

    #[test]
    fn assemble_keeps_order_and_skips_empty_and_failed() {
        let results = vec![
            result("destination", "Destination Researcher", "Great fit", StepStatus::Success),
            result("attractions", "Attraction Planner", "", StepStatus::Success),
            result("budget", "Budget Planner", "Ranges", StepStatus::Success),
            result("tips", "Travel Tips Expert", "", StepStatus::Failed(StepError::RateLimited)),
        ];
        let sections = assemble(&results);
        assert_eq!(
            sections,
            vec![
                AgentSection {
                    agent: "Destination Researcher".into(),
                    content: "Great fit".into()
                },
                AgentSection {
                    agent: "Budget Planner".into(),
                    content: "Ranges".into()
                },
            ]
        );
    }

    #[test]
    fn disposition_follows_error_kind() {
        let ok = result("a", "A", "x", StepStatus::Success);
        let throttled = result("a", "A", "", StepStatus::Failed(StepError::RateLimited));
        let empty = result("a", "A", "", StepStatus::Failed(StepError::EmptyResponse));
        let template = result(
            "a",
            "A",
            "",
            StepStatus::Failed(TemplateError::MissingParameter("days".into()).into()),
        );
        let rejected = result("a", "A", "", StepStatus::Failed(StepError::BackendRejected("401".into())));
        assert_eq!(ok.disposition(), Disposition::Success);
        assert_eq!(throttled.disposition(), Disposition::Retryable);
        assert_eq!(empty.disposition(), Disposition::Retryable);
        assert_eq!(template.disposition(), Disposition::Fatal);
        assert_eq!(rejected.disposition(), Disposition::Fatal);
    }

    #[test]
    fn summaries_hide_backend_details() {
        let reason = AbortReason::StepFailed {
            step: "budget".into(),
            error: StepError::BackendRejected("HTTP 401: {\"error\":\"invalid key sk-123\"}".into()),
        };
        let text = reason.summary();
        assert_eq!(text, "the budget step failed: the language model rejected the request");
        assert!(!text.contains("sk-123"));
    }

    #[test]
    fn malformed_backend_output_counts_as_empty() {
        let err: StepError = BackendError::Malformed("eof".into()).into();
        assert_eq!(err, StepError::EmptyResponse);
    }

    #[test]
    fn markdown_joins_sections_with_rules() {
        let report = PipelineReport {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            status: RunStatus::Completed,
            results: vec![
                result("a", "Budget Planner", "Ranges", StepStatus::Success),
                result("b", "Itinerary Planner", "Day 1:", StepStatus::Success),
            ],
        };
        assert_eq!(
            report.to_markdown(),
            "## Budget Planner\n\nRanges\n\n---\n\n## Itinerary Planner\n\nDay 1:"
        );
    }
}
