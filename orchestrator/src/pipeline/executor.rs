// Step executor: one step, one backend call

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::backend::{BackendProfile, ModelBackend, ModelRequest};
use crate::pipeline::normalize::normalize;
use crate::pipeline::report::{StepError, StepResult, StepStatus};
use crate::pipeline::step::{Parameters, StepDefinition, ToolId};
use crate::tools::{SearchHit, ToolKit};

const MAX_SEARCH_HITS: usize = 5;
const MAX_SCRAPE_CHARS: usize = 2000;

pub struct StepExecutor {
    backend: Arc<dyn ModelBackend>,
    tools: Option<Arc<dyn ToolKit>>,
    default_profile: BackendProfile,
    step_profiles: HashMap<String, BackendProfile>,
}

impl StepExecutor {
    pub fn new(backend: Arc<dyn ModelBackend>, default_profile: BackendProfile) -> Self {
        Self {
            backend,
            tools: None,
            default_profile,
            step_profiles: HashMap::new(),
        }
    }

    pub fn with_tools(mut self, tools: Arc<dyn ToolKit>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Runs `step` on a different model than the default.
    pub fn with_step_profile(mut self, step: impl Into<String>, profile: BackendProfile) -> Self {
        self.step_profiles.insert(step.into(), profile);
        self
    }

    pub fn profile_for(&self, step: &StepDefinition) -> &BackendProfile {
        self.step_profiles
            .get(step.name())
            .unwrap_or(&self.default_profile)
    }

    /// Appends web research to `prompt` for steps that declare tools.
    ///
    /// Tool failures only cost the step its research; they never fail it.
    pub async fn research(&self, step: &StepDefinition, parameters: &Parameters, prompt: String) -> String {
        let Some(tools) = &self.tools else {
            return prompt;
        };
        if !step.uses(ToolId::WebSearch) {
            return prompt;
        }

        let query = match step.render_search_query(parameters) {
            Ok(Some(query)) => query,
            Ok(None) => return prompt,
            Err(e) => {
                warn!(step = step.name(), error = %e, "Skipping web search");
                return prompt;
            }
        };

        let hits = match tools.search(&query).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(step = step.name(), error = %e, "Web search failed");
                return prompt;
            }
        };
        if hits.is_empty() {
            return prompt;
        }

        let mut prompt = prompt;
        prompt.push_str("\n\nWeb research:");
        for hit in hits.iter().take(MAX_SEARCH_HITS) {
            prompt.push_str(&format!("\n- {} ({}): {}", hit.title, hit.url, hit.snippet));
        }

        if step.uses(ToolId::Scrape) {
            if let Some(excerpt) = self.scrape_top_hit(step, tools.as_ref(), &hits).await {
                prompt.push_str(&excerpt);
            }
        }
        prompt
    }

    async fn scrape_top_hit(&self, step: &StepDefinition, tools: &dyn ToolKit, hits: &[SearchHit]) -> Option<String> {
        let top = hits.first()?;
        match tools.scrape(&top.url).await {
            Ok(text) if !text.is_empty() => {
                let excerpt: String = text.chars().take(MAX_SCRAPE_CHARS).collect();
                Some(format!("\n\nPage excerpt from {}:\n{}", top.url, excerpt))
            }
            Ok(_) => None,
            Err(e) => {
                warn!(step = step.name(), url = %top.url, error = %e, "Scrape failed");
                None
            }
        }
    }

    /// Sends one fully-resolved prompt for `step` to its backend.
    #[instrument(skip(self, step, prompt), fields(step = step.name()))]
    pub async fn execute(&self, step: &StepDefinition, prompt: &str) -> StepResult {
        let profile = self.profile_for(step);
        let request = ModelRequest {
            system: step.system_prompt(),
            prompt: prompt.to_string(),
        };

        debug!(model = %profile.model, "Executing step");
        let status_and_text = match self.backend.call(&request, profile).await {
            Ok(text) if text.trim().is_empty() => Err(StepError::EmptyResponse),
            Ok(text) => Ok(text),
            Err(e) => Err(StepError::from(e)),
        };

        match status_and_text {
            Ok(raw_text) => StepResult {
                step_name: step.name().to_string(),
                role: step.role().to_string(),
                normalized_text: normalize(&raw_text),
                raw_text,
                attempts: 1,
                status: StepStatus::Success,
            },
            Err(error) => failed(step, error),
        }
    }
}

/// A result for a step that produced no text.
pub fn failed(step: &StepDefinition, error: StepError) -> StepResult {
    StepResult {
        step_name: step.name().to_string(),
        role: step.role().to_string(),
        raw_text: String::new(),
        normalized_text: String::new(),
        attempts: 1,
        status: StepStatus::Failed(error),
    }
}
