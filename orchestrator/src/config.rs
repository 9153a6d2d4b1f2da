use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use serde::Deserialize;

use crate::agents;
use crate::backend::{BackendProfile, ProviderKeys};
use crate::pipeline::{Backoff, RetryPolicy};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub model_id: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub model_endpoint: Option<String>,
    pub step_models: String,
    pub retry_budget: u32,
    pub backoff_seconds: u64,
    pub backoff_strategy: String,
    pub request_timeout_secs: u64,
    pub openai_api_key: Option<String>,
    pub groq_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub serper_api_key: Option<String>,
    pub plan_requests_per_minute: u32,
}

impl Config {
    /// Defaults, then `orchestrator.toml` if present, then the environment (and `.env`).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Self::load(vec![
            Box::new(config::File::with_name("orchestrator").required(false)),
            Box::new(config::Environment::default().try_parsing(true)),
        ])
    }

    fn load(sources: Vec<Box<dyn config::Source + Send + Sync>>) -> Result<Self> {
        let config: Config = config::Config::builder()
            .set_default("port", 8080_i64)?
            .set_default("model_id", "ollama/llama3")?
            .set_default("temperature", 0.2_f64)?
            .set_default("step_models", "")?
            .set_default("retry_budget", 2_i64)?
            .set_default("backoff_seconds", 20_i64)?
            .set_default("backoff_strategy", "fixed")?
            .set_default("request_timeout_secs", 120_i64)?
            .set_default("plan_requests_per_minute", 10_i64)?
            .add_source(sources)
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.backoff()?;
        self.step_overrides()?;
        self.plans_per_minute()?;
        if !(0.0..=2.0).contains(&self.temperature) {
            bail!("TEMPERATURE must be between 0 and 2, got {}", self.temperature);
        }
        Ok(())
    }

    fn backoff(&self) -> Result<Backoff> {
        let base = Duration::from_secs(self.backoff_seconds);
        match self.backoff_strategy.trim().to_lowercase().as_str() {
            "fixed" => Ok(Backoff::Fixed(base)),
            "exponential" => Ok(Backoff::Exponential(base)),
            other => Err(anyhow!("unknown BACKOFF_STRATEGY '{}' (expected fixed or exponential)", other)),
        }
    }

    /// Parses `STEP_MODELS` (`step=model,step=model`) into validated pairs.
    fn step_overrides(&self) -> Result<Vec<(String, String)>> {
        let known = agents::step_names();
        let mut overrides = Vec::new();
        for entry in self.step_models.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (step, model) = entry
                .split_once('=')
                .map(|(s, m)| (s.trim(), m.trim()))
                .filter(|(s, m)| !s.is_empty() && !m.is_empty())
                .ok_or_else(|| anyhow!("malformed STEP_MODELS entry '{}' (expected step=model)", entry))?;
            if !known.contains(&step) {
                bail!("STEP_MODELS names unknown step '{}'", step);
            }
            overrides.push((step.to_string(), model.to_string()));
        }
        Ok(overrides)
    }

    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        Ok(RetryPolicy::new(self.retry_budget, self.backoff()?))
    }

    pub fn default_profile(&self) -> BackendProfile {
        let mut profile = BackendProfile::new(self.model_id.clone(), self.temperature);
        profile.max_tokens = self.max_tokens;
        profile.endpoint = self.model_endpoint.clone().filter(|e| !e.trim().is_empty());
        profile
    }

    pub fn step_profiles(&self) -> Result<Vec<(String, BackendProfile)>> {
        let default = self.default_profile();
        Ok(self
            .step_overrides()?
            .into_iter()
            .map(|(step, model)| (step, default.with_model(model)))
            .collect())
    }

    pub fn provider_keys(&self) -> ProviderKeys {
        ProviderKeys {
            openai: self.openai_api_key.clone(),
            groq: self.groq_api_key.clone(),
            gemini: self.gemini_api_key.clone(),
        }
    }

    pub fn serper_key(&self) -> Option<String> {
        self.serper_api_key.clone().filter(|k| !k.trim().is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn plans_per_minute(&self) -> Result<NonZeroU32> {
        NonZeroU32::new(self.plan_requests_per_minute)
            .ok_or_else(|| anyhow!("PLAN_REQUESTS_PER_MINUTE must be greater than zero"))
    }
}
