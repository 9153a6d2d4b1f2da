use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

/// Pipeline counters. Cheap to clone; clones share the same series.
#[derive(Clone)]
pub struct Metrics {
    pub runs: IntCounterVec,
    pub step_attempts: IntCounterVec,
    pub retries: IntCounter,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            runs: IntCounterVec::new(
                Opts::new("trip_pipeline_runs_total", "Finished pipeline runs by status"),
                &["status"],
            )?,
            step_attempts: IntCounterVec::new(
                Opts::new("trip_step_attempts_total", "Step attempts by step and outcome"),
                &["step", "outcome"],
            )?,
            retries: IntCounter::new("trip_step_retries_total", "Retries drawn from run budgets")?,
        })
    }

    pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.runs.clone()))?;
        registry.register(Box::new(self.step_attempts.clone()))?;
        registry.register(Box::new(self.retries.clone()))?;
        Ok(())
    }
}
