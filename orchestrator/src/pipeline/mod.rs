pub mod executor;
pub mod normalize;
pub mod report;
pub mod runner;
pub mod step;

pub use executor::StepExecutor;
pub use report::{AgentSection, PipelineReport};
pub use runner::{Backoff, Pipeline, RetryPolicy};
pub use step::{ContextScope, Parameters, StepDefinition, ToolId};
