use std::sync::Arc;

use tracing::{error, info, warn};
use warp::Filter;

mod agents;
mod api;
mod backend;
mod config;
mod error;
mod metrics;
mod middleware;
mod models;
mod pipeline;
mod tools;

use backend::ProviderRouter;
use pipeline::{Pipeline, StepExecutor};
use tools::WebToolKit;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL"))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .init();

    info!("Starting AI Travel Planner orchestrator");

    // Load configuration
    let config = config::Config::from_env().map_err(|e| {
        error!("Invalid configuration: {:#}", e);
        e
    })?;
    info!("Configuration loaded");

    // Model backends and research tools
    let backend = ProviderRouter::new(config.request_timeout(), config.provider_keys())?.into_shared();
    let mut executor = StepExecutor::new(backend, config.default_profile());
    match config.serper_key() {
        Some(key) => {
            executor = executor.with_tools(Arc::new(WebToolKit::new(key, config.request_timeout())?));
            info!("Web research tools enabled");
        }
        None => warn!("SERPER_API_KEY not set; steps will run without web research"),
    }
    for (step, profile) in config.step_profiles()? {
        info!(step = %step, model = %profile.model, "Using step model override");
        executor = executor.with_step_profile(step, profile);
    }

    // Pipeline metrics
    let metrics = metrics::Metrics::new()?;
    metrics.register(prometheus::default_registry())?;

    let pipeline = Pipeline::new(agents::travel_crew(), executor, config.retry_policy()?)?.with_metrics(metrics);
    info!(
        model = %config.model_id,
        retry_budget = config.retry_budget,
        "Travel pipeline ready with {} steps",
        pipeline.steps().len()
    );

    // Build API routes
    let state = api::AppState::new(pipeline, config.plans_per_minute()?);
    let api_routes = api::routes(state)
        .with(warp::log("api"))
        .with(middleware::cors());

    // Metrics route
    let metrics = warp::path("metrics")
        .and(warp::get())
        .map(|| {
            use prometheus::{Encoder, TextEncoder};
            let encoder = TextEncoder::new();
            let metric_families = prometheus::gather();
            let mut buffer = vec![];
            if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
                warn!("Failed to encode metrics: {}", e);
            }
            warp::reply::with_header(buffer, "Content-Type", encoder.format_type())
        });

    let routes = metrics
        .or(api_routes)
        .recover(error::handle_rejection);

    // Start server
    let addr = ([0, 0, 0, 0], config.port);
    info!("Server listening on {}", addr.1);

    warp::serve(routes)
        .run(addr)
        .await;

    Ok(())
}
