use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use warp::{Rejection, Reply};

use super::AppState;
use crate::agents;
use crate::error::ApiError;
use crate::models::{TripPreferences, TripRequest, TripResponse};
use crate::pipeline::PipelineReport;

pub async fn handle_plan_trip(request: TripRequest, state: AppState) -> Result<impl Reply, Rejection> {
    let report = run_plan(request, state).await?;
    Ok(warp::reply::json(&TripResponse {
        result: report.sections(),
    }))
}

pub async fn handle_plan_trip_markdown(request: TripRequest, state: AppState) -> Result<impl Reply, Rejection> {
    let report = run_plan(request, state).await?;
    Ok(warp::reply::with_header(
        report.to_markdown(),
        "Content-Type",
        "text/markdown; charset=utf-8",
    ))
}

async fn run_plan(request: TripRequest, state: AppState) -> Result<PipelineReport, Rejection> {
    let trip = TripPreferences::try_from(request).map_err(warp::reject::custom)?;

    if state.limiter.check().is_err() {
        return Err(warp::reject::custom(ApiError::RateLimitExceeded));
    }

    info!(
        "Planning trip to {} from {} ({} days, {} budget, {} style)",
        trip.destination, trip.start_location, trip.days, trip.budget, trip.style
    );

    let parameters = agents::trip_parameters(&trip);
    let cancel = CancellationToken::new();
    // Dropped with the request future when the client goes away.
    let _guard = cancel.clone().drop_guard();
    let pipeline = state.pipeline.clone();

    let report = tokio::spawn(async move { pipeline.run_with_cancel(parameters, &cancel).await })
        .await
        .map_err(|e| {
            error!("Planning task failed: {}", e);
            warp::reject::custom(ApiError::InternalError("planning task failed".to_string()))
        })?;

    if let Some(reason) = report.abort_reason() {
        error!(run_id = %report.run_id, "Trip plan aborted: {}", reason);
        return Err(warp::reject::custom(ApiError::PlanFailed(reason.summary())));
    }

    info!(
        run_id = %report.run_id,
        duration_ms = report.duration().num_milliseconds(),
        "Trip plan ready with {} sections",
        report.sections().len()
    );
    Ok(report)
}
