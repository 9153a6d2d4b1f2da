use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use warp::{Filter, Rejection, Reply};

use crate::pipeline::Pipeline;

mod plan;

/// Shared by every request: the configured pipeline and the plan rate limiter.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub limiter: Arc<DefaultDirectRateLimiter>,
}

impl AppState {
    pub fn new(pipeline: Pipeline, plans_per_minute: NonZeroU32) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            limiter: Arc::new(RateLimiter::direct(Quota::per_minute(plans_per_minute))),
        }
    }
}

pub fn routes(state: AppState) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let api = warp::path("api");

    let health_route = api
        .and(warp::path("health"))
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!({"status": "ok"})));

    let plan_route = api
        .and(warp::path("plan-trip"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(plan::handle_plan_trip);

    let markdown_route = api
        .and(warp::path("plan-trip"))
        .and(warp::path("markdown"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state))
        .and_then(plan::handle_plan_trip_markdown);

    health_route.or(plan_route).or(markdown_route)
}

fn with_state(
    state: AppState,
) -> impl Filter<Extract = (AppState,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || state.clone())
}
