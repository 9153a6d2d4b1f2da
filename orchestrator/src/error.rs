use thiserror::Error;
use warp::http::StatusCode;
use warp::{reject::Reject, Rejection, Reply};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Trip plan could not be generated: {0}")]
    PlanFailed(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl Reject for ApiError {}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ApiError::PlanFailed(_) | ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "Bad request",
            ApiError::RateLimitExceeded => "Rate limit exceeded",
            ApiError::PlanFailed(_) | ApiError::InternalError(_) => "Internal server error",
        }
    }
}

fn error_reply(code: StatusCode, error: &str, details: String) -> warp::reply::WithStatus<warp::reply::Json> {
    let json = warp::reply::json(&serde_json::json!({
        "error": error,
        "details": details,
    }));
    warp::reply::with_status(json, code)
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Rejection> {
    if let Some(api_err) = err.find::<ApiError>() {
        return Ok(error_reply(api_err.status(), api_err.label(), api_err.to_string()));
    }

    if let Some(body_err) = err.find::<warp::body::BodyDeserializeError>() {
        return Ok(error_reply(
            StatusCode::BAD_REQUEST,
            "Bad request",
            format!("Invalid request body: {}", body_err),
        ));
    }

    Err(err)
}
