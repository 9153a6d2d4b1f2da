use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::pipeline::AgentSection;

pub const MAX_TRIP_DAYS: i64 = 30;

// API Request/Response models
#[derive(Debug, Clone, Deserialize)]
pub struct TripRequest {
    pub destination: String,
    pub start_location: String,
    pub days: i64,
    pub budget: String,
    pub style: String,
}

#[derive(Debug, Serialize)]
pub struct TripResponse {
    pub result: Vec<AgentSection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BudgetLevel {
    Low,
    Medium,
    High,
    Custom(String),
}

impl BudgetLevel {
    pub fn parse(input: &str) -> Self {
        match input.trim().to_ascii_lowercase().as_str() {
            "low" => BudgetLevel::Low,
            "medium" => BudgetLevel::Medium,
            "high" => BudgetLevel::High,
            _ => BudgetLevel::Custom(input.trim().to_string()),
        }
    }
}

impl fmt::Display for BudgetLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetLevel::Low => f.write_str("Low"),
            BudgetLevel::Medium => f.write_str("Medium"),
            BudgetLevel::High => f.write_str("High"),
            BudgetLevel::Custom(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelStyle {
    Relaxed,
    Balanced,
    Adventure,
}

impl TravelStyle {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "relaxed" => Some(TravelStyle::Relaxed),
            "balanced" => Some(TravelStyle::Balanced),
            "adventure" => Some(TravelStyle::Adventure),
            _ => None,
        }
    }
}

impl fmt::Display for TravelStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TravelStyle::Relaxed => "Relaxed",
            TravelStyle::Balanced => "Balanced",
            TravelStyle::Adventure => "Adventure",
        };
        f.write_str(name)
    }
}

/// A trip request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripPreferences {
    pub destination: String,
    pub start_location: String,
    pub days: u32,
    pub budget: BudgetLevel,
    pub style: TravelStyle,
}

impl TryFrom<TripRequest> for TripPreferences {
    type Error = ApiError;

    fn try_from(request: TripRequest) -> Result<Self, Self::Error> {
        let destination = request.destination.trim().to_string();
        let start_location = request.start_location.trim().to_string();
        if destination.is_empty() || start_location.is_empty() {
            return Err(ApiError::BadRequest(
                "destination and start_location are required".to_string(),
            ));
        }
        if !(1..=MAX_TRIP_DAYS).contains(&request.days) {
            return Err(ApiError::BadRequest(format!(
                "days must be between 1 and {}",
                MAX_TRIP_DAYS
            )));
        }
        if request.budget.trim().is_empty() {
            return Err(ApiError::BadRequest("budget is required".to_string()));
        }
        let style = TravelStyle::parse(&request.style).ok_or_else(|| {
            ApiError::BadRequest("style must be one of Relaxed, Balanced, Adventure".to_string())
        })?;

        Ok(TripPreferences {
            destination,
            start_location,
            days: request.days as u32,
            budget: BudgetLevel::parse(&request.budget),
            style,
        })
    }
}
