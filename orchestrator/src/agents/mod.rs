pub mod attractions;
pub mod budget;
pub mod destination;
pub mod itinerary;
pub mod summary;
pub mod tips;

use crate::models::TripPreferences;
use crate::pipeline::{Parameters, StepDefinition};

/// Appended to every travel prompt so the model answers without its reasoning trace.
pub const OUTPUT_RULES: &str = "
IMPORTANT OUTPUT RULES:
- Do NOT include \"Thought\", \"Action\", or reasoning
- Do NOT explain your role
- Output ONLY the final answer
- Do NOT mention websites or tools";

/// The travel crew, in execution order.
pub fn travel_crew() -> Vec<StepDefinition> {
    vec![
        destination::definition(),
        attractions::definition(),
        budget::definition(),
        tips::definition(),
        itinerary::definition(),
        summary::definition(),
    ]
}

pub fn step_names() -> Vec<&'static str> {
    vec![
        destination::NAME,
        attractions::NAME,
        budget::NAME,
        tips::NAME,
        itinerary::NAME,
        summary::NAME,
    ]
}

/// Prompt parameters for one trip.
pub fn trip_parameters(trip: &TripPreferences) -> Parameters {
    let user_preferences = format!(
        "Destination: {}\nStarting location: {}\nTravel style: {}\nBudget: {}\nTrip duration: {} days",
        trip.destination, trip.start_location, trip.style, trip.budget, trip.days
    );

    [
        ("destination", trip.destination.clone()),
        ("start_location", trip.start_location.clone()),
        ("days", trip.days.to_string()),
        ("budget", trip.budget.to_string()),
        ("style", trip.style.to_string()),
        ("user_preferences", user_preferences),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BudgetLevel, TravelStyle};

    fn trip() -> TripPreferences {
        TripPreferences {
            destination: "Lisbon".into(),
            start_location: "Chennai".into(),
            days: 5,
            budget: BudgetLevel::Medium,
            style: TravelStyle::Relaxed,
        }
    }

    #[test]
    fn crew_order_matches_step_names() {
        let names: Vec<_> = travel_crew().iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, step_names());
    }

    #[test]
    fn every_prompt_renders_from_trip_parameters() {
        let params = trip_parameters(&trip());
        let mut prior = Vec::new();
        for step in travel_crew() {
            let prompt = step.render(&params, &prior).unwrap();
            assert!(prompt.contains("Lisbon"), "{} prompt lacks destination", step.name());
            assert!(!prompt.contains("{destination}"));
            assert!(step.render_search_query(&params).is_ok());
            prior.push((step.name().to_string(), format!("{} output", step.name())));
        }
    }

    #[test]
    fn each_step_receives_the_outputs_it_builds_on() {
        let params = trip_parameters(&trip());
        let prior: Vec<_> = step_names()
            .iter()
            .map(|name| (name.to_string(), format!("{} output", name)))
            .collect();
        let expected: [(&str, &[&str]); 6] = [
            (destination::NAME, &[]),
            (attractions::NAME, &[destination::NAME]),
            (budget::NAME, &[destination::NAME, attractions::NAME]),
            (tips::NAME, &[destination::NAME, budget::NAME]),
            (itinerary::NAME, &[attractions::NAME, budget::NAME, tips::NAME]),
            (summary::NAME, &[destination::NAME, attractions::NAME, budget::NAME, tips::NAME, itinerary::NAME]),
        ];

        for (index, (step, (name, deps))) in travel_crew().iter().zip(expected).enumerate() {
            assert_eq!(step.name(), name);
            let prompt = step.render(&params, &prior[..index]).unwrap();
            for (earlier, _) in &prior[..index] {
                let seen = prompt.contains(&format!("### {}\n{} output", earlier, earlier));
                assert_eq!(seen, deps.contains(&earlier.as_str()), "{} context for {}", name, earlier);
            }
            if index > 0 {
                let predecessor = &prior[index - 1].0;
                assert!(prompt.contains(&format!("{} output", predecessor)), "{} lacks its predecessor", name);
            }
        }
    }

    #[test]
    fn itinerary_keeps_the_day_count() {
        let params = trip_parameters(&trip());
        let itinerary = itinerary::definition().render(&params, &[]).unwrap();
        assert!(itinerary.contains("Finish ALL 5 days."));
    }

    #[test]
    fn user_preferences_block() {
        let params = trip_parameters(&trip());
        assert_eq!(
            params["user_preferences"],
            "Destination: Lisbon\nStarting location: Chennai\nTravel style: Relaxed\nBudget: Medium\nTrip duration: 5 days"
        );
    }
}
