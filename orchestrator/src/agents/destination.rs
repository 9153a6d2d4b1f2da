// Destination Researcher: checks how well the chosen destination fits the traveler

use super::OUTPUT_RULES;
use crate::pipeline::{StepDefinition, ToolId};

pub const NAME: &str = "destination";

pub fn definition() -> StepDefinition {
    StepDefinition::builder(NAME, "Destination Researcher")
        .goal("Judge how well the given destination suits the traveler's preferences.")
        .backstory(
            "You are a professional travel researcher who evaluates destinations by season, \
             popularity, crowd levels and traveler preferences.",
        )
        .prompt(format!(
            "Destination: {{destination}}

User preferences:
{{user_preferences}}

Your task:
- Evaluate whether the GIVEN destination matches the user's preferences.
- Consider budget, travel style, crowd levels and trip duration.
- List 2-3 strengths of this destination.
- List 1-2 limitations (if any) and how to manage them.

STRICT RULES:
- DO NOT suggest other destinations.
- DO NOT replace or override the destination.
- The destination provided by the user is FINAL.
{}",
            OUTPUT_RULES
        ))
        .expected_output("A short suitability analysis of the given destination with pros and cons.")
        .tool(ToolId::WebSearch)
        .search_query("{destination} best time to visit travel guide")
        .build()
}
