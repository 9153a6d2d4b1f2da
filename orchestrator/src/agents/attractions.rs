// Attraction Planner: short list of the attractions worth the trip

use super::{destination, OUTPUT_RULES};
use crate::pipeline::{ContextScope, StepDefinition, ToolId};

pub const NAME: &str = "attractions";

pub fn definition() -> StepDefinition {
    StepDefinition::builder(NAME, "Attraction Planner")
        .goal("Find major attractions and activities for a destination.")
        .backstory(
            "You are an expert travel guide who knows the most popular attractions \
             and activities in major tourist destinations.",
        )
        .prompt(format!(
            "Destination: {{destination}}
Travel style: {{style}}

STRICT RULES:
- Output ONLY a list of attractions
- Each attraction must be ONE bullet: Attraction name - 1-line description
- NO website descriptions
- NO meta commentary

Example format:
• Attraction - short description

Limit to 6-8 attractions.
{}",
            OUTPUT_RULES
        ))
        .expected_output("A clean bullet list of attractions with short descriptions.")
        .context(ContextScope::Steps(vec![
            destination::NAME.to_string(),
        ]))
        .tool(ToolId::WebSearch)
        .tool(ToolId::Scrape)
        .search_query("top attractions in {destination}")
        .build()
}
