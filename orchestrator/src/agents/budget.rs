// Budget Planner: cost ranges in the traveler's home currency

use super::{attractions, destination, OUTPUT_RULES};
use crate::pipeline::{ContextScope, StepDefinition, ToolId};

pub const NAME: &str = "budget";

pub fn definition() -> StepDefinition {
    StepDefinition::builder(NAME, "Budget Planner")
        .goal("Estimate realistic travel costs based on web data.")
        .backstory(
            "You are a travel budget analyst who estimates realistic daily costs \
             for accommodation, food and local transportation.",
        )
        .prompt(format!(
            "Destination: {{destination}}
Traveler origin: {{start_location}}
Budget preference: {{budget}}
Trip duration: {{days}} days

STRICT RULES:
- Use ONLY ONE currency, the one used at the traveler's origin.
- Make sure the budget aligns with the budget preference ({{budget}}).
- Separate costs into:
  Flights (round-trip estimate)
  Accommodation (per night)
  Food (per day)
  Local transport (per day)
- Provide ranges, NOT exact numbers.
- Do NOT exaggerate.
- Do NOT ask the user questions.
{}",
            OUTPUT_RULES
        ))
        .expected_output("A clean budget breakdown with clear cost ranges.")
        .context(ContextScope::Steps(vec![
            destination::NAME.to_string(),
            attractions::NAME.to_string(),
        ]))
        .tool(ToolId::WebSearch)
        .tool(ToolId::Scrape)
        .search_query("{destination} travel costs per day from {start_location}")
        .build()
}
