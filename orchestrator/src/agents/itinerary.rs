// Itinerary Planner: day-by-day plan built from the chosen attractions

use super::{attractions, budget, tips, OUTPUT_RULES};
use crate::pipeline::{ContextScope, StepDefinition};

pub const NAME: &str = "itinerary";

pub fn definition() -> StepDefinition {
    StepDefinition::builder(NAME, "Itinerary Planner")
        .goal("Create a balanced day-by-day travel itinerary.")
        .backstory(
            "You are a professional itinerary planner who organizes trips \
             to balance sightseeing, rest and travel time.",
        )
        .prompt(format!(
            "Destination: {{destination}}
Trip duration: {{days}} days
Travel style: {{style}}

CONTEXT:
- Attractions are already decided (see context below).
- Do NOT add new places.
- Keep daily spending within the budget ranges and follow the travel tips.

TASK:
- Create a COMPLETE itinerary based on the travel style.
- Morning / Afternoon / Evening for EACH day.
- Use at most 2 attractions per day.
- Finish ALL {{days}} days.

OUTPUT FORMAT (MANDATORY):

Day 1:
Morning:
Afternoon:
Evening:

Day 2:
Morning:
Afternoon:
Evening:
{}",
            OUTPUT_RULES
        ))
        .expected_output("A complete day-wise itinerary for all days.")
        .context(ContextScope::Steps(vec![
            attractions::NAME.to_string(),
            budget::NAME.to_string(),
            tips::NAME.to_string(),
        ]))
        .build()
}
