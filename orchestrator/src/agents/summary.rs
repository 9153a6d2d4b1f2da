// Trip Summary Generator: one readable overview of everything before it

use super::OUTPUT_RULES;
use crate::pipeline::{ContextScope, StepDefinition};

pub const NAME: &str = "summary";

pub fn definition() -> StepDefinition {
    StepDefinition::builder(NAME, "Trip Summary Generator")
        .goal("Generate a clear and user-friendly summary of the trip plan.")
        .backstory(
            "You specialize in presenting complex travel plans in a clean, \
             easy-to-understand format for travelers.",
        )
        .prompt(format!(
            "Destination: {{destination}}

Your task:
- Summarize the entire trip plan clearly
- Include:
  1. Why this destination fits the user
  2. Key attractions
  3. Budget overview (daily estimate)
  4. Itinerary overview ({{days}} days)
  5. Travel tips (brief)

STRICT RULES:
- Do NOT say \"I can now answer\"
- Do NOT add new information
- Write in clear markdown
- Be concise but complete
{}",
            OUTPUT_RULES
        ))
        .expected_output("A structured final trip summary.")
        .context(ContextScope::AllPrior)
        .build()
}
