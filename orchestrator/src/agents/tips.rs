// Travel Tips Expert: practical advice and common mistakes

use super::{budget, destination, OUTPUT_RULES};
use crate::pipeline::{ContextScope, StepDefinition, ToolId};

pub const NAME: &str = "travel_tips";

pub fn definition() -> StepDefinition {
    StepDefinition::builder(NAME, "Travel Tips Expert")
        .goal("Provide practical travel tips and common mistakes to avoid.")
        .backstory(
            "You are an experienced traveler who gathers practical advice \
             from blogs, forums and travel websites.",
        )
        .prompt(format!(
            "Destination: {{destination}}

Your task:
- Use the web research for travel tips and common mistakes.
- Prioritize reputable travel blogs and video descriptions.
- Extract practical advice only.
- Limit output to 5 bullet points.
{}",
            OUTPUT_RULES
        ))
        .expected_output("A list of 5 practical travel tips, each with its source url.")
        .context(ContextScope::Steps(vec![
            destination::NAME.to_string(),
            budget::NAME.to_string(),
        ]))
        .tool(ToolId::WebSearch)
        .tool(ToolId::Scrape)
        .search_query("{destination} travel tips common mistakes")
        .build()
}
