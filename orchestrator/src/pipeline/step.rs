// Step definitions: immutable units of pipeline work and their prompt rendering

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use thiserror::Error;

/// Named string parameters supplied by the caller for one run.
pub type Parameters = BTreeMap<String, String>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("missing prompt parameter: {0}")]
    MissingParameter(String),
}

/// Capabilities a step may use while gathering research for its prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolId {
    WebSearch,
    Scrape,
}

/// Which earlier outputs are fed into a step's prompt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ContextScope {
    #[default]
    None,
    AllPrior,
    Steps(Vec<String>),
}

impl ContextScope {
    fn includes(&self, step_name: &str) -> bool {
        match self {
            ContextScope::None => false,
            ContextScope::AllPrior => true,
            ContextScope::Steps(names) => names.iter().any(|name| name == step_name),
        }
    }
}

/// Per-run state owned by the pipeline runner.
///
/// `prior_outputs` only ever grows, one entry per successfully completed step.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    parameters: Parameters,
    prior_outputs: Vec<(String, String)>,
}

impl RunContext {
    pub fn new(parameters: Parameters) -> Self {
        Self {
            parameters,
            prior_outputs: Vec::new(),
        }
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn prior_outputs(&self) -> &[(String, String)] {
        &self.prior_outputs
    }

    pub(crate) fn record(&mut self, step_name: &str, text: &str) {
        self.prior_outputs.push((step_name.to_string(), text.to_string()));
    }
}

/// A named unit of pipeline work. Built once through [`StepDefinition::builder`].
#[derive(Debug, Clone, PartialEq)]
pub struct StepDefinition {
    name: String,
    role: String,
    goal: String,
    backstory: String,
    prompt_template: String,
    expected_output: String,
    tools: BTreeSet<ToolId>,
    context: ContextScope,
    search_query: Option<String>,
}

impl StepDefinition {
    pub fn builder(name: impl Into<String>, role: impl Into<String>) -> StepDefinitionBuilder {
        StepDefinitionBuilder {
            step: StepDefinition {
                name: name.into(),
                role: role.into(),
                goal: String::new(),
                backstory: String::new(),
                prompt_template: String::new(),
                expected_output: String::new(),
                tools: BTreeSet::new(),
                context: ContextScope::None,
                search_query: None,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn uses(&self, tool: ToolId) -> bool {
        self.tools.contains(&tool)
    }

    pub fn context(&self) -> &ContextScope {
        &self.context
    }

    /// System framing sent alongside every prompt of this step.
    pub fn system_prompt(&self) -> String {
        let mut framing = format!("You are {}.", self.role);
        if !self.backstory.is_empty() {
            framing.push(' ');
            framing.push_str(&self.backstory);
        }
        if !self.goal.is_empty() {
            framing.push_str("\nYour personal goal is: ");
            framing.push_str(&self.goal);
        }
        framing
    }

    /// Resolves the prompt for this step.
    ///
    /// Placeholders are `{identifier}`; any other brace sequence is copied
    /// through untouched. Prior outputs selected by the step's context scope
    /// follow in execution order, then the expected-output criteria.
    pub fn render(
        &self,
        parameters: &Parameters,
        prior_outputs: &[(String, String)],
    ) -> Result<String, TemplateError> {
        let mut prompt = substitute(&self.prompt_template, parameters)?
            .trim()
            .to_string();

        let context: Vec<_> = prior_outputs
            .iter()
            .filter(|(name, _)| self.context.includes(name))
            .collect();
        if !context.is_empty() {
            prompt.push_str("\n\nContext from previous steps:");
            for (name, text) in context {
                prompt.push_str(&format!("\n\n### {}\n{}", name, text));
            }
        }

        if !self.expected_output.is_empty() {
            prompt.push_str("\n\nThis is the expected criteria for your final answer: ");
            prompt.push_str(self.expected_output.trim());
        }

        Ok(prompt)
    }

    /// Resolves the web-search query, falling back to the `destination` parameter.
    pub fn render_search_query(&self, parameters: &Parameters) -> Result<Option<String>, TemplateError> {
        match &self.search_query {
            Some(template) => substitute(template, parameters).map(Some),
            None => Ok(parameters.get("destination").cloned()),
        }
    }
}

pub struct StepDefinitionBuilder {
    step: StepDefinition,
}

impl StepDefinitionBuilder {
    pub fn goal(mut self, goal: impl Into<String>) -> Self {
        self.step.goal = goal.into();
        self
    }

    pub fn backstory(mut self, backstory: impl Into<String>) -> Self {
        self.step.backstory = backstory.into();
        self
    }

    pub fn prompt(mut self, template: impl Into<String>) -> Self {
        self.step.prompt_template = template.into();
        self
    }

    pub fn expected_output(mut self, expected: impl Into<String>) -> Self {
        self.step.expected_output = expected.into();
        self
    }

    pub fn tool(mut self, tool: ToolId) -> Self {
        self.step.tools.insert(tool);
        self
    }

    pub fn context(mut self, scope: ContextScope) -> Self {
        self.step.context = scope;
        self
    }

    pub fn search_query(mut self, template: impl Into<String>) -> Self {
        self.step.search_query = Some(template.into());
        self
    }

    pub fn build(self) -> StepDefinition {
        self.step
    }
}

fn substitute(template: &str, parameters: &Parameters) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if is_identifier(&after[..close]) => {
                let key = &after[..close];
                let value = parameters
                    .get(key)
                    .ok_or_else(|| TemplateError::MissingParameter(key.to_string()))?;
                out.push_str(value);
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn params(pairs: &[(&str, &str)]) -> Parameters {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn itinerary_step() -> StepDefinition {
        StepDefinition::builder("itinerary", "Itinerary Planner")
            .prompt("Destination: {destination}\nTrip duration: {days} days")
            .expected_output("A complete day-wise itinerary.")
            .context(ContextScope::Steps(vec!["attractions".into()]))
            .build()
    }

    #[test]
    fn substitutes_parameters() {
        let step = itinerary_step();
        let prompt = step
            .render(&params(&[("destination", "Kyoto"), ("days", "4")]), &[])
            .unwrap();
        assert!(prompt.starts_with("Destination: Kyoto\nTrip duration: 4 days"));
        assert!(prompt.ends_with("expected criteria for your final answer: A complete day-wise itinerary."));
    }

    #[test]
    fn missing_parameter_is_a_template_error() {
        let step = itinerary_step();
        let err = step.render(&params(&[("destination", "Kyoto")]), &[]).unwrap_err();
        assert_eq!(err, TemplateError::MissingParameter("days".into()));
    }

    #[test]
    fn non_identifier_braces_are_literal() {
        let step = StepDefinition::builder("s", "r")
            .prompt("Return JSON like {\"a\": 1} or {} for {destination}")
            .build();
        let prompt = step.render(&params(&[("destination", "Rome")]), &[]).unwrap();
        assert_eq!(prompt, "Return JSON like {\"a\": 1} or {} for Rome");
    }

    #[test]
    fn only_declared_context_is_included() {
        let step = itinerary_step();
        let prior = vec![
            ("destination".to_string(), "Kyoto suits a relaxed trip.".to_string()),
            ("attractions".to_string(), "• Fushimi Inari – torii gates".to_string()),
        ];
        let prompt = step
            .render(&params(&[("destination", "Kyoto"), ("days", "4")]), &prior)
            .unwrap();
        assert!(prompt.contains("### attractions\n• Fushimi Inari – torii gates"));
        assert!(!prompt.contains("relaxed trip"));
    }

    #[test]
    fn all_prior_context_keeps_execution_order() {
        let step = StepDefinition::builder("summary", "Trip Summary Generator")
            .prompt("Summarize {destination}")
            .context(ContextScope::AllPrior)
            .build();
        let prior = vec![
            ("a".to_string(), "first".to_string()),
            ("b".to_string(), "second".to_string()),
        ];
        let prompt = step.render(&params(&[("destination", "Lima")]), &prior).unwrap();
        let first = prompt.find("### a").unwrap();
        let second = prompt.find("### b").unwrap();
        assert!(first < second);
    }

    #[test]
    fn system_prompt_frames_role_and_goal() {
        let step = StepDefinition::builder("budget", "Budget Planner")
            .goal("Estimate realistic travel costs.")
            .backstory("You are a travel budget analyst.")
            .build();
        assert_eq!(
            step.system_prompt(),
            "You are Budget Planner. You are a travel budget analyst.\nYour personal goal is: Estimate realistic travel costs."
        );
    }

    #[test]
    fn search_query_defaults_to_destination() {
        let plain = StepDefinition::builder("s", "r").build();
        let custom = StepDefinition::builder("s", "r")
            .search_query("{destination} travel tips")
            .build();
        let p = params(&[("destination", "Oslo")]);
        assert_eq!(plain.render_search_query(&p).unwrap().as_deref(), Some("Oslo"));
        assert_eq!(
            custom.render_search_query(&p).unwrap().as_deref(),
            Some("Oslo travel tips")
        );
    }

    proptest! {
        #[test]
        fn rendering_is_deterministic(
            destination in "[A-Za-z ]{1,20}",
            days in 1u32..=30,
            prior_text in "[A-Za-z .]{0,40}",
        ) {
            let step = itinerary_step();
            let p = params(&[("destination", &destination), ("days", &days.to_string())]);
            let prior = vec![("attractions".to_string(), prior_text)];
            let first = step.render(&p, &prior).unwrap();
            let second = step.render(&p, &prior).unwrap();
            prop_assert_eq!(first.as_bytes(), second.as_bytes());
        }
    }
}
