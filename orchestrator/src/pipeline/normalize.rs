// Output normalizer: strips reasoning traces from raw model output

/// Marker after which a model states its final answer.
pub const FINAL_ANSWER_MARKER: &str = "Final Answer:";

/// Line prefixes that belong to the model's reasoning trace, not its answer.
pub const RESERVED_PREFIXES: [&str; 4] = ["Thought:", "Action:", "Observation:", "System:"];

/// Extracts the final natural-language answer from raw model output.
///
/// Text after the first `Final Answer:` marker wins outright. Without a
/// marker, every line whose trimmed content starts with a reserved prefix is
/// dropped and the remaining lines are kept in order.
pub fn normalize(raw: &str) -> String {
    if let Some((_, answer)) = raw.split_once(FINAL_ANSWER_MARKER) {
        return answer.trim().to_string();
    }

    raw.lines()
        .filter(|line| !is_reasoning_line(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn is_reasoning_line(line: &str) -> bool {
    let line = line.trim();
    RESERVED_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
}
