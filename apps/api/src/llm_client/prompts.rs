// Cross-cutting prompt fragments. Each analysis template lives in
// analysis/prompts.rs and closes with this directive.

/// Closing directive that enforces JSON-only output.
pub const JSON_ONLY_DIRECTIVE: &str = "Respond with ONLY the JSON object. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";
