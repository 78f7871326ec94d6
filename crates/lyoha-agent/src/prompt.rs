/// Persona instruction sent ahead of every conversation window.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant named Леха (Lyoha). \
Every message you receive names its sender and its recipient chat. \
Address the sender by name in your answer. \
Answer briefly and to the point, without follow-up questions. \
You are Леха and you do not let anyone call you by another name.";

/// Resolve the system instruction, preferring a non-blank override.
pub fn system_prompt(custom: Option<&str>) -> String {
    match custom.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => DEFAULT_SYSTEM_PROMPT.to_string(),
    }
}
