//! Prompt file helpers.

/// Base system instruction shipped with the binary.
///
/// The personalization block (tone, length, memory notes) is appended to this
/// at request time; see `personalization::build_system_instruction`.
pub const BASE_SYSTEM_PROMPT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/base_system_prompt.md"
));
