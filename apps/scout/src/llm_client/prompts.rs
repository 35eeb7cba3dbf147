// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// Closing instruction that enforces JSON-only output. Calls carry a single
/// user message, so this is appended to the prompt body instead of a system prompt.
pub const JSON_ONLY_INSTRUCTION: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT include explanations or apologies.";

/// Role line shared by every recruiting prompt.
pub const RECRUITER_ROLE: &str =
    "You are an expert recruiter sourcing candidates for finance and business roles.";
