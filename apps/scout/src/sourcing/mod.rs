// Candidate pipeline: criteria extraction, retrieval, filtering, scoring, ranking, write-back.
// All LLM calls go through llm_client and all provider calls through provider.

pub mod adapters;
pub mod boolean_query;
pub mod criteria;
pub mod filtering;
pub mod handlers;
pub mod pipeline;
pub mod profile;
pub mod prompts;
pub mod push;
pub mod ranking;
pub mod scorer;
