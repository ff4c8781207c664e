//! Chat-completions integration.
//!
//! Typed wrappers for conversation turns, the inference client, and the
//! function-calling schema used for forced tool calls.

/// Inference client and transport types.
pub mod client;
/// Conversation turns, responses, and cost accounting.
pub mod message;
/// Tool schema and declaration helpers.
pub mod tools;
