//! Chat-assistant service integrations.
//!
//! The crate wraps three third-party HTTP services behind typed clients:
//! an image-generation service, a UK weather data provider, and a hosted
//! chat-completions backend with forced tool calls. Each client takes its
//! credentials as an explicit config struct and performs one awaited
//! network call per operation; results come back as strings ready for a
//! chat interface.

/// Chat-completions client, conversation turns, and tool schemas.
pub mod chat;
/// Image-generation client.
pub mod image;
/// Weather directory/forecast client and chat-assisted reporting.
pub mod weather;
