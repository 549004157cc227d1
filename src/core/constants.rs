//! Shared constants used across the application

/// Model used for every chat turn, in both direct and relayed modes.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Base URL of the Gemini REST API.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default relay base URL when running against a local `gemterm relay`.
pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:3000";

/// System instruction sent with every request, in both modes.
pub const SYSTEM_INSTRUCTION: &str =
    "You are a helpful and friendly chatbot. Your name is Gemini.";

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "API_KEY";

/// Seeded bot greeting when the client starts with a usable configuration.
pub const GREETING_MESSAGE: &str =
    "Hello! I'm your friendly Gemini assistant. How can I help you today?";

/// Seeded bot message when direct mode is configured but no key is present.
pub const API_KEY_MISSING_MESSAGE: &str =
    "Welcome! To use this chatbot in direct mode, please set the API_KEY environment variable.";

/// Shown in place of an empty reply when a stream completes with no text.
pub const EMPTY_RESPONSE_FALLBACK: &str =
    "I'm sorry, I couldn't generate a response. Please try again.";

/// Prefix applied to transport failures surfaced inside the conversation.
pub const ERROR_PREFIX: &str = "Error: ";
