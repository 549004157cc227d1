//! Gemterm is a terminal chat client for the Gemini API.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns runtime state: the conversation store, the per-turn
//!   streaming reducer, and configuration.
//! - [`transport`] implements the two interchangeable delivery strategies
//!   (direct API calls and the relayed byte stream) behind one trait.
//! - [`api`] defines the Gemini and relay wire payloads plus the streaming
//!   SSE client both sides share.
//! - [`relay`] is the server half of proxied mode: an axum endpoint that
//!   forwards one turn to Gemini and streams the reply back as raw bytes.
//! - [`ui`] renders the terminal interface and runs the interactive event
//!   loop.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`cli::run`].

pub mod api;
pub mod cli;
pub mod core;
pub mod logging;
pub mod relay;
pub mod transport;
pub mod ui;
pub mod utils;
