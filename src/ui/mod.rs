//! Terminal UI layer for interactive chat sessions.

pub mod chat_loop;
