pub mod app;
pub mod config;
pub mod constants;
pub mod message;
pub mod turn;
