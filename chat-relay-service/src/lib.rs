//! Chat relay: streams Gemini chat completions to web clients and echoes
//! client addresses for diagnostics.

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

pub use startup::{build_router, AppState, Application};
