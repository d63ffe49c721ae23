//! The HTTP/WebSocket edge for `GameHook` (§6). Kept as a thin shell over
//! `engine::GameHook`: every handler in [`routes`] just calls through to the
//! facade and serializes the result.

pub mod config;
pub mod error;
pub mod routes;

pub use config::GameHookConfig;
pub use routes::{app, AppState};
