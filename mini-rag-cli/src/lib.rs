//! Command-line and HTTP front end for [`mini_rag`].
//!
//! The `mini-rag` binary builds the index once from the given files, then
//! either answers a single question (`ask`) or serves `POST /query` (`serve`).

pub mod app;
pub mod cli;
pub mod server;
pub mod settings;
pub mod telemetry;

pub use server::{AppState, ServerConfig, app_router, run_server};
pub use settings::Settings;
