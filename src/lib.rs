pub mod auth;
pub mod commands;
pub mod config;
pub mod core;
pub mod errors;
pub mod handlers;
pub mod init;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod store;

// Re-export commonly used items for convenience
pub use config::ServerConfig;
pub use core::*;
pub use errors::app_error::{AppError, AppResult};
pub use errors::auth_error::{AuthError, AuthResult};
pub use routes::create_app;
pub use state::AppState;
