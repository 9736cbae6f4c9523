//! Axum HTTP server handlers and middleware for the admin API.

pub mod context;
mod handler_admin_clients;
mod handler_admin_dashboard;
mod handler_admin_users;
pub mod middleware_csrf;
pub mod server;
mod utils_json;

pub use context::AppState;
pub use server::build_router;
