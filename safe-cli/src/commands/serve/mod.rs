pub mod action;
pub mod args;
pub mod auth;
pub mod handler;
pub mod routes;
pub mod static_files;

pub use args::ServeArgs;
pub use handler::handle_serve;
pub use routes::{AppState, SharedController, router};
