mod error;
mod handlers;
mod models;
mod page;
mod render;
mod state;

pub use handlers::run_server;
