pub mod handlers;
pub mod server;

pub use handlers::AppState;
pub use server::{body_limit_from_mb, build_router, run_server, ServerConfig};
