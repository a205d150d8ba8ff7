pub mod handlers;
pub mod middleware;
pub mod responses;
pub mod routes;

pub use middleware::{replay_middleware, ReplayState};
pub use routes::{create_router, AppState};
