// Liveness/readiness probe

pub mod handler;
pub mod routes;

pub use routes::health_routes;
