//! HTTP API handlers for wops-api

pub mod attendance;
pub mod buffer;
pub mod cargo;
pub mod collectors;
pub mod health;
pub mod login;
pub mod reply;

pub use attendance::attendance_routes;
pub use buffer::buffer_routes;
pub use cargo::cargo_routes;
pub use collectors::collector_routes;
pub use health::health_routes;
pub use login::login_routes;
