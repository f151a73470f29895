pub mod app;
pub mod config;
pub mod error;
pub mod keycloak_handler;
pub mod middleware;
pub mod mirror_handler;
pub mod worker;
