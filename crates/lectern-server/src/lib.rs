pub mod app;
pub mod error;
pub mod meter;
pub mod routes;
pub mod state;
pub mod user_context;
