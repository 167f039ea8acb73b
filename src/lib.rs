pub mod chart;
pub mod config;
pub mod credentials;
pub mod error;
pub mod market;
pub mod mentions;
pub mod pages;
pub mod reddit;
pub mod routes;
pub mod session;
pub mod state;
pub mod types;

// Re-export for tests
pub use mentions::{count_mentions, Ticker};
