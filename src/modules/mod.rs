// Declare all modules
pub mod auth;
pub mod config;
pub mod payment;
pub mod security;
pub mod store;
pub mod utils;

// No re-exports here as they're handled in lib.rs
