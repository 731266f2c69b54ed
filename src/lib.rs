pub mod app;
pub mod auth;
pub mod config;
pub mod datastore;
pub mod error;
pub mod logger;
pub mod middleware;
pub mod state;
