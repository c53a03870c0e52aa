pub mod config;
pub mod host;
