pub mod api;
pub mod config;
pub mod db;
pub mod fetch;
pub mod identity;
pub mod resolver;

/// Application name for XDG paths
pub const APP_NAME: &str = "songlink";
