pub mod clock;
pub mod commands;
pub mod config;
pub mod endpoint;
pub mod expiry;
pub mod http;
pub mod http_client;
pub mod parameters;
pub mod session;
pub mod token;
pub mod user_info;
