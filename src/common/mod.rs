pub mod client;
pub mod logger;
pub mod models;
pub mod sanitize;
