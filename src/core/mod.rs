pub mod analytics;
pub mod app;
pub mod builtin_providers;
pub mod chat_stream;
pub mod code_runner;
pub mod config;
pub mod export;
pub mod message;
pub mod personality;
pub mod providers;
pub mod session;
pub mod store;
