pub mod config;
pub mod engine;
pub mod library;
pub mod search;
pub mod session;
pub mod ui;
