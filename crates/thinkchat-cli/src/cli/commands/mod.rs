//! CLI command handlers.

pub mod auth;
pub mod chat;
pub mod config;
pub mod exec;
pub mod imagine;
pub mod memory;
pub mod settings;
