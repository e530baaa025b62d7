//! Core ThinkChat library (auth, chat session, personalization, providers, config).

pub mod auth;
pub mod chat;
pub mod config;
pub mod personalization;
pub mod prompts;
pub mod providers;
pub mod store;
