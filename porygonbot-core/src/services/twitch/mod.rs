
// File: src/services/twitch/mod.rs


pub mod chat_rules;
pub mod command_service;
pub mod message_classifier;

pub mod builtin_commands;

pub use command_service::CommandRegistry;
pub use message_classifier::{ClassifierConfig, MessageClassifier};
