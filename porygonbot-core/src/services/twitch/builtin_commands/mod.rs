// File: porygonbot-core/src/services/twitch/builtin_commands/mod.rs
//! Built-in chat commands. Each lives in its own file; the command table in
//! `command_service` maps names onto these handlers.

pub mod info_commands;
pub mod shinyroll_command;

pub use info_commands::{handle_discord, handle_lurk, handle_porygonbot, handle_socials};
pub use shinyroll_command::handle_shinyroll;
