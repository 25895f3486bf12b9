use std::collections::HashMap;
use tracing::debug;
use porygonbot_common::models::{ChatEvent, RuleKind, RuleMatch};
use crate::utils::RandomSource;
use super::builtin_commands;
use super::message_classifier::ClassifierConfig;

/// Context passed to built-in command handlers.
pub struct CommandContext<'a> {
    pub event: &'a ChatEvent,
    pub config: &'a ClassifierConfig,
    /// Whitespace-separated words after the command name.
    pub args: &'a [&'a str],
    pub rng: &'a mut dyn RandomSource,
}

impl CommandContext<'_> {
    /// The name replies address the chatter by.
    pub fn chatter_name(&self) -> &str {
        &self.event.chatter.name
    }
}

pub type CommandHandler = fn(&mut CommandContext<'_>) -> Option<String>;

/// A parsed `!name args...` line. The name is lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand<'a> {
    pub name: String,
    pub args: Vec<&'a str>,
}

/// Returns `None` unless the trimmed text starts with `prefix` immediately
/// followed by a name.
pub fn parse_command<'a>(prefix: &str, text: &'a str) -> Option<ParsedCommand<'a>> {
    if prefix.is_empty() {
        return None;
    }
    let rest = text.trim().strip_prefix(prefix)?;
    if rest.starts_with(char::is_whitespace) {
        return None;
    }
    let mut parts = rest.split_whitespace();
    let name = parts.next()?.to_lowercase();
    Some(ParsedCommand {
        name,
        args: parts.collect(),
    })
}

/// Static name -> handler table, built once at startup.
pub struct CommandRegistry {
    handlers: HashMap<&'static str, CommandHandler>,
}

impl CommandRegistry {
    pub fn empty() -> Self {
        Self { handlers: HashMap::new() }
    }

    /// All built-in commands.
    pub fn builtin() -> Self {
        let mut reg = Self::empty();
        reg.register("porygonbot", builtin_commands::handle_porygonbot);
        reg.register("lurk", builtin_commands::handle_lurk);
        reg.register("socials", builtin_commands::handle_socials);
        reg.register("discord", builtin_commands::handle_discord);
        reg.register("shinyroll", builtin_commands::handle_shinyroll);
        reg
    }

    pub fn register(&mut self, name: &'static str, handler: CommandHandler) {
        self.handlers.insert(name, handler);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Run the command in `event.text`, if any. Unknown commands are ignored.
    pub fn dispatch(
        &self,
        event: &ChatEvent,
        config: &ClassifierConfig,
        rng: &mut dyn RandomSource,
    ) -> Option<RuleMatch> {
        let parsed = parse_command(&config.prefix, &event.text)?;
        let Some(handler) = self.handlers.get(parsed.name.as_str()) else {
            debug!("Ignoring unknown command '{}' from {}", parsed.name, event.chatter.login);
            return None;
        };

        let mut ctx = CommandContext {
            event,
            config,
            args: &parsed.args,
            rng,
        };
        let reply = handler(&mut ctx);
        Some(match reply {
            Some(text) => RuleMatch::respond(RuleKind::Command, text),
            None => RuleMatch::miss(RuleKind::Command),
        })
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
