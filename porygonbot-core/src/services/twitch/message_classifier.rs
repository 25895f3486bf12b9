//! Turns one chat line into the bot's replies.
//!
//! Ambient rules (corruption, keyword mention, lag, greeting) are evaluated
//! first in that fixed order, then command dispatch. Every rule produces at
//! most one reply. Messages from the bot itself produce nothing.

use regex::Regex;
use serde::{Deserialize, Serialize};
use porygonbot_common::models::{ChatEvent, RuleMatch};
use crate::Error;
use crate::utils::RandomSource;
use super::chat_rules;
use super::command_service::CommandRegistry;

/// Texts and knobs of the classifier. Defaults match the live channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub prefix: String,
    pub keyword: String,
    pub socials_url: String,
    pub discord_url: String,
    pub greeting_emote: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            prefix: "!".to_string(),
            keyword: "porygon".to_string(),
            socials_url: "https://itsmejoji.com".to_string(),
            discord_url: "https://discord.gg/N3QAw5ECSq".to_string(),
            greeting_emote: "itsmej18Love".to_string(),
        }
    }
}

pub struct MessageClassifier {
    bot_id: String,
    config: ClassifierConfig,
    commands: CommandRegistry,
    word_splitter: Regex,
}

impl MessageClassifier {
    pub fn new(bot_id: impl Into<String>, config: ClassifierConfig) -> Result<Self, Error> {
        Self::with_commands(bot_id, config, CommandRegistry::builtin())
    }

    pub fn with_commands(
        bot_id: impl Into<String>,
        config: ClassifierConfig,
        commands: CommandRegistry,
    ) -> Result<Self, Error> {
        let word_splitter = Regex::new(r"\W+")
            .map_err(|e| Error::Config(format!("word splitter: {e}")))?;
        Ok(Self {
            bot_id: bot_id.into(),
            config,
            commands,
            word_splitter,
        })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn is_self(&self, event: &ChatEvent) -> bool {
        event.chatter.id == self.bot_id
    }

    /// Evaluate every rule in order. Empty for the bot's own messages.
    pub fn classify(&self, event: &ChatEvent, rng: &mut dyn RandomSource) -> Vec<RuleMatch> {
        if self.is_self(event) {
            return Vec::new();
        }

        let lowered = event.text.to_lowercase();
        let mut matches = vec![
            chat_rules::corruption(event, rng),
            chat_rules::keyword_mention(&lowered, &self.config, rng),
            chat_rules::lag_keyword(&lowered, rng),
            chat_rules::greeting(event, &lowered, &self.word_splitter, &self.config),
        ];
        if let Some(cmd) = self.commands.dispatch(event, &self.config, rng) {
            matches.push(cmd);
        }
        matches
    }

    /// Reply texts in send order.
    pub fn responses(&self, event: &ChatEvent, rng: &mut dyn RandomSource) -> Vec<String> {
        self.classify(event, rng)
            .into_iter()
            .filter_map(|m| m.response_text)
            .collect()
    }
}
