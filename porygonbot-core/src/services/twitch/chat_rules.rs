//! Probabilistic and keyword rules that run on every chat line before
//! command dispatch. Each rule yields exactly one `RuleMatch`.

use regex::Regex;
use porygonbot_common::models::{ChatEvent, RuleKind, RuleMatch};
use crate::utils::RandomSource;
use super::message_classifier::ClassifierConfig;

/// Characters a corrupted message is rebuilt from.
pub const GARBLE_ALPHABET: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()_+=-,/?<>:;|\\[]{}";

pub const CORRUPTION_SIDES: u32 = 50;
pub const KEYWORD_SIDES: u32 = 10;
pub const LAG_SIDES: u32 = 10;

pub const LAG_TERMS: [&str; 3] = ["lag", "lagging", "lagged"];

/// Single-word greetings, compared against whole tokens.
pub const GREETING_WORDS: [&str; 7] = ["hello", "hi", "hey", "yo", "sup", "greetings", "howdy"];

/// Multi-word greetings, matched as substrings.
pub const GREETING_PHRASES: [&str; 5] =
    ["good morning", "good afternoon", "good evening", "how are you", "what's up"];

/// Replace every character of `text` with a random member of
/// [`GARBLE_ALPHABET`]. The result has as many characters as the input.
pub fn garble(text: &str, rng: &mut dyn RandomSource) -> String {
    let alphabet: Vec<char> = GARBLE_ALPHABET.chars().collect();
    text.chars()
        .map(|_| alphabet[rng.pick_index(alphabet.len())])
        .collect()
}

/// 1-in-50 on every message, whatever it says.
pub fn corruption(event: &ChatEvent, rng: &mut dyn RandomSource) -> RuleMatch {
    if rng.roll(1, CORRUPTION_SIDES) != 1 {
        return RuleMatch::miss(RuleKind::Corruption);
    }
    let garbled = garble(&event.text, rng);
    RuleMatch::respond(
        RuleKind::Corruption,
        format!(
            "ATTENTION {}! ERROR: Message Integrity Compromised - {}",
            event.chatter.name, garbled
        ),
    )
}

/// The roll only happens when the keyword is present.
pub fn keyword_mention(
    lowered: &str,
    config: &ClassifierConfig,
    rng: &mut dyn RandomSource,
) -> RuleMatch {
    if config.keyword.is_empty() || !lowered.contains(&config.keyword.to_lowercase()) {
        return RuleMatch::miss(RuleKind::KeywordMention);
    }
    if rng.roll(1, KEYWORD_SIDES) == 1 {
        RuleMatch::respond(RuleKind::KeywordMention, "NOTICE: Superior Entity Mentioned!")
    } else {
        RuleMatch::miss(RuleKind::KeywordMention)
    }
}

pub fn lag_keyword(lowered: &str, rng: &mut dyn RandomSource) -> RuleMatch {
    if !LAG_TERMS.iter().any(|t| lowered.contains(t)) {
        return RuleMatch::miss(RuleKind::LagKeyword);
    }
    if rng.roll(1, LAG_SIDES) == 1 {
        RuleMatch::respond(RuleKind::LagKeyword, "ALERT: Lag Detected - Run Diagnostics...")
    } else {
        RuleMatch::miss(RuleKind::LagKeyword)
    }
}

/// True when `lowered` contains a greeting. Single words must be whole
/// tokens after splitting on non-word runs, so "shellout" is not "hello".
pub fn is_greeting(lowered: &str, word_splitter: &Regex) -> bool {
    if GREETING_PHRASES.iter().any(|p| lowered.contains(p)) {
        return true;
    }
    word_splitter
        .split(lowered)
        .any(|tok| GREETING_WORDS.contains(&tok))
}

pub fn greeting(
    event: &ChatEvent,
    lowered: &str,
    word_splitter: &Regex,
    config: &ClassifierConfig,
) -> RuleMatch {
    if !is_greeting(lowered, word_splitter) {
        return RuleMatch::miss(RuleKind::Greeting);
    }
    let mut text = format!(
        "GREETING: Hello {}! Welcome to the stream, hope you enjoy your time here!",
        event.chatter.name
    );
    if !config.greeting_emote.is_empty() {
        text.push(' ');
        text.push_str(&config.greeting_emote);
    }
    RuleMatch::respond(RuleKind::Greeting, text)
}
