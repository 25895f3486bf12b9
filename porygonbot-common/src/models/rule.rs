use std::fmt;

/// Which classifier rule produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Corruption,
    KeywordMention,
    LagKeyword,
    Greeting,
    Command,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RuleKind::Corruption => "corruption",
            RuleKind::KeywordMention => "keyword_mention",
            RuleKind::LagKeyword => "lag_keyword",
            RuleKind::Greeting => "greeting",
            RuleKind::Command => "command",
        };
        f.write_str(s)
    }
}

/// Result of evaluating one rule against one chat event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub rule: RuleKind,
    pub triggered: bool,
    pub response_text: Option<String>,
}

impl RuleMatch {
    pub fn miss(rule: RuleKind) -> Self {
        Self { rule, triggered: false, response_text: None }
    }

    pub fn respond(rule: RuleKind, text: impl Into<String>) -> Self {
        Self { rule, triggered: true, response_text: Some(text.into()) }
    }
}
