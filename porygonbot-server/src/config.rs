use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use porygonbot_common::models::ActivityRetention;
use porygonbot_core::services::twitch::ClassifierConfig;
use porygonbot_core::Error;

/// Scopes asked for when `/oauth` is hit without `?scopes=`.
pub const DEFAULT_SCOPES: [&str; 4] = ["user:read:chat", "user:write:chat", "user:bot", "channel:bot"];

/// Optional JSON settings file (`--config`). Every key may be left out.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub classifier: ClassifierConfig,
    pub retention: ActivityRetention,
    pub scopes: Vec<String>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierConfig::default(),
            retention: ActivityRetention::default(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FileConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let cfg: FileConfig = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("invalid config {}: {}", path.display(), e)))?;
        if cfg.classifier.prefix.is_empty() {
            return Err(Error::Config("classifier.prefix must not be empty".into()));
        }
        info!("Loaded config from {}", path.display());
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn no_file_means_defaults() {
        let cfg = FileConfig::load(None).unwrap();
        assert_eq!(cfg.classifier.keyword, "porygon");
        assert_eq!(cfg.retention.max_messages_per_user, Some(200));
        assert_eq!(cfg.scopes.len(), 4);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{ "classifier": {{ "prefix": "?" }}, "retention": {{ "max_messages_per_user": 5 }} }}"#
        )
        .unwrap();

        let cfg = FileConfig::load(Some(f.path())).unwrap();
        assert_eq!(cfg.classifier.prefix, "?");
        assert_eq!(cfg.classifier.discord_url, "https://discord.gg/N3QAw5ECSq");
        assert_eq!(cfg.retention.max_messages_per_user, Some(5));
        assert_eq!(cfg.retention.max_redemptions_per_user, Some(50));
        assert!(cfg.scopes.contains(&"channel:bot".to_string()));
    }

    #[test]
    fn bad_json_is_a_config_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "not json").unwrap();
        assert!(matches!(FileConfig::load(Some(f.path())), Err(Error::Config(_))));
    }

    #[test]
    fn empty_prefix_is_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{ "classifier": {{ "prefix": "" }} }}"#).unwrap();
        assert!(matches!(FileConfig::load(Some(f.path())), Err(Error::Config(_))));
    }
}
