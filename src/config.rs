use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::query::cluster::ClusterParams;

/// Config file looked up next to the hierarchy file.
pub const CONFIG_FILE: &str = "change-story.toml";

/// Configuration loaded from `change-story.toml`.
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ChangeStoryConfig {
    /// Community detection tuning; every field falls back to the engine constants.
    pub clustering: ClusterParams,
}

impl ChangeStoryConfig {
    /// Path of the config file that applies to `hierarchy`: an explicit override, or
    /// `change-story.toml` in the hierarchy file's directory.
    pub fn path_for(hierarchy: &Path, explicit: Option<&Path>) -> PathBuf {
        match explicit {
            Some(path) => path.to_path_buf(),
            None => hierarchy
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(CONFIG_FILE),
        }
    }

    /// Load configuration from `config_path`.
    ///
    /// Returns a default configuration if the file does not exist or cannot be parsed.
    pub fn load(config_path: &Path) -> Self {
        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!(
                        path = %config_path.display(),
                        %err,
                        "failed to parse config; using defaults"
                    );
                    Self::default()
                }
            },
            Err(err) => {
                tracing::warn!(
                    path = %config_path.display(),
                    %err,
                    "failed to read config; using defaults"
                );
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ChangeStoryConfig::load(&dir.path().join(CONFIG_FILE));
        assert_eq!(config, ChangeStoryConfig::default());
        assert_eq!(config.clustering.max_levels, 50);
        assert_eq!(config.clustering.max_local_moves, 20);
        assert_eq!(config.clustering.resolution, 0.3);
    }

    #[test]
    fn test_partial_config_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[clustering]\nseed = 7\nresolution = 1.0\n").unwrap();
        let config = ChangeStoryConfig::load(&path);
        assert_eq!(config.clustering.seed, 7);
        assert_eq!(config.clustering.resolution, 1.0);
        assert_eq!(config.clustering.max_levels, 50);
    }

    #[test]
    fn test_invalid_config_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[clustering\nseed = ").unwrap();
        assert_eq!(ChangeStoryConfig::load(&path), ChangeStoryConfig::default());
    }

    #[test]
    fn test_path_for_prefers_explicit() {
        let hierarchy = Path::new("/reviews/pr-12/hierarchy.json");
        assert_eq!(
            ChangeStoryConfig::path_for(hierarchy, None),
            PathBuf::from("/reviews/pr-12/change-story.toml")
        );
        let explicit = Path::new("/etc/cs.toml");
        assert_eq!(ChangeStoryConfig::path_for(hierarchy, Some(explicit)), explicit);
    }
}
