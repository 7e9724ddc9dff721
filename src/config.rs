use crate::model::DEFAULT_HISTORY_LIMIT;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

#[derive(Debug, Clone)]
pub struct RuntimeConfigSnapshot {
    pub source: Option<String>,
    pub shell: Option<String>,
    pub history_limit: usize,
    /// Context tags keyed by the deterministic context-node id; read-only
    /// from the workspace engine's perspective.
    pub tags: HashMap<String, Vec<String>>,
}

impl Default for RuntimeConfigSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl RuntimeConfigSnapshot {
    fn empty() -> Self {
        Self {
            source: None,
            shell: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            tags: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfigWatcher {
    path: Option<PathBuf>,
    modified: Option<SystemTime>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct MantaConfigFile {
    #[serde(default)]
    shell: Option<String>,
    #[serde(default, alias = "history", alias = "history_size")]
    history_limit: Option<usize>,
    #[serde(default)]
    tags: BTreeMap<String, Vec<String>>,
}

impl RuntimeConfigWatcher {
    pub fn discover() -> Self {
        Self {
            path: discover_config_path(),
            modified: None,
        }
    }

    pub fn load_current(&mut self) -> Result<RuntimeConfigSnapshot> {
        let Some(path) = self.path.clone() else {
            return Ok(RuntimeConfigSnapshot::empty());
        };

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read runtime config {}", path.display()))?;
        let parsed: MantaConfigFile = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse runtime config {}", path.display()))?;
        self.modified = fs::metadata(&path)
            .ok()
            .and_then(|meta| meta.modified().ok());

        Ok(RuntimeConfigSnapshot {
            source: Some(path.display().to_string()),
            shell: parsed.shell,
            history_limit: parsed.history_limit.unwrap_or(DEFAULT_HISTORY_LIMIT).max(1),
            tags: parsed.tags.into_iter().collect(),
        })
    }

    pub fn reload_if_changed(&mut self) -> Result<Option<RuntimeConfigSnapshot>> {
        if self.path.is_none() {
            self.path = discover_config_path();
            if self.path.is_some() {
                return self.load_current().map(Some);
            }
            return Ok(None);
        }

        let current_path = self.path.clone().unwrap_or_default();
        if !current_path.exists() {
            self.path = discover_config_path();
            self.modified = None;
            if self.path.is_some() {
                return self.load_current().map(Some);
            }
            return Ok(Some(RuntimeConfigSnapshot::empty()));
        }

        let modified = fs::metadata(&current_path)
            .ok()
            .and_then(|meta| meta.modified().ok());
        if modified != self.modified {
            return self.load_current().map(Some);
        }

        Ok(None)
    }
}

fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("MANTA_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [
        PathBuf::from("manta.yaml"),
        PathBuf::from("manta.yml"),
        PathBuf::from(".manta.yaml"),
    ];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let user_candidates = [
            PathBuf::from(&home).join(".config/manta/config.yaml"),
            PathBuf::from(&home).join(".config/manta/config.yml"),
            PathBuf::from(&home).join(".manta.yaml"),
        ];
        for candidate in user_candidates {
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::MantaConfigFile;
    use crate::model::DEFAULT_HISTORY_LIMIT;

    #[test]
    fn config_file_parses_shell_history_and_tags() {
        let raw = "shell: /bin/zsh\nhistory_limit: 12\ntags:\n  \"other/-/-/minikube\":\n    - dev\n";
        let parsed: MantaConfigFile = serde_yaml::from_str(raw).unwrap();
        assert_eq!(parsed.shell.as_deref(), Some("/bin/zsh"));
        assert_eq!(parsed.history_limit, Some(12));
        assert_eq!(
            parsed.tags.get("other/-/-/minikube").map(Vec::len),
            Some(1)
        );
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let parsed: MantaConfigFile = serde_yaml::from_str("{}").unwrap();
        assert!(parsed.shell.is_none());
        assert_eq!(
            parsed.history_limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
            DEFAULT_HISTORY_LIMIT
        );
        assert!(parsed.tags.is_empty());
    }
}
