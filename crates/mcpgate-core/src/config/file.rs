//! File-based gateway configuration (YAML)
//!
//! Supports user-level (~/.config/mcpgate/config.yaml) and workspace-level
//! (.config/mcpgate/config.yaml) config.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use super::error::{ConfigError, ConfigResult};
use super::settings::{GatewayConfig, PresetConfig};

/// Config level (user or workspace)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLevel {
    /// User-level config (~/.config/mcpgate/config.yaml)
    User,
    /// Workspace-level config (.config/mcpgate/config.yaml in workspace root)
    Workspace,
}

impl ConfigLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigLevel::User => "user",
            ConfigLevel::Workspace => "workspace",
        }
    }
}

/// One YAML configuration file
///
/// # Example
///
/// ```no_run
/// use mcpgate_core::config::FileConfig;
///
/// let user = FileConfig::user();
/// let workspace = FileConfig::workspace("/path/to/workspace");
/// let config = FileConfig::merge(&user, &workspace)?;
/// # Ok::<(), mcpgate_core::config::ConfigError>(())
/// ```
pub struct FileConfig {
    path: PathBuf,
    level: ConfigLevel,
    cache: RwLock<Option<GatewayConfig>>,
}

impl FileConfig {
    pub fn new(path: impl Into<PathBuf>, level: ConfigLevel) -> Self {
        Self {
            path: path.into(),
            level,
            cache: RwLock::new(None),
        }
    }

    /// User-level config (~/.config/mcpgate/config.yaml)
    pub fn user() -> Self {
        // XDG config directory on Linux, ~/Library/Application Support on macOS
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        Self::new(config_dir.join("mcpgate").join("config.yaml"), ConfigLevel::User)
    }

    /// Workspace-level config (.config/mcpgate/config.yaml)
    pub fn workspace(workspace_root: impl AsRef<Path>) -> Self {
        let path = workspace_root
            .as_ref()
            .join(".config")
            .join("mcpgate")
            .join("config.yaml");
        Self::new(path, ConfigLevel::Workspace)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn level(&self) -> ConfigLevel {
        self.level
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the file, or defaults when it does not exist
    pub fn load(&self) -> ConfigResult<GatewayConfig> {
        if let Some(config) = self.cache.read().as_ref() {
            return Ok(config.clone());
        }
        self.reload()
    }

    /// Re-read from disk, invalidating the cache
    pub fn reload(&self) -> ConfigResult<GatewayConfig> {
        let config = if self.exists() {
            let content = fs::read_to_string(&self.path)?;
            if content.trim().is_empty() {
                GatewayConfig::default()
            } else {
                serde_yaml::from_str(&content)?
            }
        } else {
            GatewayConfig::default()
        };

        *self.cache.write() = Some(config.clone());
        Ok(config)
    }

    pub fn save(&self, config: &GatewayConfig) -> ConfigResult<()> {
        config.validate()?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_yaml::to_string(config)?)?;

        *self.cache.write() = Some(config.clone());
        Ok(())
    }

    pub fn add_preset(&self, preset: PresetConfig) -> ConfigResult<()> {
        let mut config = self.load()?;
        if config.presets.iter().any(|p| p.id == preset.id) {
            return Err(ConfigError::PresetExists(preset.id));
        }
        config.presets.push(preset);
        self.save(&config)
    }

    pub fn remove_preset(&self, id: &str) -> ConfigResult<()> {
        let mut config = self.load()?;
        let original_len = config.presets.len();
        config.presets.retain(|p| p.id != id);

        if config.presets.len() == original_len {
            Err(ConfigError::PresetNotFound(id.to_string()))
        } else {
            self.save(&config)
        }
    }

    /// Create a backup of the current config file
    pub fn backup(&self) -> ConfigResult<Option<PathBuf>> {
        if !self.exists() {
            return Ok(None);
        }
        let backup_path = self.path.with_extension("yaml.backup");
        fs::copy(&self.path, &backup_path)?;
        Ok(Some(backup_path))
    }

    /// Effective configuration from a user file and a workspace file
    ///
    /// Workspace presets replace user presets with the same id (in place)
    /// and new ones are appended. Scalar settings come from the workspace
    /// file when it exists.
    pub fn merge(user: &FileConfig, workspace: &FileConfig) -> ConfigResult<GatewayConfig> {
        let base = user.load()?;
        if !workspace.exists() {
            base.validate()?;
            return Ok(base);
        }

        let overlay = workspace.load()?;
        let mut presets = base.presets;
        for preset in overlay.presets.iter().cloned() {
            match presets.iter_mut().find(|p| p.id == preset.id) {
                Some(existing) => *existing = preset,
                None => presets.push(preset),
            }
        }

        let merged = GatewayConfig { presets, ..overlay };
        merged.validate()?;
        Ok(merged)
    }
}

impl std::fmt::Debug for FileConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfig")
            .field("path", &self.path)
            .field("level", &self.level)
            .field("exists", &self.exists())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::TransportConfig;
    use tempfile::tempdir;

    fn preset(id: &str, url: &str) -> PresetConfig {
        PresetConfig {
            id: id.to_string(),
            name: id.to_uppercase(),
            description: String::new(),
            transport: TransportConfig::sse(url),
            auto_connect: false,
            tags: Vec::new(),
        }
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let file = FileConfig::new(dir.path().join("config.yaml"), ConfigLevel::User);

        assert!(!file.exists());
        assert_eq!(file.load().unwrap(), GatewayConfig::default());
    }

    #[test]
    fn test_add_and_remove_presets_persist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let file = FileConfig::new(&path, ConfigLevel::User);

        file.add_preset(preset("fetch", "http://localhost:7001/sse")).unwrap();
        assert!(file.exists());
        assert!(matches!(
            file.add_preset(preset("fetch", "http://localhost:7002/sse")),
            Err(ConfigError::PresetExists(_))
        ));

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("transport: sse"));
        assert!(content.contains("http://localhost:7001/sse"));

        let reopened = FileConfig::new(&path, ConfigLevel::User);
        assert_eq!(reopened.load().unwrap().presets.len(), 1);

        reopened.remove_preset("fetch").unwrap();
        assert!(matches!(
            reopened.remove_preset("fetch"),
            Err(ConfigError::PresetNotFound(_))
        ));
    }

    #[test]
    fn test_workspace_overrides_user() {
        let dir = tempdir().unwrap();
        let user = FileConfig::new(dir.path().join("user.yaml"), ConfigLevel::User);
        let workspace = FileConfig::workspace(dir.path().join("project"));

        user.save(&GatewayConfig {
            max_iterations: 3,
            presets: vec![preset("a", "http://user-a/sse"), preset("b", "http://user-b/sse")],
            ..Default::default()
        })
        .unwrap();

        // No workspace file: the user file wins outright
        assert_eq!(FileConfig::merge(&user, &workspace).unwrap().max_iterations, 3);

        workspace
            .save(&GatewayConfig {
                max_iterations: 6,
                presets: vec![preset("b", "http://workspace-b/sse"), preset("c", "http://workspace-c/sse")],
                ..Default::default()
            })
            .unwrap();

        let merged = FileConfig::merge(&user, &workspace).unwrap();
        assert_eq!(merged.max_iterations, 6);
        let ids: Vec<&str> = merged.presets.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(merged.presets[1].transport.describe(), "http://workspace-b/sse");
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "presets: [ {id: x, transport: carrier-pigeon} ]").unwrap();

        let file = FileConfig::new(&path, ConfigLevel::Workspace);
        assert!(matches!(file.load(), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let file = FileConfig::new(&path, ConfigLevel::User);

        assert!(file.backup().unwrap().is_none());

        fs::write(&path, "presets: []").unwrap();
        let backup_path = file.backup().unwrap().unwrap();
        assert!(backup_path.exists());
        assert!(backup_path.to_string_lossy().contains("backup"));
    }
}
