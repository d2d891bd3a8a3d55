//! Configuration file discovery and loading.
//!
//! This module handles finding and loading configuration files from
//! the project directory in the correct priority order.

use crate::config::merger::merge_configs;
use crate::config::schema::WaypostConfig;
use crate::error::{Result, WaypostError};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory holding project configuration.
pub const CONFIG_DIR: &str = ".waypost";

/// Paths to configuration files in priority order (later overrides earlier).
///
/// Merge order:
/// 1. Project config (`.waypost/config.yml`)
/// 2. Local overrides (`.waypost/config.local.yml`)
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Project config: .waypost/config.yml
    pub project: Option<PathBuf>,

    /// Local overrides: .waypost/config.local.yml
    pub project_local: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover config files for the given project root.
    pub fn discover(project_root: &Path) -> Self {
        Self {
            project: existing(project_root.join(CONFIG_DIR).join("config.yml")),
            project_local: existing(project_root.join(CONFIG_DIR).join("config.local.yml")),
        }
    }

    /// Returns all existing config paths in merge order.
    pub fn all_existing(&self) -> Vec<&PathBuf> {
        self.project.iter().chain(self.project_local.iter()).collect()
    }

    /// Check if any project config exists.
    pub fn has_project_config(&self) -> bool {
        self.project.is_some()
    }
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    if path.exists() {
        Some(path)
    } else {
        None
    }
}

/// Find the project root by walking up from `start`.
///
/// Looks for:
/// 1. `.waypost` directory (primary indicator)
/// 2. `.git` directory (fallback)
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        if current.join(CONFIG_DIR).is_dir() {
            return Some(current);
        }

        if current.join(".git").exists() {
            return Some(current);
        }

        if !current.pop() {
            return None;
        }
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            WaypostError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            WaypostError::Io(e)
        }
    })
}

/// Load a single config file and parse it into [`WaypostConfig`].
///
/// # Errors
///
/// Returns `ConfigNotFound` if the file doesn't exist.
/// Returns `ConfigParseError` if the YAML is invalid.
pub fn load_config_file(path: &Path) -> Result<WaypostConfig> {
    parse_config(&read(path)?, path)
}

/// Parse YAML content into [`WaypostConfig`].
///
/// An empty document yields the default configuration.
pub fn parse_config(content: &str, source_path: &Path) -> Result<WaypostConfig> {
    if content.trim().is_empty() {
        return Ok(WaypostConfig::default());
    }
    serde_yaml::from_str(content).map_err(|e| WaypostError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load a config file as raw YAML for merging.
pub fn load_config_value(path: &Path) -> Result<serde_yaml::Value> {
    let content = read(path)?;
    if content.trim().is_empty() {
        return Ok(serde_yaml::Value::Mapping(Default::default()));
    }
    serde_yaml::from_str(&content).map_err(|e| WaypostError::ConfigParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load and merge the project config with its local overrides.
///
/// # Errors
///
/// Returns `ConfigNotFound` if no project config exists.
/// Returns `ConfigParseError` if any config file is invalid.
pub fn load_merged_config(project_root: &Path) -> Result<WaypostConfig> {
    let paths = ConfigPaths::discover(project_root);
    let main_path = project_root.join(CONFIG_DIR).join("config.yml");

    if !paths.has_project_config() {
        return Err(WaypostError::ConfigNotFound { path: main_path });
    }

    let configs = paths
        .all_existing()
        .into_iter()
        .map(|p| load_config_value(p))
        .collect::<Result<Vec<_>>>()?;

    let merged = merge_configs(&configs);
    tracing::debug!("Merged {} config file(s)", configs.len());

    serde_yaml::from_value(merged).map_err(|e| WaypostError::ConfigParseError {
        path: main_path,
        message: format!("Failed to parse merged config: {}", e),
    })
}

/// Load config with optional path override.
///
/// If `config_override` is provided, loads only that file without merging.
/// Otherwise, discovers and merges project config files.
pub fn load_config(project_root: &Path, config_override: Option<&Path>) -> Result<WaypostConfig> {
    match config_override {
        Some(path) => load_config_file(path),
        None => load_merged_config(project_root),
    }
}

/// Like [`load_config`], but a project without config gets the defaults.
pub fn load_config_or_default(
    project_root: &Path,
    config_override: Option<&Path>,
) -> Result<WaypostConfig> {
    match load_config(project_root, config_override) {
        Err(WaypostError::ConfigNotFound { .. }) if config_override.is_none() => {
            Ok(WaypostConfig::default())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project(config: &str, local: Option<&str>) -> TempDir {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(CONFIG_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.yml"), config).unwrap();
        if let Some(local) = local {
            fs::write(dir.join("config.local.yml"), local).unwrap();
        }
        temp
    }

    #[test]
    fn discover_finds_project_and_local() {
        let temp = project("app_name: test", Some(""));
        let paths = ConfigPaths::discover(temp.path());
        assert!(paths.has_project_config());
        assert!(paths.project_local.is_some());
        assert_eq!(paths.all_existing().len(), 2);
        assert!(paths.all_existing()[0].ends_with("config.yml"));
    }

    #[test]
    fn discover_returns_none_for_missing_configs() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::discover(temp.path());
        assert!(!paths.has_project_config());
        assert!(paths.all_existing().is_empty());
    }

    #[test]
    fn find_project_root_prefers_waypost_over_git() {
        let temp = TempDir::new().unwrap();
        let subdir = temp.path().join("nested").join("project");
        fs::create_dir_all(subdir.join("deeper")).unwrap();
        fs::create_dir_all(temp.path().join(".git")).unwrap();
        fs::create_dir_all(subdir.join(CONFIG_DIR)).unwrap();

        assert_eq!(find_project_root(&subdir.join("deeper")), Some(subdir));
    }

    #[test]
    fn find_project_root_falls_back_to_git() {
        let temp = TempDir::new().unwrap();
        let subdir = temp.path().join("src");
        fs::create_dir_all(&subdir).unwrap();
        fs::create_dir_all(temp.path().join(".git")).unwrap();

        assert_eq!(find_project_root(&subdir), Some(temp.path().to_path_buf()));
    }

    #[test]
    fn load_config_file_returns_not_found_error() {
        let result = load_config_file(Path::new("/nonexistent/config.yml"));
        assert!(matches!(result, Err(WaypostError::ConfigNotFound { .. })));
    }

    #[test]
    fn parse_config_reports_invalid_yaml() {
        let result = parse_config("settings: [", Path::new("test.yml"));
        assert!(matches!(result, Err(WaypostError::ConfigParseError { .. })));
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config = parse_config("", Path::new("empty.yml")).unwrap();
        assert_eq!(config, WaypostConfig::default());
    }

    #[test]
    fn local_overrides_settings() {
        let temp = project(
            "app_name: Grants\nsettings:\n  dispatch_timeout: 10\n  max_attempts: 5\n",
            Some("settings:\n  dispatch_timeout: 2\n"),
        );
        let config = load_merged_config(temp.path()).unwrap();
        assert_eq!(config.app_name.as_deref(), Some("Grants"));
        assert_eq!(config.settings.dispatch_timeout, 2);
        assert_eq!(config.settings.max_attempts, 5);
    }

    #[test]
    fn empty_local_file_is_ignored() {
        let temp = project("app_name: Grants\n", Some(""));
        let config = load_merged_config(temp.path()).unwrap();
        assert_eq!(config.app_name.as_deref(), Some("Grants"));
    }

    #[test]
    fn merged_config_requires_project_file() {
        let temp = TempDir::new().unwrap();
        let result = load_merged_config(temp.path());
        assert!(matches!(result, Err(WaypostError::ConfigNotFound { .. })));
    }

    #[test]
    fn override_path_skips_merge() {
        let temp = project("app_name: Project\n", None);
        let custom = temp.path().join("custom.yml");
        fs::write(&custom, "app_name: Custom").unwrap();

        let config = load_config(temp.path(), Some(&custom)).unwrap();
        assert_eq!(config.app_name.as_deref(), Some("Custom"));
    }

    #[test]
    fn missing_project_config_defaults_when_allowed() {
        let temp = TempDir::new().unwrap();
        let config = load_config_or_default(temp.path(), None).unwrap();
        assert_eq!(config, WaypostConfig::default());

        let missing = temp.path().join("missing.yml");
        assert!(load_config_or_default(temp.path(), Some(&missing)).is_err());
    }
}
