use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "Notesync";
const APP_NAME: &str = "notesync";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn from_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<SyncConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let default_cfg = SyncConfig::default();
            self.write_default_config(&default_cfg)?;
            return Ok(default_cfg);
        }
        self.load()
    }

    pub fn load(&self) -> Result<SyncConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let cfg: SyncConfig = toml::from_str(&raw).context("parsing config toml")?;
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &SyncConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var("NOTESYNC_CONFIG").ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        Ok(Self {
            config_dir,
            config_file,
        })
    }

    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.config_dir).with_context(|| {
            format!(
                "creating application directory {}",
                self.config_dir.display()
            )
        })?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub auto_save: AutoSaveConfig,
    pub delete_behavior: DeleteBehavior,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_save: AutoSaveConfig::default(),
            delete_behavior: DeleteBehavior::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSaveConfig {
    /// Quiet period after the last edit before the write-back fires.
    pub delay_ms: u64,
    pub enabled: bool,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            delay_ms: 120_000,
            enabled: true,
        }
    }
}

impl AutoSaveConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Delete policy owned by external settings storage and enforced by the
/// backend. Mirrored here so hosts can surface and persist the choice; the
/// cache itself never branches on it — `delete` defers to whatever the
/// backend currently enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeleteBehavior {
    MoveToTrash,
    Permanent,
}

impl Default for DeleteBehavior {
    fn default() -> Self {
        DeleteBehavior::MoveToTrash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_paths(root: &TempDir) -> ConfigPaths {
        let config_dir = root.path().join("config");
        ConfigPaths {
            config_file: config_dir.join("config.toml"),
            config_dir,
        }
    }

    #[test]
    fn first_run_writes_the_default_file_and_reloads() -> Result<()> {
        let temp = TempDir::new()?;
        let loader = ConfigLoader::from_paths(temp_paths(&temp));

        let cfg = loader.load_or_init()?;
        assert!(loader.paths().config_file.exists());
        assert_eq!(cfg.auto_save.delay_ms, 120_000);
        assert!(cfg.auto_save.enabled);
        assert_eq!(cfg.delete_behavior, DeleteBehavior::MoveToTrash);

        let reloaded = loader.load()?;
        assert_eq!(reloaded.auto_save.delay_ms, cfg.auto_save.delay_ms);
        Ok(())
    }

    #[test]
    fn partial_files_fall_back_to_defaults_and_tolerate_unknown_keys() -> Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        paths.ensure_directories()?;
        fs::write(
            &paths.config_file,
            "unknown_knob = true\n\n[auto_save]\ndelay_ms = 5000\n",
        )?;

        let cfg = ConfigLoader::from_paths(paths).load()?;
        assert_eq!(cfg.auto_save.delay_ms, 5_000);
        assert!(cfg.auto_save.enabled, "missing field keeps its default");
        Ok(())
    }

    #[test]
    fn delete_behavior_uses_kebab_case_values() -> Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        paths.ensure_directories()?;
        fs::write(&paths.config_file, "delete_behavior = \"permanent\"\n")?;

        let cfg = ConfigLoader::from_paths(paths).load()?;
        assert_eq!(cfg.delete_behavior, DeleteBehavior::Permanent);
        Ok(())
    }
}
