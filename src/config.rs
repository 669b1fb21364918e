use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::platform;
use crate::{Error, Result};

pub const CONFIG_FILE_NAME: &str = "launcher.toml";

fn default_java_path() -> PathBuf {
    PathBuf::from("java")
}

fn default_memory_max_mb() -> u32 {
    2048
}

fn default_jvm_args() -> String {
    "-XX:+UseG1GC -XX:+ParallelRefProcEnabled -XX:MaxGCPauseMillis=200".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_launcher_name() -> String {
    platform::PRODUCT_NAME.to_string()
}

fn default_launcher_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LauncherConfig {
    #[serde(default = "platform::default_install_root")]
    pub install_root: PathBuf,
    #[serde(default = "default_java_path")]
    pub java_path: PathBuf,
    #[serde(default = "default_memory_max_mb")]
    pub memory_max_mb: u32,
    #[serde(default = "default_jvm_args")]
    pub jvm_args: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_launcher_name")]
    pub launcher_name: String,
    #[serde(default = "default_launcher_version")]
    pub launcher_version: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            install_root: platform::default_install_root(),
            java_path: default_java_path(),
            memory_max_mb: default_memory_max_mb(),
            jvm_args: default_jvm_args(),
            log_level: default_log_level(),
            launcher_name: default_launcher_name(),
            launcher_version: default_launcher_version(),
        }
    }
}

impl LauncherConfig {
    pub fn with_install_root(install_root: PathBuf) -> Self {
        Self {
            install_root,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.memory_max_mb == 0 {
            return Err(Error::Config("Maximum memory cannot be 0".to_string()));
        }

        if !self.install_root.is_absolute() {
            return Err(Error::Config(
                "Install root must be an absolute path".to_string()
            ));
        }

        Ok(())
    }
}

pub struct ConfigManager {
    config: LauncherConfig,
    config_path: PathBuf,
    dirty: bool,
}

impl ConfigManager {
    pub fn new(config_path: PathBuf) -> Self {
        Self {
            config: LauncherConfig::default(),
            config_path,
            dirty: false,
        }
    }

    /// Manager for the config file that lives inside the default install root.
    pub fn for_default_root() -> Self {
        Self::new(platform::default_install_root().join(CONFIG_FILE_NAME))
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn update<F>(&mut self, setter: F)
    where
        F: FnOnce(&mut LauncherConfig),
    {
        self.dirty = true;
        setter(&mut self.config)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(&self.config)?;
        std::fs::write(&self.config_path, content)?;
        self.dirty = false;

        log::info!("Config saved to {:?}", self.config_path);
        Ok(())
    }

    /// Loads the config file, writing the defaults out when it is missing.
    pub fn load(&mut self) -> Result<()> {
        if !self.load_existing()? {
            self.dirty = true;
            self.save()?;
        }
        Ok(())
    }

    /// Loads the config file if there is one. Touches nothing on disk;
    /// returns false and keeps the defaults when the file is missing.
    pub fn load_existing(&mut self) -> Result<bool> {
        if !self.config_path.exists() {
            log::debug!("No config at {:?}, using defaults", self.config_path);
            return Ok(false);
        }

        let content = std::fs::read_to_string(&self.config_path)?;

        self.config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {:?}: {}", self.config_path, e)))?;

        self.dirty = false;
        log::info!("Config loaded from {:?}", self.config_path);
        Ok(true)
    }

    pub fn into_config(self) -> LauncherConfig {
        self.config
    }
}
