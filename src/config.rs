use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::fs;
use std::time::Duration;
use anyhow::{Context, Result};

/// Central configuration for arctech
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathSettings,
    pub tools: ToolSettings,
    pub display: DisplaySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Registry mapping lookup keys to data file paths
    pub registry_file: PathBuf,
    /// Keys locating the default flag configuration inside the registry
    pub config_keys: Vec<String>,
    /// File the assisted-selection helper writes its flags to
    pub assisted_result: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub scan_binary: String,
    pub interpreter: String,
    pub analysis_script: String,
    pub assistant_script: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub status_interval_secs: u64,
    pub color_enabled: bool,
    /// Appending this phrase after the target skips the mode menu
    pub forced_defaults_phrase: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            registry_file: PathBuf::from("filenames.json"),
            config_keys: vec!["Nmap".to_string(), "config".to_string()],
            assisted_result: PathBuf::from("intermediate_data/selected_nmap_flags.json"),
        }
    }
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            scan_binary: "nmap".to_string(),
            interpreter: "python3".to_string(),
            analysis_script: "Nmap/process_nmap.py".to_string(),
            assistant_script: "Nmap/nmap_wizard.py".to_string(),
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            status_interval_secs: 5,
            color_enabled: true,
            forced_defaults_phrase: "FOR THE REPUBLIC!!!".to_string(),
        }
    }
}

impl DisplaySettings {
    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }
}

impl Settings {
    /// Load settings from an explicit file, the standard config directory, or defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let settings = match explicit {
            Some(path) => Self::load_from(path)?,
            None => {
                let config_path = Self::get_config_path();
                if config_path.exists() {
                    Self::load_from(&config_path)?
                } else {
                    Self::default()
                }
            }
        };

        settings.validate()?;
        Ok(settings)
    }

    fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse settings file {}", path.display()))?;
        Ok(settings)
    }

    /// Get the path to the config file
    pub fn get_config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("arctech");
        path.push("config.json");
        path
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<()> {
        if self.display.status_interval_secs == 0 {
            return Err(anyhow::anyhow!("status_interval_secs must be greater than 0"));
        }

        if self.paths.config_keys.is_empty() {
            return Err(anyhow::anyhow!("config_keys must name at least one key"));
        }

        for (name, value) in [
            ("scan_binary", &self.tools.scan_binary),
            ("interpreter", &self.tools.interpreter),
            ("analysis_script", &self.tools.analysis_script),
            ("assistant_script", &self.tools.assistant_script),
        ] {
            if value.trim().is_empty() {
                return Err(anyhow::anyhow!("{} must not be empty", name));
            }
        }

        Ok(())
    }

    /// Settings rooted in a scratch directory, for tests
    #[cfg(test)]
    pub fn test_settings(root: &Path) -> Self {
        let mut settings = Self::default();
        settings.paths.registry_file = root.join("filenames.json");
        settings.paths.assisted_result = root.join("intermediate_data").join("selected_nmap_flags.json");
        settings.display.color_enabled = false;
        settings.display.status_interval_secs = 3600;
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.tools.scan_binary, "nmap");
        assert_eq!(settings.paths.config_keys, vec!["Nmap", "config"]);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"tools": {"scan_binary": "/usr/local/bin/nmap"}}"#).unwrap();

        let settings = Settings::load(Some(path.as_path())).unwrap();
        assert_eq!(settings.tools.scan_binary, "/usr/local/bin/nmap");
        assert_eq!(settings.tools.interpreter, "python3");
        assert_eq!(settings.display.status_interval_secs, 5);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut settings = Settings::default();
        settings.display.status_interval_secs = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.tools.interpreter = "  ".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(Settings::load(Some(dir.path().join("nope.json").as_path())).is_err());
    }
}
