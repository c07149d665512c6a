//! Driver profile persistence
//!
//! Save/load/list/delete `DriverConfig` profiles as pretty JSON files in one
//! directory, one `<name>.json` per profile.

use std::path::{Path, PathBuf};

use crate::domain::{DriverConfig, Hc12Error, Hc12Result};

/// Profile that always exists and cannot be deleted
pub const DEFAULT_PROFILE: &str = "Default";

pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    /// Use `dir` for profiles, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Hc12Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| Hc12Error::Config(format!("Failed to create profile dir: {e}")))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save(&self, config: &DriverConfig) -> Hc12Result<()> {
        let path = self.path_for(&config.name)?;
        let json = serde_json::to_string_pretty(config)
            .map_err(|e| Hc12Error::Config(format!("Serialization error: {e}")))?;
        std::fs::write(&path, json)
            .map_err(|e| Hc12Error::Config(format!("Failed to write profile: {e}")))?;
        log::debug!("saved profile to {}", path.display());
        Ok(())
    }

    /// Load a profile. A missing `Default` profile yields the built-in defaults.
    pub fn load(&self, name: &str) -> Hc12Result<DriverConfig> {
        let path = self.path_for(name)?;
        let name = sanitize_name(name)?;
        if name == DEFAULT_PROFILE && !path.exists() {
            return Ok(DriverConfig::default());
        }
        let json = std::fs::read_to_string(&path)
            .map_err(|e| Hc12Error::Config(format!("Failed to read profile '{name}': {e}")))?;
        serde_json::from_str(&json)
            .map_err(|e| Hc12Error::Config(format!("Failed to parse profile '{name}': {e}")))
    }

    pub fn list(&self) -> Hc12Result<Vec<String>> {
        let mut names: Vec<String> = std::fs::read_dir(&self.dir)
            .map_err(|e| Hc12Error::Config(format!("Failed to read profile dir: {e}")))?
            .filter_map(|entry| {
                let path = entry.ok()?.path();
                if path.extension()?.to_str()? == "json" {
                    path.file_stem()?.to_str().map(String::from)
                } else {
                    None
                }
            })
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn delete(&self, name: &str) -> Hc12Result<()> {
        let path = self.path_for(name)?;
        let name = sanitize_name(name)?;
        if name == DEFAULT_PROFILE {
            return Err(Hc12Error::Config(
                "Cannot delete the Default profile".to_string(),
            ));
        }
        if !path.exists() {
            return Err(Hc12Error::Config(format!("Profile '{name}' not found")));
        }
        std::fs::remove_file(&path)
            .map_err(|e| Hc12Error::Config(format!("Failed to delete profile '{name}': {e}")))
    }

    fn path_for(&self, name: &str) -> Hc12Result<PathBuf> {
        let name = sanitize_name(name)?;
        Ok(self.dir.join(format!("{name}.json")))
    }
}

/// Reject names that could escape the profile directory.
fn sanitize_name(name: &str) -> Hc12Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Hc12Error::Config("Profile name cannot be empty".to_string()));
    }
    if trimmed.contains("..") || trimmed.contains('/') || trimmed.contains('\\') {
        return Err(Hc12Error::Config("Invalid profile name".to_string()));
    }
    // Only allow alphanumeric, spaces, hyphens, underscores
    if !trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || c == ' ' || c == '-' || c == '_')
    {
        return Err(Hc12Error::Config(
            "Profile name contains invalid characters".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}
