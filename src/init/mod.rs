//! Initialization of specflow projects.
//!
//! `specflow init` creates the `.specflow/` directory structure and the specs
//! directory in a project:
//!
//! ```text
//! .specflow/
//! ├── config.toml      # Project configuration (defaults)
//! ├── state/           # Retry counters (retry.json)
//! └── memory/          # Project constitution
//! specs/               # One directory per spec (001-feature, ...)
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{CONFIG_FILE, SpecflowToml};

/// The name of the specflow configuration directory.
pub const SPECFLOW_DIR: &str = ".specflow";

/// Result of initializing a specflow project.
#[derive(Debug)]
pub struct InitResult {
    /// Path to the .specflow directory
    pub specflow_dir: PathBuf,
    /// Path to the specs directory
    pub specs_dir: PathBuf,
    /// Whether the directory was newly created (false if it already existed)
    pub created: bool,
}

/// Initialize a specflow project in the given directory.
///
/// Re-running on an initialized project completes any missing parts and
/// never overwrites an existing `config.toml`.
pub fn init_project(project_dir: &Path) -> Result<InitResult> {
    let specflow_dir = project_dir.join(SPECFLOW_DIR);
    let created = !specflow_dir.exists();

    std::fs::create_dir_all(&specflow_dir).with_context(|| {
        format!("Failed to create directory: {}", specflow_dir.display())
    })?;

    let config_path = specflow_dir.join(CONFIG_FILE);
    if !config_path.exists() {
        SpecflowToml::default().save(&config_path)?;
    }
    let toml = SpecflowToml::load(&config_path)?;

    for dir in [
        project_dir.join(&toml.workflow.state_dir),
        specflow_dir.join("memory"),
    ] {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }

    let specs_dir = project_dir.join(&toml.workflow.specs_dir);
    std::fs::create_dir_all(&specs_dir).with_context(|| {
        format!("Failed to create specs directory: {}", specs_dir.display())
    })?;

    info!(dir = %specflow_dir.display(), created, "project initialized");
    Ok(InitResult {
        specflow_dir,
        specs_dir,
        created,
    })
}

/// Check if a project is already initialized with specflow.
pub fn is_initialized(project_dir: &Path) -> bool {
    project_dir.join(SPECFLOW_DIR).exists()
}

/// Get the path to the specflow directory for a project.
pub fn get_specflow_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(SPECFLOW_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_project_creates_structure() {
        let dir = tempdir().unwrap();
        let result = init_project(dir.path()).unwrap();
        assert!(result.created);
        assert_eq!(result.specflow_dir, dir.path().join(".specflow"));
        assert_eq!(result.specs_dir, dir.path().join("specs"));

        assert!(dir.path().join(".specflow/state").is_dir());
        assert!(dir.path().join(".specflow/memory").is_dir());
        assert!(dir.path().join("specs").is_dir());
        assert!(dir.path().join(".specflow/config.toml").is_file());

        let toml = SpecflowToml::load(&dir.path().join(".specflow/config.toml")).unwrap();
        assert_eq!(toml, SpecflowToml::default());
    }

    #[test]
    fn test_init_project_twice_returns_created_false() {
        let dir = tempdir().unwrap();
        assert!(init_project(dir.path()).unwrap().created);
        assert!(!init_project(dir.path()).unwrap().created);
    }

    #[test]
    fn test_init_project_keeps_existing_config() {
        let dir = tempdir().unwrap();
        let specflow_dir = dir.path().join(".specflow");
        std::fs::create_dir_all(&specflow_dir).unwrap();
        std::fs::write(
            specflow_dir.join("config.toml"),
            "[workflow]\nspecs_dir = \"features\"\n",
        )
        .unwrap();

        let result = init_project(dir.path()).unwrap();
        assert!(!result.created);
        assert!(dir.path().join("features").is_dir());
        assert!(!dir.path().join("specs").exists());

        let content = std::fs::read_to_string(specflow_dir.join("config.toml")).unwrap();
        assert!(content.contains("features"));
    }

    #[test]
    fn test_is_initialized() {
        let dir = tempdir().unwrap();
        assert!(!is_initialized(dir.path()));
        init_project(dir.path()).unwrap();
        assert!(is_initialized(dir.path()));
        assert_eq!(get_specflow_dir(dir.path()), dir.path().join(".specflow"));
    }
}
