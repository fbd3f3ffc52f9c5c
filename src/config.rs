//! Layered configuration for specflow.
//!
//! Settings are read from `.specflow/config.toml` and resolved in this order,
//! later layers winning:
//!
//! 1. built-in defaults
//! 2. user file (`<config dir>/specflow/config.toml`)
//! 3. project file (`.specflow/config.toml`)
//! 4. environment (`SPECFLOW_AGENT_CMD`, `SPECFLOW_MAX_RETRIES`,
//!    `SPECFLOW_TIMEOUT_SECS`, `SPECFLOW_SPECS_DIR`)
//! 5. CLI flags (`--max-retries`, `--timeout`)
//!
//! # Configuration File Format
//!
//! ```toml
//! [agent]
//! command = "claude"
//! args = ["-p", "--dangerously-skip-permissions"]
//! timeout_secs = 0          # 0 = no timeout
//!
//! [workflow]
//! max_retries = 3
//! specs_dir = "specs"
//! state_dir = ".specflow/state"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::agent::ExecOptions;
use crate::init::SPECFLOW_DIR;

pub const CONFIG_FILE: &str = "config.toml";

pub const ENV_AGENT_CMD: &str = "SPECFLOW_AGENT_CMD";
pub const ENV_MAX_RETRIES: &str = "SPECFLOW_MAX_RETRIES";
pub const ENV_TIMEOUT_SECS: &str = "SPECFLOW_TIMEOUT_SECS";
pub const ENV_SPECS_DIR: &str = "SPECFLOW_SPECS_DIR";

/// Retry budgets above this are almost certainly a typo.
const MAX_SANE_RETRIES: u32 = 20;

/// How the external agent is invoked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentSection {
    #[serde(default = "default_command")]
    pub command: String,
    /// Arguments placed before the instruction.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Per-invocation timeout; 0 disables it.
    #[serde(default)]
    pub timeout_secs: u64,
}

fn default_command() -> String {
    "claude".to_string()
}

fn default_args() -> Vec<String> {
    vec!["-p".to_string(), "--dangerously-skip-permissions".to_string()]
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: default_args(),
            timeout_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowSection {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Relative paths are resolved against the project directory.
    #[serde(default = "default_specs_dir")]
    pub specs_dir: String,
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
}

fn default_max_retries() -> u32 {
    3
}

fn default_specs_dir() -> String {
    "specs".to_string()
}

fn default_state_dir() -> String {
    format!("{}/state", SPECFLOW_DIR)
}

impl Default for WorkflowSection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            specs_dir: default_specs_dir(),
            state_dir: default_state_dir(),
        }
    }
}

/// Contents of a `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpecflowToml {
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub workflow: WorkflowSection,
}

impl SpecflowToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config.toml")
    }

    /// Load `.specflow/config.toml` under `specflow_dir`, or defaults if absent.
    pub fn load_or_default(specflow_dir: &Path) -> Result<Self> {
        let config_path = specflow_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Merge the given files in order; missing files are skipped.
    ///
    /// Merging happens key by key, so a later file only overrides the keys
    /// it actually sets.
    pub fn load_layered(paths: &[PathBuf]) -> Result<Self> {
        let mut merged = toml::Table::new();
        for path in paths {
            if !path.exists() {
                continue;
            }
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let layer: toml::Table = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            debug!(path = %path.display(), "config layer loaded");
            merge_tables(&mut merged, layer);
        }
        toml::Value::Table(merged)
            .try_into()
            .context("Invalid configuration values")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.agent.command.trim().is_empty() {
            warnings.push("agent.command is empty; no agent can be invoked".to_string());
        }
        if self.workflow.max_retries > MAX_SANE_RETRIES {
            warnings.push(format!(
                "workflow.max_retries = {} is unusually high (expected at most {})",
                self.workflow.max_retries, MAX_SANE_RETRIES
            ));
        }
        if self.workflow.specs_dir.trim().is_empty() {
            warnings.push("workflow.specs_dir is empty".to_string());
        }
        if self.workflow.state_dir.trim().is_empty() {
            warnings.push("workflow.state_dir is empty".to_string());
        }
        if self.agent.timeout_secs > 0 && self.agent.timeout_secs < 10 {
            warnings.push(format!(
                "agent.timeout_secs = {} is very short; agent sessions usually take minutes",
                self.agent.timeout_secs
            ));
        }

        warnings
    }
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        let toml::Value::Table(incoming) = value else {
            base.insert(key, value);
            continue;
        };
        if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
            merge_tables(existing, incoming);
            continue;
        }
        base.insert(key, toml::Value::Table(incoming));
    }
}

/// User-level config file, if the platform has a config directory.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("specflow").join(CONFIG_FILE))
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_number<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env_var(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = name, value = %raw, "ignoring non-numeric environment override");
            None
        }
    }
}

/// Resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct SpecflowConfig {
    pub project_dir: PathBuf,
    pub specflow_dir: PathBuf,
    /// Merged file layers.
    pub toml: SpecflowToml,
    pub verbose: bool,
    pub cli_max_retries: Option<u32>,
    pub cli_timeout_secs: Option<u64>,
}

impl SpecflowConfig {
    /// Resolve configuration for a project, including the user-level file.
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let mut layers = Vec::new();
        if let Some(user) = user_config_path() {
            layers.push(user);
        }
        layers.push(project_dir.join(SPECFLOW_DIR).join(CONFIG_FILE));
        Self::from_layers(project_dir, &layers)
    }

    /// Resolve configuration from an explicit list of files.
    pub fn from_layers(project_dir: PathBuf, layers: &[PathBuf]) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let specflow_dir = project_dir.join(SPECFLOW_DIR);
        let toml = SpecflowToml::load_layered(layers)?;

        Ok(Self {
            project_dir,
            specflow_dir,
            toml,
            verbose: false,
            cli_max_retries: None,
            cli_timeout_secs: None,
        })
    }

    pub fn with_cli_args(
        project_dir: PathBuf,
        verbose: bool,
        max_retries: Option<u32>,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        let mut config = Self::new(project_dir)?;
        config.verbose = verbose;
        config.cli_max_retries = max_retries;
        config.cli_timeout_secs = timeout_secs;
        Ok(config)
    }

    /// Agent command (env → file).
    pub fn agent_command(&self) -> String {
        env_var(ENV_AGENT_CMD).unwrap_or_else(|| self.toml.agent.command.clone())
    }

    pub fn agent_args(&self) -> &[String] {
        &self.toml.agent.args
    }

    /// Retry budget (CLI → env → file).
    pub fn max_retries(&self) -> u32 {
        self.cli_max_retries
            .or_else(|| env_number(ENV_MAX_RETRIES))
            .unwrap_or(self.toml.workflow.max_retries)
    }

    /// Timeout in seconds (CLI → env → file); 0 means none.
    pub fn timeout_secs(&self) -> u64 {
        self.cli_timeout_secs
            .or_else(|| env_number(ENV_TIMEOUT_SECS))
            .unwrap_or(self.toml.agent.timeout_secs)
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_secs() {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn exec_options(&self) -> ExecOptions {
        ExecOptions {
            timeout: self.timeout(),
            quiet: false,
        }
    }

    /// Directory holding one subdirectory per spec (env → file).
    pub fn specs_dir(&self) -> PathBuf {
        let raw = env_var(ENV_SPECS_DIR).unwrap_or_else(|| self.toml.workflow.specs_dir.clone());
        self.resolve(&raw)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.resolve(&self.toml.workflow.state_dir)
    }

    pub fn config_path(&self) -> PathBuf {
        self.specflow_dir.join(CONFIG_FILE)
    }

    /// Project constitution produced by the constitution stage.
    pub fn constitution_path(&self) -> PathBuf {
        self.specflow_dir.join("memory").join("constitution.yaml")
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }

    fn resolve(&self, raw: &str) -> PathBuf {
        let path = Path::new(raw);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }
}
