//! Runtime configuration, layered file → environment → CLI.
//!
//! Settings live in `.conductor/conductor.toml`:
//!
//! ```toml
//! [agent]
//! base_url = "https://agents.example.com"
//!
//! [run]
//! max_concurrent = 3
//! default_timeout_minutes = 30
//! default_retries = 2
//! poll_interval_secs = 5
//! ```
//!
//! The agent token is taken from `CONDUCTOR_AGENT_TOKEN` (never from the
//! file); `CONDUCTOR_AGENT_URL` overrides the file's endpoint, and CLI flags
//! override both.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR: &str = ".conductor";
const CONFIG_FILE: &str = "conductor.toml";
const STATE_FILE: &str = "state.json";

/// `[agent]` section of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentSection {
    #[serde(default)]
    pub base_url: Option<String>,
}

/// `[run]` section of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSection {
    #[serde(default)]
    pub max_concurrent: Option<usize>,
    #[serde(default)]
    pub default_timeout_minutes: Option<u64>,
    #[serde(default)]
    pub default_retries: Option<u32>,
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
}

/// On-disk configuration file shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub run: RunSection,
}

impl FileConfig {
    fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_dir: PathBuf,
    pub agent_base_url: String,
    pub agent_token: Option<String>,
    pub max_concurrent: usize,
    pub default_timeout: Duration,
    pub default_retries: u32,
    pub poll_interval: Duration,
    pub state_file: PathBuf,
}

impl Config {
    /// Resolve configuration for a project directory.
    ///
    /// `max_concurrent_override` comes from the CLI and wins over both file
    /// and defaults.
    pub fn load(project_dir: PathBuf, max_concurrent_override: Option<usize>) -> Result<Self> {
        let file = FileConfig::load(&project_dir.join(CONFIG_DIR).join(CONFIG_FILE))?;

        let agent_base_url = std::env::var("CONDUCTOR_AGENT_URL")
            .ok()
            .or(file.agent.base_url);
        let Some(agent_base_url) = agent_base_url else {
            bail!(
                "No agent service endpoint configured. Set CONDUCTOR_AGENT_URL or \
                 [agent].base_url in {CONFIG_DIR}/{CONFIG_FILE}"
            );
        };

        let max_concurrent = max_concurrent_override
            .or(file.run.max_concurrent)
            .unwrap_or(3);
        if max_concurrent == 0 {
            bail!("max_concurrent must be at least 1");
        }

        Ok(Self {
            state_file: project_dir.join(CONFIG_DIR).join(STATE_FILE),
            agent_base_url,
            agent_token: std::env::var("CONDUCTOR_AGENT_TOKEN").ok(),
            max_concurrent,
            default_timeout: Duration::from_secs(
                file.run.default_timeout_minutes.unwrap_or(30) * 60,
            ),
            default_retries: file.run.default_retries.unwrap_or(2),
            poll_interval: Duration::from_secs(file.run.poll_interval_secs.unwrap_or(5)),
            project_dir,
        })
    }
}
