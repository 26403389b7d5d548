use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use vigil_common::types::Trigger;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// SQLite file name inside `data_dir`.
    #[serde(default = "default_database_file")]
    pub database_file: String,
    #[serde(default)]
    pub checker: CheckerConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckerConfig {
    #[serde(default = "default_checker_tick_secs")]
    pub tick_secs: u64,
    #[serde(default = "default_checker_max_concurrent")]
    pub max_concurrent: usize,
    /// Raw values older than this are pruned when a trigger is checked.
    #[serde(default = "default_metrics_ttl_secs")]
    pub metrics_ttl_secs: i64,
    /// Step of the series built from raw values.
    #[serde(default = "default_step_secs")]
    pub step_secs: i64,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_checker_tick_secs(),
            max_concurrent: default_checker_max_concurrent(),
            metrics_ttl_secs: default_metrics_ttl_secs(),
            step_secs: default_step_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Address of the Graphite plaintext listener, e.g. `0.0.0.0:2003`.
    /// The listener is disabled when unset.
    #[serde(default)]
    pub listen: Option<String>,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_database_file() -> String {
    "vigil.db".to_string()
}

fn default_checker_tick_secs() -> u64 {
    60
}

fn default_checker_max_concurrent() -> usize {
    8
}

fn default_metrics_ttl_secs() -> i64 {
    3 * 3600
}

fn default_step_secs() -> i64 {
    60
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config '{path}': {e}"))?;
        Self::parse(&content)
    }

    /// Parses and validates a TOML config.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let mut config: Self = toml::from_str(content)?;
        config.validate()?;
        for trigger in &mut config.triggers {
            if trigger.custom_expression().is_none() {
                trigger.expression = None;
            }
            if trigger.patterns.is_empty() {
                trigger.patterns = trigger
                    .targets
                    .iter()
                    .filter(|target| !target.contains('('))
                    .cloned()
                    .collect();
            }
        }
        Ok(config)
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.database_file)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.checker.tick_secs == 0 {
            anyhow::bail!("checker.tick_secs must be greater than 0");
        }
        if self.checker.max_concurrent == 0 {
            anyhow::bail!("checker.max_concurrent must be greater than 0");
        }
        if self.checker.step_secs <= 0 {
            anyhow::bail!("checker.step_secs must be greater than 0");
        }
        let mut ids = std::collections::HashSet::new();
        for trigger in &self.triggers {
            if trigger.targets.is_empty() {
                anyhow::bail!("trigger '{}' has no targets", trigger.id);
            }
            if !ids.insert(trigger.id.as_str()) {
                anyhow::bail!("duplicate trigger id '{}'", trigger.id);
            }
        }
        Ok(())
    }
}
