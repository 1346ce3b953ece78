//! Pipeline configuration: schema, file loading, and validation.

use ballast_core::{Error, Result, RouterConfig, RoutingPolicy, MAX_PAYLOAD_SIZE};
use ballast_consumer::ConsumerConfig;
use ballast_producer::ProducerConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Default configuration file name searched for by the loader.
pub const DEFAULT_CONFIG_FILE: &str = "ballast.toml";

/// Aggregate configuration for a running pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Producer settings
    pub producer: ProducerConfig,

    /// Settings shared by every consumer worker
    pub consumer: ConsumerConfig,

    /// Number of consumer workers in the fleet
    pub consumers: usize,

    /// Routing policy and capacity refresh settings
    pub routing: RouterConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            producer: ProducerConfig::default(),
            consumer: ConsumerConfig::default(),
            consumers: 3,
            routing: RouterConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Check the configuration for values the pipeline cannot run with.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.consumers == 0 {
            return Err(Error::configuration("consumers must be at least 1"));
        }
        if self.producer.send_interval.is_zero() {
            return Err(Error::configuration("producer.send_interval must be non-zero"));
        }
        if self.producer.payload_size == 0 || self.producer.payload_size > MAX_PAYLOAD_SIZE {
            return Err(Error::configuration(format!(
                "producer.payload_size must be in 1..={MAX_PAYLOAD_SIZE}"
            )));
        }
        if self.consumer.processing_duration.is_zero() {
            return Err(Error::configuration("consumer.processing_duration must be non-zero"));
        }
        if self.routing.refresh_interval.is_zero() {
            return Err(Error::configuration("routing.refresh_interval must be non-zero"));
        }
        Ok(())
    }
}

/// Configuration loader layering defaults, an optional TOML file, and
/// `BALLAST_`-prefixed environment overrides.
pub struct ConfigLoader {
    search_paths: Vec<PathBuf>,
    file: Option<PathBuf>,
    env_prefix: String,
}

impl ConfigLoader {
    /// Create a loader with the default search paths.
    #[must_use]
    pub fn new() -> Self {
        Self {
            search_paths: vec![PathBuf::from("."), PathBuf::from("./config")],
            file: None,
            env_prefix: "BALLAST".to_string(),
        }
    }

    /// Add a directory to search for the configuration file.
    #[must_use]
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Load from a specific configuration file instead of searching.
    #[must_use]
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the environment variable prefix.
    #[must_use]
    pub fn with_env_prefix<S: AsRef<str>>(mut self, prefix: S) -> Self {
        self.env_prefix = prefix.as_ref().to_string();
        self
    }

    /// Load configuration from all available sources.
    ///
    /// Order: built-in defaults, then the configuration file if one is found,
    /// then environment overrides; the result is validated before returning.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] on unreadable or invalid input.
    pub fn load(&self) -> Result<PipelineConfig> {
        let mut config = match self.find_config_file() {
            Some(path) => {
                info!(path = %path.display(), "loading configuration file");
                Self::load_file(&path)?
            },
            None => {
                debug!("no configuration file found, using defaults");
                PipelineConfig::default()
            },
        };

        self.apply_env(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(ref file) = self.file {
            return Some(file.clone());
        }
        self.search_paths
            .iter()
            .map(|dir| dir.join(DEFAULT_CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    fn load_file(path: &Path) -> Result<PipelineConfig> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&raw).map_err(|e| Error::configuration(e.to_string()))
    }

    /// Apply `<PREFIX>_*` environment overrides onto the loaded values.
    fn apply_env(&self, config: &mut PipelineConfig) -> Result<()> {
        if let Some(n) = self.env_var_parsed::<usize>("CONSUMERS")? {
            config.consumers = n;
        }
        if let Some(policy) = self.env_var("ROUTING_POLICY") {
            config.routing.policy = policy.parse::<RoutingPolicy>()?;
        }
        if let Some(ms) = self.env_var_parsed::<u64>("SEND_INTERVAL_MS")? {
            config.producer.send_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.env_var_parsed::<u64>("INITIAL_DELAY_MS")? {
            config.producer.initial_delay = Duration::from_millis(ms);
        }
        if let Some(size) = self.env_var_parsed::<usize>("PAYLOAD_SIZE")? {
            config.producer.payload_size = size;
        }
        if let Some(ms) = self.env_var_parsed::<u64>("PROCESSING_DURATION_MS")? {
            config.consumer.processing_duration = Duration::from_millis(ms);
        }
        if let Some(bound) = self.env_var_parsed::<usize>("MAX_BACKLOG")? {
            config.consumer.max_backlog = Some(bound);
        }
        if let Some(ms) = self.env_var_parsed::<u64>("REFRESH_INTERVAL_MS")? {
            config.routing.refresh_interval = Duration::from_millis(ms);
        }
        Ok(())
    }

    fn env_var(&self, name: &str) -> Option<String> {
        env::var(format!("{}_{name}", self.env_prefix)).ok()
    }

    fn env_var_parsed<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>>
    where
        T::Err: std::fmt::Display,
    {
        match self.env_var(name) {
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|e| {
                    Error::configuration(format!("{}_{name}: {e}", self.env_prefix))
                }),
            None => Ok(None),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
