use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;

pub const UNIT_PREFIX_KEY: &str = "MESHESTRA_UNIT_PREFIX";
pub const BUILDER_SUFFIX_KEY: &str = "MESHESTRA_BUILDER_SUFFIX";
pub const RUNTIME_CRATE_KEY: &str = "MESHESTRA_RUNTIME_CRATE";
pub const JOBS_KEY: &str = "MESHESTRA_JOBS";

/// Configuration service
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    /// Snapshot of the process environment.
    pub fn new() -> Self {
        Self::from_pairs(env::vars())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let service = Self::default();
        for (key, value) in pairs {
            service.config.insert(key.into(), value.into());
        }
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }
}

/// Naming and scheduling knobs for a compilation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    /// Prepended to the component name to form the unit name.
    pub unit_prefix: String,
    /// Appended to the unit name to form the builder name.
    pub builder_suffix: String,
    /// Crate path emitted code uses to reach `BuildError`.
    pub runtime_crate: String,
    /// Worker threads for compiling independent components.
    pub jobs: usize,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            unit_prefix: "Wired".to_string(),
            builder_suffix: "Builder".to_string(),
            runtime_crate: "meshestra_compiler".to_string(),
            jobs: num_cpus::get(),
        }
    }
}

impl CompilerOptions {
    pub fn from_env() -> Self {
        Self::from_config(&ConfigService::new())
    }

    pub fn from_config(config: &ConfigService) -> Self {
        let mut options = Self::default();
        if let Some(prefix) = config.get(UNIT_PREFIX_KEY) {
            options.unit_prefix = prefix;
        }
        if let Some(suffix) = config.get(BUILDER_SUFFIX_KEY) {
            options.builder_suffix = suffix;
        }
        if let Some(path) = config.get(RUNTIME_CRATE_KEY) {
            options.runtime_crate = path;
        }
        if let Some(jobs) = config.get(JOBS_KEY) {
            match jobs.trim().parse::<usize>() {
                Ok(n) if n > 0 => options.jobs = n,
                _ => tracing::warn!(
                    "Ignoring {}={:?}, expected a positive integer",
                    JOBS_KEY,
                    jobs
                ),
            }
        }
        options
    }

    pub fn unit_name(&self, component: &str) -> String {
        format!("{}{}", self.unit_prefix, component)
    }

    pub fn builder_name(&self, unit: &str) -> String {
        format!("{}{}", unit, self.builder_suffix)
    }
}
