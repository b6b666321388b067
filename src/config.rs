use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub samples: SamplesConfig,
    pub performance: PerformanceConfig,
    pub formatter: FormatterConfig,
    pub walker: WalkerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplesConfig {
    pub root: PathBuf,
    #[serde(default = "default_exclude_suffixes")]
    pub exclude_suffixes: Vec<String>,
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    #[serde(default = "default_max_threads")]
    pub max_threads: usize,
    #[serde(default = "default_true")]
    pub parallel: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatterConfig {
    #[serde(default = "default_char_budget")]
    pub char_budget: usize,
    #[serde(default = "default_max_covered_per_type")]
    pub max_covered_per_type: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkerConfig {
    #[serde(default = "default_true")]
    pub cache_parsed_files: bool,
}

fn default_true() -> bool {
    true
}

fn default_exclude_suffixes() -> Vec<String> {
    vec!["_test.rs".to_string()]
}

fn default_exclude_dirs() -> Vec<String> {
    vec!["target".to_string(), "node_modules".to_string()]
}

fn default_max_threads() -> usize {
    num_cpus::get()
}

fn default_char_budget() -> usize {
    12000
}

fn default_max_covered_per_type() -> usize {
    8
}

impl Default for SamplesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            exclude_suffixes: default_exclude_suffixes(),
            exclude_dirs: default_exclude_dirs(),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_threads: default_max_threads(),
            parallel: default_true(),
        }
    }
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            char_budget: default_char_budget(),
            max_covered_per_type: default_max_covered_per_type(),
        }
    }
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            cache_parsed_files: default_true(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        Ok(config)
    }

    pub fn from_samples_root<P: AsRef<std::path::Path>>(samples_root: P) -> Self {
        let mut config = Self::default();
        config.samples.root = samples_root.as_ref().to_path_buf();
        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            samples: SamplesConfig::default(),
            performance: PerformanceConfig::default(),
            formatter: FormatterConfig::default(),
            walker: WalkerConfig::default(),
        }
    }
}
