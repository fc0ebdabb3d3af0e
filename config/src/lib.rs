//! Obscura Configuration
//!
//! Handles loading configuration from:
//! 1. OBSCURA_CONFIG env var (explicit path)
//! 2. ./obscura.toml (current directory)
//! 3. ~/.obscura/config.toml (user home)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};

const LOCAL_CONFIG_FILE_NAME: &str = "obscura.toml";
const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = ".obscura";

// ============================================================================
// Default Constants
// ============================================================================

const DEFAULT_TREE_DEPTH: usize = 20;
const MAX_TREE_DEPTH: usize = 32;
const DEFAULT_LOG_FILTER: &str = "warn";

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObscuraConfig {
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub prover: ProverConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Commitment tree configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Must match the depth the proving keys were generated for
    #[serde(default = "default_tree_depth")]
    pub depth: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_TREE_DEPTH,
        }
    }
}

fn default_tree_depth() -> usize {
    DEFAULT_TREE_DEPTH
}

/// Hash the on-chain verifier binds public inputs with
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptHashToml {
    #[default]
    Keccak256,
    Sha256,
}

impl std::str::FromStr for TranscriptHashToml {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keccak256" | "keccak" => Ok(Self::Keccak256),
            "sha256" => Ok(Self::Sha256),
            other => Err(format!("unknown transcript hash '{other}'")),
        }
    }
}

/// Prover configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProverConfig {
    #[serde(default)]
    pub proving_key_path: Option<PathBuf>,
    #[serde(default)]
    pub verifying_key_path: Option<PathBuf>,
    #[serde(default)]
    pub transcript_hash: TranscriptHashToml,
    #[serde(default)]
    pub deterministic: bool,
    /// Run a publicly seeded setup when no keys are configured. Development only.
    #[serde(default)]
    pub dev_setup: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.into(),
        }
    }
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.into()
}

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Source of override values (the process environment outside tests)
type Vars<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Set field from env var if present
fn env_string(vars: Vars<'_>, key: &str, field: &mut String) {
    if let Some(v) = vars(key) {
        *field = v;
    }
}

/// Set Option<PathBuf> from env var if present
fn env_option_path(vars: Vars<'_>, key: &str, field: &mut Option<PathBuf>) {
    if let Some(v) = vars(key) {
        *field = Some(PathBuf::from(v));
    }
}

/// Set field from env var if present and parseable
fn env_parse<T: std::str::FromStr>(vars: Vars<'_>, key: &str, field: &mut T) {
    if let Some(v) = vars(key) {
        match v.parse() {
            Ok(parsed) => *field = parsed,
            Err(_) => tracing::warn!(key, value = %v, "ignoring unparseable environment override"),
        }
    }
}

/// Check if env var is set to a truthy value ("1" or "true")
fn env_bool(vars: Vars<'_>, key: &str) -> Option<bool> {
    vars(key).map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

// ============================================================================
// Implementation
// ============================================================================

impl ObscuraConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                tracing::info!("Loading config from: {}", path.display());
                Self::parse_file(&path)?
            }
            None => {
                tracing::debug!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &Path) -> Result<Self> {
        tracing::info!("Loading config from: {}", path.display());
        let mut config = Self::parse_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check OBSCURA_CONFIG env var
        if let Ok(path) = env::var("OBSCURA_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
            tracing::warn!("OBSCURA_CONFIG points to missing file {}", path.display());
        }

        // 2. Check ./obscura.toml (current directory)
        let local_path = PathBuf::from(LOCAL_CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        // 3. Check ~/.obscura/config.toml
        Self::default_config_path().filter(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(&|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, vars: Vars<'_>) {
        // Tree
        env_parse(vars, "OBSCURA_TREE_DEPTH", &mut self.tree.depth);

        // Prover
        env_option_path(vars, "OBSCURA_PROVING_KEY", &mut self.prover.proving_key_path);
        env_option_path(vars, "OBSCURA_VERIFYING_KEY", &mut self.prover.verifying_key_path);
        env_parse(
            vars,
            "OBSCURA_TRANSCRIPT_HASH",
            &mut self.prover.transcript_hash,
        );
        if let Some(v) = env_bool(vars, "OBSCURA_DETERMINISTIC") {
            self.prover.deterministic = v;
        }
        if let Some(v) = env_bool(vars, "OBSCURA_DEV_SETUP") {
            self.prover.dev_setup = v;
        }

        // Logging
        env_string(vars, "RUST_LOG", &mut self.logging.filter);
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.tree.depth == 0 || self.tree.depth > MAX_TREE_DEPTH {
            bail!(
                "tree.depth must be between 1 and {MAX_TREE_DEPTH}, got {}",
                self.tree.depth
            );
        }

        match (&self.prover.proving_key_path, &self.prover.verifying_key_path) {
            (Some(_), None) | (None, Some(_)) => {
                bail!("prover.proving_key_path and prover.verifying_key_path must be set together")
            }
            _ => Ok(()),
        }
    }

    /// Whether proving keys are configured
    pub fn has_keys(&self) -> bool {
        self.prover.proving_key_path.is_some() && self.prover.verifying_key_path.is_some()
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        let mut sample = Self::default();
        sample.prover.proving_key_path = Some(PathBuf::from("./keys/proving.key"));
        sample.prover.verifying_key_path = Some(PathBuf::from("./keys/verifying.key"));
        toml::to_string_pretty(&sample).unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================
