use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptingConfig {
    /// Mission scripts, loaded in order into one interpreter.
    #[serde(default)]
    pub scripts: Vec<PathBuf>,
    /// Mirror script `print`/`debug` output to stdout.
    #[serde(default)]
    pub echo_to_console: bool,
    /// Script output lines kept in memory for the harness and tools.
    #[serde(default = "ScriptingConfig::default_log_capacity")]
    pub log_capacity: usize,
    /// Directory for `script.log`. No file is written when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default = "ScriptingConfig::default_max_call_levels")]
    pub max_call_levels: usize,
    /// Nesting limit for expressions and function bodies. Zero is unlimited.
    #[serde(default = "ScriptingConfig::default_max_expr_depth")]
    pub max_expr_depth: usize,
}

impl ScriptingConfig {
    const fn default_log_capacity() -> usize {
        256
    }

    const fn default_max_call_levels() -> usize {
        64
    }

    const fn default_max_expr_depth() -> usize {
        256
    }
}

impl Default for ScriptingConfig {
    fn default() -> Self {
        Self {
            scripts: Vec::new(),
            echo_to_console: false,
            log_capacity: Self::default_log_capacity(),
            log_dir: None,
            max_call_levels: Self::default_max_call_levels(),
            max_expr_depth: Self::default_max_expr_depth(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Seed for the shared simulation RNG.
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub scripting: ScriptingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchConfigOverrides {
    pub seed: Option<u64>,
    pub log_dir: Option<PathBuf>,
    pub echo_to_console: Option<bool>,
}

impl MatchConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                eprintln!("Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &MatchConfigOverrides) {
        if let Some(seed) = overrides.seed {
            self.seed = seed;
        }
        if let Some(dir) = &overrides.log_dir {
            self.scripting.log_dir = Some(dir.clone());
        }
        if let Some(echo) = overrides.echo_to_console {
            self.scripting.echo_to_console = echo;
        }
    }
}

impl MatchConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.seed.is_none() && self.log_dir.is_none() && self.echo_to_console.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.seed.is_some() {
            fields.push("seed");
        }
        if self.log_dir.is_some() {
            fields.push("log_dir");
        }
        if self.echo_to_console.is_some() {
            fields.push("echo_to_console");
        }
        fields
    }
}
