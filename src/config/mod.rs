//! Project configuration
//!
//! Settings come from `.claudo/config.toml` in the project directory, then
//! `CLAUDO_*` environment variables, then command-line flags. Every field
//! is optional; unset fields fall back to built-in defaults.

use crate::error::{ClaudoError, ErrorCode};
use crate::subprocess::streaming::{OutputDestination, ParserConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_DIR: &str = ".claudo";
pub const CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_MODEL: &str = "sonnet";
pub const DEFAULT_IMAGE: &str = "claudo-container";

/// Transcript rendering settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParserSettings {
    pub agent_name: Option<String>,
    pub color: Option<bool>,
    pub verbose: Option<bool>,
    pub fallback_to_raw: Option<bool>,
    pub max_text_length: Option<usize>,
    pub output_file: Option<PathBuf>,
    pub stall_threshold_secs: Option<u64>,
    pub health_check_interval_secs: Option<u64>,
    pub max_restarts: Option<u32>,
}

/// Agent launch settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentSettings {
    pub model: Option<String>,
    pub image: Option<String>,
    /// Extra arguments for `claude`, split with shell quoting rules
    pub extra_args: Option<String>,
    pub prompts_dir: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClaudoConfig {
    pub parser: ParserSettings,
    pub agent: AgentSettings,
}

impl ClaudoConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `<project>/.claudo/config.toml` if present, then apply the
    /// environment
    pub fn load(project_dir: &Path) -> Result<Self, ClaudoError> {
        let path = project_dir.join(CONFIG_DIR).join(CONFIG_FILE);
        let mut config = if path.is_file() {
            Self::load_file(&path)?
        } else {
            tracing::trace!("No config file at {}", path.display());
            Self::new()
        };
        config.merge_env_vars();
        Ok(config)
    }

    pub fn load_file(path: &Path) -> Result<Self, ClaudoError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClaudoError::config_with_code(
                ErrorCode::CONFIG_NOT_FOUND,
                format!("cannot read {}", path.display()),
            )
            .with_source(e)
        })?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| e.with_context(path.display()))?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ClaudoError> {
        toml::from_str(content).map_err(|e| {
            ClaudoError::config_with_code(ErrorCode::CONFIG_INVALID_TOML, "invalid config file")
                .with_source(e)
        })
    }

    pub fn merge_env_vars(&mut self) {
        self.merge_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value
    pub fn merge_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("CLAUDO_AGENT_NAME") {
            self.parser.agent_name = Some(name);
        }

        if lookup("CLAUDO_NO_COLOR").is_some_and(|v| is_truthy(&v))
            || lookup("NO_COLOR").is_some_and(|v| !v.is_empty())
        {
            self.parser.color = Some(false);
        }

        if let Some(verbose) = lookup("CLAUDO_VERBOSE_PARSE") {
            self.parser.verbose = Some(is_truthy(&verbose));
        }

        if let Some(max) = lookup("CLAUDO_MAX_TEXT_LENGTH") {
            match max.parse::<usize>() {
                Ok(value) => self.parser.max_text_length = Some(value),
                Err(_) => tracing::warn!("Ignoring CLAUDO_MAX_TEXT_LENGTH={}: not a number", max),
            }
        }

        if let Some(path) = lookup("CLAUDO_OUTPUT_FILE").filter(|p| !p.is_empty()) {
            self.parser.output_file = Some(PathBuf::from(path));
        }

        if let Some(secs) = lookup("CLAUDO_STALL_THRESHOLD_SECS") {
            match secs.parse::<u64>() {
                Ok(value) => self.parser.stall_threshold_secs = Some(value),
                Err(_) => tracing::warn!(
                    "Ignoring CLAUDO_STALL_THRESHOLD_SECS={}: not a number",
                    secs
                ),
            }
        }

        if let Some(model) = lookup("CLAUDO_MODEL") {
            self.agent.model = Some(model);
        }

        if let Some(image) = lookup("CLAUDO_IMAGE") {
            self.agent.image = Some(image);
        }
    }

    pub fn model(&self) -> &str {
        self.agent.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn image(&self) -> &str {
        self.agent.image.as_deref().unwrap_or(DEFAULT_IMAGE)
    }

    /// Extra `claude` arguments, split like a shell would
    pub fn extra_args(&self) -> Result<Vec<String>, ClaudoError> {
        match &self.agent.extra_args {
            None => Ok(Vec::new()),
            Some(raw) => shell_words::split(raw).map_err(|e| {
                ClaudoError::config_with_code(
                    ErrorCode::CONFIG_INVALID_VALUE,
                    format!("agent.extra_args is not valid shell syntax: {}", raw),
                )
                .with_source(e)
            }),
        }
    }

    /// Parser configuration for an agent labelled `agent_name`
    pub fn parser_config(&self, agent_name: Option<&str>) -> ParserConfig {
        let defaults = ParserConfig::default();
        let name = agent_name
            .map(String::from)
            .or_else(|| self.parser.agent_name.clone())
            .unwrap_or(defaults.agent_name.clone());

        let mut config = ParserConfig::new(name)
            .with_verbose_diagnostics(self.parser.verbose.unwrap_or(false))
            .with_fallback_to_raw(self.parser.fallback_to_raw.unwrap_or(true))
            .with_max_text_length(self.parser.max_text_length.unwrap_or(defaults.max_text_length))
            .with_max_restarts(self.parser.max_restarts.unwrap_or(defaults.max_restarts));

        if let Some(color) = self.parser.color {
            config = config.with_color(color);
        }
        if let Some(path) = &self.parser.output_file {
            config = config.with_output(OutputDestination::File(path.clone()));
        }
        if let Some(secs) = self.parser.stall_threshold_secs {
            config = config.with_stall_threshold(Duration::from_secs(secs));
        }
        if let Some(secs) = self.parser.health_check_interval_secs {
            config = config.with_health_check_interval(Duration::from_secs(secs.max(1)));
        }
        config
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
