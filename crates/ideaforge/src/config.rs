//! Configuration file support for ideaforge.
//!
//! Settings are layered: built-in defaults, then the global config
//! (`<config_dir>/ideaforge/config.toml`), then `ideaforge.toml` in the
//! working directory, then command-line flags.

use anyhow::{bail, Context, Result};
use ideaforge_agent::{RetryPolicy, DEFAULT_TEMPERATURE};
use ideaforge_crew::{ExecutorConfig, RoleKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The project config file name
pub const CONFIG_FILE_NAME: &str = "ideaforge.toml";

/// The global config file, under the platform config directory
pub const GLOBAL_CONFIG_FILE: &str = "ideaforge/config.toml";

pub const DEFAULT_PROMPT: &str = "Generate business ideas related to the implementation of AI";
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// One configuration file. Every key is optional.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Seed prompt for idea generation
    pub prompt: Option<String>,
    /// Default model for every role
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_iterations: Option<usize>,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub creator: RoleConfig,
    #[serde(default)]
    pub refiner: RoleConfig,
    #[serde(default)]
    pub judge: RoleConfig,
    #[serde(default)]
    pub writer: RoleConfig,
}

/// Provider call settings
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    pub retry_attempts: Option<u32>,
    #[serde(default, with = "humantime_serde")]
    pub initial_backoff: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    pub max_backoff: Option<Duration>,
    pub max_tool_rounds: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    pub enabled: Option<bool>,
    pub num_results: Option<usize>,
}

/// Per-role overrides
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RoleConfig {
    pub model: Option<String>,
}

impl RoleConfig {
    fn merge(self, over: RoleConfig) -> RoleConfig {
        RoleConfig {
            model: over.model.or(self.model),
        }
    }
}

impl FileConfig {
    /// Load a config file.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if the file exists and parses
    /// - `Ok(None)` if the file does not exist
    /// - `Err(...)` if the file exists but fails to parse (hard error)
    pub fn load_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let config: FileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(Some(config))
    }

    /// Load `ideaforge.toml` from the working directory
    pub fn load_project(working_dir: &Path) -> Result<Option<Self>> {
        Self::load_file(&working_dir.join(CONFIG_FILE_NAME))
    }

    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(GLOBAL_CONFIG_FILE))
    }

    pub fn load_global() -> Result<Option<Self>> {
        match Self::global_path() {
            Some(path) => Self::load_file(&path),
            None => Ok(None),
        }
    }

    /// Global config overlaid with the project config
    pub fn load_layered(working_dir: &Path) -> Result<Self> {
        let global = Self::load_global()?.unwrap_or_default();
        let project = Self::load_project(working_dir)?.unwrap_or_default();
        Ok(global.merge(project))
    }

    /// Overlay `over` on top of `self`; keys set in `over` win
    pub fn merge(self, over: FileConfig) -> FileConfig {
        FileConfig {
            prompt: over.prompt.or(self.prompt),
            model: over.model.or(self.model),
            temperature: over.temperature.or(self.temperature),
            max_iterations: over.max_iterations.or(self.max_iterations),
            llm: LlmConfig {
                timeout: over.llm.timeout.or(self.llm.timeout),
                retry_attempts: over.llm.retry_attempts.or(self.llm.retry_attempts),
                initial_backoff: over.llm.initial_backoff.or(self.llm.initial_backoff),
                max_backoff: over.llm.max_backoff.or(self.llm.max_backoff),
                max_tool_rounds: over.llm.max_tool_rounds.or(self.llm.max_tool_rounds),
            },
            search: SearchConfig {
                enabled: over.search.enabled.or(self.search.enabled),
                num_results: over.search.num_results.or(self.search.num_results),
            },
            creator: self.creator.merge(over.creator),
            refiner: self.refiner.merge(over.refiner),
            judge: self.judge.merge(over.judge),
            writer: self.writer.merge(over.writer),
        }
    }

    fn role(&self, kind: RoleKind) -> &RoleConfig {
        match kind {
            RoleKind::Creator => &self.creator,
            RoleKind::Refiner => &self.refiner,
            RoleKind::Judge => &self.judge,
            RoleKind::Writer => &self.writer,
        }
    }
}

/// Values given on the command line
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub prompt: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_iterations: Option<usize>,
    pub timeout: Option<Duration>,
    pub no_search: bool,
}

/// Fully resolved settings for a run
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub prompt: String,
    /// Default model; `None` uses the provider's default
    pub model: Option<String>,
    pub temperature: f32,
    pub max_iterations: usize,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub max_tool_rounds: usize,
    pub search_enabled: bool,
    pub search_results: usize,
    role_models: Vec<(RoleKind, String)>,
}

impl Settings {
    pub fn resolve(file: FileConfig, cli: Overrides) -> Result<Self> {
        let defaults = ExecutorConfig::default();

        let temperature = cli
            .temperature
            .or(file.temperature)
            .unwrap_or(DEFAULT_TEMPERATURE);
        if !(0.0..=2.0).contains(&temperature) {
            bail!("temperature must be between 0.0 and 2.0, got {}", temperature);
        }

        let max_iterations = cli
            .max_iterations
            .or(file.max_iterations)
            .unwrap_or(DEFAULT_MAX_ITERATIONS);
        if max_iterations == 0 {
            bail!("max_iterations must be at least 1");
        }

        let timeout = cli
            .timeout
            .or(file.llm.timeout)
            .unwrap_or(defaults.call_timeout);
        if timeout.is_zero() {
            bail!("timeout must be greater than zero");
        }

        let mut retry = defaults.retry;
        if let Some(attempts) = file.llm.retry_attempts {
            retry = retry.with_attempts(attempts);
        }
        retry = retry.with_backoff(
            file.llm.initial_backoff.unwrap_or(retry.initial_backoff),
            file.llm.max_backoff.unwrap_or(retry.max_backoff),
        );

        let role_models = RoleKind::ALL
            .into_iter()
            .filter_map(|kind| file.role(kind).model.clone().map(|m| (kind, m)))
            .collect();

        let prompt = cli
            .prompt
            .or(file.prompt)
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PROMPT.to_string());

        Ok(Self {
            prompt,
            model: cli.model.or(file.model),
            temperature,
            max_iterations,
            timeout,
            retry,
            max_tool_rounds: file.llm.max_tool_rounds.unwrap_or(defaults.max_tool_rounds),
            search_enabled: !cli.no_search && file.search.enabled.unwrap_or(true),
            search_results: file.search.num_results.unwrap_or(5),
            role_models,
        })
    }

    /// Model for a role: its own override, else none (use the default)
    pub fn role_model(&self, kind: RoleKind) -> Option<&str> {
        self.role_models
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, m)| m.as_str())
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            temperature: self.temperature,
            call_timeout: self.timeout,
            retry: self.retry,
            max_tool_rounds: self.max_tool_rounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert_eq!(FileConfig::load_project(dir.path()).unwrap(), None);
    }

    #[test]
    fn test_load_full_config() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
prompt = "Ideas for logistics"
model = "gemini-1.5-pro"
temperature = 0.7
max_iterations = 3

[llm]
timeout = "90s"
retry_attempts = 5
initial_backoff = "500ms"
max_backoff = "10s"
max_tool_rounds = 2

[search]
enabled = false
num_results = 3

[judge]
model = "gemini-1.5-flash"
"#,
        )
        .unwrap();

        let file = FileConfig::load_project(dir.path()).unwrap().unwrap();
        assert_eq!(file.llm.timeout, Some(Duration::from_secs(90)));
        assert_eq!(file.llm.initial_backoff, Some(Duration::from_millis(500)));

        let settings = Settings::resolve(file, Overrides::default()).unwrap();
        assert_eq!(settings.prompt, "Ideas for logistics");
        assert_eq!(settings.max_iterations, 3);
        assert_eq!(settings.retry.max_attempts, 5);
        assert_eq!(settings.retry.max_backoff, Duration::from_secs(10));
        assert_eq!(settings.max_tool_rounds, 2);
        assert!(!settings.search_enabled);
        assert_eq!(settings.search_results, 3);
        assert_eq!(settings.role_model(RoleKind::Judge), Some("gemini-1.5-flash"));
        assert_eq!(settings.role_model(RoleKind::Creator), None);

        let executor = settings.executor_config();
        assert_eq!(executor.call_timeout, Duration::from_secs(90));
        assert!((executor.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_unknown_key_is_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "agent = \"claude\"\n").unwrap();
        assert!(FileConfig::load_project(dir.path()).is_err());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "max_iterations = [").unwrap();
        let err = FileConfig::load_project(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_project_overrides_global() {
        let global: FileConfig = toml::from_str(
            r#"
model = "gemini-1.5-pro"
max_iterations = 10
[writer]
model = "gemini-1.5-flash"
"#,
        )
        .unwrap();
        let project: FileConfig = toml::from_str("max_iterations = 2\n").unwrap();

        let merged = global.merge(project);
        assert_eq!(merged.max_iterations, Some(2));
        assert_eq!(merged.model.as_deref(), Some("gemini-1.5-pro"));
        assert_eq!(merged.writer.model.as_deref(), Some("gemini-1.5-flash"));
    }

    #[test]
    fn test_cli_overrides_files() {
        let file: FileConfig = toml::from_str(
            r#"
prompt = "from file"
max_iterations = 4
[llm]
timeout = "30s"
"#,
        )
        .unwrap();
        let cli = Overrides {
            prompt: Some("from cli".into()),
            max_iterations: Some(1),
            timeout: Some(Duration::from_secs(5)),
            no_search: true,
            ..Default::default()
        };

        let settings = Settings::resolve(file, cli).unwrap();
        assert_eq!(settings.prompt, "from cli");
        assert_eq!(settings.max_iterations, 1);
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert!(!settings.search_enabled);
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(FileConfig::default(), Overrides::default()).unwrap();
        assert_eq!(settings.prompt, DEFAULT_PROMPT);
        assert_eq!(settings.max_iterations, 10);
        assert_eq!(settings.timeout, Duration::from_secs(120));
        assert_eq!(settings.retry, RetryPolicy::default());
        assert!(settings.search_enabled);
        assert_eq!(settings.model, None);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let zero = Overrides {
            max_iterations: Some(0),
            ..Default::default()
        };
        assert!(Settings::resolve(FileConfig::default(), zero).is_err());

        let hot = Overrides {
            temperature: Some(3.5),
            ..Default::default()
        };
        assert!(Settings::resolve(FileConfig::default(), hot).is_err());
    }
}
