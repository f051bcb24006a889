//! Configuration management utilities.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::naming::RenameMap;

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".iconforge/config.toml";

pub const ACCESS_TOKEN_VAR: &str = "FIGMA_ACCESS_TOKEN";

/// Largest in-flight limit the dispatch limiter can represent.
pub const MAX_CONCURRENCY: usize = tokio::sync::Semaphore::MAX_PERMITS;

/// Errors that stop a run before any remote work starts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing Figma access token. Set FIGMA_ACCESS_TOKEN in the env.")]
    MissingAccessToken,
    #[error("invalid rename '{0}', expected oldValue:newValue")]
    InvalidRename(String),
    #[error("concurrency must be between 1 and {max}, got {value}")]
    InvalidConcurrency { value: usize, max: usize },
    #[error("invalid value '{value}' for {name}")]
    InvalidEnv { name: &'static str, value: String },
}

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub figma: FigmaSettings,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub variants: VariantSettings,
    #[serde(default)]
    pub format: FormatSettings,
    #[serde(skip)]
    access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FigmaSettings {
    #[serde(default)]
    api_base: Option<String>,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

impl FigmaSettings {
    pub fn api_base(&self) -> &str {
        self.api_base.as_deref().unwrap_or("https://api.figma.com/v1")
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(30)
    }

    pub fn set_api_base(&mut self, base: impl Into<String>) {
        self.api_base = Some(base.into());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SchedulerSettings {
    #[serde(default)]
    concurrency: Option<usize>,
    #[serde(default)]
    delay_ms: Option<u64>,
}

impl SchedulerSettings {
    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or(10)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms.unwrap_or(100))
    }

    pub fn set_concurrency(&mut self, concurrency: usize) {
        self.concurrency = Some(concurrency);
    }

    pub fn set_delay_ms(&mut self, delay_ms: u64) {
        self.delay_ms = Some(delay_ms);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OutputSettings {
    #[serde(default)]
    write_index: Option<bool>,
    #[serde(default)]
    write_storybook: Option<bool>,
    #[serde(default)]
    storybook_title: Option<String>,
    #[serde(default)]
    storybook_grid: Option<String>,
    #[serde(default)]
    current_color: Option<String>,
}

impl OutputSettings {
    pub fn write_index(&self) -> bool {
        self.write_index.unwrap_or(true)
    }

    pub fn write_storybook(&self) -> bool {
        self.write_storybook.unwrap_or(false)
    }

    pub fn storybook_title(&self) -> &str {
        self.storybook_title.as_deref().unwrap_or("Components")
    }

    pub fn storybook_grid(&self) -> &str {
        self.storybook_grid.as_deref().unwrap_or("50px")
    }

    pub fn current_color(&self) -> Option<&str> {
        self.current_color.as_deref()
    }

    pub fn set_write_index(&mut self, value: bool) {
        self.write_index = Some(value);
    }

    pub fn set_write_storybook(&mut self, value: bool) {
        self.write_storybook = Some(value);
    }

    pub fn set_storybook_title(&mut self, value: impl Into<String>) {
        self.storybook_title = Some(value.into());
    }

    pub fn set_storybook_grid(&mut self, value: impl Into<String>) {
        self.storybook_grid = Some(value.into());
    }

    pub fn set_current_color(&mut self, value: impl Into<String>) {
        self.current_color = Some(value.into());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VariantSettings {
    #[serde(default)]
    fail_on_missing: Option<bool>,
    #[serde(default)]
    pub rename: RenameMap,
}

impl VariantSettings {
    pub fn fail_on_missing(&self) -> bool {
        self.fail_on_missing.unwrap_or(false)
    }

    pub fn set_fail_on_missing(&mut self, value: bool) {
        self.fail_on_missing = Some(value);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FormatSettings {
    /// Formatter argv; `{path}` is replaced by the destination file path.
    #[serde(default)]
    pub command: Option<Vec<String>>,
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    access_token: Option<String>,
    concurrency: Option<String>,
    delay_ms: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            access_token: env::var(ACCESS_TOKEN_VAR).ok().filter(|v| !v.trim().is_empty()),
            concurrency: env::var("ICONFORGE_CONCURRENCY").ok(),
            delay_ms: env::var("ICONFORGE_DELAY_MS").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(token: Option<&str>, concurrency: Option<&str>, delay_ms: Option<&str>) -> Self {
        Self {
            access_token: token.map(str::to_owned),
            concurrency: concurrency.map(str::to_owned),
            delay_ms: delay_ms.map(str::to_owned),
        }
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, workspace config, and env overrides.
    pub fn load() -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path()?;
        Self::load_with_layers(global, workspace, env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            layers.push(Self::from_file(&workspace_path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        apply_env_overrides(merged, env_overrides)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data).with_context(|| format!("in {}", path.display()))
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            figma: FigmaSettings {
                api_base: other.figma.api_base.or(self.figma.api_base),
                timeout_secs: other.figma.timeout_secs.or(self.figma.timeout_secs),
            },
            scheduler: SchedulerSettings {
                concurrency: other.scheduler.concurrency.or(self.scheduler.concurrency),
                delay_ms: other.scheduler.delay_ms.or(self.scheduler.delay_ms),
            },
            output: merge_output(self.output, other.output),
            variants: merge_variants(self.variants, other.variants),
            format: FormatSettings {
                command: other.format.command.or(self.format.command),
            },
            access_token: other.access_token.or(self.access_token),
        }
    }

    /// The Figma token, required before any remote call.
    pub fn access_token(&self) -> Result<&str, ConfigError> {
        self.access_token
            .as_deref()
            .ok_or(ConfigError::MissingAccessToken)
    }

    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = Some(token.into());
    }

    /// Check invariants that layering alone cannot guarantee.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let concurrency = self.scheduler.concurrency();
        if !(1..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(ConfigError::InvalidConcurrency {
                value: concurrency,
                max: MAX_CONCURRENCY,
            });
        }
        Ok(())
    }
}

fn merge_output(base: OutputSettings, overlay: OutputSettings) -> OutputSettings {
    OutputSettings {
        write_index: overlay.write_index.or(base.write_index),
        write_storybook: overlay.write_storybook.or(base.write_storybook),
        storybook_title: overlay.storybook_title.or(base.storybook_title),
        storybook_grid: overlay.storybook_grid.or(base.storybook_grid),
        current_color: overlay.current_color.or(base.current_color),
    }
}

fn merge_variants(base: VariantSettings, overlay: VariantSettings) -> VariantSettings {
    let mut rename = base.rename;
    rename.extend(overlay.rename);
    VariantSettings {
        fail_on_missing: overlay.fail_on_missing.or(base.fail_on_missing),
        rename,
    }
}

/// Parse `oldValue:newValue` pairs into a rename map. Later entries win.
pub fn parse_renames<S: AsRef<str>>(entries: &[S]) -> Result<RenameMap, ConfigError> {
    entries
        .iter()
        .map(|entry| {
            let entry = entry.as_ref();
            entry
                .split_once(':')
                .map(|(old, new)| (old.to_owned(), new.to_owned()))
                .ok_or_else(|| ConfigError::InvalidRename(entry.to_owned()))
        })
        .collect()
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("iconforge/config.toml"))
}

fn workspace_config_path() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir()?;
    let root = find_repo_root(&cwd).unwrap_or(cwd);
    Ok(Some(root.join(DEFAULT_WORKSPACE_CONFIG_PATH)))
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Result<Config> {
    if let Some(token) = env.access_token {
        config.access_token = Some(token);
    }
    if let Some(raw) = env.concurrency {
        let value = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            name: "ICONFORGE_CONCURRENCY",
            value: raw.clone(),
        })?;
        config.scheduler.concurrency = Some(value);
    }
    if let Some(raw) = env.delay_ms {
        let value = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            name: "ICONFORGE_DELAY_MS",
            value: raw.clone(),
        })?;
        config.scheduler.delay_ms = Some(value);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_uses_defaults_when_no_files() {
        let config = Config::load_with_layers(None, None, EnvOverrides::default())
            .expect("load default config");
        assert_eq!(config.scheduler.concurrency(), 10);
        assert_eq!(config.scheduler.delay(), Duration::from_millis(100));
        assert_eq!(config.figma.api_base(), "https://api.figma.com/v1");
        assert!(config.output.write_index());
        assert!(!config.output.write_storybook());
        assert_eq!(config.access_token(), Err(ConfigError::MissingAccessToken));
    }

    #[test]
    fn merge_global_and_workspace() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let global = temp.path().join("config.toml");
        fs::write(
            &global,
            r#"
[scheduler]
concurrency = 4
[variants.rename]
On = "true"
Off = "false"
"#,
        )?;

        let workspace_dir = temp.path().join("repo");
        fs::create_dir_all(workspace_dir.join(".iconforge"))?;
        fs::write(
            workspace_dir.join(".iconforge/config.toml"),
            r#"
[output]
write_storybook = true
storybook_title = "Icons"
[variants.rename]
Off = "no"
"#,
        )?;

        let config = Config::load_with_layers(
            Some(global),
            Some(workspace_dir.join(".iconforge/config.toml")),
            EnvOverrides::default(),
        )?;

        assert_eq!(config.scheduler.concurrency(), 4);
        assert_eq!(config.scheduler.delay(), Duration::from_millis(100));
        assert!(config.output.write_storybook());
        assert_eq!(config.output.storybook_title(), "Icons");
        assert_eq!(config.variants.rename.get("On").map(String::as_str), Some("true"));
        assert_eq!(config.variants.rename.get("Off").map(String::as_str), Some("no"));
        Ok(())
    }

    #[test]
    fn env_overrides_take_precedence() -> Result<()> {
        let overrides = EnvOverrides::for_tests(Some("secret"), Some("2"), Some("250"));
        let config = Config::load_with_layers(None, None, overrides)?;
        assert_eq!(config.access_token(), Ok("secret"));
        assert_eq!(config.scheduler.concurrency(), 2);
        assert_eq!(config.scheduler.delay(), Duration::from_millis(250));
        Ok(())
    }

    #[test]
    fn invalid_env_value_is_rejected() {
        let overrides = EnvOverrides::for_tests(None, Some("many"), None);
        assert!(Config::load_with_layers(None, None, overrides).is_err());
    }

    #[test]
    fn invalid_config_returns_error() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let file = temp.path().join("broken.toml");
        fs::write(&file, "this is not toml")?;
        let result = Config::from_file(&file);
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn zero_concurrency_fails_validation() {
        let mut config = Config::default();
        config.scheduler.set_concurrency(0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidConcurrency {
                value: 0,
                max: MAX_CONCURRENCY,
            })
        );
    }

    #[test]
    fn concurrency_above_permit_limit_fails_validation() {
        let mut config = Config::default();
        config.scheduler.set_concurrency(usize::MAX);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConcurrency { value: usize::MAX, .. })
        ));

        config.scheduler.set_concurrency(MAX_CONCURRENCY);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn parses_rename_pairs() {
        let renames = parse_renames(&["On:true", "Lg:Large"]).unwrap();
        assert_eq!(renames.get("On").map(String::as_str), Some("true"));
        assert_eq!(renames.get("Lg").map(String::as_str), Some("Large"));
        assert_eq!(
            parse_renames(&["broken"]),
            Err(ConfigError::InvalidRename("broken".into()))
        );
    }
}
