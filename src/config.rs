//! Configuration for kycflow.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (KYCFLOW_HOME, KYCFLOW_REPORTS, WATCHLIST_URL, ...)
//! 2. Config file (.kycflow/config.yaml)
//! 3. Defaults (~/.kycflow)
//!
//! Config file discovery:
//! - Searches current directory and parents for .kycflow/config.yaml
//! - Relative paths in the config file resolve against the .kycflow/ directory
//!
//! API keys are read from the environment only.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub version: Option<String>,
    pub paths: PathsConfig,
    pub extraction: ExtractionSettings,
    pub sources: SourcesConfig,
    pub reasoning: ReasoningSettings,
    pub notifications: EmailSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// State directory (relative to .kycflow/)
    pub home: Option<String>,
    /// Report output directory (relative to .kycflow/)
    pub reports: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub watchlist: WatchlistSettings,
    pub sanctions: SanctionsSettings,
    pub media: MediaSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractionSettings {
    pub url: String,
    /// Lower-case file extensions accepted for submission
    pub allowed_extensions: Vec<String>,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            url: "https://idcheck.nxu.ae/api/id".to_string(),
            allowed_extensions: vec!["jpg".into(), "jpeg".into(), "png".into()],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchlistSettings {
    pub url: String,
    pub min_match: f64,
    pub limit: u32,
}

impl Default for WatchlistSettings {
    fn default() -> Self {
        Self {
            url: "https://watchman.nxu.ae/search".to_string(),
            min_match: 0.85,
            limit: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SanctionsSettings {
    pub url: String,
    /// Results must score strictly above this to be kept
    pub score_threshold: f64,
}

impl Default for SanctionsSettings {
    fn default() -> Self {
        Self {
            url: "https://api.opensanctions.org/match/default".to_string(),
            score_threshold: 0.8,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MediaSettings {
    pub url: String,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            url: "https://api.dilisense.com/v1/media/checkIndividual".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReasoningSettings {
    pub base_url: String,
    pub model: String,
    /// Existing assistant to reuse; one is created on first use when unset
    pub assistant_id: Option<String>,
    pub poll_interval_seconds: u64,
    pub rate_limit_backoff_seconds: u64,
    pub timeout_seconds: u64,
}

impl Default for ReasoningSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            assistant_id: None,
            poll_interval_seconds: 2,
            rate_limit_backoff_seconds: 5,
            timeout_seconds: 600,
        }
    }
}

impl ReasoningSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn rate_limit_backoff(&self) -> Duration {
        Duration::from_secs(self.rate_limit_backoff_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EmailSettings {
    pub sendgrid_url: String,
    pub from_email: Option<String>,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            sendgrid_url: "https://api.sendgrid.com/v3/mail/send".to_string(),
            from_email: None,
        }
    }
}

/// API keys, read from the environment only
#[derive(Clone, Default)]
pub struct Secrets {
    pub idcheck_api_key: Option<String>,
    pub sanctions_api_key: Option<String>,
    pub media_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub sendgrid_api_key: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let set = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Secrets")
            .field("idcheck_api_key", &set(&self.idcheck_api_key))
            .field("sanctions_api_key", &set(&self.sanctions_api_key))
            .field("media_api_key", &set(&self.media_api_key))
            .field("openai_api_key", &set(&self.openai_api_key))
            .field("sendgrid_api_key", &set(&self.sendgrid_api_key))
            .finish()
    }
}

impl Secrets {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        Self {
            idcheck_api_key: lookup("IDCHECK_API_KEY"),
            sanctions_api_key: lookup("SANCTIONS_API_KEY"),
            media_api_key: lookup("MEDIA_API_KEY"),
            openai_api_key: lookup("OPENAI_API_KEY"),
            sendgrid_api_key: lookup("SENDGRID_API_KEY"),
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// Absolute path to kycflow home
    pub home: PathBuf,
    /// Directory reports are written to
    pub reports: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub extraction: ExtractionSettings,
    pub sources: SourcesConfig,
    pub reasoning: ReasoningSettings,
    pub notifications: EmailSettings,
    #[serde(skip)]
    pub secrets: Secrets,
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".kycflow").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Merge file values, environment overrides and defaults
fn resolve(
    file: ConfigFile,
    config_file: Option<PathBuf>,
    default_home: PathBuf,
    lookup: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    let kycflow_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf);

    let from_file = |value: &Option<String>| -> Option<PathBuf> {
        match (value, kycflow_dir.as_deref()) {
            (Some(v), Some(dir)) => Some(resolve_path(dir, v)),
            (Some(v), None) => Some(PathBuf::from(v)),
            _ => None,
        }
    };

    let home = lookup("KYCFLOW_HOME")
        .map(PathBuf::from)
        .or_else(|| from_file(&file.paths.home))
        .unwrap_or(default_home);

    let reports = lookup("KYCFLOW_REPORTS")
        .map(PathBuf::from)
        .or_else(|| from_file(&file.paths.reports))
        .unwrap_or_else(|| home.join("reports"));

    let mut extraction = file.extraction;
    let mut sources = file.sources;
    let mut reasoning = file.reasoning;
    let mut notifications = file.notifications;

    if let Some(url) = lookup("IDCHECK_URL") {
        extraction.url = url;
    }
    if let Some(url) = lookup("WATCHLIST_URL") {
        sources.watchlist.url = url;
    }
    if let Some(url) = lookup("SANCTIONS_URL") {
        sources.sanctions.url = url;
    }
    if let Some(url) = lookup("MEDIA_URL") {
        sources.media.url = url;
    }
    if let Some(id) = lookup("OPENAI_ASSISTANT_ID") {
        reasoning.assistant_id = Some(id);
    }
    if let Some(from) = lookup("SENDGRID_FROM_EMAIL") {
        notifications.from_email = Some(from);
    }

    extraction.allowed_extensions = extraction
        .allowed_extensions
        .iter()
        .map(|ext| ext.trim_start_matches('.').to_lowercase())
        .collect();

    ResolvedConfig {
        home,
        reports,
        config_file,
        extraction,
        sources,
        reasoning,
        notifications,
        secrets: Secrets::from_lookup(&lookup),
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".kycflow");

    let config_file = find_config_file();
    let file = match config_file {
        Some(ref path) => load_config_file(path)?,
        None => ConfigFile::default(),
    };

    let lookup = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
    Ok(resolve(file, config_file, default_home, lookup))
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Load configuration afresh, bypassing the cache
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
