use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::DEFAULT_TTL_SECS;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub data: DataConfig,
    pub session: SessionConfig,
    pub dialog: DialogConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Reference data files, read once at start-up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataConfig {
    pub catalog_path: PathBuf,
    pub package_mapping_path: PathBuf,
    pub product_mapping_path: PathBuf,
    pub scope_mapping_path: PathBuf,
    pub promotions_path: Option<PathBuf>,
    pub intent_labels_path: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub ttl_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DialogConfig {
    pub trial_days: u32,
    pub training_days: u32,
    pub purchase_url: String,
    pub trial_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub catalog_path: Option<PathBuf>,
    pub session_ttl_secs: Option<u64>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl DataConfig {
    /// Standard file names under one directory.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            catalog_path: dir.join("catalog.csv"),
            package_mapping_path: dir.join("package_mapping.json"),
            product_mapping_path: dir.join("product_mapping.json"),
            scope_mapping_path: dir.join("scope_mapping.json"),
            promotions_path: Some(dir.join("promotions.json")),
            intent_labels_path: Some(dir.join("intent_labels.json")),
        }
    }

    pub fn required_paths(&self) -> [(&'static str, &Path); 4] {
        [
            ("data.catalog_path", self.catalog_path.as_path()),
            ("data.package_mapping_path", self.package_mapping_path.as_path()),
            ("data.product_mapping_path", self.product_mapping_path.as_path()),
            ("data.scope_mapping_path", self.scope_mapping_path.as_path()),
        ]
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self::in_dir("data")
    }
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            trial_days: 15,
            training_days: 2,
            purchase_url:
                "https://www.misa.com.vn/san-pham/mua-hang?Step=3&PurchaseProduct=MISASME2019"
                    .to_string(),
            trial_url: "https://www.misa.com.vn/san-pham/download/pid/158/MISA-SMENET-2019"
                .to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            session: SessionConfig { ttl_secs: DEFAULT_TTL_SECS },
            dialog: DialogConfig::default(),
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 5055,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("dealbot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(data) = patch.data {
            if let Some(dir) = data.dir {
                self.data = DataConfig::in_dir(dir);
            }
            if let Some(path) = data.catalog_path {
                self.data.catalog_path = path;
            }
            if let Some(path) = data.package_mapping_path {
                self.data.package_mapping_path = path;
            }
            if let Some(path) = data.product_mapping_path {
                self.data.product_mapping_path = path;
            }
            if let Some(path) = data.scope_mapping_path {
                self.data.scope_mapping_path = path;
            }
            if let Some(path) = data.promotions_path {
                self.data.promotions_path = Some(path);
            }
            if let Some(path) = data.intent_labels_path {
                self.data.intent_labels_path = Some(path);
            }
        }

        if let Some(ttl_secs) = patch.session.and_then(|session| session.ttl_secs) {
            self.session.ttl_secs = ttl_secs;
        }

        if let Some(dialog) = patch.dialog {
            if let Some(trial_days) = dialog.trial_days {
                self.dialog.trial_days = trial_days;
            }
            if let Some(training_days) = dialog.training_days {
                self.dialog.training_days = training_days;
            }
            if let Some(purchase_url) = dialog.purchase_url {
                self.dialog.purchase_url = purchase_url;
            }
            if let Some(trial_url) = dialog.trial_url {
                self.dialog.trial_url = trial_url;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("DEALBOT_DATA_DIR") {
            self.data = DataConfig::in_dir(value);
        }
        if let Some(value) = read_env("DEALBOT_DATA_CATALOG_PATH") {
            self.data.catalog_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("DEALBOT_DATA_PACKAGE_MAPPING_PATH") {
            self.data.package_mapping_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("DEALBOT_DATA_PRODUCT_MAPPING_PATH") {
            self.data.product_mapping_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("DEALBOT_DATA_SCOPE_MAPPING_PATH") {
            self.data.scope_mapping_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("DEALBOT_DATA_PROMOTIONS_PATH") {
            self.data.promotions_path = Some(PathBuf::from(value));
        }
        if let Some(value) = read_env("DEALBOT_DATA_INTENT_LABELS_PATH") {
            self.data.intent_labels_path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("DEALBOT_SESSION_TTL_SECS") {
            self.session.ttl_secs = parse_u64("DEALBOT_SESSION_TTL_SECS", &value)?;
        }

        if let Some(value) = read_env("DEALBOT_DIALOG_TRIAL_DAYS") {
            self.dialog.trial_days = parse_u32("DEALBOT_DIALOG_TRIAL_DAYS", &value)?;
        }
        if let Some(value) = read_env("DEALBOT_DIALOG_TRAINING_DAYS") {
            self.dialog.training_days = parse_u32("DEALBOT_DIALOG_TRAINING_DAYS", &value)?;
        }
        if let Some(value) = read_env("DEALBOT_DIALOG_PURCHASE_URL") {
            self.dialog.purchase_url = value;
        }
        if let Some(value) = read_env("DEALBOT_DIALOG_TRIAL_URL") {
            self.dialog.trial_url = value;
        }

        if let Some(value) = read_env("DEALBOT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("DEALBOT_SERVER_PORT") {
            self.server.port = parse_u16("DEALBOT_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("DEALBOT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("DEALBOT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("DEALBOT_LOGGING_LEVEL").or_else(|| read_env("DEALBOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("DEALBOT_LOGGING_FORMAT").or_else(|| read_env("DEALBOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(dir) = overrides.data_dir {
            self.data = DataConfig::in_dir(dir);
        }
        if let Some(catalog_path) = overrides.catalog_path {
            self.data.catalog_path = catalog_path;
        }
        if let Some(ttl_secs) = overrides.session_ttl_secs {
            self.session.ttl_secs = ttl_secs;
        }
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_data(&self.data)?;
        validate_session(&self.session)?;
        validate_dialog(&self.dialog)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("dealbot.toml"), PathBuf::from("config/dealbot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_data(data: &DataConfig) -> Result<(), ConfigError> {
    for (key, path) in data.required_paths() {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!("{key} must not be empty")));
        }
    }
    Ok(())
}

fn validate_session(session: &SessionConfig) -> Result<(), ConfigError> {
    if session.ttl_secs == 0 {
        return Err(ConfigError::Validation(
            "session.ttl_secs must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_dialog(dialog: &DialogConfig) -> Result<(), ConfigError> {
    if dialog.trial_days == 0 {
        return Err(ConfigError::Validation(
            "dialog.trial_days must be greater than zero".to_string(),
        ));
    }

    let urls =
        [("dialog.purchase_url", &dialog.purchase_url), ("dialog.trial_url", &dialog.trial_url)];
    for (key, url) in urls {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "{key} must start with http:// or https://"
            )));
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    data: Option<DataPatch>,
    session: Option<SessionPatch>,
    dialog: Option<DialogPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DataPatch {
    dir: Option<PathBuf>,
    catalog_path: Option<PathBuf>,
    package_mapping_path: Option<PathBuf>,
    product_mapping_path: Option<PathBuf>,
    scope_mapping_path: Option<PathBuf>,
    promotions_path: Option<PathBuf>,
    intent_labels_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionPatch {
    ttl_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DialogPatch {
    trial_days: Option<u32>,
    training_days: Option<u32>,
    purchase_url: Option<String>,
    trial_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
