use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Hosted table API. Empty url and key means local-only mode.
    #[serde(default)]
    pub upstream: UpstreamSettings,
    #[serde(default)]
    pub admin: AdminConfig,
    /// Submission notification configuration
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_body_size: default_max_body_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `bookings.json`, `enquiries.json` and `payments.json`.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamSettings {
    /// Supabase project URL
    #[serde(default)]
    pub url: String,

    /// Supabase service role key
    #[serde(default)]
    pub service_key: String,

    #[serde(default = "default_outbound_timeout")]
    pub timeout_secs: u64,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            service_key: String::new(),
            timeout_secs: default_outbound_timeout(),
        }
    }
}

impl UpstreamSettings {
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.service_key.is_empty()
    }
}

/// Where the admin list endpoints read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    Local,
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// Shared secret accepted as bearer token or admin key header.
    /// Empty disables token authentication.
    #[serde(default)]
    pub api_key: String,

    /// Basic auth username. Empty disables Basic authentication.
    #[serde(default)]
    pub username: String,

    /// Basic auth password. Empty disables Basic authentication.
    #[serde(default)]
    pub password: String,

    /// `local` or `remote`
    #[serde(default = "default_read_source")]
    pub read_source: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            username: String::new(),
            password: String::new(),
            read_source: default_read_source(),
        }
    }
}

impl AdminConfig {
    pub fn basic_enabled(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    pub fn token_enabled(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Parsed read source. Unknown values fall back to local; `validate`
    /// rejects them at startup.
    pub fn read_source(&self) -> ReadSource {
        match self.read_source.to_lowercase().as_str() {
            "remote" => ReadSource::Remote,
            _ => ReadSource::Local,
        }
    }
}

/// Notification configuration for submission alerts.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    /// Provider: auto, sendgrid, smtp, console or none
    #[serde(default = "default_notify_provider")]
    pub provider: String,

    /// Address that receives submission alerts
    #[serde(default)]
    pub recipient: String,

    /// From address. Empty uses the recipient (SendGrid) or the SMTP user.
    #[serde(default)]
    pub sender: String,

    #[serde(default)]
    pub sendgrid_api_key: String,

    #[serde(default = "default_sendgrid_url")]
    pub sendgrid_url: String,

    #[serde(default)]
    pub smtp_host: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub smtp_username: String,

    #[serde(default)]
    pub smtp_password: String,

    #[serde(default = "default_outbound_timeout")]
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            provider: default_notify_provider(),
            recipient: String::new(),
            sender: String::new(),
            sendgrid_api_key: String::new(),
            sendgrid_url: default_sendgrid_url(),
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            timeout_secs: default_outbound_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentConfig {
    /// Returned to the client as `confirmUrl` when non-empty
    #[serde(default)]
    pub confirm_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Only enable behind proper HTTPS termination
    #[serde(default)]
    pub hsts_enabled: bool,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_body_size() -> usize {
    1_048_576
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_data_dir() -> String {
    "data".to_string()
}
fn default_outbound_timeout() -> u64 {
    10
}
fn default_read_source() -> String {
    "local".to_string()
}
fn default_notify_provider() -> String {
    "auto".to_string()
}
fn default_sendgrid_url() -> String {
    "https://api.sendgrid.com/v3/mail/send".to_string()
}
fn default_smtp_port() -> u16 {
    587 // STARTTLS submission port
}

const NOTIFY_PROVIDERS: [&str; 5] = ["auto", "sendgrid", "smtp", "console", "none"];

/// Conventional environment names and the keys they override.
/// Later entries win when two names map to the same key.
const LEGACY_ENV: [(&str, &str); 15] = [
    ("PORT", "server.port"),
    ("DATA_DIR", "storage.data_dir"),
    ("SUPABASE_URL", "upstream.url"),
    ("SUPABASE_SERVICE_ROLE_KEY", "upstream.service_key"),
    ("ADMIN_API_KEY", "admin.api_key"),
    ("ADMIN_USER", "admin.username"),
    ("ADMIN_PASS", "admin.password"),
    ("SENDGRID_API_KEY", "notify.sendgrid_api_key"),
    ("NOTIFY_EMAIL", "notify.recipient"),
    ("NOTIFY_TO", "notify.recipient"),
    ("SMTP_HOST", "notify.smtp_host"),
    ("SMTP_PORT", "notify.smtp_port"),
    ("SMTP_USER", "notify.smtp_username"),
    ("SMTP_PASS", "notify.smtp_password"),
    ("PAYMENT_CONFIRM_URL", "payment.confirm_url"),
];

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration (optional)
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with CD__ prefix
    /// 4. Conventional names such as `PORT` or `SUPABASE_URL`
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("CD").separator("__"));

        for (key, value) in legacy_overrides(lookup) {
            builder = builder.set_override(key, value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Ignores config files and the environment.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        // Skip validation in tests to allow partial configs
        Ok(cfg)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.storage.data_dir.trim().is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "storage.data_dir must not be empty".to_string(),
            ));
        }

        // Upstream is all-or-nothing
        match (
            self.upstream.url.is_empty(),
            self.upstream.service_key.is_empty(),
        ) {
            (false, true) => {
                return Err(ConfigValidationError::MissingRequired(
                    "SUPABASE_SERVICE_ROLE_KEY (upstream.service_key) must be set when upstream.url is set"
                        .to_string(),
                ))
            }
            (true, false) => {
                return Err(ConfigValidationError::MissingRequired(
                    "SUPABASE_URL (upstream.url) must be set when upstream.service_key is set"
                        .to_string(),
                ))
            }
            _ => {}
        }

        if !matches!(
            self.admin.read_source.to_lowercase().as_str(),
            "local" | "remote"
        ) {
            return Err(ConfigValidationError::InvalidValue(format!(
                "admin.read_source must be 'local' or 'remote', got '{}'",
                self.admin.read_source
            )));
        }

        if !NOTIFY_PROVIDERS.contains(&self.notify.provider.to_lowercase().as_str()) {
            return Err(ConfigValidationError::InvalidValue(format!(
                "notify.provider must be one of {}, got '{}'",
                NOTIFY_PROVIDERS.join(", "),
                self.notify.provider
            )));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}

fn legacy_overrides(lookup: impl Fn(&str) -> Option<String>) -> Vec<(&'static str, String)> {
    LEGACY_ENV
        .iter()
        .filter_map(|(name, key)| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .map(|v| (*key, v))
        })
        .collect()
}
