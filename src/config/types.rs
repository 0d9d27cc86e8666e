// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub site: SiteConfig,
    pub session: SessionConfig,
    pub contact: ContactConfig,
    pub recaptcha: RecaptchaConfig,
    pub mail: MailConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
    /// Seconds to wait for in-flight connections on shutdown
    pub shutdown_grace: u64,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub max_body_size: u64,
    /// Take the client address from `X-Forwarded-For` / `X-Real-IP`
    pub trust_proxy_headers: bool,
}

/// Document root and fallback page
#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    pub root: String,
    pub not_found_page: String,
}

/// Session cookie settings
#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub ttl_secs: u64,
    pub secure_cookie: bool,
}

impl SessionConfig {
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Deployment mode of the contact pipeline.
///
/// `Development` turns CSRF and bot-check failures into warnings.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Development,
}

impl Environment {
    pub const fn is_strict(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Contact form settings
#[derive(Debug, Deserialize, Clone)]
pub struct ContactConfig {
    pub environment: Environment,
    /// Fixed window length in seconds
    pub rate_limit_window: u64,
    pub max_submissions: u32,
    pub max_name_length: usize,
    pub max_email_length: usize,
    pub max_phone_length: usize,
    pub max_message_length: usize,
    pub admin_email: String,
    pub admin_name: String,
    pub from_email: String,
    pub from_name: String,
    pub site_name: String,
    pub templates_dir: String,
}

/// reCAPTCHA v3 verification settings
#[derive(Debug, Deserialize, Clone)]
pub struct RecaptchaConfig {
    #[serde(default)]
    pub secret_key: String,
    pub min_score: f64,
    pub verify_url: String,
    pub timeout_secs: u64,
}

/// Which mail transport to build at startup
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// SMTP when `smtp_host` is set, sendmail otherwise
    Auto,
    Smtp,
    Sendmail,
}

/// SMTP connection security
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// Implicit TLS (usually port 465)
    Tls,
    /// Plain connection upgraded with STARTTLS (usually port 587)
    Starttls,
    None,
}

/// Outbound mail settings
#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    pub transport: TransportKind,
    #[serde(default)]
    pub smtp_host: String,
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: String,
    #[serde(default)]
    pub smtp_password: String,
    pub smtp_security: SmtpSecurity,
    pub sendmail_command: String,
    pub timeout_secs: u64,
}
