// Configuration module entry point
// Loads application configuration and builds the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{
    Config, ContactConfig, Environment, MailConfig, RecaptchaConfig, SessionConfig, SmtpSecurity,
    TransportKind,
};

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// The file is optional; environment variables prefixed with `SITE__`
    /// override it, e.g. `SITE__RECAPTCHA__SECRET_KEY`.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("SITE").separator("__"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 60)?
            .set_default("performance.shutdown_grace", 10)?
            .set_default("http.server_name", "assistara-web")?
            .set_default("http.max_body_size", 65_536)? // 64KB
            .set_default("http.trust_proxy_headers", false)?
            .set_default("site.root", "public")?
            .set_default("site.not_found_page", "404.html")?
            .set_default("session.cookie_name", "SITESESSID")?
            .set_default("session.ttl_secs", 1440)?
            .set_default("session.secure_cookie", false)?
            .set_default("contact.environment", "production")?
            .set_default("contact.rate_limit_window", 3600)?
            .set_default("contact.max_submissions", 5)?
            .set_default("contact.max_name_length", 100)?
            .set_default("contact.max_email_length", 254)?
            .set_default("contact.max_phone_length", 30)?
            .set_default("contact.max_message_length", 5000)?
            .set_default("contact.admin_email", "info@assistara.de")?
            .set_default("contact.admin_name", "Assistara Team")?
            .set_default("contact.from_email", "noreply@assistara.de")?
            .set_default("contact.from_name", "Assistara")?
            .set_default("contact.site_name", "Assistara")?
            .set_default("contact.templates_dir", "templates/email")?
            .set_default("recaptcha.min_score", 0.5)?
            .set_default(
                "recaptcha.verify_url",
                "https://www.google.com/recaptcha/api/siteverify",
            )?
            .set_default("recaptcha.timeout_secs", 10)?
            .set_default("mail.transport", "auto")?
            .set_default("mail.smtp_port", 587)?
            .set_default("mail.smtp_security", "starttls")?
            .set_default("mail.sendmail_command", "sendmail")?
            .set_default("mail.timeout_secs", 20)?
            .build()?;

        settings.try_deserialize()
    }

    /// Worst case of the contact pipeline's outbound calls: one
    /// verification plus the admin and confirmation mails
    pub const fn contact_outbound_budget(&self) -> u64 {
        self.recaptcha
            .timeout_secs
            .saturating_add(self.mail.timeout_secs.saturating_mul(2))
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::load_from("does-not-exist/config").unwrap();
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.contact.environment, Environment::Production);
        assert_eq!(cfg.contact.max_submissions, 5);
        assert_eq!(cfg.mail.transport, TransportKind::Auto);
        assert_eq!(cfg.mail.smtp_security, SmtpSecurity::Starttls);
        assert!(cfg.recaptcha.secret_key.is_empty());
        assert_eq!(cfg.site.not_found_page, "404.html");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[contact]\nenvironment = \"development\"\nmax_submissions = 2\n\n[mail]\ntransport = \"sendmail\""
        )
        .unwrap();

        let base = dir.path().join("site");
        let cfg = Config::load_from(base.to_str().unwrap()).unwrap();
        assert_eq!(cfg.contact.environment, Environment::Development);
        assert!(!cfg.contact.environment.is_strict());
        assert_eq!(cfg.contact.max_submissions, 2);
        assert_eq!(cfg.mail.transport, TransportKind::Sendmail);
        // untouched values keep their defaults
        assert_eq!(cfg.contact.rate_limit_window, 3600);
    }

    #[test]
    fn test_default_deadline_covers_outbound_calls() {
        let cfg = Config::load_from("does-not-exist/config").unwrap();
        assert_eq!(cfg.contact_outbound_budget(), 50);
        assert!(cfg.performance.write_timeout > cfg.contact_outbound_budget());
    }

    #[test]
    fn test_socket_addr() {
        let cfg = Config::load_from("does-not-exist/config").unwrap();
        assert_eq!(cfg.get_socket_addr().unwrap().port(), 8000);
    }
}
