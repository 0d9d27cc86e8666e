//! Contact form pipeline
//!
//! One submission runs through: rate limit, CSRF check, risk-score check,
//! sanitize, validate, render, then admin notification followed by the
//! submitter's confirmation. In development mode the CSRF and risk-score
//! checks only log; the honeypot is part of validation and always applies.

pub mod csrf;
pub mod error;
pub mod form;
pub mod mailer;
pub mod rate_limit;
pub mod recaptcha;
pub mod template;

pub use error::{ContactError, SecurityCheck};
pub use mailer::{MailTransport, Mailer, OutgoingMail, Recipient};
pub use recaptcha::{RecaptchaVerifier, RiskVerifier};

use crate::config::{ContactConfig, Environment};
use crate::logger;
use crate::session::SessionStore;
use chrono::{Local, TimeDelta, Utc};
use form::{FieldLimits, RawSubmission, Submission};
use rate_limit::{RateDecision, RateLimitPolicy};
use std::net::IpAddr;
use std::sync::Arc;
use template::{TemplateName, TemplateStore};

pub const SUCCESS_MESSAGE: &str =
    "Vielen Dank für Ihre Nachricht! Wir haben Ihnen eine Bestätigungsemail gesendet.";

/// Settings derived from `[contact]`
#[derive(Debug, Clone)]
pub struct ContactSettings {
    pub environment: Environment,
    pub rate_limit: RateLimitPolicy,
    pub limits: FieldLimits,
    pub admin: Recipient,
    pub site_name: String,
}

impl ContactSettings {
    pub fn from_config(cfg: &ContactConfig) -> Self {
        Self {
            environment: cfg.environment,
            rate_limit: RateLimitPolicy {
                max_submissions: cfg.max_submissions,
                window: i64::try_from(cfg.rate_limit_window)
                    .ok()
                    .and_then(TimeDelta::try_seconds)
                    .unwrap_or(TimeDelta::MAX),
            },
            limits: FieldLimits {
                name: cfg.max_name_length,
                email: cfg.max_email_length,
                phone: cfg.max_phone_length,
                message: cfg.max_message_length,
            },
            admin: Recipient {
                address: cfg.admin_email.clone(),
                name: cfg.admin_name.clone(),
            },
            site_name: cfg.site_name.clone(),
        }
    }
}

/// Who is submitting
#[derive(Debug, Clone, Copy)]
pub struct SubmissionContext<'a> {
    pub session_id: &'a str,
    pub client_ip: IpAddr,
}

pub struct ContactService<S, M, V> {
    settings: ContactSettings,
    sessions: Arc<S>,
    mailer: M,
    verifier: V,
    templates: TemplateStore,
}

impl<S, M, V> ContactService<S, M, V>
where
    S: SessionStore,
    M: MailTransport,
    V: RiskVerifier,
{
    pub fn new(
        settings: ContactSettings,
        sessions: Arc<S>,
        mailer: M,
        verifier: V,
        templates: TemplateStore,
    ) -> Self {
        Self {
            settings,
            sessions,
            mailer,
            verifier,
            templates,
        }
    }

    pub const fn mailer(&self) -> &M {
        &self.mailer
    }

    /// CSRF token for the session, created on first request
    pub fn issue_token(&self, session_id: &str) -> String {
        csrf::issue_token(self.sessions.as_ref(), session_id)
    }

    /// Run the whole pipeline for one request body
    pub async fn submit(
        &self,
        ctx: &SubmissionContext<'_>,
        body: &[u8],
    ) -> Result<&'static str, ContactError> {
        self.check_rate_limit(ctx)?;

        let raw = RawSubmission::parse(body);
        self.check_csrf(ctx, &raw)?;
        self.check_risk_score(ctx, &raw).await?;

        let submission = Submission::from_raw(&raw, &self.settings.limits, Local::now());
        submission
            .validate(&self.settings.limits)
            .map_err(ContactError::ValidationFailed)?;

        self.dispatch(&submission).await?;
        Ok(SUCCESS_MESSAGE)
    }

    fn check_rate_limit(&self, ctx: &SubmissionContext<'_>) -> Result<(), ContactError> {
        let key = rate_limit::client_key(ctx.client_ip);
        let decision = self.sessions.with_session(ctx.session_id, |session| {
            rate_limit::check(
                &mut session.rate_limits,
                &key,
                Utc::now(),
                &self.settings.rate_limit,
            )
        });
        match decision {
            RateDecision::Allowed { count } => {
                logger::log_debug(&format!("Contact submission {count} in current window"));
                Ok(())
            }
            RateDecision::Limited => {
                logger::log_warning(&format!("Rate limit reached for {}", ctx.client_ip));
                Err(ContactError::RateLimited)
            }
        }
    }

    fn check_csrf(&self, ctx: &SubmissionContext<'_>, raw: &RawSubmission) -> Result<(), ContactError> {
        let submitted = raw.field("csrf_token");
        if self.settings.environment == Environment::Development {
            let stored = self
                .sessions
                .with_session(ctx.session_id, |s| s.csrf_token.clone());
            logger::log_debug(&format!(
                "CSRF session token: {}, received: {}",
                stored.as_deref().unwrap_or("none"),
                submitted.unwrap_or("none")
            ));
        }

        if csrf::verify_token(self.sessions.as_ref(), ctx.session_id, submitted) {
            return Ok(());
        }
        self.reject_or_warn(SecurityCheck::Csrf, "CSRF token invalid")
    }

    async fn check_risk_score(
        &self,
        ctx: &SubmissionContext<'_>,
        raw: &RawSubmission,
    ) -> Result<(), ContactError> {
        let token = raw.field("recaptcha_token").unwrap_or_default();
        match self.verifier.verify(token, Some(ctx.client_ip)).await {
            Ok(score) => {
                logger::log_debug(&format!("Risk score {score} accepted"));
                Ok(())
            }
            Err(e) => self.reject_or_warn(SecurityCheck::Bot, &format!("Risk check failed: {e}")),
        }
    }

    fn reject_or_warn(&self, check: SecurityCheck, reason: &str) -> Result<(), ContactError> {
        if self.settings.environment.is_strict() {
            logger::log_warning(reason);
            Err(ContactError::SecurityCheckFailed(check))
        } else {
            logger::log_warning(&format!("{reason} (ignored in development mode)"));
            Ok(())
        }
    }

    async fn dispatch(&self, submission: &Submission) -> Result<(), ContactError> {
        let label = submission.contact_type_label();
        let vars = [
            ("name", submission.name.as_str()),
            ("email", submission.email.as_str()),
            ("phone", submission.phone.as_str()),
            ("contactType", submission.contact_type.as_str()),
            ("contactTypeLabel", label),
            ("message", submission.message.as_str()),
            ("timestamp", submission.timestamp.as_str()),
            ("privacy", if submission.privacy { "Ja" } else { "Nein" }),
            ("siteName", self.settings.site_name.as_str()),
        ];

        let admin_mail = OutgoingMail {
            to: self.settings.admin.clone(),
            subject: format!("Neue Kontaktanfrage: {label}"),
            html: self.templates.render(TemplateName::AdminHtml, &vars).await,
            text: self.templates.render(TemplateName::AdminText, &vars).await,
        };
        if let Err(e) = self.mailer.send(&admin_mail).await {
            logger::log_error(&format!("Admin notification failed: {e}"));
            return Err(ContactError::EmailDeliveryFailed(e.to_string()));
        }

        let user_mail = OutgoingMail {
            to: Recipient {
                address: submission.email.clone(),
                name: html_escape::decode_html_entities(&submission.name).into_owned(),
            },
            subject: format!("Bestätigung Ihrer Anfrage - {}", self.settings.site_name),
            html: self.templates.render(TemplateName::UserHtml, &vars).await,
            text: self.templates.render(TemplateName::UserText, &vars).await,
        };
        if let Err(e) = self.mailer.send(&user_mail).await {
            logger::log_error(&format!(
                "Confirmation to {} failed: {e}",
                submission.email
            ));
        }

        Ok(())
    }
}
