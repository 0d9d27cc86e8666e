// Application state module
// Shared runtime state built once from configuration

use std::sync::Arc;

use super::types::Config;
use crate::contact::template::TemplateStore;
use crate::contact::{ContactService, ContactSettings, Mailer, RecaptchaVerifier};
use crate::routing::Resolver;
use crate::session::MemorySessionStore;

/// Contact pipeline wired to the production transports
pub type SiteContact = ContactService<MemorySessionStore, Mailer, RecaptchaVerifier>;

/// Application state
pub struct AppState {
    pub config: Config,
    pub resolver: Resolver,
    pub sessions: Arc<MemorySessionStore>,
    pub contact: SiteContact,
}

impl AppState {
    /// Build the session store, mail transport and verifier from `config`
    pub fn new(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let sessions = Arc::new(MemorySessionStore::new(config.session.ttl()));
        let mailer = Mailer::from_config(
            &config.mail,
            &config.contact.from_email,
            &config.contact.from_name,
        )?;
        let verifier = RecaptchaVerifier::from_config(&config.recaptcha)?;

        let contact = ContactService::new(
            ContactSettings::from_config(&config.contact),
            Arc::clone(&sessions),
            mailer,
            verifier,
            TemplateStore::new(&config.contact.templates_dir),
        );

        Ok(Self {
            resolver: Resolver::new(&config.site.root),
            sessions,
            contact,
            config,
        })
    }
}
