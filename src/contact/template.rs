//! E-mail templates
//!
//! Templates are plain files with `{{placeholder}}` markers. A template
//! missing from the configured directory falls back to the copy compiled
//! into the binary.

use crate::logger;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Named templates used by the contact pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateName {
    AdminHtml,
    AdminText,
    UserHtml,
    UserText,
}

impl TemplateName {
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::AdminHtml => "admin-notification.html",
            Self::AdminText => "admin-notification.txt",
            Self::UserHtml => "user-confirmation.html",
            Self::UserText => "user-confirmation.txt",
        }
    }

    const fn builtin(self) -> &'static str {
        match self {
            Self::AdminHtml => include_str!("../../templates/email/admin-notification.html"),
            Self::AdminText => include_str!("../../templates/email/admin-notification.txt"),
            Self::UserHtml => include_str!("../../templates/email/user-confirmation.html"),
            Self::UserText => include_str!("../../templates/email/user-confirmation.txt"),
        }
    }
}

/// Loads templates from a directory
#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
}

impl TemplateStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub async fn load(&self, name: TemplateName) -> String {
        let path = self.dir.join(name.file_name());
        match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                logger::log_warning(&format!(
                    "E-mail template '{}' unavailable ({e}), using built-in default",
                    path.display()
                ));
                name.builtin().to_string()
            }
        }
    }

    pub async fn render(&self, name: TemplateName, vars: &[(&str, &str)]) -> String {
        render(&self.load(name).await, vars)
    }
}

/// Replace `{{key}}` markers in one pass; unknown keys are kept verbatim
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("}}") else {
            out.push_str(&rest[open..]);
            return out;
        };
        let key = &after_open[..close];
        match vars.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[open..open + 2 + close + 2]),
        }
        rest = &after_open[close + 2..];
    }

    out.push_str(rest);
    out
}
