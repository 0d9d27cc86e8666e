// Contact pipeline error taxonomy
//
// Every variant maps to a status code and a fixed user-facing message; the
// detail carried in a variant is for the log only.

use hyper::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Which security check rejected a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityCheck {
    Csrf,
    Bot,
}

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("request body could not be read: {0}")]
    BodyUnreadable(String),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("security check failed: {0:?}")]
    SecurityCheckFailed(SecurityCheck),

    #[error("validation failed: {}", .0.join(", "))]
    ValidationFailed(Vec<String>),

    #[error("admin notification could not be delivered: {0}")]
    EmailDeliveryFailed(String),

    #[error("submission not completed within {0:?}")]
    Timeout(Duration),
}

impl ContactError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::BodyUnreadable(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::SecurityCheckFailed(_) => StatusCode::FORBIDDEN,
            Self::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            Self::EmailDeliveryFailed(_) | Self::Timeout(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the submitter
    pub fn public_message(&self) -> String {
        match self {
            Self::MethodNotAllowed => "Nur POST-Requests erlaubt".to_string(),
            Self::PayloadTooLarge { .. } => "Anfrage ist zu groß".to_string(),
            Self::BodyUnreadable(_) => "Ungültige Anfrage".to_string(),
            Self::RateLimited => {
                "Zu viele Anfragen. Bitte versuchen Sie es später erneut.".to_string()
            }
            Self::SecurityCheckFailed(SecurityCheck::Csrf) => {
                "Ungültiges Sicherheitstoken. Bitte laden Sie die Seite neu.".to_string()
            }
            Self::SecurityCheckFailed(SecurityCheck::Bot) => {
                "Sicherheitsprüfung fehlgeschlagen. Bitte versuchen Sie es erneut.".to_string()
            }
            Self::ValidationFailed(errors) => errors.join(", "),
            Self::EmailDeliveryFailed(_) | Self::Timeout(_) => "Ein Fehler ist aufgetreten. Bitte versuchen Sie es \
                 später erneut oder kontaktieren Sie uns telefonisch."
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ContactError::MethodNotAllowed.status(), 405);
        assert_eq!(ContactError::RateLimited.status(), 429);
        assert_eq!(
            ContactError::SecurityCheckFailed(SecurityCheck::Csrf).status(),
            403
        );
        assert_eq!(ContactError::ValidationFailed(vec![]).status(), 400);
        assert_eq!(
            ContactError::EmailDeliveryFailed("smtp down".into()).status(),
            500
        );
        assert_eq!(ContactError::Timeout(Duration::from_secs(60)).status(), 500);
        assert_eq!(ContactError::BodyUnreadable("reset".into()).status(), 400);
    }

    #[test]
    fn test_internal_detail_is_not_public() {
        let err = ContactError::EmailDeliveryFailed("connection refused 10.0.0.5:25".into());
        assert!(!err.public_message().contains("10.0.0.5"));
        assert!(err.to_string().contains("10.0.0.5"));
    }

    #[test]
    fn test_validation_messages_are_joined() {
        let err = ContactError::ValidationFailed(vec![
            "Name ist erforderlich".into(),
            "Spam erkannt".into(),
        ]);
        assert_eq!(err.public_message(), "Name ist erforderlich, Spam erkannt");
    }
}
