// CSRF token issuing and verification

use crate::session::{random_token, SessionStore};
use subtle::ConstantTimeEq;

/// Return the session's token, generating and storing one on first use
pub fn issue_token<S: SessionStore>(store: &S, session_id: &str) -> String {
    store.with_session(session_id, |session| {
        session.csrf_token.get_or_insert_with(random_token).clone()
    })
}

/// Check a submitted token against the one stored in the session.
///
/// Absent tokens on either side never match.
pub fn verify_token<S: SessionStore>(store: &S, session_id: &str, submitted: Option<&str>) -> bool {
    let Some(submitted) = submitted.filter(|t| !t.is_empty()) else {
        return false;
    };
    store.with_session(session_id, |session| {
        session
            .csrf_token
            .as_deref()
            .is_some_and(|expected| expected.as_bytes().ct_eq(submitted.as_bytes()).into())
    })
}
