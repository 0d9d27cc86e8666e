//! CSRF token endpoint

use crate::config::AppState;
use crate::http::{self, JsonOptions};
use crate::session::SessionHandle;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;

#[derive(Serialize)]
struct TokenBody<'a> {
    csrf_token: &'a str,
}

/// Return the session's token, minting session and token as needed
pub fn issue<B>(req: &Request<B>, state: &AppState) -> Response<Full<Bytes>> {
    let is_head = req.method() == Method::HEAD;
    if req.method() != Method::GET && !is_head {
        return http::build_405_response("GET, HEAD");
    }

    let session = SessionHandle::resolve(
        req.headers(),
        &state.config.session.cookie_name,
        state.sessions.as_ref(),
    );
    let token = state.contact.issue_token(&session.id);
    let cookie = session.set_cookie(&state.config.session);

    http::build_json_response(
        StatusCode::OK,
        &TokenBody { csrf_token: &token },
        JsonOptions {
            set_cookie: cookie.as_deref(),
            no_store: true,
            is_head,
        },
    )
}
