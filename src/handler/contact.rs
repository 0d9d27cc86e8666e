//! Contact submission endpoint
//!
//! Reads the capped body, runs the pipeline and maps the outcome to the
//! `{success, message|error}` JSON contract.

use crate::config::AppState;
use crate::contact::{ContactError, SubmissionContext};
use crate::http::{self, BodyError, JsonOptions};
use crate::logger;
use crate::session::SessionHandle;
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct Outcome {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn submit<B>(req: Request<B>, state: &AppState, client_ip: IpAddr) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let session = SessionHandle::resolve(
        req.headers(),
        &state.config.session.cookie_name,
        state.sessions.as_ref(),
    );
    let cookie = session.set_cookie(&state.config.session);

    let (status, outcome) = match process(req, state, &session.id, client_ip).await {
        Ok(message) => (
            StatusCode::OK,
            Outcome {
                success: true,
                message: Some(message.to_string()),
                error: None,
            },
        ),
        Err(e) => {
            logger::log_debug(&format!("Contact submission from {client_ip} rejected: {e}"));
            (
                e.status(),
                Outcome {
                    success: false,
                    message: None,
                    error: Some(e.public_message()),
                },
            )
        }
    };

    http::build_json_response(
        status,
        &outcome,
        JsonOptions {
            set_cookie: cookie.as_deref(),
            no_store: true,
            is_head: false,
        },
    )
}

async fn process<B>(
    req: Request<B>,
    state: &AppState,
    session_id: &str,
    client_ip: IpAddr,
) -> Result<&'static str, ContactError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    if req.method() != Method::POST {
        return Err(ContactError::MethodNotAllowed);
    }

    let limit = state.config.http.max_body_size;
    if http::declared_length(req.headers()).is_some_and(|len| len > limit) {
        return Err(ContactError::PayloadTooLarge { limit });
    }
    let body = match http::read_limited(req.into_body(), limit).await {
        Ok(body) => body,
        Err(BodyError::TooLarge(limit)) => return Err(ContactError::PayloadTooLarge { limit }),
        Err(BodyError::Read(e)) => return Err(ContactError::BodyUnreadable(e)),
    };

    let ctx = SubmissionContext {
        session_id,
        client_ip,
    };
    // bounded so a slow transport still ends in a JSON reply
    let deadline = Duration::from_secs(state.config.performance.write_timeout);
    tokio::time::timeout(deadline, state.contact.submit(&ctx, &body))
        .await
        .unwrap_or_else(|_| {
            logger::log_error(&format!(
                "Contact submission from {client_ip} exceeded {}s",
                deadline.as_secs()
            ));
            Err(ContactError::Timeout(deadline))
        })
}
