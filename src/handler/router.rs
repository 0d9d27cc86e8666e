//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: client address, route
//! resolution, method checks, dispatch and the access log line.

use crate::config::AppState;
use crate::handler::{contact, static_files, token};
use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::routing::{Resolution, Script};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderName, HeaderValue, REFERER, SERVER, USER_AGENT};
use hyper::{HeaderMap, Method, Request, Response, Version};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let client_ip = client_ip(
        req.headers(),
        peer_addr,
        state.config.http.trust_proxy_headers,
    );
    let mut entry = access_entry(&req, client_ip);

    let mut response = dispatch(req, &state, client_ip).await;

    if let Ok(name) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, name);
    }

    if state.config.logging.access_log {
        entry.status = response.status().as_u16();
        entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

async fn dispatch<B>(req: Request<B>, state: &AppState, client_ip: IpAddr) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let resolution = state.resolver.resolve(req.uri().path());
    logger::log_debug(&format!("{} -> {resolution:?}", req.uri().path()));

    match resolution {
        Resolution::Redirect(target) => http::build_redirect_response(&target),
        Resolution::Script(Script::CsrfToken) => token::issue(&req, state),
        Resolution::Script(Script::ContactHandler) => {
            contact::submit(req, state, client_ip).await
        }
        Resolution::File(path) => match check_static_method(req.method()) {
            Some(resp) => resp,
            None => static_files::serve_file(&path, req.method() == Method::HEAD, state).await,
        },
        Resolution::NotFound => match check_static_method(req.method()) {
            Some(resp) => resp,
            None => static_files::serve_not_found(req.method() == Method::HEAD, state).await,
        },
    }
}

/// Static content accepts GET, HEAD and OPTIONS only
fn check_static_method(method: &Method) -> Option<Response<Full<Bytes>>> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => Some(http::build_options_response()),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response(http::STATIC_METHODS))
        }
    }
}

/// Client address, honoring `X-Forwarded-For` / `X-Real-IP` behind a trusted proxy
pub fn client_ip(headers: &HeaderMap, peer_addr: SocketAddr, trust_proxy: bool) -> IpAddr {
    if trust_proxy {
        let header_ip = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .and_then(|ip| ip.trim().parse::<IpAddr>().ok())
        };
        if let Some(ip) = header_ip("x-forwarded-for").or_else(|| header_ip("x-real-ip")) {
            return ip;
        }
    }
    peer_addr.ip()
}

fn access_entry<B>(req: &Request<B>, client_ip: IpAddr) -> AccessLogEntry {
    let header = |name: HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        client_ip.to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = match req.version() {
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2.0",
        _ => "1.1",
    }
    .to_string();
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Environment, TransportKind};
    use http_body_util::BodyExt;
    use hyper::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
    use hyper::StatusCode;
    use std::fs;
    use tempfile::TempDir;

    const PEER: &str = "198.51.100.4:51000";

    fn app() -> (TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<h1>Start</h1>").unwrap();
        fs::write(dir.path().join("kontakt.html"), "<h1>Kontakt</h1>").unwrap();
        fs::write(dir.path().join("404.html"), "<h1>Nicht da</h1>").unwrap();

        let mut config = Config::load_from("does-not-exist").unwrap();
        config.site.root = dir.path().display().to_string();
        config.logging.access_log = false;
        config.contact.environment = Environment::Development;
        config.contact.templates_dir = dir.path().join("templates").display().to_string();
        config.recaptcha.secret_key = String::new();
        config.mail.transport = TransportKind::Sendmail;
        config.mail.sendmail_command = dir.path().join("no-sendmail").display().to_string();
        config.http.max_body_size = 1024;

        let state = Arc::new(AppState::new(config).unwrap());
        (dir, state)
    }

    fn request(method: Method, uri: &str, body: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    async fn send(state: &Arc<AppState>, req: Request<Full<Bytes>>) -> Response<Full<Bytes>> {
        handle_request(req, Arc::clone(state), PEER.parse().unwrap())
            .await
            .unwrap()
    }

    async fn body_string(resp: Response<Full<Bytes>>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn json(resp: Response<Full<Bytes>>) -> serde_json::Value {
        serde_json::from_str(&body_string(resp).await).unwrap()
    }

    #[tokio::test]
    async fn test_clean_url_and_literal_file_match() {
        let (_dir, state) = app();
        let clean = send(&state, request(Method::GET, "/kontakt", "")).await;
        assert_eq!(clean.status(), StatusCode::OK);
        assert_eq!(clean.headers()[CONTENT_TYPE], "text/html; charset=utf-8");
        let literal = send(&state, request(Method::GET, "/kontakt.html", "")).await;
        assert_eq!(body_string(clean).await, body_string(literal).await);
    }

    #[tokio::test]
    async fn test_trailing_slash_redirect() {
        let (_dir, state) = app();
        let resp = send(&state, request(Method::GET, "/kontakt/", "")).await;
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.headers()[LOCATION], "/kontakt");
    }

    #[tokio::test]
    async fn test_unknown_path_serves_404_page() {
        let (_dir, state) = app();
        let resp = send(&state, request(Method::GET, "/nirgendwo", "")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(resp).await, "<h1>Nicht da</h1>");
    }

    #[tokio::test]
    async fn test_static_methods() {
        let (_dir, state) = app();
        let head = send(&state, request(Method::HEAD, "/", "")).await;
        assert_eq!(head.status(), StatusCode::OK);
        assert_eq!(head.headers()["Content-Length"], "14");
        assert!(body_string(head).await.is_empty());

        let options = send(&state, request(Method::OPTIONS, "/kontakt", "")).await;
        assert_eq!(options.status(), StatusCode::NO_CONTENT);

        let post = send(&state, request(Method::POST, "/kontakt", "x=1")).await;
        assert_eq!(post.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(post.headers()["Allow"], "GET, HEAD, OPTIONS");
    }

    #[tokio::test]
    async fn test_token_endpoint_reuses_session_token() {
        let (_dir, state) = app();
        let first = send(&state, request(Method::GET, "/api/get-csrf-token.php", "")).await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()["Cache-Control"], "no-store");
        let cookie = first.headers()[SET_COOKIE]
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();
        let token = json(first).await["csrf_token"].as_str().unwrap().to_string();
        assert_eq!(token.len(), 64);

        let mut again = request(Method::GET, "/api/get-csrf-token.php", "");
        again
            .headers_mut()
            .insert(COOKIE, HeaderValue::from_str(&cookie).unwrap());
        let second = send(&state, again).await;
        assert!(second.headers().get(SET_COOKIE).is_none());
        assert_eq!(json(second).await["csrf_token"], token.as_str());

        let post = send(&state, request(Method::POST, "/api/get-csrf-token.php", "")).await;
        assert_eq!(post.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_contact_rejects_get() {
        let (_dir, state) = app();
        let resp = send(&state, request(Method::GET, "/api/contact-handler.php", "")).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()["X-Frame-Options"], "DENY");
        let body = json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Nur POST-Requests erlaubt");
    }

    #[tokio::test]
    async fn test_contact_rejects_oversized_body() {
        let (_dir, state) = app();
        let big = "x".repeat(2048);
        let resp = send(&state, request(Method::POST, "/api/contact-handler.php", &big)).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_contact_reports_all_validation_errors() {
        let (_dir, state) = app();
        let resp = send(&state, request(Method::POST, "/api/contact-handler.php", "{}")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json(resp).await["error"],
            "Name ist erforderlich, E-Mail ist erforderlich, Nachricht ist erforderlich, Kontaktart ist erforderlich"
        );
    }

    #[tokio::test]
    async fn test_contact_admin_delivery_failure_is_500() {
        let (_dir, state) = app();
        let payload = r#"{"name":"Anna","email":"anna@example.de","contactType":"general","message":"Hallo","privacy":true}"#;
        let resp = send(&state, request(Method::POST, "/api/contact-handler.php", payload)).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body.get("message").is_none());
    }

    #[tokio::test]
    async fn test_redirect_never_leaves_the_site() {
        let (_dir, state) = app();
        for (uri, expected) in [
            ("//evil.example/", "/evil.example"),
            ("///evil.example//", "/evil.example"),
            ("/kontakt%2F", "/kontakt"),
            ("/kontakt%2f/", "/kontakt"),
        ] {
            let resp = send(&state, request(Method::GET, uri, "")).await;
            assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY, "{uri}");
            assert_eq!(resp.headers()[LOCATION], expected, "{uri}");
        }
    }

    struct ResetBody;

    impl Body for ResetBody {
        type Data = Bytes;
        type Error = std::io::Error;

        fn poll_frame(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<Option<Result<hyper::body::Frame<Bytes>, Self::Error>>> {
            std::task::Poll::Ready(Some(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "peer reset",
            ))))
        }
    }

    #[tokio::test]
    async fn test_contact_unreadable_body_is_400() {
        let (_dir, state) = app();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/contact-handler.php")
            .body(ResetBody)
            .unwrap();
        let resp = handle_request(req, Arc::clone(&state), PEER.parse().unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(resp).await["error"], "Ungültige Anfrage");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_mail_transport_still_gets_a_reply() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let sendmail = dir.path().join("slow-sendmail");
        fs::write(&sendmail, "#!/bin/sh\nsleep 3\ncat > /dev/null\n").unwrap();
        fs::set_permissions(&sendmail, fs::Permissions::from_mode(0o755)).unwrap();

        let mut config = Config::load_from("does-not-exist").unwrap();
        config.site.root = dir.path().display().to_string();
        config.logging.access_log = false;
        config.contact.environment = Environment::Development;
        config.recaptcha.secret_key = String::new();
        config.mail.transport = TransportKind::Sendmail;
        config.mail.sendmail_command = sendmail.display().to_string();
        config.performance.write_timeout = 1;
        let state = Arc::new(AppState::new(config).unwrap());

        let payload = r#"{"name":"Anna","email":"anna@example.de","contactType":"general","message":"Hallo","privacy":true}"#;
        let resp = send(&state, request(Method::POST, "/api/contact-handler.php", payload)).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json(resp).await["success"], false);
    }

    #[test]
    fn test_client_ip_from_trusted_proxy() {
        let peer: SocketAddr = PEER.parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );

        assert_eq!(client_ip(&headers, peer, false), peer.ip());
        assert_eq!(
            client_ip(&headers, peer, true),
            "203.0.113.9".parse::<IpAddr>().unwrap()
        );

        headers.remove("x-forwarded-for");
        headers.insert("x-real-ip", HeaderValue::from_static("garbage"));
        assert_eq!(client_ip(&headers, peer, true), peer.ip());
    }
}
