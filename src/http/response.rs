//! HTTP response building module
//!
//! Provides builders for various HTTP status code responses, decoupled from specific business logic.

use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;

pub const STATIC_METHODS: &str = "GET, HEAD, OPTIONS";

/// Fallback body when `404.html` is missing from the document root
const NOT_FOUND_HTML: &str = "<!DOCTYPE html>\n<html lang=\"de\">\n<head><meta charset=\"utf-8\"><title>Seite nicht gefunden</title></head>\n<body><h1>404</h1><p>Die angeforderte Seite wurde nicht gefunden.</p><p><a href=\"/\">Zur Startseite</a></p></body>\n</html>\n";

/// Build 301 Moved Permanently response
pub fn build_redirect_response(target: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header("Location", target)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from("Moved Permanently")))
        .unwrap_or_else(|e| {
            log_build_error("301", &e);
            Response::new(Full::new(Bytes::from("Moved Permanently")))
        })
}

/// Build 404 Not Found response from the fallback page, if any
pub fn build_404_response(page: Option<Vec<u8>>, is_head: bool) -> Response<Full<Bytes>> {
    let page = page.map_or_else(|| Bytes::from_static(NOT_FOUND_HTML.as_bytes()), Bytes::from);
    let content_length = page.len();
    let body = if is_head { Bytes::new() } else { page };

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "text/html; charset=UTF-8")
        .header("Content-Length", content_length)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error("404", &e);
            Response::new(Full::new(Bytes::from("404 Not Found")))
        })
}

/// Build 405 Method Not Allowed response
pub fn build_405_response(allow: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header("Content-Type", "text/plain")
        .header("Allow", allow)
        .body(Full::new(Bytes::from("405 Method Not Allowed")))
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            Response::new(Full::new(Bytes::from("405 Method Not Allowed")))
        })
}

/// Build OPTIONS response
pub fn build_options_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Allow", STATIC_METHODS)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("OPTIONS", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build static file response; `HEAD` keeps the headers and drops the body
pub fn build_file_response(
    data: Bytes,
    content_type: &str,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let content_length = data.len();
    let body = if is_head { Bytes::new() } else { data };

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", content_type)
        .header("Content-Length", content_length)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Options for [`build_json_response`]
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonOptions<'a> {
    pub set_cookie: Option<&'a str>,
    pub no_store: bool,
    pub is_head: bool,
}

/// Build JSON API response carrying the browser hardening headers
pub fn build_json_response<T: Serialize>(
    status: StatusCode,
    body: &T,
    opts: JsonOptions<'_>,
) -> Response<Full<Bytes>> {
    let json = match serde_json::to_vec(body) {
        Ok(j) => Bytes::from(j),
        Err(e) => {
            logger::log_error(&format!("Failed to serialize response: {e}"));
            return Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .header("Content-Type", "application/json; charset=utf-8")
                .body(Full::new(Bytes::from(r#"{"success":false}"#)))
                .unwrap_or_else(|_| Response::new(Full::new(Bytes::from("Error"))));
        }
    };

    let mut builder = Response::builder()
        .status(status)
        .header("Content-Type", "application/json; charset=utf-8")
        .header("Content-Length", json.len())
        .header("X-Content-Type-Options", "nosniff")
        .header("X-Frame-Options", "DENY")
        .header("X-XSS-Protection", "1; mode=block");
    if opts.no_store {
        builder = builder.header("Cache-Control", "no-store");
    }
    if let Some(cookie) = opts.set_cookie {
        builder = builder.header("Set-Cookie", cookie);
    }

    let body = if opts.is_head { Bytes::new() } else { json };
    builder.body(Full::new(body)).unwrap_or_else(|e| {
        log_build_error("JSON", &e);
        Response::new(Full::new(Bytes::from("Error")))
    })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    logger::log_error(&format!("Failed to build {status} response: {error}"));
}
