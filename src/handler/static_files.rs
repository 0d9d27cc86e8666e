//! Static file serving module
//!
//! Streams resolved files with a Content-Type by extension and renders the
//! not-found page.

use crate::config::AppState;
use crate::http::{self, mime};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::path::Path;
use tokio::fs;

/// Serve a file the resolver already confirmed inside the document root
pub async fn serve_file(path: &Path, is_head: bool, state: &AppState) -> Response<Full<Bytes>> {
    match fs::read(path).await {
        Ok(content) => {
            let content_type = mime::get_content_type(path.extension().and_then(|e| e.to_str()));
            http::build_file_response(Bytes::from(content), content_type, is_head)
        }
        Err(e) => {
            logger::log_error(&format!("Failed to read file '{}': {e}", path.display()));
            serve_not_found(is_head, state).await
        }
    }
}

/// 404 with the site's own page, or the built-in one when that is missing
pub async fn serve_not_found(is_head: bool, state: &AppState) -> Response<Full<Bytes>> {
    let page = match state.resolver.existing_file(&state.config.site.not_found_page) {
        Some(path) => fs::read(&path).await.ok(),
        None => None,
    };
    http::build_404_response(page, is_head)
}
