//! Request handler module
//!
//! Dispatches resolved routes to static file serving, the CSRF token
//! endpoint and the contact submission endpoint.

mod contact;
pub mod router;
mod static_files;
mod token;

// Re-export main entry point
pub use router::handle_request;
