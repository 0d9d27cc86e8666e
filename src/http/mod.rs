//! HTTP protocol layer module
//!
//! Response builders, body limits and content types shared by the static
//! file and API handlers.

pub mod body;
pub mod mime;
pub mod response;

// Re-export commonly used types
pub use body::{declared_length, read_limited, BodyError};
pub use response::{
    build_404_response, build_405_response, build_file_response, build_json_response,
    build_options_response, build_redirect_response, JsonOptions, STATIC_METHODS,
};
