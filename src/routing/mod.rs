//! Routing module
//!
//! Clean-URL routing for the static site:
//! - Trailing-slash normalization
//! - Legacy path redirects
//! - Clean path aliases and `.html` probing
//! - Script endpoint dispatch

mod resolver;
mod table;

pub use resolver::{Resolution, Resolver};
pub use table::Script;
