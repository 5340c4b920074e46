//! Utility functions shared by the API client and the terminal UI.
//!
//! - **URL validation**: the forum server URL must be HTTPS unless local
//! - **Text processing**: terminal-safe titles, width-aware truncation

mod text;
mod url_validator;

pub use text::{
    display_width, sanitize_title, strip_control_chars, truncate_to_width, MAX_TITLE_CHARS,
};
pub use url_validator::{validate_base_url, UrlValidationError};
