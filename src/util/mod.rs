//! Utility functions shared by the feed and episode stages.
//!
//! - **URL validation**: only http/https sources are fetched
//! - **Extension inference**: file extension from a media URL's path
//! - **Path safety**: nicknames must stay a single directory component

mod path;
mod url_validator;

pub use path::is_single_component;
pub use url_validator::{extension_from_url, validate_url, UrlValidationError};
