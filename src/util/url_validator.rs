use thiserror::Error;
use url::Url;

/// Errors that can occur during URL validation.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
}

/// Validates a URL string for use as a feed or media source.
///
/// Feeds and episodes are plain HTTP(S) resources, so anything else
/// (`file://`, `ftp://`, `data:`) is rejected before a request is built.
///
/// # Examples
///
/// ```
/// use podget::util::validate_url;
///
/// let url = validate_url("https://example.com/feed.xml").unwrap();
/// assert_eq!(url.host_str(), Some("example.com"));
///
/// assert!(validate_url("file:///etc/passwd").is_err());
/// ```
pub fn validate_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(url)
}

/// Infers a file extension from the final dot-segment of a URL's path.
///
/// Only the last non-empty path segment is considered, so query strings,
/// fragments and dotted host names never leak into the result. Returns an
/// empty string when there is no usable extension; the caller then writes a
/// file without one.
pub fn extension_from_url(url_str: &str) -> String {
    let Ok(url) = Url::parse(url_str.trim()) else {
        return String::new();
    };

    let Some(segment) = url.path().split('/').filter(|s| !s.is_empty()).last() else {
        return String::new();
    };

    match segment.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && ext.bytes().all(|b| b.is_ascii_alphanumeric()) => {
            ext.to_string()
        }
        _ => String::new(),
    }
}
