//! Validation of URLs submitted for shortening.

use url::Url;

/// Reasons a submitted URL is rejected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UrlCheckError {
    #[error("URL is empty")]
    Empty,

    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS protocols are allowed")]
    UnsupportedProtocol,

    #[error("URL has no host")]
    MissingHost,
}

/// Checks that `input` is an absolute HTTP(S) URL with a host.
///
/// The URL is stored exactly as submitted; this only rejects input that could
/// never be redirected to (`javascript:`, `mailto:`, relative paths, ...).
///
/// # Errors
///
/// Returns the first rule `input` violates.
pub fn validate_url(input: &str) -> Result<(), UrlCheckError> {
    if input.trim().is_empty() {
        return Err(UrlCheckError::Empty);
    }

    let url = Url::parse(input).map_err(|e| UrlCheckError::InvalidFormat(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        _ => return Err(UrlCheckError::UnsupportedProtocol),
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(UrlCheckError::MissingHost);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_http_and_https() {
        assert!(validate_url("http://example.com").is_ok());
        assert!(validate_url("https://example.com/path?q=1#frag").is_ok());
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(validate_url(""), Err(UrlCheckError::Empty));
        assert_eq!(validate_url("   "), Err(UrlCheckError::Empty));
    }

    #[test]
    fn test_rejects_relative() {
        assert!(matches!(
            validate_url("example.com/path"),
            Err(UrlCheckError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_rejects_dangerous_schemes() {
        assert_eq!(
            validate_url("javascript:alert(1)"),
            Err(UrlCheckError::UnsupportedProtocol)
        );
        assert_eq!(
            validate_url("ftp://example.com/file"),
            Err(UrlCheckError::UnsupportedProtocol)
        );
    }
}
