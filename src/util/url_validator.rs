use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors that can occur when validating the forum server URL.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// Plain HTTP to a remote host would expose the API token.
    #[error("HTTPS required for remote host: {0}")]
    InsecureRemote(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
}

/// Validates the base URL of the forum REST API.
///
/// Accepts `https://` for any host, and `http://` only for the local machine
/// (`localhost`, `127.0.0.1`, `::1`), which is what test servers and local
/// development backends use.
///
/// # Examples
///
/// ```
/// use forumtree::util::validate_base_url;
///
/// assert!(validate_base_url("https://forum.example.com/api").is_ok());
/// assert!(validate_base_url("http://127.0.0.1:8080").is_ok());
/// assert!(validate_base_url("http://forum.example.com/api").is_err());
/// assert!(validate_base_url("ftp://forum.example.com").is_err());
/// ```
pub fn validate_base_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    let host = url.host_str().ok_or(UrlValidationError::MissingHost)?;

    match url.scheme() {
        "https" => Ok(url),
        "http" if is_local_host(host) => {
            tracing::warn!(base_url = %url, "Using plain HTTP to a local forum server");
            Ok(url)
        }
        "http" => Err(UrlValidationError::InsecureRemote(host.to_owned())),
        scheme => Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }
}

fn is_local_host(host: &str) -> bool {
    if host == "localhost" {
        return true;
    }

    // Strip brackets from IPv6 addresses for parsing
    let host_for_parse = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    host_for_parse
        .parse::<IpAddr>()
        .map(|ip| ip.is_loopback())
        .unwrap_or(false)
}
