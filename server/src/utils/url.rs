//! URL canonicalization helpers

/// Canonicalize a channel URL to scheme + host + path.
///
/// Lowercases scheme and host, drops query and fragment, and removes any
/// trailing slash so that variants of the same address collapse to one
/// source row.
pub fn canonicalize(url: &str) -> Result<String, String> {
    let url = url.trim();
    if url.is_empty() {
        return Err("URL is empty".to_string());
    }

    let (scheme, rest) = url
        .split_once("://")
        .ok_or_else(|| format!("URL has no scheme: {url}"))?;

    let scheme = scheme.to_ascii_lowercase();
    if scheme != "http" && scheme != "https" {
        return Err(format!("Unsupported URL scheme: {scheme}"));
    }

    let rest = rest
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');

    let (host, path) = match rest.split_once('/') {
        Some((host, path)) => (host, Some(path)),
        None => (rest, None),
    };
    if host.is_empty() {
        return Err(format!("URL has no host: {url}"));
    }

    let host = host.to_ascii_lowercase();
    Ok(match path {
        Some(path) => format!("{scheme}://{host}/{path}"),
        None => format!("{scheme}://{host}"),
    })
}

/// Extract the channel slug (last path segment) from a channel URL
pub fn channel_slug(url: &str) -> Option<&str> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains(':'))
}
