//! URL normalization, content hashing, and favicon fallback chains.

use sha2::{Digest, Sha256};
use url::Url;

use crate::error::{Error, Result};

/// Query parameters that never change page identity.
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_cid", "mc_eid", "ref_src"];

fn is_tracking_param(name: &str) -> bool {
    name.starts_with("utm_") || TRACKING_PARAMS.contains(&name)
}

/// Parse a bookmark URL, accepting only `http` and `https`.
pub fn parse_bookmark_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("URL cannot be empty".to_string()));
    }
    let url = Url::parse(trimmed)
        .map_err(|e| Error::InvalidInput(format!("Invalid URL '{}': {}", trimmed, e)))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(Error::InvalidInput(format!(
                "Unsupported URL scheme '{}'. Only http and https are allowed",
                other
            )))
        }
    }
    if url.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(Error::InvalidInput(format!("URL '{}' has no host", trimmed)));
    }
    Ok(url)
}

/// Canonical form of a URL for duplicate detection.
///
/// Scheme and host are lowercased and default ports dropped (both done by
/// the parser); the fragment and tracking parameters are removed, remaining
/// query pairs are sorted, and a trailing `/` is removed from non-root
/// paths.
pub fn normalize_url(raw: &str) -> Result<String> {
    let mut url = parse_bookmark_url(raw)?;
    url.set_fragment(None);

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.sort();
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    Ok(url.to_string())
}

/// Hex SHA-256 of the normalized URL.
pub fn content_hash(raw: &str) -> Result<String> {
    let normalized = normalize_url(raw)?;
    Ok(hex::encode(Sha256::digest(normalized.as_bytes())))
}

/// Host of a URL without a leading `www.`.
pub fn domain_of(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let host = url.host_str()?.to_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

/// Ordered favicon candidates for a page, best first.
///
/// The tab-provided icon comes first when present, then the site's own
/// `/favicon.ico`, then two public icon services.
pub fn favicon_candidates(page_url: &str, provided: Option<&str>) -> Vec<String> {
    let mut out = Vec::with_capacity(4);
    if let Some(icon) = provided.map(str::trim).filter(|s| !s.is_empty()) {
        // Extension-internal icons (chrome://, data:) are useless off-browser.
        if icon.starts_with("http://") || icon.starts_with("https://") {
            out.push(icon.to_string());
        }
    }
    if let Ok(url) = Url::parse(page_url.trim()) {
        if let Some(host) = url.host_str() {
            out.push(format!("{}/favicon.ico", url.origin().ascii_serialization()));
            out.push(format!(
                "https://www.google.com/s2/favicons?domain={}&sz=64",
                host
            ));
            out.push(format!("https://icons.duckduckgo.com/ip3/{}.ico", host));
        }
    }
    out
}

/// First favicon candidate, if any.
pub fn primary_favicon(page_url: &str, provided: Option<&str>) -> Option<String> {
    favicon_candidates(page_url, provided).into_iter().next()
}
