//! Object keys and public URLs.
//!
//! Keys look like `products/images/1714557600000_saree.jpg`. Public URLs
//! are the configured base URL plus the key with each segment
//! percent-encoded.

use chrono::{DateTime, Utc};
use url::Url;

use crate::error::{StorageError, StorageResult};

/// `{namespace}/{epochMillis}_{name}`
pub fn object_key(namespace: &str, file_name: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}/{}_{}",
        namespace.trim_matches('/'),
        at.timestamp_millis(),
        file_name
    )
}

/// Public URL of `key` under `base_url`.
pub fn public_url(base_url: &str, key: &str) -> String {
    let encoded: Vec<String> = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("{}/{}", base_url.trim_end_matches('/'), encoded.join("/"))
}

/// Recover the object key from a URL handed out earlier.
///
/// Accepts URLs under `base_url` and Firebase download URLs of the form
/// `.../o/<percent-encoded key>?alt=media&token=...`.
pub fn key_from_url(base_url: &str, url: &str) -> StorageResult<String> {
    let base = base_url.trim_end_matches('/');
    if let Some(rest) = url.strip_prefix(base).and_then(|r| r.strip_prefix('/')) {
        let path = rest.split(|c| c == '?' || c == '#').next().unwrap_or_default();
        return decode_key(path);
    }

    let parsed = Url::parse(url).map_err(|_| StorageError::InvalidUrl(url.to_string()))?;
    match parsed.path().split_once("/o/") {
        Some((_, encoded)) => decode_key(encoded),
        None => Err(StorageError::InvalidUrl(url.to_string())),
    }
}

fn decode_key(path: &str) -> StorageResult<String> {
    let key = urlencoding::decode(path)
        .map_err(|e| StorageError::InvalidKey(format!("{}: {}", path, e)))?
        .into_owned();
    if key.is_empty() {
        return Err(StorageError::InvalidKey("empty key".to_string()));
    }
    Ok(key)
}
