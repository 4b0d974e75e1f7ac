//! Derived-name generation for proxy objects.

use sha2::{Digest, Sha256};

const PROXY_SUFFIX: &str = "nodeport-proxy";

/// Object names may not exceed the DNS label limit.
const MAX_NAME_LEN: usize = 63;

/// Derives the name of the object shadowing `origin`.
///
/// The name is a pure function of the origin name: repeated reconciles, and
/// concurrent reconciles triggered by different watches, converge on the same
/// object identity. A truncated SHA-256 suffix keeps distinct origins from
/// colliding even when the origin itself has to be truncated to fit.
pub fn proxy_name(origin: &str, hash_len: usize) -> String {
    let hash = content_hash(origin, hash_len);

    let suffix = format!("-{PROXY_SUFFIX}-{hash}");
    let max_prefix_len = MAX_NAME_LEN.saturating_sub(suffix.len());
    if max_prefix_len == 0 {
        let mut short = format!("{PROXY_SUFFIX}-{hash}");
        short.truncate(MAX_NAME_LEN);
        return short;
    }

    let mut prefix = origin;
    if prefix.len() > max_prefix_len {
        prefix = &prefix[..max_prefix_len];
    }
    let prefix = prefix.trim_end_matches('-');

    format!("{prefix}{suffix}")
}

/// First `len` hex characters of the SHA-256 of `input`.
///
/// SHA-256 rather than the standard library hasher: the result is persisted
/// in object names and must be stable across processes and toolchains.
fn content_hash(input: &str, len: usize) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = digest
        .iter()
        .fold(String::with_capacity(digest.len() * 2), |mut s, b| {
            use std::fmt::Write;
            let _ = write!(s, "{b:02x}");
            s
        });
    hex.truncate(len);
    hex
}
