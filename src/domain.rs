//! Domain name resolution
//!
//! Callers may pass a bare hostname or a full URL. Both the ingest and query
//! paths key the log by the same normalized hostname.

use url::Url;

use crate::error::{CtError, Result};

/// Longest DNS name in presentation form
pub const MAX_DOMAIN_LEN: usize = 253;

/// Resolve a hostname or URL to the normalized domain key
pub fn resolve_domain(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CtError::InvalidDomain("domain is empty".to_string()));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&candidate)
        .map_err(|e| CtError::InvalidDomain(format!("{}: {}", trimmed, e)))?;
    let host = url
        .host_str()
        .ok_or_else(|| CtError::InvalidDomain(format!("{} has no host", trimmed)))?;

    normalize_domain(host)
}

/// Lowercase, trim whitespace and any trailing root dot
pub fn normalize_domain(domain: &str) -> Result<String> {
    let normalized = domain.trim().trim_end_matches('.').to_ascii_lowercase();

    if normalized.is_empty() {
        return Err(CtError::InvalidDomain("domain is empty".to_string()));
    }
    if normalized.len() > MAX_DOMAIN_LEN {
        return Err(CtError::InvalidDomain(format!(
            "domain exceeds {} characters",
            MAX_DOMAIN_LEN
        )));
    }
    if normalized
        .chars()
        .any(|c| c.is_whitespace() || c == '/' || c == '@')
    {
        return Err(CtError::InvalidDomain(format!(
            "{} is not a hostname",
            normalized
        )));
    }

    Ok(normalized)
}
