use anyhow::{bail, Result};

/// Sanitize a user-supplied target domain.
///
/// Strips a leading `http://` or `https://` scheme and anything after the
/// first `/`, trims whitespace and lowercases the rest. An empty result is
/// rejected here, before any scanning starts.
pub fn sanitize_domain(raw: &str) -> Result<String> {
    let s = raw.trim();
    let s = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"))
        .unwrap_or(s);
    let s = s.split('/').next().unwrap_or("");
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        bail!("domain is required");
    }
    Ok(s)
}

/// Join a candidate label with the base domain into a fully-qualified name.
pub fn join_fqdn(label: &str, domain: &str) -> String {
    format!("{label}.{domain}")
}
