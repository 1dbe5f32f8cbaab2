use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

/// Parse wordlist file content into an ordered, deduplicated list of
/// candidate subdomain labels.
///
/// Supported formats per line:
/// - single label: `www`
/// - comments: everything after `#` is ignored
/// - whitespace and blank lines are ignored
///
/// Labels are lowercased before deduplication, so `www` and `WWW` count as
/// one candidate.
pub fn parse_wordlist_str(s: &str) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for (idx, raw_line) in s.lines().enumerate() {
        let line_no = idx + 1;
        // Strip comments and trim
        let line = raw_line.split('#').next().map(str::trim).unwrap_or("");
        if line.is_empty() {
            continue;
        }

        let label = line.to_lowercase();
        validate_label(&label).with_context(|| format!("line {line_no}: invalid label: {line}"))?;
        if seen.insert(label.clone()) {
            out.push(label);
        }
    }

    Ok(out)
}

/// Load a wordlist from a file path. Errors if the file cannot be read or parsed.
pub fn load_wordlist_from_path(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("failed to read wordlist file: {}", path.as_ref().display()))?;
    parse_wordlist_str(&content)
}

/// Load a wordlist from a file, or return the built-in default list if the
/// file is missing or empty. A file that exists but fails to read or parse
/// is an error, never a silent fallback.
pub fn load_wordlist_or_default(path: impl AsRef<Path>) -> Result<Vec<String>> {
    if !path.as_ref().exists() {
        return Ok(default_wordlist());
    }
    let labels = load_wordlist_from_path(&path)?;
    if labels.is_empty() {
        return Ok(default_wordlist());
    }
    Ok(labels)
}

fn validate_label(label: &str) -> Result<()> {
    if !label
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
    {
        bail!("label contains characters outside [a-z0-9._-]");
    }
    if label.starts_with(['-', '.']) || label.ends_with(['-', '.']) {
        bail!("label must not start or end with '-' or '.'");
    }
    Ok(())
}

/// A built-in list of commonly seen subdomain labels, used when no wordlist
/// file is supplied. Sorted, so scans without a custom list enumerate
/// candidates in a stable order.
pub fn default_wordlist() -> Vec<String> {
    const DEFAULT: &[&str] = &[
        "admin", "api", "app", "apps", "archive", "assets", "auth", "backup", "beta", "blog",
        "cdn", "chat", "client", "cloud", "cpanel", "crm", "css", "dashboard", "data", "db",
        "demo", "dev", "dns", "dns1", "dns2", "docs", "download", "exchange", "files", "forum",
        "ftp", "gateway", "git", "gitlab", "grafana", "help", "images", "imap", "internal",
        "jenkins", "js", "kibana", "login", "m", "mail", "mail2", "manage", "media", "mobile",
        "monitor", "mx", "mx1", "mx2", "news", "ns1", "ns2", "ns3", "old", "panel", "payment",
        "pop", "pop3", "portal", "preprod", "prod", "proxy", "qa", "redis", "remote", "sandbox",
        "search", "secure", "shop", "smtp", "sso", "stage", "staging", "static", "stats",
        "status", "store", "support", "test", "tools", "uat", "upload", "vpn", "web", "webdisk",
        "webmail", "whm", "wiki", "www", "www1", "www2", "www3",
    ];
    DEFAULT.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_labels() {
        let input = "www\napi\n   mail  \n";
        let labels = parse_wordlist_str(input).unwrap();
        assert_eq!(labels, vec!["www", "api", "mail"]);
    }

    #[test]
    fn parse_lowercases_and_dedups() {
        let input = "www\nWWW\nApi\napi\n";
        let labels = parse_wordlist_str(input).unwrap();
        assert_eq!(labels, vec!["www", "api"]);
    }

    #[test]
    fn parse_with_comments_and_whitespace() {
        let input = r#"
            # common labels
            www  # the obvious one
            api

            # blank lines and spaces should be fine
            cgi-bin
        "#;
        let labels = parse_wordlist_str(input).unwrap();
        assert_eq!(labels, vec!["www", "api", "cgi-bin"]);
    }

    #[test]
    fn invalid_labels_error() {
        assert!(parse_wordlist_str("not a label\n").is_err());
        assert!(parse_wordlist_str("-leading\n").is_err());
        assert!(parse_wordlist_str("trailing.\n").is_err());
    }

    #[test]
    fn default_has_common_labels_and_is_sorted() {
        let d = default_wordlist();
        assert!(!d.is_empty());
        assert!(d.contains(&"www".to_string()) && d.contains(&"mail".to_string()));
        let mut sorted = d.clone();
        sorted.sort();
        assert_eq!(d, sorted);
    }
}
