use std::time::Duration;

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use tracing::debug;

/// Thin wrapper around the async DNS resolver used for candidate probing.
///
/// Resolution failure (NXDOMAIN or equivalent) is an expected negative
/// outcome, so the lookup surface is a plain `bool` rather than a `Result`.
pub struct Resolver {
    inner: TokioAsyncResolver,
}

impl Resolver {
    /// Build a resolver using the system default upstream configuration with
    /// an explicit per-lookup timeout so a hung nameserver cannot block a
    /// worker indefinitely.
    pub fn new(timeout: Duration) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 1;
        Self {
            inner: TokioAsyncResolver::tokio(ResolverConfig::default(), opts),
        }
    }

    /// Returns true iff `fqdn` resolves to at least one address.
    pub async fn resolves(&self, fqdn: &str) -> bool {
        match self.inner.lookup_ip(fqdn).await {
            Ok(lookup) => {
                let hit = lookup.iter().next().is_some();
                debug!(fqdn, hit, "dns lookup completed");
                hit
            }
            Err(e) => {
                debug!(fqdn, error = %e, "dns lookup failed");
                false
            }
        }
    }
}
