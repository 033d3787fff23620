// # Domain Resolution
//
// Turns a domain name into the filter set of a domain-backed alert.
//
// The addresses are taken once, at create (or recreate) time. An alert never
// follows later DNS changes on its own; its filters reflect the answer at the
// time it was last created.
//
// ## Usage
//
// ```rust,ignore
// use netalert_core::resolve::{SystemResolver, resolve_domain};
//
// let addresses = resolve_domain(&SystemResolver, "example.com").await?;
// ```

use crate::error::{Error, Result};
use crate::model::FilterSet;
use crate::traits::NameResolver;
use async_trait::async_trait;
use std::net::IpAddr;
use tracing::debug;

/// Resolver backed by the host's name resolution (getaddrinfo)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl NameResolver for SystemResolver {
    async fn lookup(&self, domain: &str) -> Result<Vec<IpAddr>> {
        // lookup_host needs a port; it is dropped below.
        let addrs = tokio::net::lookup_host((domain, 0))
            .await
            .map_err(|e| Error::resolution(domain, e.to_string()))?;

        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// Resolve a domain to its distinct addresses
///
/// Order follows the resolver; duplicates are dropped.
///
/// # Returns
///
/// - `Ok(Vec<IpAddr>)`: At least one address
/// - `Err(Error::InvalidInput)`: Empty domain
/// - `Err(Error::Resolution)`: Lookup failed or returned nothing
pub async fn resolve_domain(resolver: &dyn NameResolver, domain: &str) -> Result<Vec<IpAddr>> {
    let domain = domain.trim();
    if domain.is_empty() {
        return Err(Error::invalid_input("domain cannot be empty"));
    }

    let mut addresses: Vec<IpAddr> = Vec::new();
    for address in resolver.lookup(domain).await? {
        if !addresses.contains(&address) {
            addresses.push(address);
        }
    }

    if addresses.is_empty() {
        return Err(Error::resolution(domain, "no IP addresses found"));
    }

    debug!(domain = %domain, count = addresses.len(), "Resolved domain");
    Ok(addresses)
}

/// Resolve a domain straight into an alert filter set
pub async fn resolve_filters(resolver: &dyn NameResolver, domain: &str) -> Result<FilterSet> {
    let addresses = resolve_domain(resolver, domain).await?;
    Ok(FilterSet::networks(addresses.iter().map(|ip| ip.to_string())))
}
