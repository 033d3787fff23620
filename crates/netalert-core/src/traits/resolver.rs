// # Name Resolver Trait
//
// Defines the interface for turning a domain name into the addresses it
// currently resolves to.
//
// ## Implementations
//
// - System resolver: `netalert_core::resolve::SystemResolver`
// - Tests: static resolvers with fixed answers

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for name resolution
///
/// Implementations return whatever the underlying resolver answered, in its
/// order, possibly empty. Emptiness and duplicate handling are owned by
/// [`crate::resolve::resolve_domain`].
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Look up the addresses for a domain
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<IpAddr>)`: The resolved addresses (may be empty)
    /// - `Err(Error::Resolution)`: The lookup itself failed
    async fn lookup(&self, domain: &str) -> Result<Vec<IpAddr>, crate::Error>;
}
