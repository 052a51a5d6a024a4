//! Proxy routing.
//!
//! [`ProxyRouter`] decides per request whether to go direct or through the
//! configured proxy. Both network backends consult the same router so the
//! decision never depends on which backend is active.

pub mod exceptions;
pub mod router;

pub use exceptions::ProxyExceptions;
pub use router::{ProxyCredentials, ProxyRoute, ProxyRouter};
