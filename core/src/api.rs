use std::fmt::Debug;
use std::sync::Arc;

use crate::Result;

/// SigningService turns a request description into an authorization value.
///
/// Implementations must be pure: no network, no shared mutable state, safe
/// to call from any number of threads at once.
pub trait SigningService: Debug + Send + Sync + 'static {
    /// Description of the request to sign.
    type Request;
    /// Signing output, typically an authorization header.
    type Output;

    /// Sign the request.
    fn sign(&self, req: &Self::Request) -> Result<Self::Output>;
}

/// PoolProvider hands out shared connection managers keyed by connection
/// settings.
///
/// A provider creates at most one manager per key and returns the same
/// instance to every caller using that key.
pub trait PoolProvider: Debug + Send + Sync + 'static {
    /// Identity of a pool.
    type Key;
    /// Settings used to build a manager on first use.
    type Config;
    /// The shared manager.
    type Manager: Send + Sync;

    /// Return the manager for `key`, creating it from `config` if absent.
    fn get_or_create(&self, key: &Self::Key, config: &Self::Config) -> Result<Arc<Self::Manager>>;
}
