use bytes::Bytes;
use std::fmt::Debug;

use crate::Result;

/// HttpSend is used to dispatch a signed request.
///
/// Pooled connection managers implement this so callers can hand a signed
/// `http::Request` to whichever manager the pool registry returned.
#[async_trait::async_trait]
pub trait HttpSend: Debug + Send + Sync + 'static {
    /// Send http request and return the response.
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>>;
}
