// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use cloudsign_core::{Error, HttpSend, Result};
use http::Uri;
use http_body_util::BodyExt;
use log::debug;
use reqwest::{Client, Request};
use tokio::sync::Notify;

use crate::{PoolConfig, TrustMode};

/// Default max in-flight requests per route.
pub const DEFAULT_MAX_PER_ROUTE: usize = 2;
/// Default max in-flight requests in total.
pub const DEFAULT_MAX_TOTAL: usize = 20;

#[derive(Debug, Default)]
struct Leases {
    total: usize,
    per_route: HashMap<String, usize>,
}

/// Pooled HTTP connection manager.
///
/// Wraps a [`reqwest::Client`] whose TLS and proxy settings are fixed at
/// construction, and caps in-flight requests per route (`host:port`) and in
/// total. The caps can be changed at any time; leases already held are not
/// revoked.
#[derive(Debug)]
pub struct ConnectionManager {
    client: Client,
    trust_mode: TrustMode,
    proxy: Option<String>,

    max_per_route: AtomicUsize,
    max_total: AtomicUsize,
    leases: Mutex<Leases>,
    released: Notify,
}

impl ConnectionManager {
    /// Build a manager from `config`.
    pub fn new(config: &PoolConfig) -> Result<Self> {
        let limits = config.limits()?;
        let max_per_route = limits.max_per_route.unwrap_or(DEFAULT_MAX_PER_ROUTE);
        let max_total = limits.max_total.unwrap_or(DEFAULT_MAX_TOTAL);
        let proxy = config.proxy_url()?;

        let mut builder = Client::builder().pool_max_idle_per_host(max_per_route);
        builder = match config.trust_mode {
            TrustMode::Strict => builder,
            TrustMode::AllowAllHostnames => builder.danger_accept_invalid_hostnames(true),
            TrustMode::TrustAllRoots => builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true),
        };
        if let Some(url) = &proxy {
            let p = reqwest::Proxy::all(url).map_err(|e| {
                Error::config_invalid(format!("invalid proxy: {url}")).with_source(e)
            })?;
            builder = builder.proxy(p);
        }
        let client = builder
            .build()
            .map_err(|e| Error::unexpected("failed to build http client").with_source(e))?;

        debug!(
            "connection manager created: trust_mode={}, proxy={proxy:?}, max_per_route={max_per_route}, max_total={max_total}",
            config.trust_mode
        );
        Ok(Self {
            client,
            trust_mode: config.trust_mode,
            proxy,
            max_per_route: AtomicUsize::new(max_per_route),
            max_total: AtomicUsize::new(max_total),
            leases: Mutex::default(),
            released: Notify::new(),
        })
    }

    /// The underlying client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// TLS trust mode bound at construction.
    pub fn trust_mode(&self) -> TrustMode {
        self.trust_mode
    }

    /// Proxy url bound at construction.
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    /// Max in-flight requests per route.
    pub fn max_per_route(&self) -> usize {
        self.max_per_route.load(Ordering::Acquire)
    }

    /// Max in-flight requests in total.
    pub fn max_total(&self) -> usize {
        self.max_total.load(Ordering::Acquire)
    }

    /// Change the per-route cap. Zero is ignored.
    pub fn set_max_per_route(&self, n: usize) {
        if n > 0 && self.max_per_route.swap(n, Ordering::AcqRel) != n {
            debug!("connection manager max_per_route set to {n}");
            self.released.notify_waiters();
        }
    }

    /// Change the total cap. Zero is ignored.
    pub fn set_max_total(&self, n: usize) {
        if n > 0 && self.max_total.swap(n, Ordering::AcqRel) != n {
            debug!("connection manager max_total set to {n}");
            self.released.notify_waiters();
        }
    }

    /// Requests in flight across all routes.
    pub fn leased(&self) -> usize {
        self.lock().total
    }

    /// Requests in flight for `route`.
    pub fn leased_for(&self, route: &str) -> usize {
        self.lock().per_route.get(route).copied().unwrap_or_default()
    }

    /// Take a lease for `route` if both caps allow it.
    pub fn try_acquire(&self, route: &str) -> Option<Lease<'_>> {
        let mut leases = self.lock();
        let used = leases.per_route.get(route).copied().unwrap_or_default();
        if leases.total >= self.max_total() || used >= self.max_per_route() {
            return None;
        }

        leases.total += 1;
        leases.per_route.insert(route.to_string(), used + 1);
        Some(Lease {
            manager: self,
            route: route.to_string(),
        })
    }

    /// Wait until a lease for `route` is available.
    pub async fn acquire(&self, route: &str) -> Lease<'_> {
        loop {
            // Registered before checking so a release in between is not missed.
            let released = self.released.notified();
            if let Some(lease) = self.try_acquire(route) {
                return lease;
            }
            released.await;
        }
    }

    fn release(&self, route: &str) {
        {
            let mut leases = self.lock();
            leases.total = leases.total.saturating_sub(1);
            if let Some(used) = leases.per_route.get_mut(route) {
                *used -= 1;
                if *used == 0 {
                    leases.per_route.remove(route);
                }
            }
        }
        self.released.notify_waiters();
    }

    fn lock(&self) -> MutexGuard<'_, Leases> {
        // Counters stay consistent even if a holder panicked.
        self.leases.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A held slot of a [`ConnectionManager`], released on drop.
#[derive(Debug)]
pub struct Lease<'a> {
    manager: &'a ConnectionManager,
    route: String,
}

impl Lease<'_> {
    /// Route this lease counts against.
    pub fn route(&self) -> &str {
        &self.route
    }
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        self.manager.release(&self.route);
    }
}

/// Route of a uri: `host:port`, with the scheme's default port filled in.
pub fn route_of(uri: &Uri) -> Result<String> {
    let host = uri
        .host()
        .ok_or_else(|| Error::request_invalid(format!("request uri has no host: {uri}")))?;
    let port = uri.port_u16().unwrap_or(match uri.scheme_str() {
        Some("http") => 80,
        _ => 443,
    });
    Ok(format!("{host}:{port}"))
}

impl ConnectionManager {
    /// Send `req` on a lease already taken from this manager.
    ///
    /// Lets a caller wait for capacity before doing time sensitive work such
    /// as signing. The lease must come from this manager and cover the
    /// request's route.
    pub async fn send_leased(
        &self,
        lease: &Lease<'_>,
        req: http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>> {
        if !std::ptr::eq(lease.manager, self) {
            return Err(Error::request_invalid(
                "lease was taken from another connection manager",
            ));
        }
        let route = route_of(req.uri())?;
        if lease.route != route {
            return Err(Error::request_invalid(format!(
                "lease for {} can't send to {route}",
                lease.route
            )));
        }

        let req = Request::try_from(req)
            .map_err(|e| Error::request_invalid("failed to convert request").with_source(e))?;
        let resp: http::Response<_> = self
            .client
            .execute(req)
            .await
            .map_err(|e| Error::unexpected("failed to send request").with_source(e))?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(|e| Error::unexpected("failed to read response body").with_source(e))?;
        Ok(http::Response::from_parts(parts, bs))
    }
}

#[async_trait]
impl HttpSend for ConnectionManager {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let route = route_of(req.uri())?;
        let lease = self.acquire(&route).await;
        let resp = self.send_leased(&lease, req).await?;
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn manager(per_route: &str, total: &str) -> ConnectionManager {
        ConnectionManager::new(
            &PoolConfig::new()
                .with_max_per_route(per_route)
                .with_max_total(total),
        )
        .expect("manager must build")
    }

    #[test]
    fn test_defaults() {
        let m = ConnectionManager::new(&PoolConfig::new()).unwrap();
        assert_eq!(m.max_per_route(), DEFAULT_MAX_PER_ROUTE);
        assert_eq!(m.max_total(), DEFAULT_MAX_TOTAL);
        assert_eq!(m.trust_mode(), TrustMode::Strict);
        assert_eq!(m.proxy(), None);
    }

    #[test]
    fn test_proxy_bound() {
        let m = ConnectionManager::new(
            &PoolConfig::new()
                .with_proxy("127.0.0.1", "3128")
                .with_trust_mode(TrustMode::TrustAllRoots),
        )
        .unwrap();
        assert_eq!(m.proxy(), Some("http://127.0.0.1:3128"));
        assert_eq!(m.trust_mode(), TrustMode::TrustAllRoots);
    }

    #[test]
    fn test_per_route_cap() {
        let m = manager("1", "10");

        let a = m.try_acquire("a:443").expect("first lease");
        assert!(m.try_acquire("a:443").is_none());
        let _b = m.try_acquire("b:443").expect("other route");
        assert_eq!(m.leased(), 2);
        assert_eq!(m.leased_for("a:443"), 1);

        drop(a);
        assert_eq!(m.leased_for("a:443"), 0);
        assert!(m.try_acquire("a:443").is_some());
    }

    #[test]
    fn test_total_cap() {
        let m = manager("5", "2");

        let _a = m.try_acquire("a:443").unwrap();
        let _b = m.try_acquire("b:443").unwrap();
        assert!(m.try_acquire("c:443").is_none());

        m.set_max_total(3);
        assert!(m.try_acquire("c:443").is_some());
    }

    #[test]
    fn test_zero_cap_ignored() {
        let m = manager("3", "4");
        m.set_max_per_route(0);
        m.set_max_total(0);
        assert_eq!(m.max_per_route(), 3);
        assert_eq!(m.max_total(), 4);
    }

    #[tokio::test]
    async fn test_acquire_waits_for_release() {
        let m = Arc::new(manager("1", "1"));
        let held = m.try_acquire("a:443").unwrap();

        let waiter = {
            let m = m.clone();
            tokio::spawn(async move {
                let lease = m.acquire("a:443").await;
                lease.route().to_string()
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(held);
        let route = tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("waiter must wake")
            .expect("task must not panic");
        assert_eq!(route, "a:443");
        assert_eq!(m.leased(), 0);
    }

    #[test]
    fn test_route_of() {
        let uri = Uri::from_static("https://ec2.amazonaws.com/?a=b");
        assert_eq!(route_of(&uri).unwrap(), "ec2.amazonaws.com:443");

        let uri = Uri::from_static("http://127.0.0.1:9000/");
        assert_eq!(route_of(&uri).unwrap(), "127.0.0.1:9000");

        let uri = Uri::from_static("/relative");
        assert!(route_of(&uri).unwrap_err().is_signature_error());
    }

    #[tokio::test]
    async fn test_send_leased_rejects_foreign_lease() {
        let a = manager("1", "1");
        let b = manager("1", "1");
        let lease = a.try_acquire("127.0.0.1:9").unwrap();

        let req = http::Request::get("http://127.0.0.1:9/")
            .body(Bytes::new())
            .unwrap();
        let err = b.send_leased(&lease, req).await.unwrap_err();
        assert!(err.message().contains("another connection manager"));
    }

    #[tokio::test]
    async fn test_send_leased_rejects_other_route() {
        let m = manager("1", "1");
        let lease = m.try_acquire("example.com:443").unwrap();

        let req = http::Request::get("http://127.0.0.1:9/")
            .body(Bytes::new())
            .unwrap();
        let err = m.send_leased(&lease, req).await.unwrap_err();
        assert!(err.message().contains("can't send to 127.0.0.1:9"));
        assert_eq!(m.leased(), 1);
    }
}
