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

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use cloudsign_core::{Error, Result};

use crate::ConnectionManager;

/// Input name used in errors about the per-route limit.
pub const CONNECTIONS_MAX_PER_ROUTE: &str = "connectionsMaxPerRoute";
/// Input name used in errors about the total limit.
pub const CONNECTIONS_MAX_TOTAL: &str = "connectionsMaxTotal";
/// Proxy port used when a proxy host is given without one.
pub const DEFAULT_PROXY_PORT: u16 = 8080;

/// How the TLS peer is verified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TrustMode {
    /// Verify certificate chain and hostname.
    #[default]
    Strict,
    /// Verify the chain but accept any hostname.
    AllowAllHostnames,
    /// Accept any certificate.
    TrustAllRoots,
}

impl TrustMode {
    /// Stable name used in pool keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustMode::Strict => "strict",
            TrustMode::AllowAllHostnames => "allow_all",
            TrustMode::TrustAllRoots => "trust_all_roots",
        }
    }
}

impl Display for TrustMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrustMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            // `browser_compatible` still verifies hostnames.
            "" | "strict" | "browser_compatible" => Ok(TrustMode::Strict),
            "allow_all" => Ok(TrustMode::AllowAllHostnames),
            "true" | "trust_all_roots" => Ok(TrustMode::TrustAllRoots),
            v => Err(Error::config_invalid(format!("unknown tls trust mode: {v}"))),
        }
    }
}

/// Connection settings a pooled manager is built from.
///
/// Values stay strings the way the host hands them over; they are parsed
/// when a manager is requested so a bad value fails only that request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolConfig {
    /// Proxy host, no proxy when absent or empty.
    pub proxy_host: Option<String>,
    /// Proxy port, [`DEFAULT_PROXY_PORT`] when absent or empty.
    pub proxy_port: Option<String>,
    /// TLS verification mode.
    pub trust_mode: TrustMode,
    /// Max connections per route.
    pub max_per_route: Option<String>,
    /// Max connections in total.
    pub max_total: Option<String>,
}

impl PoolConfig {
    /// Create an empty config: no proxy, strict TLS, default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the proxy.
    pub fn with_proxy(mut self, host: impl Into<String>, port: impl Into<String>) -> Self {
        self.proxy_host = Some(host.into());
        self.proxy_port = Some(port.into());
        self
    }

    /// Set the TLS trust mode.
    pub fn with_trust_mode(mut self, mode: TrustMode) -> Self {
        self.trust_mode = mode;
        self
    }

    /// Set the per-route limit.
    pub fn with_max_per_route(mut self, v: impl Into<String>) -> Self {
        self.max_per_route = Some(v.into());
        self
    }

    /// Set the total limit.
    pub fn with_max_total(mut self, v: impl Into<String>) -> Self {
        self.max_total = Some(v.into());
        self
    }

    /// Parse the pool limits.
    pub fn limits(&self) -> Result<PoolLimits> {
        Ok(PoolLimits {
            max_per_route: parse_limit(self.max_per_route.as_deref(), CONNECTIONS_MAX_PER_ROUTE)?,
            max_total: parse_limit(self.max_total.as_deref(), CONNECTIONS_MAX_TOTAL)?,
        })
    }

    /// Proxy url, if a proxy host is set.
    pub fn proxy_url(&self) -> Result<Option<String>> {
        let Some(host) = self.proxy_host.as_deref().filter(|v| !v.is_empty()) else {
            return Ok(None);
        };
        let port = match self.proxy_port.as_deref().filter(|v| !v.is_empty()) {
            None => DEFAULT_PROXY_PORT,
            Some(v) => v.trim().parse::<u16>().map_err(|e| {
                Error::config_invalid(format!("the proxy port should be a port number: {v}"))
                    .with_source(e)
            })?,
        };
        Ok(Some(format!("http://{host}:{port}")))
    }
}

/// Limits parsed from a [`PoolConfig`]; `None` leaves the current value alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolLimits {
    /// Max connections per route.
    pub max_per_route: Option<usize>,
    /// Max connections in total.
    pub max_total: Option<usize>,
}

impl PoolLimits {
    /// Overwrite the manager's limits with the ones set here.
    pub fn apply(&self, manager: &ConnectionManager) {
        if let Some(v) = self.max_per_route {
            manager.set_max_per_route(v);
        }
        if let Some(v) = self.max_total {
            manager.set_max_total(v);
        }
    }
}

fn parse_limit(v: Option<&str>, input: &str) -> Result<Option<usize>> {
    let Some(v) = v.filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    match v.trim().parse::<usize>() {
        Ok(0) => Err(Error::config_invalid(format!(
            "the '{input}' input should be a positive integer"
        ))),
        Ok(n) => Ok(Some(n)),
        Err(e) => Err(
            Error::config_invalid(format!("the '{input}' input should be integer: {v}"))
                .with_source(e),
        ),
    }
}
