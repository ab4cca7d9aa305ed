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

use crate::PoolConfig;

/// Rendering of an absent key component.
const NULL_COMPONENT: &str = "null";

/// Identity of a pooled connection manager.
///
/// Two requests share a manager iff their keys are equal. A key is the
/// `:` joined rendering of its components, with absent components shown as
/// `null`, so `[Some("proxy"), None]` and `[Some("proxy"), Some("null")]`
/// collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolKey(String);

impl PoolKey {
    /// Build a key from raw components.
    pub fn from_components(components: &[Option<&str>]) -> Self {
        let key = components
            .iter()
            .map(|v| v.unwrap_or(NULL_COMPONENT))
            .collect::<Vec<_>>()
            .join(":");
        Self(key)
    }

    /// Build the key of a [`PoolConfig`].
    ///
    /// Components: proxy host, proxy port, trust mode, max per route and max
    /// total.
    pub fn from_config(config: &PoolConfig) -> Self {
        Self::from_components(&[
            config.proxy_host.as_deref(),
            config.proxy_port.as_deref(),
            Some(config.trust_mode.as_str()),
            config.max_per_route.as_deref(),
            config.max_total.as_deref(),
        ])
    }

    /// Key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PoolKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PoolKey {
    fn from(v: &str) -> Self {
        Self(v.to_string())
    }
}

impl From<String> for PoolKey {
    fn from(v: String) -> Self {
        Self(v)
    }
}
