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

//! Pooled HTTP connection managers backed by reqwest.
//!
//! [`ConnectionPoolRegistry`] hands out one shared [`ConnectionManager`] per
//! [`PoolKey`]. Each manager owns a [`reqwest::Client`] configured from a
//! [`PoolConfig`] and implements [`cloudsign_core::HttpSend`].
//!
//! ```no_run
//! use cloudsign_http_pool_reqwest::{ConnectionPoolRegistry, PoolConfig, PoolKey};
//!
//! # fn main() -> cloudsign_core::Result<()> {
//! let registry = ConnectionPoolRegistry::new();
//! let config = PoolConfig::new().with_max_per_route("10");
//! let manager = registry.get_or_create(&PoolKey::from_config(&config), &config)?;
//! assert_eq!(manager.max_per_route(), 10);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
pub use config::{
    PoolConfig, PoolLimits, TrustMode, CONNECTIONS_MAX_PER_ROUTE, CONNECTIONS_MAX_TOTAL,
    DEFAULT_PROXY_PORT,
};

mod key;
pub use key::PoolKey;

mod manager;
pub use manager::{
    route_of, ConnectionManager, Lease, DEFAULT_MAX_PER_ROUTE, DEFAULT_MAX_TOTAL,
};

mod registry;
pub use registry::ConnectionPoolRegistry;
