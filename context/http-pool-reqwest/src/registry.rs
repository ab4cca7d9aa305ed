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
use std::sync::{Arc, PoisonError, RwLock};

use cloudsign_core::{PoolProvider, Result};
use log::debug;

use crate::{ConnectionManager, PoolConfig, PoolKey};

/// Registry of shared connection managers keyed by [`PoolKey`].
///
/// A manager is built the first time its key is requested and lives as long
/// as the registry. Share the registry itself through an [`Arc`].
#[derive(Debug, Default)]
pub struct ConnectionPoolRegistry {
    managers: RwLock<HashMap<PoolKey, Arc<ConnectionManager>>>,
    created: AtomicUsize,
}

impl ConnectionPoolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the manager for `key`, building it from `config` on first use.
    ///
    /// The limits in `config` are applied to the returned manager even when it
    /// already existed, so the latest caller's limits win. Proxy and TLS
    /// settings of an existing manager are left as its creator set them.
    ///
    /// Invalid limits fail before the registry is touched.
    pub fn get_or_create(
        &self,
        key: &PoolKey,
        config: &PoolConfig,
    ) -> Result<Arc<ConnectionManager>> {
        let limits = config.limits()?;

        let manager = match self.get(key) {
            Some(m) => m,
            None => self.create(key, config)?,
        };
        limits.apply(&manager);
        Ok(manager)
    }

    /// Return the manager for `key` if it has been created.
    pub fn get(&self, key: &PoolKey) -> Option<Arc<ConnectionManager>> {
        self.managers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn create(&self, key: &PoolKey, config: &PoolConfig) -> Result<Arc<ConnectionManager>> {
        let mut managers = self.managers.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have created it while we waited for the lock.
        if let Some(m) = managers.get(key) {
            return Ok(m.clone());
        }

        let manager = Arc::new(ConnectionManager::new(config)?);
        managers.insert(key.clone(), manager.clone());
        self.created.fetch_add(1, Ordering::Relaxed);
        debug!("connection manager registered for key {key}");
        Ok(manager)
    }

    /// Number of managers held.
    pub fn len(&self) -> usize {
        self.managers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no manager has been created yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of managers this registry has constructed.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

impl PoolProvider for ConnectionPoolRegistry {
    type Key = PoolKey;
    type Config = PoolConfig;
    type Manager = ConnectionManager;

    fn get_or_create(&self, key: &PoolKey, config: &PoolConfig) -> Result<Arc<ConnectionManager>> {
        ConnectionPoolRegistry::get_or_create(self, key, config)
    }
}
