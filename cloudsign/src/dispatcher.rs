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

use std::sync::Arc;

use bytes::Bytes;
use cloudsign_aws_v4::{RequestDescription, RequestSigner};
use cloudsign_core::Result;
use cloudsign_http_pool_reqwest::{route_of, ConnectionPoolRegistry, PoolConfig, PoolKey};
use http::Uri;
use log::debug;

/// Signs requests and sends them through the pooled manager matching their
/// connection settings.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    signer: RequestSigner,
    registry: Arc<ConnectionPoolRegistry>,
}

impl Dispatcher {
    /// Create a dispatcher drawing managers from `registry`.
    pub fn new(registry: Arc<ConnectionPoolRegistry>) -> Self {
        Self {
            signer: RequestSigner::new(),
            registry,
        }
    }

    /// The registry managers are drawn from.
    pub fn registry(&self) -> &Arc<ConnectionPoolRegistry> {
        &self.registry
    }

    /// Send `req` through the manager for `pool`.
    ///
    /// The request is signed only once a connection slot for its route is
    /// held, so the signed `x-amz-date` is current when the request leaves.
    /// Pool errors are returned before waiting, signing errors before any I/O.
    pub async fn send(
        &self,
        req: &RequestDescription,
        pool: &PoolConfig,
    ) -> Result<http::Response<Bytes>> {
        let key = PoolKey::from_config(pool);
        let manager = self.registry.get_or_create(&key, pool)?;

        let target = Uri::builder()
            .scheme(req.scheme().clone())
            .authority(req.host())
            .path_and_query("/")
            .build()?;
        let lease = manager.acquire(&route_of(&target)?).await;

        let auth = self.signer.sign(req)?;
        let http_req = req.to_http_request(&auth)?;
        debug!(
            "dispatching {} {} through pool {key}",
            http_req.method(),
            http_req.uri()
        );

        let resp = manager.send_leased(&lease, http_req).await?;
        Ok(resp)
    }
}
