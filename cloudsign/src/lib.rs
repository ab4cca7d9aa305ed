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

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

// Re-export core types.
pub use cloudsign_core::*;

#[cfg(feature = "aws")]
pub mod aws {
    //! AWS SigV4 request signing.
    pub use cloudsign_aws_v4::*;
}

#[cfg(feature = "pool")]
pub mod pool {
    //! Shared pooled HTTP connection managers.
    pub use cloudsign_http_pool_reqwest::*;
}

#[cfg(all(feature = "aws", feature = "pool"))]
mod dispatcher;
#[cfg(all(feature = "aws", feature = "pool"))]
pub use dispatcher::Dispatcher;
