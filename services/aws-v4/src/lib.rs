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

//! AWS Signature Version 4 signing.
//!
//! Describe a request with [`RequestDescription`], sign it with
//! [`RequestSigner`], and attach the resulting [`AuthorizationHeader`]:
//!
//! ```
//! use cloudsign_aws_v4::{Credential, RequestDescription, RequestSigner};
//!
//! # fn main() -> cloudsign_core::Result<()> {
//! let req = RequestDescription::builder()
//!     .method("GET")
//!     .host("ec2.amazonaws.com")
//!     .query("Action", "DescribeRegions")
//!     .query("Version", "2016-11-15")
//!     .region("us-east-1")
//!     .service("ec2")
//!     .credential(Credential::new("access_key_id", "secret_access_key"))
//!     .build()?;
//!
//! let auth = RequestSigner::new().sign(&req)?;
//! let http_req = req.to_http_request(&auth)?;
//! assert!(http_req.headers().contains_key(http::header::AUTHORIZATION));
//! # Ok(())
//! # }
//! ```

mod constants;
pub use constants::{ALGORITHM, DEFAULT_REGION, UNSIGNED_PAYLOAD};

mod config;
pub use config::Config;

mod credential;
pub use credential::Credential;

mod request;
pub use request::{Payload, RequestDescription, RequestDescriptionBuilder};

mod canonical;
pub use canonical::{encode_path, encode_query, encode_query_component, CanonicalRequest};

mod sign_request;
pub use sign_request::{
    generate_signing_key, string_to_sign, AuthorizationHeader, CredentialScope, RequestSigner,
};
