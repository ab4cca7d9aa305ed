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

use cloudsign_core::hash::{hex_hmac_sha256, hmac_sha256};
use cloudsign_core::time::{check_signable, format_date, format_iso8601, now, DateTime};
use cloudsign_core::{Error, Result, SigningService};
use http::HeaderValue;
use log::debug;

use crate::canonical::CanonicalRequest;
use crate::constants::{ALGORITHM, AWS4_REQUEST};
use crate::RequestDescription;

/// Credential scope: `20220313/<region>/<service>/aws4_request`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialScope {
    date: String,
    region: String,
    service: String,
}

impl CredentialScope {
    /// Build the scope of a request signed at `time`.
    pub fn new(time: DateTime, region: &str, service: &str) -> Self {
        Self {
            date: format_date(time),
            region: region.to_string(),
            service: service.to_string(),
        }
    }

    /// Date stamp, `YYYYMMDD`.
    pub fn date(&self) -> &str {
        &self.date
    }

    /// Region.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Service.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Derive the signing key through the four stage HMAC-SHA256 chain.
    pub fn signing_key(&self, secret: &str) -> Vec<u8> {
        generate_signing_key(secret, &self.date, &self.region, &self.service)
    }
}

impl Display for CredentialScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.date, self.region, self.service, AWS4_REQUEST
        )
    }
}

/// Derive the SigV4 signing key.
///
/// `key = HMAC(HMAC(HMAC(HMAC("AWS4" + secret, date), region), service), "aws4_request")`
pub fn generate_signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    // Sign secret
    let secret = format!("AWS4{secret}");
    // Sign date
    let sign_date = hmac_sha256(secret.as_bytes(), date.as_bytes());
    // Sign region
    let sign_region = hmac_sha256(sign_date.as_slice(), region.as_bytes());
    // Sign service
    let sign_service = hmac_sha256(sign_region.as_slice(), service.as_bytes());
    // Sign request
    hmac_sha256(sign_service.as_slice(), AWS4_REQUEST.as_bytes())
}

/// Build the string to sign.
///
/// ```text
/// AWS4-HMAC-SHA256
/// 20220313T072004Z
/// 20220313/<region>/<service>/aws4_request
/// <hashed_canonical_request>
/// ```
pub fn string_to_sign(amz_date: &str, scope: &CredentialScope, creq: &CanonicalRequest) -> String {
    format!("{ALGORITHM}\n{amz_date}\n{scope}\n{}", creq.hash())
}

/// Value of the `Authorization` header for one signed request.
///
/// It is bound to the canonical form and timestamp it was computed from and
/// must not be reused for another request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationHeader {
    access_key_id: String,
    scope: CredentialScope,
    signed_headers: String,
    signature: String,
    amz_date: String,
}

impl AuthorizationHeader {
    /// Algorithm identifier, always `AWS4-HMAC-SHA256`.
    pub fn algorithm(&self) -> &'static str {
        ALGORITHM
    }

    /// `<access key>/<scope>`.
    pub fn credential(&self) -> String {
        format!("{}/{}", self.access_key_id, self.scope)
    }

    /// Scope the signature is bound to.
    pub fn scope(&self) -> &CredentialScope {
        &self.scope
    }

    /// Signed header names joined by `;`.
    pub fn signed_headers(&self) -> &str {
        &self.signed_headers
    }

    /// Lowercase hex signature.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// `x-amz-date` value the signature covers, e.g. `20160101T000000Z`.
    pub fn amz_date(&self) -> &str {
        &self.amz_date
    }

    /// Render as a sensitive header value.
    pub fn to_header_value(&self) -> Result<HeaderValue> {
        let mut value = HeaderValue::from_str(&self.to_string())?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl Display for AuthorizationHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} Credential={}, SignedHeaders={}, Signature={}",
            ALGORITHM,
            self.credential(),
            self.signed_headers,
            self.signature
        )
    }
}

/// RequestSigner that implement AWS SigV4.
///
/// - [Signature Version 4 signing process](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
///
/// The signer holds no state; region, service, credential and time all come
/// from the [`RequestDescription`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestSigner;

impl RequestSigner {
    /// Create a new AWS V4 signer.
    pub fn new() -> Self {
        Self
    }

    /// Sign `req` and return its authorization header.
    pub fn sign(&self, req: &RequestDescription) -> Result<AuthorizationHeader> {
        let cred = req.credential();
        if cred.secret_access_key.is_empty() {
            return Err(Error::credential_invalid("secret access key is empty"));
        }

        let now = req.timestamp().unwrap_or_else(now);
        check_signable(now)?;
        let amz_date = format_iso8601(now);

        let creq = CanonicalRequest::build(req, &amz_date)?;
        debug!("calculated canonical request: {creq}");

        let scope = CredentialScope::new(now, req.region(), req.service());
        debug!("calculated scope: {scope}");

        let string_to_sign = string_to_sign(&amz_date, &scope, &creq);
        debug!("calculated string to sign: {string_to_sign}");

        let signing_key = scope.signing_key(&cred.secret_access_key);
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        Ok(AuthorizationHeader {
            access_key_id: cred.access_key_id.clone(),
            scope,
            signed_headers: creq.signed_headers,
            signature,
            amz_date,
        })
    }
}

impl SigningService for RequestSigner {
    type Request = RequestDescription;
    type Output = AuthorizationHeader;

    fn sign(&self, req: &RequestDescription) -> Result<AuthorizationHeader> {
        RequestSigner::sign(self, req)
    }
}
