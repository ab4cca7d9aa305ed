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

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::str::FromStr;

use bytes::Bytes;
use cloudsign_core::hash::{hex_sha256, hex_sha256_reader, EMPTY_SHA256};
use cloudsign_core::time::DateTime;
use cloudsign_core::{Error, Result};
use http::header::{HeaderName, HeaderValue, AUTHORIZATION, HOST};
use http::uri::Scheme;
use http::{Method, Uri};
use percent_encoding::percent_decode_str;

use crate::canonical::{encode_path, encode_query};
use crate::constants::*;
use crate::{AuthorizationHeader, Credential};

/// Payload of the request being signed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Payload {
    /// No body; hashed as the empty byte sequence.
    #[default]
    Empty,
    /// In-memory body.
    Bytes(Bytes),
    /// Body streamed from a file when hashing and sending.
    File(PathBuf),
    /// Body left out of the signature, signed as `UNSIGNED-PAYLOAD`.
    Unsigned(Bytes),
}

impl Payload {
    /// Lowercase hex SHA-256 of the payload, or `UNSIGNED-PAYLOAD`.
    pub fn hash(&self) -> Result<String> {
        match self {
            Payload::Empty => Ok(EMPTY_SHA256.to_string()),
            Payload::Bytes(bs) => Ok(hex_sha256(bs)),
            Payload::File(path) => {
                let f = File::open(path).map_err(|e| {
                    Error::payload_unreadable(format!("failed to open payload {}", path.display()))
                        .with_source(e)
                })?;
                hex_sha256_reader(BufReader::new(f))
            }
            Payload::Unsigned(_) => Ok(UNSIGNED_PAYLOAD.to_string()),
        }
    }

    /// Load the payload into memory for sending.
    pub fn to_bytes(&self) -> Result<Bytes> {
        match self {
            Payload::Empty => Ok(Bytes::new()),
            Payload::Bytes(bs) | Payload::Unsigned(bs) => Ok(bs.clone()),
            Payload::File(path) => std::fs::read(path).map(Bytes::from).map_err(|e| {
                Error::payload_unreadable(format!("failed to read payload {}", path.display()))
                    .with_source(e)
            }),
        }
    }
}

/// Immutable description of an HTTP request to sign.
///
/// Built through [`RequestDescription::builder`], which enforces that method,
/// host and region are present. The path is stored decoded; it is encoded once
/// while canonicalizing.
#[derive(Debug, Clone)]
pub struct RequestDescription {
    method: Method,
    scheme: Scheme,
    host: String,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(HeaderName, String)>,
    payload: Payload,
    region: String,
    service: String,
    credential: Credential,
    timestamp: Option<DateTime>,
}

impl RequestDescription {
    /// Start building a request description.
    pub fn builder() -> RequestDescriptionBuilder {
        RequestDescriptionBuilder::default()
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// URI scheme used when the request is turned into an `http::Request`.
    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    /// Target host, including the port if one was given.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Decoded URI path, `/` when none was given.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query pairs in insertion order, decoded.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Caller supplied headers.
    pub fn headers(&self) -> &[(HeaderName, String)] {
        &self.headers
    }

    /// Request payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Region the request is scoped to.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Service the request is scoped to, e.g. `ec2`.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Signing credential.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Caller supplied signing time.
    pub fn timestamp(&self) -> Option<DateTime> {
        self.timestamp
    }

    /// Headers that take part in the signature, with lowercase names and raw values.
    ///
    /// `host` and `x-amz-date` always come from the description itself;
    /// caller supplied copies of them, and any `authorization` header, are
    /// dropped.
    pub fn signing_headers(&self, amz_date: &str) -> Vec<(String, String)> {
        let mut headers = Vec::with_capacity(self.headers.len() + 4);
        headers.push((HOST.as_str().to_string(), self.host.clone()));
        headers.push((X_AMZ_DATE.to_string(), amz_date.to_string()));
        if let Some(token) = &self.credential.session_token {
            headers.push((X_AMZ_SECURITY_TOKEN.to_string(), token.clone()));
        }
        if matches!(self.payload, Payload::Unsigned(_)) {
            headers.push((
                X_AMZ_CONTENT_SHA_256.to_string(),
                UNSIGNED_PAYLOAD.to_string(),
            ));
        }

        for (name, value) in &self.headers {
            if name == HOST
                || name == AUTHORIZATION
                || name.as_str() == X_AMZ_DATE
                || name.as_str() == X_AMZ_SECURITY_TOKEN
                || (name.as_str() == X_AMZ_CONTENT_SHA_256
                    && matches!(self.payload, Payload::Unsigned(_)))
            {
                continue;
            }
            headers.push((name.as_str().to_string(), value.clone()));
        }

        headers
    }

    /// Build the `http::Request` carrying this description and its signature.
    pub fn to_http_request(&self, auth: &AuthorizationHeader) -> Result<http::Request<Bytes>> {
        let query = encode_query(&self.query);
        let paq = if query.is_empty() {
            encode_path(&self.path)
        } else {
            format!("{}?{}", encode_path(&self.path), query)
        };
        let uri = Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.host.as_str())
            .path_and_query(paq)
            .build()?;

        let mut builder = http::Request::builder()
            .method(self.method.clone())
            .uri(uri);
        for (name, value) in self.signing_headers(auth.amz_date()) {
            let mut value = HeaderValue::from_str(&value)?;
            if name == X_AMZ_SECURITY_TOKEN {
                value.set_sensitive(true);
            }
            builder = builder.header(name, value);
        }
        builder = builder.header(AUTHORIZATION, auth.to_header_value()?);

        Ok(builder.body(self.payload.to_bytes()?)?)
    }
}

/// Builder for [`RequestDescription`].
#[derive(Debug, Default, Clone)]
pub struct RequestDescriptionBuilder {
    method: Option<String>,
    scheme: Option<Scheme>,
    host: Option<String>,
    path: Option<String>,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    payload: Payload,
    region: Option<String>,
    service: Option<String>,
    credential: Credential,
    timestamp: Option<DateTime>,
}

impl RequestDescriptionBuilder {
    /// Set the HTTP method, case-insensitive.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Set scheme, host, path and query from an URI.
    ///
    /// The path and query are percent-decoded so they are encoded exactly once
    /// while signing.
    pub fn uri(mut self, uri: &str) -> Result<Self> {
        let uri = Uri::from_str(uri)?;
        let Some(authority) = uri.authority() else {
            return Err(Error::request_invalid(
                "request without authority is invalid for signing",
            ));
        };

        self.scheme = Some(uri.scheme().cloned().unwrap_or(Scheme::HTTPS));
        self.host = Some(authority.as_str().to_string());
        self.path = Some(
            percent_decode_str(uri.path())
                .decode_utf8()
                .map_err(|e| Error::request_invalid("path is not valid utf-8").with_source(e))?
                .into_owned(),
        );
        if let Some(query) = uri.query() {
            self.query.extend(
                form_urlencoded::parse(query.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned())),
            );
        }
        Ok(self)
    }

    /// Set the URI scheme, `https` by default.
    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = Some(scheme);
        self
    }

    /// Set the target host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the decoded URI path.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Append a query parameter. Duplicated names are kept.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Append a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the payload.
    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Set the region.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set the service name, e.g. `ec2`.
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Set the signing credential.
    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    /// Set the signing time.
    ///
    /// When unset, the signer takes the current time once per signing.
    pub fn timestamp(mut self, timestamp: DateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Validate and build the description.
    pub fn build(self) -> Result<RequestDescription> {
        let method = self
            .method
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::request_invalid("method is required"))?;
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;

        let host = self
            .host
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::request_invalid("host is required"))?;
        let region = self
            .region
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::request_invalid("region is required"))?;

        let path = match self.path {
            Some(p) if p.is_empty() => "/".to_string(),
            Some(p) if !p.starts_with('/') => format!("/{p}"),
            Some(p) => p,
            None => "/".to_string(),
        };

        let headers = self
            .headers
            .into_iter()
            .map(|(k, v)| -> Result<(HeaderName, String)> {
                Ok((HeaderName::from_bytes(k.as_bytes())?, v))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RequestDescription {
            method,
            scheme: self.scheme.unwrap_or(Scheme::HTTPS),
            host,
            path,
            query: self.query,
            headers,
            payload: self.payload,
            region,
            service: self.service.unwrap_or_default(),
            credential: self.credential,
            timestamp: self.timestamp,
        })
    }
}
