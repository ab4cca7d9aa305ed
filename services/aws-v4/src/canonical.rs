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

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use cloudsign_core::hash::hex_sha256;
use cloudsign_core::Result;
use percent_encoding::utf8_percent_encode;

use crate::constants::{AWS_QUERY_ENCODE_SET, AWS_URI_ENCODE_SET};
use crate::RequestDescription;

/// Encode a decoded path, keeping `/` between segments.
pub fn encode_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    utf8_percent_encode(path, &AWS_URI_ENCODE_SET).to_string()
}

/// Encode a single query name or value; `/` and space become `%2F` and `%20`.
pub fn encode_query_component(s: &str) -> String {
    utf8_percent_encode(s, &AWS_QUERY_ENCODE_SET).to_string()
}

/// Build the canonical query string.
///
/// Names and values are encoded independently, then sorted by encoded name
/// and, for duplicated names, by encoded value.
pub fn encode_query(query: &[(String, String)]) -> String {
    let mut pairs = query
        .iter()
        .map(|(k, v)| (encode_query_component(k), encode_query_component(v)))
        .collect::<Vec<_>>();
    pairs.sort();

    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Trim a header value and collapse runs of internal whitespace into one space.
pub fn normalize_header_value(v: &str) -> String {
    v.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical form of a request, the input of the SigV4 string to sign.
///
/// ```text
/// GET
/// /
/// Action=DescribeRegions&Version=2016-11-15
/// host:ec2.amazonaws.com
/// x-amz-date:20160101T000000Z
///
/// host;x-amz-date
/// e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    /// Uppercase method.
    pub method: String,
    /// Encoded path.
    pub path: String,
    /// Sorted, encoded query string; empty when there is no query.
    pub query: String,
    /// Sorted `(name, value)` pairs with lowercase names and normalized values.
    pub headers: Vec<(String, String)>,
    /// Lowercase header names joined by `;`.
    pub signed_headers: String,
    /// Hex SHA-256 of the payload, or `UNSIGNED-PAYLOAD`.
    pub payload_hash: String,
}

impl CanonicalRequest {
    /// Canonicalize `req` as it will be sent at `amz_date`.
    pub fn build(req: &RequestDescription, amz_date: &str) -> Result<Self> {
        // Repeated header names are signed once with their values comma-joined.
        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in req.signing_headers(amz_date) {
            headers
                .entry(name.to_ascii_lowercase())
                .or_default()
                .push(normalize_header_value(&value));
        }
        let headers = headers
            .into_iter()
            .map(|(k, v)| (k, v.join(",")))
            .collect::<Vec<_>>();
        let signed_headers = headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");

        Ok(Self {
            method: req.method().as_str().to_ascii_uppercase(),
            path: encode_path(req.path()),
            query: encode_query(req.query()),
            headers,
            signed_headers,
            payload_hash: req.payload().hash()?,
        })
    }

    /// Hex SHA-256 of the canonical request.
    pub fn hash(&self) -> String {
        hex_sha256(self.to_string().as_bytes())
    }
}

impl Display for CanonicalRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.method)?;
        writeln!(f, "{}", self.path)?;
        writeln!(f, "{}", self.query)?;
        for (name, value) in &self.headers {
            writeln!(f, "{name}:{value}")?;
        }
        writeln!(f)?;
        writeln!(f, "{}", self.signed_headers)?;
        write!(f, "{}", self.payload_hash)
    }
}
