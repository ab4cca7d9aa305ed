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

use std::fmt::{Debug, Formatter};

use cloudsign_core::utils::Redact;
use cloudsign_core::{Env, Error, Result};
use log::debug;

use crate::constants::*;
use crate::Credential;

/// Config for aws services.
///
/// Fields set explicitly always win over values loaded by [`Config::from_env`].
#[derive(Clone, Default)]
pub struct Config {
    /// `region` will be loaded from:
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AWS_REGION`], then [`AWS_DEFAULT_REGION`]
    /// - [`DEFAULT_REGION`] as the last resort
    pub region: Option<String>,
    /// `access_key_id` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AWS_ACCESS_KEY_ID`]
    pub access_key_id: Option<String>,
    /// `secret_access_key` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AWS_SECRET_ACCESS_KEY`]
    pub secret_access_key: Option<String>,
    /// `session_token` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AWS_SESSION_TOKEN`]
    pub session_token: Option<String>,
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("region", &self.region)
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("session_token", &Redact::from(&self.session_token))
            .finish()
    }
}

impl Config {
    /// Load config from env.
    pub fn from_env(mut self, env: &dyn Env) -> Self {
        let envs = env.vars();

        if self.region.is_none() {
            self.region = [AWS_REGION, AWS_DEFAULT_REGION]
                .into_iter()
                .filter_map(|k| envs.get(k))
                .find(|v| !v.is_empty())
                .cloned();
        }
        if self.access_key_id.is_none() {
            self.access_key_id = envs.get(AWS_ACCESS_KEY_ID).cloned();
        }
        if self.secret_access_key.is_none() {
            self.secret_access_key = envs.get(AWS_SECRET_ACCESS_KEY).cloned();
        }
        if self.session_token.is_none() {
            self.session_token = envs.get(AWS_SESSION_TOKEN).cloned();
        }

        debug!("config loaded from env: {self:?}");
        self
    }

    /// Region to sign for.
    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    /// Build the credential described by this config.
    pub fn credential(&self) -> Result<Credential> {
        let (Some(ak), Some(sk)) = (&self.access_key_id, &self.secret_access_key) else {
            return Err(Error::credential_invalid(
                "access key id and secret access key must both be set",
            ));
        };

        Ok(Credential {
            access_key_id: ak.clone(),
            secret_access_key: sk.clone(),
            session_token: self.session_token.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudsign_core::{ErrorKind, StaticEnv};

    #[test]
    fn test_config_from_env() {
        let env = StaticEnv::from_pairs([
            (AWS_ACCESS_KEY_ID, "access_key_id"),
            (AWS_SECRET_ACCESS_KEY, "secret_access_key"),
            (AWS_DEFAULT_REGION, "eu-west-1"),
        ]);

        let config = Config::default().from_env(&env);
        assert_eq!(config.region(), "eu-west-1");

        let cred = config.credential().expect("credential must be loaded");
        assert_eq!(cred.access_key_id, "access_key_id");
        assert_eq!(cred.secret_access_key, "secret_access_key");
        assert_eq!(cred.session_token, None);
    }

    #[test]
    fn test_explicit_fields_win() {
        let env = StaticEnv::from_pairs([(AWS_REGION, "eu-west-1"), (AWS_ACCESS_KEY_ID, "env")]);

        let config = Config {
            region: Some("ap-south-1".to_string()),
            access_key_id: Some("explicit".to_string()),
            ..Default::default()
        }
        .from_env(&env);

        assert_eq!(config.region(), "ap-south-1");
        assert_eq!(config.access_key_id.as_deref(), Some("explicit"));
    }

    #[test]
    fn test_empty_region_falls_back_to_default_region() {
        let env = StaticEnv::from_pairs([(AWS_REGION, ""), (AWS_DEFAULT_REGION, "eu-west-1")]);

        let config = Config::default().from_env(&env);
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.region(), "eu-west-1");
    }

    #[test]
    fn test_missing_credential() {
        let config = Config::default().from_env(&StaticEnv::default());
        assert_eq!(config.region(), DEFAULT_REGION);

        let err = config.credential().expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::CredentialInvalid);
    }
}
