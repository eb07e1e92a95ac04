// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding `identities.redb` | `./data` |
//! | `OIDC_JWKS_URL` | Realm JWKS endpoint (HTTPS) | unset = development mode |
//! | `OIDC_ISSUER` | Expected `iss` claim | Optional |
//! | `OIDC_CLIENT_ID` | Client whose `resource_access` roles count | `api-gateway` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use url::Url;

use crate::auth::DEFAULT_TARGET_AUDIENCE;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const JWKS_URL_ENV: &str = "OIDC_JWKS_URL";
pub const ISSUER_ENV: &str = "OIDC_ISSUER";
pub const CLIENT_ID_ENV: &str = "OIDC_CLIENT_ID";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_DIR: &str = "./data";

/// File name of the identity database inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "identities.redb";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is not a valid {expected}: {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("OIDC_JWKS_URL must use https: {0}")]
    InsecureJwksUrl(String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    /// `None` runs without signature verification.
    pub jwks_url: Option<Url>,
    pub issuer: Option<String>,
    pub client_id: String,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = var(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let ip: IpAddr = host.parse().map_err(|_| ConfigError::Invalid {
            name: HOST_ENV,
            expected: "IP address",
            value: host.clone(),
        })?;

        let port = match var(PORT_ENV) {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: PORT_ENV,
                expected: "port number",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let jwks_url = match var(JWKS_URL_ENV) {
            Some(raw) => {
                let url = Url::parse(&raw).map_err(|_| ConfigError::Invalid {
                    name: JWKS_URL_ENV,
                    expected: "URL",
                    value: raw.clone(),
                })?;
                if url.scheme() != "https" {
                    return Err(ConfigError::InsecureJwksUrl(raw));
                }
                Some(url)
            }
            None => None,
        };

        let log_format = match var(LOG_FORMAT_ENV).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: LOG_FORMAT_ENV,
                    expected: "log format (json|pretty)",
                    value: other.to_string(),
                })
            }
        };

        let data_dir = var(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());

        Ok(Self {
            bind_addr: SocketAddr::new(ip, port),
            data_dir: PathBuf::from(data_dir),
            jwks_url,
            issuer: var(ISSUER_ENV),
            client_id: var(CLIENT_ID_ENV).unwrap_or_else(|| DEFAULT_TARGET_AUDIENCE.to_string()),
            log_format,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.database_path(), PathBuf::from("./data/identities.redb"));
        assert!(config.jwks_url.is_none());
        assert_eq!(config.client_id, "api-gateway");
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn production_settings() {
        let config = config_from(&[
            (PORT_ENV, "9000"),
            (JWKS_URL_ENV, "https://sso.example.com/realms/main/protocol/openid-connect/certs"),
            (ISSUER_ENV, "https://sso.example.com/realms/main"),
            (CLIENT_ID_ENV, "user-service"),
            (LOG_FORMAT_ENV, "json"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert!(config.jwks_url.is_some());
        assert_eq!(config.issuer.as_deref(), Some("https://sso.example.com/realms/main"));
        assert_eq!(config.client_id, "user-service");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn rejects_plain_http_jwks() {
        let result = config_from(&[(JWKS_URL_ENV, "http://sso.example.com/certs")]);
        assert!(matches!(result, Err(ConfigError::InsecureJwksUrl(_))));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config_from(&[(PORT_ENV, "eighty")]).is_err());
        assert!(config_from(&[(HOST_ENV, "not an ip")]).is_err());
        assert!(config_from(&[(LOG_FORMAT_ENV, "xml")]).is_err());
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = config_from(&[(JWKS_URL_ENV, "  "), (CLIENT_ID_ENV, "")]).unwrap();
        assert!(config.jwks_url.is_none());
        assert_eq!(config.client_id, "api-gateway");
    }
}
