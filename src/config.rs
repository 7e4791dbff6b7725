// Client configuration and credentials
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;

use crate::error::{CheddarError, Result};

pub const DEFAULT_HOST: &str = "getcheddar.com";
pub const DEFAULT_PORT: u16 = 443;

// Checked in order; the first variable that is set wins
pub const HOST_VARS: [&str; 2] = ["CHEDDAR_HOST", "CHEDDARGETTER_HOST"];
pub const PORT_VARS: [&str; 2] = ["CHEDDAR_PORT", "CHEDDARGETTER_PORT"];

// Where requests are sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            use_tls: true,
        }
    }
}

impl ClientConfig {
    /// Reads host and port overrides from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ClientConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first_set = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| lookup(name).filter(|value| !value.trim().is_empty()))
        };

        let mut config = Self::default();
        if let Some(host) = first_set(&HOST_VARS) {
            config.host = host.trim().to_string();
        }
        if let Some(port) = first_set(&PORT_VARS) {
            config.port = port.trim().parse().map_err(|_| {
                CheddarError::ConfigError(format!("invalid port value: {port:?}"))
            })?;
        }
        Ok(config)
    }

    pub fn scheme(&self) -> &'static str {
        if self.use_tls {
            "https"
        } else {
            "http"
        }
    }
}

/// Authentication and product scope, fixed for the life of a client.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    authorization: String,
    product_code: String,
}

impl Credentials {
    pub fn new(username: &str, secret: &str, product_code: impl Into<String>) -> Self {
        let token = STANDARD.encode(format!("{username}:{secret}"));
        Self {
            authorization: format!("Basic {token}"),
            product_code: product_code.into(),
        }
    }

    // Value of the Authorization header
    pub fn authorization(&self) -> &str {
        &self.authorization
    }

    pub fn product_code(&self) -> &str {
        &self.product_code
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("authorization", &"Basic <redacted>")
            .field("product_code", &self.product_code)
            .finish()
    }
}
