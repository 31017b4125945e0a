//! Configuration module for Session Gate.
//!
//! Loads configuration from YAML files and environment variables.

use std::fmt;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

use crate::error::{GateError, GateResult};
use crate::session::HttpMethod;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Authentication gate configuration.
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    /// The single user allowed to log in.
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Session lifetime in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Protected routes.
    #[serde(default)]
    pub routes: Vec<SecureRoute>,
    /// Button shown on the access-denied and session surfaces.
    #[serde(default)]
    pub fallback: FallbackConfig,
    /// Identify clients by the first `X-Forwarded-For` entry instead of the
    /// socket address. Only enable behind a trusted proxy.
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

/// A protected path and the methods it accepts.
#[derive(Debug, Clone, Deserialize)]
pub struct SecureRoute {
    pub path: String,
    #[serde(default = "default_methods")]
    pub methods: Vec<HttpMethod>,
}

/// Fallback button on the error surfaces.
#[derive(Debug, Clone, Deserialize)]
pub struct FallbackConfig {
    #[serde(default = "default_fallback_button")]
    pub button: String,
    #[serde(default = "default_fallback_path")]
    pub path: String,
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_methods() -> Vec<HttpMethod> {
    vec![HttpMethod::Get]
}

fn default_fallback_button() -> String {
    "LOGIN".to_string()
}

fn default_fallback_path() -> String {
    "/".to_string()
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            button: default_fallback_button(),
            path: default_fallback_path(),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .field("routes", &self.routes)
            .field("fallback", &self.fallback)
            .field("trust_forwarded_for", &self.trust_forwarded_for)
            .finish()
    }
}

impl AuthConfig {
    /// Validate the settings and normalise route paths.
    pub fn validate(mut self) -> GateResult<Self> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(GateError::Config(
                "username and password must both be set".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(GateError::Config(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        if !self.fallback.path.starts_with('/') {
            return Err(GateError::Config(
                "fallback path must start with '/'".to_string(),
            ));
        }
        if self.routes.is_empty() {
            return Err(GateError::Config(
                "at least one secure route is required".to_string(),
            ));
        }

        for route in &mut self.routes {
            if !route.path.starts_with('/') {
                route.path.insert(0, '/');
            }
            if route.methods.is_empty() {
                route.methods = default_methods();
            }
        }

        Ok(self)
    }
}

impl Config {
    /// Load configuration from files and environment.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (GATE__*)
    /// 2. config/local.yaml (if exists)
    /// 3. config/default.yaml
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            // Start with default config
            .add_source(File::with_name("config/default").required(false))
            // Layer on local overrides
            .add_source(File::with_name("config/local").required(false))
            // Layer on environment variables with GATE__ prefix
            .add_source(
                Environment::with_prefix("GATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
