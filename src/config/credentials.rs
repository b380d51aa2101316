//! API credentials, resolved once at process start

use crate::config::types::ApiConfig;
use crate::ConfigError;

/// API keys for the upstream providers
///
/// Built once from the environment by the binary and handed to component
/// constructors; no component reads the environment itself.
#[derive(Clone)]
pub struct Credentials {
    places_api_key: Option<String>,
    serper_api_key: Option<String>,
    places_key_env: String,
    serper_key_env: String,
}

impl Credentials {
    /// Creates credentials from explicit values (blank keys count as missing)
    pub fn new(places_api_key: Option<String>, serper_api_key: Option<String>) -> Self {
        let api = ApiConfig::default();
        Self {
            places_api_key: non_blank(places_api_key),
            serper_api_key: non_blank(serper_api_key),
            places_key_env: api.places_key_env,
            serper_key_env: api.serper_key_env,
        }
    }

    /// Reads the key variables named in `api` from the process environment
    pub fn from_env(api: &ApiConfig) -> Self {
        Self {
            places_api_key: non_blank(std::env::var(&api.places_key_env).ok()),
            serper_api_key: non_blank(std::env::var(&api.serper_key_env).ok()),
            places_key_env: api.places_key_env.clone(),
            serper_key_env: api.serper_key_env.clone(),
        }
    }

    /// Returns the places API key, or the variable that should have held it
    pub fn places_key(&self) -> Result<&str, ConfigError> {
        self.places_api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingCredential(self.places_key_env.clone()))
    }

    /// Returns the aggregator API key, or the variable that should have held it
    pub fn serper_key(&self) -> Result<&str, ConfigError> {
        self.serper_api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingCredential(self.serper_key_env.clone()))
    }
}

// Keys never reach logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("places_api_key", &self.places_api_key.as_ref().map(|_| "***"))
            .field("serper_api_key", &self.serper_api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
