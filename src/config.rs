//! Configuration for fanllm providers and the coordinator

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use log::{debug, warn};

use crate::error::Error;
use crate::request::{
  GenerationParams, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE
, MAX_TEMPERATURE, MIN_TEMPERATURE
};
use crate::Vendor;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const ENV_TIMEOUT_SECS: &str = "FANLLM_REQUEST_TIMEOUT_SECS";

/// Per-provider endpoint overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig
{   /// Provider tag ("openai", "anthropic", "google")
    pub name: String
  , /// API base URL (if custom)
    pub api_base: Option<String>
  , /// HTTP client timeout in seconds
    pub timeout_secs: Option<u64>
}

impl ProviderConfig
{   pub fn new(name: impl Into<String>) -> Self
    {   ProviderConfig
        {   name: name.into()
          , ..Default::default()
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self
    {   self.api_base = Some(api_base.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self
    {   self.timeout_secs = Some(secs);
        self
    }

    pub fn timeout(&self) -> Option<Duration>
    {   self.timeout_secs.map(Duration::from_secs)
    }
}

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig
{   /// Provider tag -> API key. Missing or empty means not configured.
    #[serde(default)]
    pub credentials: HashMap<String, String>
  , /// Endpoint overrides
    #[serde(default)]
    pub providers: Vec<ProviderConfig>
  , /// Per-call deadline enforced by the coordinator
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64
  , #[serde(default = "default_temperature")]
    pub default_temperature: f32
  , #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32
}

fn default_timeout_secs() -> u64 { DEFAULT_REQUEST_TIMEOUT_SECS }
fn default_temperature() -> f32 { DEFAULT_TEMPERATURE }
fn default_max_tokens() -> u32 { DEFAULT_MAX_TOKENS }

impl Default for CoordinatorConfig
{   fn default() -> Self
    {   CoordinatorConfig
        {   credentials: HashMap::new()
          , providers: vec![]
          , request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS
          , default_temperature: DEFAULT_TEMPERATURE
          , default_max_tokens: DEFAULT_MAX_TOKENS
        }
    }
}

impl CoordinatorConfig
{   /// Config holding just the given credentials
    pub fn with_credentials<K, V>(
      credentials: impl IntoIterator<Item = (K, V)>
    ) -> Self
    where K: Into<String>, V: Into<String>
    {   CoordinatorConfig
        {   credentials: credentials.into_iter()
              .map(|(k, v)| (k.into(), v.into()))
              .collect()
          , ..Default::default()
        }
    }

    /// Read API keys and the timeout from the environment
    pub fn from_env() -> Result<Self, Error>
    {   let mut config = CoordinatorConfig::default();
        for vendor in Vendor::ALL
        {   let var = format!(
              "{}_API_KEY", vendor.as_str().to_uppercase()
            );
            if let Ok(key) = std::env::var(&var)
            {   debug!("Found {} in environment", var);
                config.credentials
                  .insert(vendor.as_str().to_string(), key);
            }
        }
        if let Ok(raw) = std::env::var(ENV_TIMEOUT_SECS)
        {   config.request_timeout_secs = raw.trim().parse()
              .map_err(|_| Error::InvalidConfiguration(format!(
                "{} must be a whole number of seconds, got '{}'",
                ENV_TIMEOUT_SECS, raw
              )))?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error>
    {   let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
          .map_err(|e| Error::InvalidConfiguration(format!(
            "cannot read {}: {}", path.display(), e
          )))?;
        let config: CoordinatorConfig = serde_json::from_str(&raw)
          .map_err(|e| Error::InvalidConfiguration(format!(
            "cannot parse {}: {}", path.display(), e
          )))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error>
    {   if self.request_timeout_secs == 0
        {   return Err(Error::InvalidConfiguration(
              "request_timeout_secs must be positive".to_string()
            ));
        }
        if !(MIN_TEMPERATURE..=MAX_TEMPERATURE)
            .contains(&self.default_temperature)
        {   return Err(Error::InvalidConfiguration(format!(
              "default_temperature {} outside {}..={}",
              self.default_temperature, MIN_TEMPERATURE, MAX_TEMPERATURE
            )));
        }
        if self.default_max_tokens == 0
        {   return Err(Error::InvalidConfiguration(
              "default_max_tokens must be positive".to_string()
            ));
        }
        for name in self.credentials.keys()
        {   if name.parse::<Vendor>().is_err()
            {   warn!("Ignoring credential for unknown provider: {}", name);
            }
        }
        Ok(())
    }

    /// Non-empty API key for a vendor
    pub fn credential(&self, vendor: Vendor) -> Option<&str>
    {   self.credentials.get(vendor.as_str())
          .map(|k| k.trim())
          .filter(|k| !k.is_empty())
    }

    /// Endpoint overrides for a vendor, defaulted when absent
    pub fn provider_config(&self, vendor: Vendor) -> ProviderConfig
    {   self.providers.iter()
          .find(|p| p.name == vendor.as_str())
          .cloned()
          .unwrap_or_else(|| ProviderConfig::new(vendor.as_str()))
    }

    pub fn request_timeout(&self) -> Duration
    {   Duration::from_secs(self.request_timeout_secs)
    }

    /// Defaults with any per-batch overrides applied
    pub fn params(
      &self
    , temperature: Option<f32>
    , max_tokens: Option<u32>
    ) -> GenerationParams
    {   GenerationParams::new(
          temperature.unwrap_or(self.default_temperature)
        , max_tokens.unwrap_or(self.default_max_tokens)
        )
    }
}
