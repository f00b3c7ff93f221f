//! LLM provider implementations

pub mod anthropic;
pub mod google;
pub mod openai;

// Re-export for convenience
pub use anthropic::AnthropicClient;
pub use google::GoogleClient;
pub use openai::OpenAiClient;

use async_trait::async_trait;
use log::{error, trace};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::ProviderConfig;
use crate::error::Error;
use crate::request::{GenerationRequest, GenerationResult};

/// Prompt and output budget used by every connection probe
pub const PROBE_PROMPT: &str = "Hello";
pub const PROBE_MAX_TOKENS: u32 = 5;

/// What the coordinator needs from one vendor.
///
/// `generate` reports every failure inside the returned result;
/// it is not expected to panic or hang, but the coordinator guards
/// against both.
#[async_trait]
pub trait LlmProvider: Send + Sync
{   /// Provider tag, e.g. "openai"
    fn provider_name(&self) -> &str;

    /// Supported models in presentation order. No network.
    fn available_models(&self) -> Vec<String>;

    /// Cheap generation call made with `api_key`.
    /// True only when the vendor answered without error.
    async fn test_connection(&self, api_key: &str) -> bool;

    /// Run one generation call and normalize the outcome
    async fn generate(&self, request: &GenerationRequest)
      -> GenerationResult;
}

/// Result for a model outside the provider's catalog.
/// No network call, zero elapsed time.
pub(crate) fn model_not_available(
  provider: &str
, model: &str
) -> GenerationResult
{   GenerationResult::failure(
      provider
    , model
    , Duration::ZERO
    , Error::ModelNotAvailable(model.to_string())
    )
}

/// Sum of vendor-reported input and output units.
/// A sum past u64::MAX means the usage payload is corrupt.
pub(crate) fn total_units(input: u64, output: u64) -> Result<u64, Error>
{   input.checked_add(output).ok_or_else(|| {
      error!("Usage counts overflow: {} + {}", input, output);
      Error::ParseError(format!(
        "usage counts overflow: {} input + {} output", input, output
      ))
    })
}

pub(crate) fn http_client(config: &ProviderConfig)
  -> Result<reqwest::Client, Error>
{   let mut builder = reqwest::Client::builder();
    if let Some(timeout) = config.timeout()
    {   builder = builder.timeout(timeout);
    }
    builder.build().map_err(|e| {
      error!("Failed to build HTTP client for {}: {}", config.name, e);
      Error::InvalidConfiguration(e.to_string())
    })
}

pub(crate) fn api_base(
  config: &ProviderConfig
, default: &str
) -> String
{   config.api_base.as_deref()
      .unwrap_or(default)
      .trim_end_matches('/')
      .to_string()
}

/// Send a prepared request and decode a 2xx JSON body.
/// Non-2xx statuses become `ApiError` carrying the vendor's text.
pub(crate) async fn send_json<T: DeserializeOwned>(
  vendor: &str
, request: reqwest::RequestBuilder
) -> Result<T, Error>
{   let response = request
      .send()
      .await
      .map_err(|e| {
        error!("{} HTTP error: {}", vendor, e);
        Error::from(e)
      })?;

    let status = response.status();
    trace!("{} response status: {}", vendor, status);

    if !status.is_success()
    {   let error_text = response.text().await
          .unwrap_or_else(|_|
            "Unknown error".to_string()
          );
        error!("{} API error ({}): {}", vendor, status, error_text);
        return Err(Error::ApiError(
          format!("{} {}: {}", vendor, status.as_u16(), error_text)
        ));
    }

    let body = response.text().await.map_err(|e| {
      error!("{} body read error: {}", vendor, e);
      Error::from(e)
    })?;
    serde_json::from_str(&body).map_err(|e| {
      error!("{} parse error: {}", vendor, e);
      Error::ParseError(e.to_string())
    })
}
