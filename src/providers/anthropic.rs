use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use log::{debug, error, trace};
use std::time::Instant;

use crate::config::ProviderConfig;
use crate::error::Error;
use crate::pricing::{ModelPricing, PricingTable};
use crate::request::{GenerationRequest, GenerationResult};
use crate::Vendor;
use super::{LlmProvider, PROBE_MAX_TOKENS, PROBE_PROMPT};

const ANTHROPIC_API_BASE: &str
  = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const PROBE_MODEL: &str = "claude-3-haiku-20240307";

const MODELS: &[(&str, ModelPricing)] = &[
  ("claude-3-opus-20240229", ModelPricing::new(0.015, 0.075))
, ("claude-3-sonnet-20240229", ModelPricing::new(0.003, 0.015))
, ("claude-3-haiku-20240307", ModelPricing::new(0.00025, 0.00125))
];

pub static PRICING: PricingTable = PricingTable::new(MODELS);

// ===== Message Types =====

#[derive(Debug, Clone, Serialize)]
pub struct MessageParam
{   pub role: String
  , pub content: String
}

#[derive(Debug, Clone, Serialize)]
pub struct AnthropicMessagesRequest
{   pub model: String
  , pub max_tokens: u32
  , pub messages: Vec<MessageParam>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicMessagesResponse
{   #[serde(default)]
    pub content: Vec<ContentBlock>
  , #[serde(default)]
    pub usage: Option<Usage>
  , #[serde(default)]
    pub stop_reason: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlock
{   #[serde(rename = "type")]
    pub kind: String
  , #[serde(default)]
    pub text: Option<String>
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Usage
{   #[serde(default)]
    pub input_tokens: u64
  , #[serde(default)]
    pub output_tokens: u64
}

// ===== Anthropic Client =====

/// Adapter for the Anthropic messages API
pub struct AnthropicClient
{   api_key: String
  , api_base: String
  , http_client: reqwest::Client
}

impl AnthropicClient
{   pub fn new(api_key: impl Into<String>) -> Result<Self, Error>
    {   Self::with_config(
          api_key
        , &ProviderConfig::new(Vendor::Anthropic.as_str())
        )
    }

    pub fn with_config(
      api_key: impl Into<String>
    , config: &ProviderConfig
    ) -> Result<Self, Error>
    {   let api_key = api_key.into();
        if api_key.trim().is_empty()
        {   return Err(Error::MissingApiKey("anthropic".to_string()));
        }
        debug!("Creating AnthropicClient");
        Ok(AnthropicClient
        {   api_key
          , api_base: super::api_base(config, ANTHROPIC_API_BASE)
          , http_client: super::http_client(config)?
        })
    }

    async fn messages(
      &self
    , api_key: &str
    , request: &AnthropicMessagesRequest
    ) -> Result<AnthropicMessagesResponse, Error>
    {   trace!("Anthropic request: {:?}", request);
        let builder = self.http_client
          .post(format!("{}/v1/messages", self.api_base))
          .header("x-api-key", api_key)
          .header("anthropic-version", ANTHROPIC_VERSION)
          .json(request);
        super::send_json("Anthropic", builder).await
    }
}

fn user_request(
  model: &str
, prompt: &str
, max_tokens: u32
, temperature: Option<f32>
) -> AnthropicMessagesRequest
{   AnthropicMessagesRequest
    {   model: model.to_string()
      , max_tokens
      , messages: vec![
          MessageParam
          {   role: "user".to_string()
            , content: prompt.to_string()
          }
        ]
      , temperature
    }
}

#[async_trait]
impl LlmProvider for AnthropicClient
{   fn provider_name(&self) -> &str
    {   Vendor::Anthropic.as_str()
    }

    fn available_models(&self) -> Vec<String>
    {   PRICING.models()
    }

    async fn test_connection(&self, api_key: &str) -> bool
    {   let probe = user_request(
          PROBE_MODEL, PROBE_PROMPT, PROBE_MAX_TOKENS, None
        );
        match self.messages(api_key, &probe).await
        {   Ok(_) => true
          , Err(e) => {
              error!("Anthropic API connection test failed: {}", e);
              false
            }
        }
    }

    async fn generate(&self, request: &GenerationRequest)
      -> GenerationResult
    {   let provider = self.provider_name();
        if !PRICING.contains(&request.model)
        {   debug!("Anthropic model not available: {}", request.model);
            return super::model_not_available(provider, &request.model);
        }

        let body = user_request(
          &request.model
        , &request.prompt
        , request.params.max_tokens
        , Some(request.params.temperature)
        );

        let started = Instant::now();
        let outcome = self.messages(&self.api_key, &body).await;
        let elapsed = started.elapsed();

        match outcome
        {   Ok(response) => {
              // first block only
              let text = response.content.into_iter()
                .next()
                .and_then(|block| block.text)
                .unwrap_or_default();
              let tokens_used = match response.usage
                .map(|u| super::total_units(u.input_tokens, u.output_tokens))
                .transpose()
              {   Ok(units) => units
                , Err(e) => {
                    error!(
                      "Anthropic usage for model {} rejected: {}"
                    , request.model, e
                    );
                    return GenerationResult::failure(
                      provider, &request.model, elapsed, e
                    );
                  }
              };
              let cost = response.usage.and_then(|u| PRICING.cost(
                &request.model, u.input_tokens, u.output_tokens
              ));
              debug!(
                "Anthropic {} answered in {:?} ({:?} tokens, stop: {:?})",
                request.model, elapsed, tokens_used, response.stop_reason
              );
              GenerationResult::success(
                provider, &request.model, text, tokens_used, elapsed, cost
              )
            }
          , Err(e) => {
              error!(
                "Anthropic API error for model {}: {}", request.model, e
              );
              GenerationResult::failure(
                provider, &request.model, elapsed, e
              )
            }
        }
    }
}
