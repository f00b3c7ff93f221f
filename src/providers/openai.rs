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

const OPENAI_API_BASE: &str
  = "https://api.openai.com";
const PROBE_MODEL: &str = "gpt-3.5-turbo";

const MODELS: &[(&str, ModelPricing)] = &[
  ("gpt-4", ModelPricing::new(0.03, 0.06))
, ("gpt-4-turbo", ModelPricing::new(0.01, 0.03))
, ("gpt-3.5-turbo", ModelPricing::new(0.0015, 0.002))
, ("gpt-3.5-turbo-16k", ModelPricing::new(0.003, 0.004))
];

pub static PRICING: PricingTable = PricingTable::new(MODELS);

// ===== Message Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: String
  , pub content: String
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenAiChatRequest
{   pub model: String
  , pub messages: Vec<ChatMessage>
  , pub max_tokens: u32
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiChatResponse
{   #[serde(default)]
    pub choices: Vec<Choice>
  , #[serde(default)]
    pub usage: Option<Usage>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice
{   pub message: ResponseMessage
  , #[serde(default)]
    pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage
{   #[serde(default)]
    pub content: Option<String>
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Usage
{   #[serde(default)]
    pub prompt_tokens: u64
  , #[serde(default)]
    pub completion_tokens: u64
  , #[serde(default)]
    pub total_tokens: u64
}

// ===== OpenAI Client =====

/// Adapter for the OpenAI chat completions API
pub struct OpenAiClient
{   api_key: String
  , api_base: String
  , http_client: reqwest::Client
}

impl OpenAiClient
{   pub fn new(api_key: impl Into<String>) -> Result<Self, Error>
    {   Self::with_config(
          api_key
        , &ProviderConfig::new(Vendor::OpenAI.as_str())
        )
    }

    pub fn with_config(
      api_key: impl Into<String>
    , config: &ProviderConfig
    ) -> Result<Self, Error>
    {   let api_key = api_key.into();
        if api_key.trim().is_empty()
        {   return Err(Error::MissingApiKey("openai".to_string()));
        }
        debug!("Creating OpenAiClient");
        Ok(OpenAiClient
        {   api_key
          , api_base: super::api_base(config, OPENAI_API_BASE)
          , http_client: super::http_client(config)?
        })
    }

    async fn chat(
      &self
    , api_key: &str
    , request: &OpenAiChatRequest
    ) -> Result<OpenAiChatResponse, Error>
    {   trace!("OpenAI request: {:?}", request);
        let builder = self.http_client
          .post(format!("{}/v1/chat/completions", self.api_base))
          .bearer_auth(api_key)
          .json(request);
        super::send_json("OpenAI", builder).await
    }
}

fn user_request(
  model: &str
, prompt: &str
, max_tokens: u32
, temperature: Option<f32>
) -> OpenAiChatRequest
{   OpenAiChatRequest
    {   model: model.to_string()
      , messages: vec![
          ChatMessage
          {   role: "user".to_string()
            , content: prompt.to_string()
          }
        ]
      , max_tokens
      , temperature
    }
}

#[async_trait]
impl LlmProvider for OpenAiClient
{   fn provider_name(&self) -> &str
    {   Vendor::OpenAI.as_str()
    }

    fn available_models(&self) -> Vec<String>
    {   PRICING.models()
    }

    async fn test_connection(&self, api_key: &str) -> bool
    {   let probe = user_request(
          PROBE_MODEL, PROBE_PROMPT, PROBE_MAX_TOKENS, None
        );
        match self.chat(api_key, &probe).await
        {   Ok(_) => true
          , Err(e) => {
              error!("OpenAI API connection test failed: {}", e);
              false
            }
        }
    }

    async fn generate(&self, request: &GenerationRequest)
      -> GenerationResult
    {   let provider = self.provider_name();
        if !PRICING.contains(&request.model)
        {   debug!("OpenAI model not available: {}", request.model);
            return super::model_not_available(provider, &request.model);
        }

        let body = user_request(
          &request.model
        , &request.prompt
        , request.params.max_tokens
        , Some(request.params.temperature)
        );

        let started = Instant::now();
        let outcome = self.chat(&self.api_key, &body).await;
        let elapsed = started.elapsed();

        match outcome
        {   Ok(response) => {
              let text = response.choices.into_iter()
                .next()
                .and_then(|c| c.message.content)
                .unwrap_or_default();
              let tokens_used = response.usage.map(|u| u.total_tokens);
              let cost = response.usage.and_then(|u| PRICING.cost(
                &request.model, u.prompt_tokens, u.completion_tokens
              ));
              debug!(
                "OpenAI {} answered in {:?} ({:?} tokens)",
                request.model, elapsed, tokens_used
              );
              GenerationResult::success(
                provider, &request.model, text, tokens_used, elapsed, cost
              )
            }
          , Err(e) => {
              error!("OpenAI API error for model {}: {}", request.model, e);
              GenerationResult::failure(
                provider, &request.model, elapsed, e
              )
            }
        }
    }
}
