use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use log::{debug, error, trace};
use std::time::Instant;

use crate::config::ProviderConfig;
use crate::error::Error;
use crate::pricing::{
  estimate_units, split_estimate, ModelPricing, PricingTable
};
use crate::request::{GenerationRequest, GenerationResult};
use crate::Vendor;
use super::{LlmProvider, PROBE_MAX_TOKENS, PROBE_PROMPT};

const GOOGLE_API_BASE: &str
  = "https://generativelanguage.googleapis.com";
const PROBE_MODEL: &str = "gemini-pro";

const MODELS: &[(&str, ModelPricing)] = &[
  ("gemini-pro", ModelPricing::new(0.0005, 0.0015))
, ("gemini-pro-vision", ModelPricing::new(0.0005, 0.0015))
, ("gemini-1.5-pro", ModelPricing::new(0.0035, 0.0105))
, ("gemini-1.5-flash", ModelPricing::new(0.00035, 0.00105))
];

pub static PRICING: PricingTable = PricingTable::new(MODELS);

// ===== Message Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part
{   #[serde(default)]
    pub text: Option<String>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content
{   #[serde(default)]
    pub parts: Vec<Part>
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig
{   #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>
  , pub max_output_tokens: u32
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest
{   pub contents: Vec<Content>
  , pub generation_config: GenerationConfig
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse
{   #[serde(default)]
    pub candidates: Vec<Candidate>
  , #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate
{   #[serde(default)]
    pub content: Option<Content>
  , #[serde(default)]
    pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata
{   #[serde(default)]
    pub prompt_token_count: u64
  , #[serde(default)]
    pub candidates_token_count: u64
}

impl GenerateContentResponse
{   /// Text parts of the first candidate, joined
    pub fn text(&self) -> String
    {   self.candidates.first()
          .and_then(|c| c.content.as_ref())
          .map(|content| content.parts.iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join(""))
          .unwrap_or_default()
    }
}

/// (units used, input units, output units) for a finished call.
/// Real usage metadata wins; without it the word-count estimate
/// is split evenly between input and output.
pub fn usage_units(
  usage: Option<UsageMetadata>
, prompt: &str
, output: &str
) -> Result<(u64, u64, u64), Error>
{   match usage
    {   Some(u) => Ok((
          super::total_units(
            u.prompt_token_count, u.candidates_token_count
          )?
        , u.prompt_token_count
        , u.candidates_token_count
        ))
      , None => {
          let total = estimate_units(prompt, output);
          let (input, output) = split_estimate(total);
          Ok((total, input, output))
        }
    }
}

// ===== Google Client =====

/// Adapter for the Gemini generateContent API
pub struct GoogleClient
{   api_key: String
  , api_base: String
  , http_client: reqwest::Client
}

impl GoogleClient
{   pub fn new(api_key: impl Into<String>) -> Result<Self, Error>
    {   Self::with_config(
          api_key
        , &ProviderConfig::new(Vendor::Google.as_str())
        )
    }

    pub fn with_config(
      api_key: impl Into<String>
    , config: &ProviderConfig
    ) -> Result<Self, Error>
    {   let api_key = api_key.into();
        if api_key.trim().is_empty()
        {   return Err(Error::MissingApiKey("google".to_string()));
        }
        debug!("Creating GoogleClient");
        Ok(GoogleClient
        {   api_key
          , api_base: super::api_base(config, GOOGLE_API_BASE)
          , http_client: super::http_client(config)?
        })
    }

    async fn generate_content(
      &self
    , api_key: &str
    , model: &str
    , request: &GenerateContentRequest
    ) -> Result<GenerateContentResponse, Error>
    {   trace!("Google request for {}: {:?}", model, request);
        let builder = self.http_client
          .post(format!(
            "{}/v1beta/models/{}:generateContent", self.api_base, model
          ))
          .header("x-goog-api-key", api_key)
          .json(request);
        super::send_json("Google", builder).await
    }
}

fn user_request(
  prompt: &str
, max_output_tokens: u32
, temperature: Option<f32>
) -> GenerateContentRequest
{   GenerateContentRequest
    {   contents: vec![
          Content
          {   parts: vec![Part { text: Some(prompt.to_string()) }]
          }
        ]
      , generation_config: GenerationConfig
        {   temperature
          , max_output_tokens
        }
    }
}

#[async_trait]
impl LlmProvider for GoogleClient
{   fn provider_name(&self) -> &str
    {   Vendor::Google.as_str()
    }

    fn available_models(&self) -> Vec<String>
    {   PRICING.models()
    }

    async fn test_connection(&self, api_key: &str) -> bool
    {   let probe = user_request(PROBE_PROMPT, PROBE_MAX_TOKENS, None);
        match self.generate_content(api_key, PROBE_MODEL, &probe).await
        {   Ok(_) => true
          , Err(e) => {
              error!("Google API connection test failed: {}", e);
              false
            }
        }
    }

    async fn generate(&self, request: &GenerationRequest)
      -> GenerationResult
    {   let provider = self.provider_name();
        if !PRICING.contains(&request.model)
        {   debug!("Google model not available: {}", request.model);
            return super::model_not_available(provider, &request.model);
        }

        let body = user_request(
          &request.prompt
        , request.params.max_tokens
        , Some(request.params.temperature)
        );

        let started = Instant::now();
        let outcome = self
          .generate_content(&self.api_key, &request.model, &body)
          .await;
        let elapsed = started.elapsed();

        match outcome
        {   Ok(response) => {
              let text = response.text();
              let (tokens_used, input, output) = match usage_units(
                response.usage_metadata, &request.prompt, &text
              )
              {   Ok(units) => units
                , Err(e) => {
                    error!(
                      "Google usage for model {} rejected: {}"
                    , request.model, e
                    );
                    return GenerationResult::failure(
                      provider, &request.model, elapsed, e
                    );
                  }
              };
              let cost = PRICING.cost(&request.model, input, output);
              debug!(
                "Google {} answered in {:?} ({} tokens)",
                request.model, elapsed, tokens_used
              );
              GenerationResult::success(
                provider, &request.model, text, Some(tokens_used)
              , elapsed, cost
              )
            }
          , Err(e) => {
              error!("Google API error for model {}: {}", request.model, e);
              GenerationResult::failure(
                provider, &request.model, elapsed, e
              )
            }
        }
    }
}
