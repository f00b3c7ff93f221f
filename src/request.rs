//! Unified request and result types for fanllm

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const MIN_TEMPERATURE: f32 = 0.0;
pub const MAX_TEMPERATURE: f32 = 2.0;

/// Sampling parameters shared by every call of a batch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams
{   /// Temperature for sampling, 0.0 to 2.0
    pub temperature: f32
  , /// Max output units to generate
    pub max_tokens: u32
}

impl GenerationParams
{   /// Clamp the temperature into range and keep max_tokens positive.
    /// NaN falls back to the default temperature.
    pub fn new(temperature: f32, max_tokens: u32) -> Self
    {   let temperature = if temperature.is_nan()
        {   DEFAULT_TEMPERATURE
        } else
        {   temperature
        };
        GenerationParams
        {   temperature: temperature
              .clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)
          , max_tokens: max_tokens.max(1)
        }
    }
}

impl Default for GenerationParams
{   fn default() -> Self
    {   GenerationParams
        {   temperature: DEFAULT_TEMPERATURE
          , max_tokens: DEFAULT_MAX_TOKENS
        }
    }
}

/// One generation call, built per (provider, model) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest
{   /// The prompt text
    pub prompt: String
  , /// Provider tag
    pub provider: String
  , /// Model name
    pub model: String
  , pub params: GenerationParams
}

impl GenerationRequest
{   pub fn new(
      prompt: impl Into<String>
    , provider: impl Into<String>
    , model: impl Into<String>
    , params: GenerationParams
    ) -> Self
    {   GenerationRequest
        {   prompt: prompt.into()
          , provider: provider.into()
          , model: model.into()
          , params
        }
    }
}

/// Normalized outcome of one generation call.
/// `error` is set iff the call failed; a failed call has empty
/// text and never a cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult
{   /// Provider that handled (or refused) the call
    pub provider: String
  , /// Model that was asked for
    pub model: String
  , /// Generated text
    pub text: String
  , /// Units consumed, when the vendor reported or we estimated them
    pub tokens_used: Option<u64>
  , /// Wall-clock seconds from dispatch to completion or failure
    pub response_time: f64
  , /// Cost in currency units, when usage and pricing both exist
    pub cost: Option<f64>
  , /// Failure description
    pub error: Option<String>
}

impl GenerationResult
{   pub fn success(
      provider: impl Into<String>
    , model: impl Into<String>
    , text: String
    , tokens_used: Option<u64>
    , elapsed: Duration
    , cost: Option<f64>
    ) -> Self
    {   GenerationResult
        {   provider: provider.into()
          , model: model.into()
          , text
          , tokens_used
          , response_time: elapsed.as_secs_f64()
          , cost
          , error: None
        }
    }

    pub fn failure(
      provider: impl Into<String>
    , model: impl Into<String>
    , elapsed: Duration
    , error: impl ToString
    ) -> Self
    {   GenerationResult
        {   provider: provider.into()
          , model: model.into()
          , text: String::new()
          , tokens_used: None
          , response_time: elapsed.as_secs_f64()
          , cost: None
          , error: Some(error.to_string())
        }
    }

    pub fn is_error(&self) -> bool
    {   self.error.is_some()
    }
}

/// Batch totals, computed by the caller from a returned batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary
{   /// Wall-clock seconds the caller spent waiting on the batch
    pub total_time: f64
  , /// Sum of present costs; None when that sum is zero
    pub total_cost: Option<f64>
  , pub succeeded: usize
  , pub failed: usize
}

impl BatchSummary
{   pub fn from_results(
      results: &[GenerationResult]
    , wall_time: Duration
    ) -> Self
    {   let total: f64 = results.iter()
          .filter_map(|r| r.cost)
          .sum();
        let failed = results.iter()
          .filter(|r| r.is_error())
          .count();
        BatchSummary
        {   total_time: wall_time.as_secs_f64()
          , total_cost: if total > 0.0 { Some(total) } else { None }
          , succeeded: results.len() - failed
          , failed
        }
    }
}
