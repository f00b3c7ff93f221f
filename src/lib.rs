pub mod error;
pub mod config;
pub mod pricing;
pub mod providers;
pub mod request;
pub mod coordinator;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/*

fanllm (fan-out LLM) sends one prompt to many (provider, model)
pairs at once and hands back one normalized result per pair, in
the order they were asked for. A provider that fails only fails
its own slot; the rest of the batch still reports.

fanllm/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Re-exports, vendor tags, logging setup
│   ├── error.rs        # Error enum
│   ├── config.rs       # Credentials, endpoints, timeouts
│   ├── pricing.rs      # Per-model price tables, cost math
│   ├── request.rs      # GenerationRequest / GenerationResult
│   ├── coordinator.rs  # Registry + concurrent fan-out/fan-in
│   └── providers/
│       ├── mod.rs      # LlmProvider trait
│       ├── openai.rs
│       ├── anthropic.rs
│       └── google.rs
└── tests/

*/

pub use coordinator::Coordinator;
pub use config::{CoordinatorConfig, ProviderConfig};
pub use error::Error;
pub use providers::LlmProvider;
pub use request::{
  BatchSummary, GenerationParams, GenerationRequest, GenerationResult
};

/// The vendors fanllm ships an adapter for.
/// Each variant maps to the fixed string tag used in credential maps
/// and model selections.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash
, Deserialize, Serialize
)]
#[serde(rename_all = "lowercase")]
pub enum Vendor
{   /// OpenAI (GPT-4, GPT-3.5)
    OpenAI
  , /// Anthropic (Claude 3 models)
    Anthropic
  , /// Google (Gemini models)
    Google
}

impl Vendor
{   pub const ALL: [Vendor; 3]
      = [Vendor::Google, Vendor::OpenAI, Vendor::Anthropic];

    pub fn as_str(&self) -> &'static str
    {   match self
        {   Vendor::OpenAI => "openai"
          , Vendor::Anthropic => "anthropic"
          , Vendor::Google => "google"
        }
    }
}

impl std::fmt::Display for Vendor
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
      -> std::fmt::Result
    {   f.write_str(self.as_str())
    }
}

impl FromStr for Vendor
{   type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {   match s
        {   "openai" => Ok(Vendor::OpenAI)
          , "anthropic" => Ok(Vendor::Anthropic)
          , "google" => Ok(Vendor::Google)
          , other => Err(Error::ProviderNotConfigured(
              other.to_string()
            ))
        }
    }
}

/// One (provider, model) pair of a batch.
/// The provider is a plain tag so callers can name providers
/// that are not registered; those come back as error results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSelection
{   pub provider: String
  , pub model: String
}

impl ModelSelection
{   pub fn new(
      provider: impl Into<String>
    , model: impl Into<String>
    ) -> Self
    {   ModelSelection
        {   provider: provider.into()
          , model: model.into()
        }
    }
}

/// Install env_logger as the `log` backend.
/// Reads RUST_LOG, falls back to `info`. Safe to call twice.
pub fn init_logging()
{   let _ = env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or("info")
    ).try_init();
}
