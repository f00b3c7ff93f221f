//! Provider registry and concurrent batch dispatch

use futures::future::join_all;
use log::{debug, error, info, warn};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinHandle};

use crate::config::CoordinatorConfig;
use crate::error::Error;
use crate::providers::{
  AnthropicClient, GoogleClient, LlmProvider, OpenAiClient
};
use crate::request::{GenerationRequest, GenerationResult};
use crate::{ModelSelection, Vendor};

/// One batch position: either settled up front or still running
enum Slot
{   Ready(GenerationResult)
  , Running(JoinHandle<GenerationResult>)
}

/// Fans one prompt out to many providers and collects the results
/// in request order.
///
/// The registry is fixed at construction. New credentials mean a
/// new coordinator.
pub struct Coordinator
{   providers: HashMap<String, Arc<dyn LlmProvider>>
  , config: CoordinatorConfig
}

impl Coordinator
{   /// Build one adapter per vendor that has a non-empty credential
    pub fn new(config: CoordinatorConfig) -> Result<Self, Error>
    {   config.validate()?;
        let mut providers: Vec<Arc<dyn LlmProvider>> = vec![];
        for vendor in Vendor::ALL
        {   let Some(key) = config.credential(vendor)
            else
            {   debug!("No credential for {}, leaving it out", vendor);
                continue;
            };
            let endpoint = config.provider_config(vendor);
            let provider: Arc<dyn LlmProvider> = match vendor
            {   Vendor::OpenAI => Arc::new(
                  OpenAiClient::with_config(key, &endpoint)?
                )
              , Vendor::Anthropic => Arc::new(
                  AnthropicClient::with_config(key, &endpoint)?
                )
              , Vendor::Google => Arc::new(
                  GoogleClient::with_config(key, &endpoint)?
                )
            };
            providers.push(provider);
        }
        Ok(Self::with_providers(config, providers))
    }

    /// Shorthand for `new` with only credentials set
    pub fn from_credentials<K, V>(
      credentials: impl IntoIterator<Item = (K, V)>
    ) -> Result<Self, Error>
    where K: Into<String>, V: Into<String>
    {   Self::new(CoordinatorConfig::with_credentials(credentials))
    }

    /// Register ready-made adapters, keyed by their provider name.
    /// A later adapter with the same name replaces an earlier one.
    pub fn with_providers(
      config: CoordinatorConfig
    , providers: impl IntoIterator<Item = Arc<dyn LlmProvider>>
    ) -> Self
    {   let providers: HashMap<String, Arc<dyn LlmProvider>>
          = providers.into_iter()
            .map(|p| (p.provider_name().to_string(), p))
            .collect();
        let mut names: Vec<&String> = providers.keys().collect();
        names.sort();
        info!("Coordinator ready with providers: {:?}", names);
        Coordinator
        {   providers
          , config
        }
    }

    pub fn is_configured(&self, provider: &str) -> bool
    {   self.providers.contains_key(provider)
    }

    /// Provider -> model catalog for every registered provider.
    /// No network.
    pub fn list_available_providers(&self)
      -> BTreeMap<String, Vec<String>>
    {   self.providers.iter()
          .map(|(name, p)| (name.clone(), p.available_models()))
          .collect()
    }

    /// Probe every provider that is both registered and present in
    /// `credentials`, using the supplied keys. Probes run concurrently;
    /// one that outlives the request timeout counts as down.
    pub async fn test_all_connections(
      &self
    , credentials: &HashMap<String, String>
    ) -> HashMap<String, bool>
    {   let timeout = self.config.request_timeout();
        let probes = credentials.iter()
          .filter_map(|(name, key)| {
            self.providers.get(name).map(|p| (name, key, p))
          })
          .map(|(name, key, provider)| async move {
            debug!("Testing connection for {}", name);
            let ok = tokio::time::timeout(
                timeout
              , provider.test_connection(key)
              ).await
              .unwrap_or_else(|_| {
                warn!("Connection test for {} timed out", name);
                false
              });
            (name.clone(), ok)
          });
        join_all(probes).await.into_iter().collect()
    }

    /// Send `prompt` to every selection at once.
    ///
    /// Returns one result per selection, in selection order. Provider
    /// failures, unknown providers, timeouts and adapter panics all
    /// come back as error results; the batch itself never fails.
    pub async fn dispatch_batch(
      &self
    , prompt: &str
    , selections: &[ModelSelection]
    , temperature: Option<f32>
    , max_tokens: Option<u32>
    ) -> Vec<GenerationResult>
    {   if selections.is_empty()
        {   debug!("Empty batch, nothing to dispatch");
            return vec![];
        }

        let params = self.config.params(temperature, max_tokens);
        let timeout = self.config.request_timeout();
        debug!(
          "Dispatching batch of {} selections ({:?})",
          selections.len(), params
        );

        let slots: Vec<Slot> = selections.iter()
          .map(|selection| {
            let Some(provider) = self.providers.get(&selection.provider)
            else
            {   warn!(
                  "Provider {} not configured (model {})",
                  selection.provider, selection.model
                );
                return Slot::Ready(GenerationResult::failure(
                  &selection.provider
                , &selection.model
                , Duration::ZERO
                , Error::ProviderNotConfigured(selection.provider.clone())
                ));
            };
            let request = GenerationRequest::new(
              prompt, &selection.provider, &selection.model, params
            );
            let provider = Arc::clone(provider);
            Slot::Running(tokio::spawn(
              run_call(provider, request, timeout)
            ))
          })
          .collect();

        // every task owns its own slot; join keeps input order
        let results = join_all(
          slots.into_iter().zip(selections).map(
            |(slot, selection)| async move {
              match slot
              {   Slot::Ready(result) => result
                , Slot::Running(handle) => match handle.await
                  {   Ok(result) => result
                    , Err(e) => fault_result(selection, e)
                  }
              }
            }
          )
        ).await;

        let failed = results.iter().filter(|r| r.is_error()).count();
        info!(
          "Batch finished: {} ok, {} failed",
          results.len() - failed, failed
        );
        results
    }
}

/// Run one adapter call under the per-call deadline
async fn run_call(
  provider: Arc<dyn LlmProvider>
, request: GenerationRequest
, timeout: Duration
) -> GenerationResult
{   let started = Instant::now();
    match tokio::time::timeout(timeout, provider.generate(&request)).await
    {   Ok(result) => result
      , Err(_) => {
          warn!(
            "{} {} timed out after {:?}",
            request.provider, request.model, timeout
          );
          GenerationResult::failure(
            request.provider
          , request.model
          , started.elapsed()
          , Error::Timeout
          )
        }
    }
}

/// Result for a task that panicked or was cancelled.
/// Keeps the selection's provider/model so positions still line up.
fn fault_result(
  selection: &ModelSelection
, e: JoinError
) -> GenerationResult
{   let detail = if e.is_panic()
    {   let payload = e.into_panic();
        payload.downcast_ref::<&str>()
          .map(|s| s.to_string())
          .or_else(|| payload.downcast_ref::<String>().cloned())
          .unwrap_or_else(|| "adapter panicked".to_string())
    } else
    {   e.to_string()
    };
    error!(
      "Task for {} {} failed: {}",
      selection.provider, selection.model, detail
    );
    GenerationResult::failure(
      &selection.provider
    , &selection.model
    , Duration::ZERO
    , Error::Other(format!("Adapter fault: {}", detail))
    )
}
