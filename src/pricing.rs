//! Static per-model price tables and cost math

use serde::Serialize;

/// Price of one model, in currency per 1000 units
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelPricing
{   pub input_per_1k: f64
  , pub output_per_1k: f64
}

impl ModelPricing
{   pub const fn new(input_per_1k: f64, output_per_1k: f64) -> Self
    {   ModelPricing
        {   input_per_1k
          , output_per_1k
        }
    }

    /// Cost of a call that consumed the given unit counts
    pub fn cost(&self, input_units: u64, output_units: u64) -> f64
    {   input_units as f64 * self.input_per_1k / 1000.0
          + output_units as f64 * self.output_per_1k / 1000.0
    }
}

/// Model catalog of one provider, in presentation order, with prices.
/// Built from a `'static` slice so it never changes after load.
#[derive(Debug, Clone, Copy)]
pub struct PricingTable
{   entries: &'static [(&'static str, ModelPricing)]
}

impl PricingTable
{   pub const fn new(
      entries: &'static [(&'static str, ModelPricing)]
    ) -> Self
    {   PricingTable { entries }
    }

    pub fn lookup(&self, model: &str) -> Option<ModelPricing>
    {   self.entries.iter()
          .find(|(name, _)| *name == model)
          .map(|(_, pricing)| *pricing)
    }

    pub fn contains(&self, model: &str) -> bool
    {   self.lookup(model).is_some()
    }

    /// Model identifiers in table order
    pub fn models(&self) -> Vec<String>
    {   self.entries.iter()
          .map(|(name, _)| name.to_string())
          .collect()
    }

    /// Cost for `model`, or None when it has no pricing entry
    pub fn cost(
      &self
    , model: &str
    , input_units: u64
    , output_units: u64
    ) -> Option<f64>
    {   self.lookup(model)
          .map(|p| p.cost(input_units, output_units))
    }
}

/// Rough unit count for vendors that report no usage:
/// whitespace-separated words of prompt plus output.
pub fn estimate_units(prompt: &str, output: &str) -> u64
{   (prompt.split_whitespace().count()
      + output.split_whitespace().count()) as u64
}

/// Split an estimated total into (input, output) halves.
/// Input gets the floor, output the remainder.
pub fn split_estimate(total: u64) -> (u64, u64)
{   let input = total / 2;
    (input, total - input)
}
