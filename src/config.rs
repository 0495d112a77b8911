//! Generator parameters and results, as read from and written to JSON.
//!
//! Every struct here derives Serialize + Deserialize; absent fields take
//! the defaults below.

use serde::{Deserialize, Serialize};

use crate::catalog::NodeCatalog;
use crate::energy::{EnergyComponents, EnergyParams};
use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::moves::MoveParams;
use crate::scene::GraphFile;
use crate::tempering::TemperingParams;

fn default_grammar() -> String {
    "simple".to_string()
}

fn default_derivation_steps() -> usize {
    12
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorParams {
    #[serde(default = "default_grammar")]
    pub grammar: String,
    #[serde(default = "default_derivation_steps")]
    pub derivation_steps: usize,
    /// Drives derivation, placement and every optimisation stream.
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub hierarchical: bool,
    #[serde(default = "default_true")]
    pub path_generation: bool,
    /// Optimise this graph instead of deriving one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<GraphFile>,
    /// Start from this layout instead of a random placement. Requires
    /// `graph`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_layout: Option<Layout>,
    #[serde(default)]
    pub tempering: TemperingParams,
    #[serde(default)]
    pub moves: MoveParams,
    #[serde(default)]
    pub energy: EnergyParams,
    /// Node type traits; the built-in catalog when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<NodeCatalog>,
}

impl Default for GeneratorParams {
    fn default() -> Self {
        GeneratorParams {
            grammar: default_grammar(),
            derivation_steps: default_derivation_steps(),
            seed: 0,
            hierarchical: false,
            path_generation: true,
            graph: None,
            initial_layout: None,
            tempering: TemperingParams::default(),
            moves: MoveParams::default(),
            energy: EnergyParams::default(),
            catalog: None,
        }
    }
}

impl GeneratorParams {
    /// Rejects parameter combinations the optimiser cannot run with.
    pub fn validate(&self) -> Result<()> {
        let t = &self.tempering;
        if t.chain_count == 0 {
            return Err(Error::Config("chain count must be at least 1".into()));
        }
        if !(t.first_temperature.is_finite() && t.first_temperature > 0.0) {
            return Err(Error::Config(format!(
                "first temperature must be positive, got {}",
                t.first_temperature
            )));
        }
        if !(t.temperature_factor.is_finite() && t.temperature_factor > 0.0) {
            return Err(Error::Config(format!(
                "temperature factor must be positive, got {}",
                t.temperature_factor
            )));
        }
        if !(t.step_factor.is_finite() && t.step_factor > 0.0) {
            return Err(Error::Config(format!(
                "step factor must be positive, got {}",
                t.step_factor
            )));
        }
        if !(0.0..=1.0).contains(&t.swap_probability) {
            return Err(Error::Config(format!(
                "swap probability must lie in [0, 1], got {}",
                t.swap_probability
            )));
        }
        if !(0.0..=1.0).contains(&self.moves.reparent_probability) {
            return Err(Error::Config(format!(
                "reparent probability must lie in [0, 1], got {}",
                self.moves.reparent_probability
            )));
        }
        if self.initial_layout.is_some() && self.graph.is_none() {
            return Err(Error::Config("an initial layout needs its graph".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub graph: GraphFile,
    pub layout: Layout,
    /// Energy of `layout` over the whole scene; `None` when it is invalid.
    pub energy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<EnergyComponents>,
    pub iterations: u64,
    pub steps_completed: u64,
}
