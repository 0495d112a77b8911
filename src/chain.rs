//! A single Metropolis chain over layouts.
//!
//! Each step copies the current layout, applies one proposal move and
//! evaluates the energy. Invalid layouts score `+∞`; a chain whose current
//! energy is `+∞` accepts its next proposal unconditionally.

use tracing::warn;

use crate::energy::{Energy, EvaluationScope};
use crate::layout::Layout;
use crate::moves::{MoveParams, MoveSet};
use crate::prng::Pcg32;

/// Outcome of one chain step, as reported to progress observers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepStatistics {
    /// Energy of the chain after the step.
    pub energy: f64,
    pub step_accepted: bool,
    pub swap_accepted: bool,
}

/// Receives every layout a chain wants shown, before it is evaluated.
pub trait SceneSink {
    fn apply(&mut self, layout: &Layout);
}

/// Metropolis acceptance for moving from `current` to `proposed` energy.
///
/// Accepts without drawing when `current` is `+∞`; otherwise draws once and
/// accepts with probability `min(1, exp(β (current - proposed)))`.
pub fn metropolis_accept(current: f64, proposed: f64, inverse_temperature: f64, rng: &mut Pcg32) -> bool {
    if current == f64::INFINITY {
        return true;
    }
    let acceptance = (inverse_temperature * (current - proposed)).exp();
    acceptance > rng.next_float()
}

/// Replica-exchange acceptance between chains at inverse temperatures
/// `beta_i`, `beta_j` holding energies `energy_i`, `energy_j`. Draws once.
pub fn swap_accept(beta_i: f64, beta_j: f64, energy_i: f64, energy_j: f64, rng: &mut Pcg32) -> bool {
    let acceptance = ((beta_i - beta_j) * (energy_i - energy_j)).exp();
    acceptance > rng.next_float()
}

pub(crate) fn evaluate(energy: &dyn Energy, layout: &Layout, scope: &EvaluationScope) -> f64 {
    match energy.evaluate(layout, scope) {
        Ok(value) if !value.is_nan() => value,
        Ok(_) => f64::INFINITY,
        Err(_) => f64::INFINITY,
    }
}

pub struct McmcChain<'a> {
    current: Layout,
    current_energy: f64,
    inverse_temperature: f64,
    moves: MoveSet,
    params: MoveParams,
    scope: EvaluationScope,
    energy: &'a dyn Energy,
    rng: Pcg32,
}

impl<'a> McmcChain<'a> {
    pub fn new(
        layout: Layout,
        energy: &'a dyn Energy,
        scope: EvaluationScope,
        moves: MoveSet,
        params: MoveParams,
        temperature: f64,
        rng: Pcg32,
    ) -> Self {
        let current_energy = evaluate(energy, &layout, &scope);
        if current_energy == f64::INFINITY {
            warn!(temperature, "chain starts from an invalid layout");
        }
        McmcChain {
            current: layout,
            current_energy,
            inverse_temperature: 1.0 / temperature,
            moves,
            params,
            scope,
            energy,
            rng,
        }
    }

    pub fn current_layout(&self) -> &Layout {
        &self.current
    }

    pub fn current_energy(&self) -> f64 {
        self.current_energy
    }

    pub fn inverse_temperature(&self) -> f64 {
        self.inverse_temperature
    }

    pub fn temperature(&self) -> f64 {
        1.0 / self.inverse_temperature
    }

    pub fn step(&mut self) -> StepStatistics {
        self.advance(None)
    }

    /// Like [`McmcChain::step`], showing the proposal on `sink` before it is
    /// evaluated and the current layout again if it is rejected.
    pub fn step_materialized(&mut self, sink: &mut dyn SceneSink) -> StepStatistics {
        self.advance(Some(sink))
    }

    fn advance(&mut self, mut sink: Option<&mut dyn SceneSink>) -> StepStatistics {
        let mut proposal = self.current.clone();
        if self
            .moves
            .propose(&mut proposal, &self.params, &mut self.rng)
            .is_none()
        {
            return StepStatistics {
                energy: self.current_energy,
                step_accepted: false,
                swap_accepted: false,
            };
        }
        if let Some(sink) = sink.as_deref_mut() {
            sink.apply(&proposal);
        }

        let proposed_energy = evaluate(self.energy, &proposal, &self.scope);
        let accepted = metropolis_accept(
            self.current_energy,
            proposed_energy,
            self.inverse_temperature,
            &mut self.rng,
        );
        if accepted {
            self.current = proposal;
            self.current_energy = proposed_energy;
        } else if let Some(sink) = sink {
            sink.apply(&self.current);
        }
        StepStatistics {
            energy: self.current_energy,
            step_accepted: accepted,
            swap_accepted: false,
        }
    }

    /// Attempts to exchange the states of two chains. Temperatures and
    /// random streams stay with their chains.
    pub fn swap_step(first: &mut McmcChain<'_>, second: &mut McmcChain<'_>, rng: &mut Pcg32) -> bool {
        let accepted = swap_accept(
            first.inverse_temperature,
            second.inverse_temperature,
            first.current_energy,
            second.current_energy,
            rng,
        );
        if accepted {
            std::mem::swap(&mut first.current, &mut second.current);
            std::mem::swap(&mut first.current_energy, &mut second.current_energy);
        }
        accepted
    }

    /// Gives back the chain's random stream.
    pub fn into_rng(self) -> Pcg32 {
        self.rng
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NodeCatalog;
    use crate::energy::InvalidLayout;
    use crate::layout::ObjectPlacement;

    fn layout() -> Layout {
        Layout {
            objects: (0..3)
                .map(|i| ObjectPlacement {
                    node_type: "SimpleLargeBox".into(),
                    node_index: i,
                    parent_index: None,
                    position: [i as f64 * 3.0, 0.0, 0.0],
                    rotation_y: 0.0,
                })
                .collect(),
            paths: vec![],
        }
    }

    fn chain<'a>(energy: &'a dyn Energy, temperature: f64, seed: u64) -> McmcChain<'a> {
        let start = layout();
        let moves = MoveSet::new(&start, &NodeCatalog::builtin(), &[0, 1, 2], &[]);
        let scope = EvaluationScope::full(&start);
        McmcChain::new(start, energy, scope, moves, MoveParams::default(), temperature, Pcg32::new(seed, 0))
    }

    fn spread(layout: &Layout, _: &EvaluationScope) -> Result<f64, InvalidLayout> {
        Ok(layout.objects.iter().map(|o| o.position[0].powi(2)).sum())
    }

    // -- Acceptance ----------------------------------------------------

    #[test]
    fn metropolis_rate_matches_boltzmann_factor() {
        let mut rng = Pcg32::new(17, 0);
        let n = 40_000;
        let temperature = 2.0;
        let accepted = (0..n)
            .filter(|_| metropolis_accept(0.0, 1.0, 1.0 / temperature, &mut rng))
            .count();
        let rate = accepted as f64 / n as f64;
        let expected = (-1.0f64 / temperature).exp();
        assert!((rate - expected).abs() < 0.01, "rate {rate}, expected {expected}");
    }

    #[test]
    fn improvements_and_recoveries_are_always_accepted() {
        let mut rng = Pcg32::new(1, 0);
        for _ in 0..1000 {
            assert!(metropolis_accept(5.0, 4.0, 1.0, &mut rng));
        }
        let mut drawn = Pcg32::new(2, 0);
        let mut untouched = Pcg32::new(2, 0);
        assert!(metropolis_accept(f64::INFINITY, f64::INFINITY, 1.0, &mut drawn));
        assert_eq!(drawn.next_u32(), untouched.next_u32());
        assert!(!metropolis_accept(0.0, f64::INFINITY, 1.0, &mut Pcg32::new(3, 0)));
    }

    #[test]
    fn swap_rate_matches_exchange_formula() {
        let mut rng = Pcg32::new(23, 0);
        let (beta_i, beta_j, e_i, e_j) = (1.0, 1.0 / 1.3, 2.0, 5.0);
        let n = 40_000;
        let accepted = (0..n)
            .filter(|_| swap_accept(beta_i, beta_j, e_i, e_j, &mut rng))
            .count();
        let rate = accepted as f64 / n as f64;
        let expected = ((beta_i - beta_j) * (e_i - e_j)).exp().min(1.0);
        assert!((rate - expected).abs() < 0.01, "rate {rate}, expected {expected}");
        assert!((0..100).all(|_| swap_accept(beta_i, beta_j, e_j, e_i, &mut rng)));
    }

    // -- Chains ---------------------------------------------------------

    #[test]
    fn constant_energy_accepts_every_step() {
        let constant = |_: &Layout, _: &EvaluationScope| -> Result<f64, InvalidLayout> { Ok(1.5) };
        let mut c = chain(&constant, 1.0, 4);
        for _ in 0..500 {
            assert!(c.step().step_accepted);
        }
        assert_eq!(c.current_energy(), 1.5);
    }

    #[test]
    fn invalid_start_accepts_the_first_proposal() {
        let invalid = |_: &Layout, _: &EvaluationScope| -> Result<f64, InvalidLayout> {
            Err(InvalidLayout::new("always"))
        };
        for seed in 0..10 {
            let mut c = chain(&invalid, 1.0, seed);
            assert_eq!(c.current_energy(), f64::INFINITY);
            let stats = c.step();
            assert!(stats.step_accepted);
            assert_eq!(stats.energy, f64::INFINITY);
        }
    }

    #[test]
    fn nan_energy_counts_as_invalid() {
        let nan = |_: &Layout, _: &EvaluationScope| -> Result<f64, InvalidLayout> { Ok(f64::NAN) };
        assert_eq!(chain(&nan, 1.0, 0).current_energy(), f64::INFINITY);
    }

    struct Recorder(Vec<Layout>);

    impl SceneSink for Recorder {
        fn apply(&mut self, layout: &Layout) {
            self.0.push(layout.clone());
        }
    }

    #[test]
    fn rejected_steps_rematerialize_the_current_layout() {
        let only_start = |l: &Layout, _: &EvaluationScope| -> Result<f64, InvalidLayout> {
            if *l == layout() {
                Ok(0.0)
            } else {
                Err(InvalidLayout::new("moved"))
            }
        };
        let mut c = chain(&only_start, 1.0, 8);
        let mut sink = Recorder(Vec::new());
        let stats = c.step_materialized(&mut sink);
        assert!(!stats.step_accepted);
        assert_eq!(sink.0.len(), 2);
        assert_ne!(sink.0[0], layout());
        assert_eq!(sink.0[1], layout());
        assert_eq!(c.current_layout(), &layout());
    }

    #[test]
    fn cold_chain_descends() {
        let mut c = chain(&spread, 0.01, 5);
        let start = c.current_energy();
        for _ in 0..2000 {
            c.step();
        }
        assert!(c.current_energy() < start);
    }

    #[test]
    fn empty_move_set_never_accepts() {
        let start = layout();
        let moves = MoveSet::new(&start, &NodeCatalog::builtin(), &[], &[]);
        let scope = EvaluationScope::full(&start);
        let mut c = McmcChain::new(start, &spread, scope, moves, MoveParams::default(), 1.0, Pcg32::new(1, 0));
        let stats = c.step();
        assert!(!stats.step_accepted);
        assert_eq!(stats.energy, 45.0);
    }

    #[test]
    fn swap_step_exchanges_state_not_temperature() {
        let high = |_: &Layout, _: &EvaluationScope| -> Result<f64, InvalidLayout> { Ok(10.0) };
        let low = |_: &Layout, _: &EvaluationScope| -> Result<f64, InvalidLayout> { Ok(1.0) };
        let mut cold = chain(&high, 1.0, 1);
        let mut hot = chain(&low, 10.0, 2);
        hot.step();
        let hot_layout = hot.current_layout().clone();
        assert_ne!(hot_layout, layout());

        // a hotter chain holding lower energy always swaps down
        assert!(McmcChain::swap_step(&mut cold, &mut hot, &mut Pcg32::new(0, 9)));
        assert_eq!(cold.current_layout(), &hot_layout);
        assert_eq!(hot.current_layout(), &layout());
        assert_eq!(cold.current_energy(), 1.0);
        assert_eq!(hot.current_energy(), 10.0);
        assert_eq!(cold.temperature(), 1.0);
        assert_eq!(hot.temperature(), 10.0);
    }
}
