//! Replica-exchange (parallel tempering) over layouts.
//!
//! `chain_count` Metropolis chains run side by side at temperatures
//! `T0·f^i`, with move step sizes scaled by `g^i`. After every iteration one
//! adjacent pair may exchange states. Each chain owns its own PRNG stream
//! (same seed, sequence number = chain index) and swap decisions draw from a
//! dedicated stream (sequence = `chain_count`), so a run is reproducible
//! whether the chains step serially or on the rayon pool.
//!
//! With hierarchical optimisation the run is split into schedule entries:
//! one per cluster parent, deepest first, then the whole scene. Each entry
//! moves only the direct children of its parent and evaluates only the
//! parent's subtree. The best layout found by an entry is committed before
//! the next one starts.

use std::collections::VecDeque;
use std::ops::ControlFlow;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::NodeCatalog;
use crate::chain::{evaluate, McmcChain, StepStatistics};
use crate::energy::{Energy, EvaluationScope};
use crate::layout::Layout;
use crate::moves::{MoveParams, MoveSet};
use crate::prng::Pcg32;

/// Steps over which acceptance rates are smoothed for progress reports.
pub const PROGRESS_WINDOW: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperingParams {
    /// Step budget shared by all schedule entries and chains.
    pub total_steps: u64,
    pub chain_count: usize,
    pub first_temperature: f64,
    pub temperature_factor: f64,
    pub step_factor: f64,
    pub swap_probability: f64,
    pub seed: u64,
    /// Step chains on the rayon pool. Results do not depend on this.
    pub parallel: bool,
}

impl Default for TemperingParams {
    fn default() -> Self {
        TemperingParams {
            total_steps: 10_000,
            chain_count: 10,
            first_temperature: 1.0,
            temperature_factor: 1.3,
            step_factor: 1.0,
            swap_probability: 1.0,
            seed: 0,
            parallel: true,
        }
    }
}

/// Temperature ladder `first · factor^i` for `chain_count` chains.
pub fn temperature_ladder(chain_count: usize, first: f64, factor: f64) -> Vec<f64> {
    (0..chain_count).map(|i| first * factor.powi(i as i32)).collect()
}

/// Move step multipliers `factor^i` for `chain_count` chains.
pub fn step_factors(chain_count: usize, factor: f64) -> Vec<f64> {
    (0..chain_count).map(|i| factor.powi(i as i32)).collect()
}

/// One optimisation phase of a hierarchical run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleEntry {
    /// Cluster parent whose children move; `None` for the whole scene.
    pub parent: Option<usize>,
    /// Objects that receive moves.
    pub objects: Vec<usize>,
    /// Paths that receive moves.
    pub paths: Vec<usize>,
    pub scope: EvaluationScope,
}

fn depth(layout: &Layout, index: usize) -> usize {
    let mut depth = 0;
    let mut current = layout.objects[index].parent_index;
    while let Some(parent) = current {
        depth += 1;
        if depth > layout.objects.len() {
            break;
        }
        current = layout.objects[parent].parent_index;
    }
    depth
}

fn subtree(layout: &Layout, root: usize) -> Vec<usize> {
    let mut members = vec![root];
    let mut next = 0;
    while next < members.len() {
        let current = members[next];
        next += 1;
        for (i, object) in layout.objects.iter().enumerate() {
            if object.parent_index == Some(current) && !members.contains(&i) {
                members.push(i);
            }
        }
    }
    members
}

/// Builds the optimisation schedule for `layout`.
///
/// Without `hierarchical` the schedule is a single whole-scene entry moving
/// every object and path.
pub fn hierarchical_schedule(layout: &Layout, hierarchical: bool) -> Vec<ScheduleEntry> {
    let mut entries = Vec::new();
    if hierarchical {
        let mut parents: Vec<usize> = layout.objects.iter().filter_map(|o| o.parent_index).collect();
        parents.sort_unstable();
        parents.dedup();
        let mut order: Vec<(usize, usize)> = parents.into_iter().map(|p| (depth(layout, p), p)).collect();
        order.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        for (_, parent) in order {
            let members = subtree(layout, parent);
            let objects = (0..layout.objects.len())
                .filter(|&i| layout.objects[i].parent_index == Some(parent))
                .collect();
            let paths: Vec<usize> = (0..layout.paths.len())
                .filter(|&i| layout.paths[i].owner.is_some_and(|o| members.contains(&o)))
                .collect();
            entries.push(ScheduleEntry {
                parent: Some(parent),
                objects,
                paths: paths.clone(),
                scope: EvaluationScope::new(members, paths),
            });
        }
    }

    let objects = (0..layout.objects.len())
        .filter(|&i| !hierarchical || layout.objects[i].parent_index.is_none())
        .collect();
    entries.push(ScheduleEntry {
        parent: None,
        objects,
        paths: (0..layout.paths.len()).collect(),
        scope: EvaluationScope::full(layout),
    });
    entries
}

/// Snapshot reported after every iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub entry: usize,
    pub entry_count: usize,
    pub steps_completed: u64,
    pub total_steps: u64,
    /// One entry per chain, in ladder order.
    pub statistics: Vec<StepStatistics>,
    /// Lowest energy seen in the current entry.
    pub best_energy: f64,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.total_steps == 0 {
            1.0
        } else {
            (self.steps_completed as f64 / self.total_steps as f64).min(1.0)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemperingResult {
    pub layout: Layout,
    /// Energy of `layout` over the whole scene.
    pub energy: f64,
    pub iterations: u64,
    pub steps_completed: u64,
}

/// Drives the chains of every schedule entry in turn.
pub struct ReplicaExchange<'a> {
    params: TemperingParams,
    move_params: MoveParams,
    catalog: &'a NodeCatalog,
    energy: &'a dyn Energy,
    schedule: Vec<ScheduleEntry>,
    entry: usize,
    committed: Layout,
    chains: Vec<McmcChain<'a>>,
    rngs: Vec<Pcg32>,
    swap_rng: Pcg32,
    best_layout: Layout,
    best_energy: f64,
    iterations_per_entry: u64,
    entry_iteration: u64,
    iterations: u64,
    steps_completed: u64,
}

impl<'a> ReplicaExchange<'a> {
    pub fn new(
        layout: Layout,
        energy: &'a dyn Energy,
        catalog: &'a NodeCatalog,
        schedule: Vec<ScheduleEntry>,
        params: TemperingParams,
        move_params: MoveParams,
    ) -> Self {
        let chain_count = params.chain_count.max(1);
        let steps_per_entry = if schedule.is_empty() {
            0
        } else {
            params.total_steps / schedule.len() as u64
        };
        let iterations_per_entry = steps_per_entry.div_ceil(chain_count as u64);
        debug!(
            entries = schedule.len(),
            chain_count, iterations_per_entry, "replica exchange configured"
        );
        ReplicaExchange {
            rngs: (0..chain_count).map(|i| Pcg32::new(params.seed, i as u64)).collect(),
            swap_rng: Pcg32::new(params.seed, chain_count as u64),
            params: TemperingParams { chain_count, ..params },
            move_params,
            catalog,
            energy,
            schedule,
            entry: 0,
            best_layout: layout.clone(),
            committed: layout,
            chains: Vec::new(),
            best_energy: f64::INFINITY,
            iterations_per_entry,
            entry_iteration: 0,
            iterations: 0,
            steps_completed: 0,
        }
    }

    pub fn schedule(&self) -> &[ScheduleEntry] {
        &self.schedule
    }

    /// Layout committed by the entries completed so far.
    pub fn committed_layout(&self) -> &Layout {
        &self.committed
    }

    pub fn chains(&self) -> &[McmcChain<'a>] {
        &self.chains
    }

    fn start_entry(&mut self) {
        let entry = &self.schedule[self.entry];
        let temperatures = temperature_ladder(
            self.params.chain_count,
            self.params.first_temperature,
            self.params.temperature_factor,
        );
        let factors = step_factors(self.params.chain_count, self.params.step_factor);
        let moves = MoveSet::new(&self.committed, self.catalog, &entry.objects, &entry.paths);
        debug!(
            entry = self.entry,
            parent = ?entry.parent,
            moves = moves.len(),
            "starting schedule entry"
        );

        let rngs = std::mem::take(&mut self.rngs);
        self.chains = rngs
            .into_iter()
            .zip(temperatures.into_iter().zip(factors))
            .map(|(rng, (temperature, factor))| {
                McmcChain::new(
                    self.committed.clone(),
                    self.energy,
                    entry.scope.clone(),
                    moves.clone(),
                    self.move_params.scaled(factor),
                    temperature,
                    rng,
                )
            })
            .collect();
        self.best_energy = self.chains[0].current_energy();
        self.best_layout = self.chains[0].current_layout().clone();
        self.entry_iteration = 0;
    }

    fn finish_entry(&mut self) {
        info!(
            entry = self.entry,
            best_energy = self.best_energy,
            "schedule entry finished"
        );
        self.rngs = std::mem::take(&mut self.chains)
            .into_iter()
            .map(McmcChain::into_rng)
            .collect();
        self.committed = self.best_layout.clone();
        self.entry += 1;
    }

    /// Runs one iteration: every chain steps once, then one swap may happen.
    /// Returns `None` once every schedule entry is complete.
    pub fn next_iteration(&mut self) -> Option<Progress> {
        loop {
            if self.entry >= self.schedule.len() {
                return None;
            }
            if self.chains.is_empty() {
                self.start_entry();
            }
            if self.entry_iteration < self.iterations_per_entry {
                break;
            }
            self.finish_entry();
        }

        let mut statistics: Vec<StepStatistics> = if self.params.parallel && self.chains.len() > 1 {
            self.chains.par_iter_mut().map(|chain| chain.step()).collect()
        } else {
            self.chains.iter_mut().map(|chain| chain.step()).collect()
        };

        for chain in &self.chains {
            if chain.current_energy() < self.best_energy {
                self.best_energy = chain.current_energy();
                self.best_layout = chain.current_layout().clone();
            }
        }

        let chain_count = self.chains.len();
        if chain_count > 1 && self.swap_rng.next_float() < self.params.swap_probability {
            let boundary = self.swap_rng.next_index(chain_count - 1);
            let (low, high) = self.chains.split_at_mut(boundary + 1);
            let accepted = McmcChain::swap_step(&mut low[boundary], &mut high[0], &mut self.swap_rng);
            statistics[boundary].swap_accepted = accepted;
            statistics[boundary + 1].swap_accepted = accepted;
            statistics[boundary].energy = self.chains[boundary].current_energy();
            statistics[boundary + 1].energy = self.chains[boundary + 1].current_energy();
        }

        self.entry_iteration += 1;
        self.iterations += 1;
        self.steps_completed += chain_count as u64;

        let progress = Progress {
            entry: self.entry,
            entry_count: self.schedule.len(),
            steps_completed: self.steps_completed,
            total_steps: self.params.total_steps,
            statistics,
            best_energy: self.best_energy,
        };
        if self.entry_iteration == self.iterations_per_entry {
            self.finish_entry();
        }
        Some(progress)
    }

    /// Commits the best layout of an unfinished entry and reports the result.
    pub fn finish(mut self) -> TemperingResult {
        if !self.chains.is_empty() {
            self.finish_entry();
        }
        let scope = EvaluationScope::full(&self.committed);
        let energy = evaluate(self.energy, &self.committed, &scope);
        info!(
            energy,
            iterations = self.iterations,
            steps = self.steps_completed,
            "replica exchange finished"
        );
        TemperingResult {
            layout: self.committed,
            energy,
            iterations: self.iterations,
            steps_completed: self.steps_completed,
        }
    }

    /// Runs to completion, or until `observer` breaks.
    pub fn run(mut self, mut observer: impl FnMut(&Progress) -> ControlFlow<()>) -> TemperingResult {
        while let Some(progress) = self.next_iteration() {
            if observer(&progress).is_break() {
                debug!(iterations = self.iterations, "replica exchange cancelled");
                break;
            }
        }
        self.finish()
    }
}

/// Smoothed per-chain acceptance and swap rates over the last
/// [`PROGRESS_WINDOW`] iterations.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    window: usize,
    accepted: Vec<VecDeque<bool>>,
    swapped: Vec<VecDeque<bool>>,
}

impl ProgressTracker {
    pub fn new(chain_count: usize) -> Self {
        Self::with_window(chain_count, PROGRESS_WINDOW)
    }

    pub fn with_window(chain_count: usize, window: usize) -> Self {
        ProgressTracker {
            window: window.max(1),
            accepted: vec![VecDeque::new(); chain_count],
            swapped: vec![VecDeque::new(); chain_count],
        }
    }

    pub fn record(&mut self, progress: &Progress) {
        for (i, stats) in progress.statistics.iter().enumerate() {
            if i >= self.accepted.len() {
                break;
            }
            push_bounded(&mut self.accepted[i], stats.step_accepted, self.window);
            push_bounded(&mut self.swapped[i], stats.swap_accepted, self.window);
        }
    }

    pub fn acceptance_rate(&self, chain: usize) -> Option<f64> {
        self.accepted.get(chain).and_then(rate)
    }

    pub fn swap_rate(&self, chain: usize) -> Option<f64> {
        self.swapped.get(chain).and_then(rate)
    }
}

fn push_bounded(queue: &mut VecDeque<bool>, value: bool, window: usize) {
    queue.push_back(value);
    if queue.len() > window {
        queue.pop_front();
    }
}

fn rate(queue: &VecDeque<bool>) -> Option<f64> {
    if queue.is_empty() {
        None
    } else {
        Some(queue.iter().filter(|&&v| v).count() as f64 / queue.len() as f64)
    }
}
