//! End-to-end generation: grammar derivation, initial placement, then
//! replica-exchange optimisation of the layout.

use std::ops::ControlFlow;

use tracing::info;

use crate::catalog::NodeCatalog;
use crate::config::{GenerationResult, GeneratorParams};
use crate::energy::{EvaluationScope, SceneEnergy};
use crate::error::{Error, Result};
use crate::grammars;
use crate::placement::place_objects;
use crate::prng::Pcg32;
use crate::scene::{GraphFile, SceneGraph};
use crate::tempering::{hierarchical_schedule, Progress, ReplicaExchange, TemperingParams};

/// Derives a scene graph from the built-in grammar `name`.
pub fn derive_graph(name: &str, steps: usize, rng: &mut Pcg32) -> Result<SceneGraph> {
    let grammar = grammars::builtin(name)?;
    grammar
        .derive(rng, steps)?
        .ok_or_else(|| Error::NoStartGraph(name.to_string()))
}

pub fn generate(params: &GeneratorParams) -> Result<GenerationResult> {
    generate_with_progress(params, |_| ControlFlow::Continue(()))
}

/// Runs the pipeline, reporting every optimisation iteration to `observer`.
/// Breaking from the observer stops the optimisation early; the best layout
/// found so far is still returned.
pub fn generate_with_progress(
    params: &GeneratorParams,
    observer: impl FnMut(&Progress) -> ControlFlow<()>,
) -> Result<GenerationResult> {
    params.validate()?;
    let catalog = params.catalog.clone().unwrap_or_else(NodeCatalog::builtin);

    // chains use streams 0..n and swaps stream n
    let mut rng = Pcg32::new(params.seed, params.tempering.chain_count as u64 + 1);

    let graph = match &params.graph {
        Some(file) => SceneGraph::try_from(file.clone())?,
        None => derive_graph(&params.grammar, params.derivation_steps, &mut rng)?,
    };

    let layout = match &params.initial_layout {
        Some(layout) => {
            layout.check_against(graph.nodes())?;
            layout.clone()
        }
        None => place_objects(
            &graph,
            &catalog,
            params.hierarchical,
            params.path_generation,
            &mut rng,
        )?,
    };

    let energy = SceneEnergy::new(&graph, &catalog, params.energy.clone());
    let schedule = hierarchical_schedule(&layout, params.hierarchical);
    let tempering = TemperingParams {
        seed: params.seed,
        ..params.tempering.clone()
    };
    let result = ReplicaExchange::new(layout, &energy, &catalog, schedule, tempering, params.moves.clone())
        .run(observer);

    let components = energy
        .components(&result.layout, &EvaluationScope::full(&result.layout))
        .ok();
    info!(
        nodes = graph.node_count(),
        paths = result.layout.paths.len(),
        energy = result.energy,
        steps = result.steps_completed,
        "generation finished"
    );

    Ok(GenerationResult {
        graph: GraphFile::from(&graph),
        layout: result.layout,
        energy: result.energy.is_finite().then_some(result.energy),
        components,
        iterations: result.iterations,
        steps_completed: result.steps_completed,
    })
}

/// Runs the pipeline on a JSON `GeneratorParams` document and returns the
/// JSON `GenerationResult`.
pub fn generate_json(params_json: &str) -> Result<String> {
    let params: GeneratorParams = serde_json::from_str(params_json)?;
    let result = generate(&params)?;
    Ok(serde_json::to_string(&result)?)
}
