//! `scenegen` command line: derive scene graphs, run the full generator or
//! print a grammar.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scenegen::config::GeneratorParams;
use scenegen::generate::{derive_graph, generate_with_progress};
use scenegen::grammars;
use scenegen::prng::Pcg32;
use scenegen::scene::{scene_to_dot, GraphFile};
use scenegen::tempering::ProgressTracker;
use scenegen::Result;

/// Scene generation from graph grammars
#[derive(Parser)]
#[command(name = "scenegen")]
#[command(about = "Derive scene graphs and optimise their layouts", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level
    #[arg(long, env = "SCENEGEN_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "SCENEGEN_LOG_JSON", global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Derive a relationship graph from a built-in grammar
    Derive {
        #[arg(short, long, default_value = "simple")]
        grammar: String,
        /// Maximum number of rule applications
        #[arg(short, long, default_value_t = 12)]
        steps: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(short, long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
    /// Derive, place and optimise a scene
    Generate {
        /// Parameter file (JSON); flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        grammar: Option<String>,
        #[arg(long)]
        seed: Option<u64>,
        /// Maximum number of rule applications
        #[arg(long)]
        derivation_steps: Option<usize>,
        /// Total MCMC step budget
        #[arg(long)]
        mcmc_steps: Option<u64>,
        #[arg(long)]
        chains: Option<usize>,
        #[arg(long)]
        temperature: Option<f64>,
        #[arg(long)]
        temperature_factor: Option<f64>,
        #[arg(long)]
        step_factor: Option<f64>,
        #[arg(long)]
        swap_probability: Option<f64>,
        #[arg(long)]
        reparent_probability: Option<f64>,
        /// Optimise clusters before the whole scene
        #[arg(long)]
        hierarchical: bool,
        /// Do not lay out paths
        #[arg(long)]
        no_paths: bool,
        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print a built-in grammar as Graphviz DOT
    Grammar {
        #[arg(default_value = "simple")]
        name: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Dot,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "scenegen failed");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Derive {
            grammar,
            steps,
            seed,
            format,
        } => {
            let graph = derive_graph(&grammar, steps, &mut Pcg32::new(seed, 0))?;
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&GraphFile::from(&graph))?),
                Format::Dot => println!("{}", scene_to_dot(&graph)),
            }
        }
        Command::Generate {
            config,
            grammar,
            seed,
            derivation_steps,
            mcmc_steps,
            chains,
            temperature,
            temperature_factor,
            step_factor,
            swap_probability,
            reparent_probability,
            hierarchical,
            no_paths,
            output,
        } => {
            let mut params: GeneratorParams = match config {
                Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
                None => GeneratorParams::default(),
            };
            if let Some(v) = grammar {
                params.grammar = v;
            }
            if let Some(v) = seed {
                params.seed = v;
            }
            if let Some(v) = derivation_steps {
                params.derivation_steps = v;
            }
            if let Some(v) = mcmc_steps {
                params.tempering.total_steps = v;
            }
            if let Some(v) = chains {
                params.tempering.chain_count = v;
            }
            if let Some(v) = temperature {
                params.tempering.first_temperature = v;
            }
            if let Some(v) = temperature_factor {
                params.tempering.temperature_factor = v;
            }
            if let Some(v) = step_factor {
                params.tempering.step_factor = v;
            }
            if let Some(v) = swap_probability {
                params.tempering.swap_probability = v;
            }
            if let Some(v) = reparent_probability {
                params.moves.reparent_probability = v;
            }
            params.hierarchical |= hierarchical;
            params.path_generation &= !no_paths;

            let mut tracker = ProgressTracker::new(params.tempering.chain_count);
            let mut last_percent = 0;
            let result = generate_with_progress(&params, |progress| {
                tracker.record(progress);
                let percent = (progress.fraction() * 100.0) as u32;
                if percent >= last_percent + 10 {
                    last_percent = percent;
                    info!(
                        percent,
                        entry = progress.entry,
                        best_energy = progress.best_energy,
                        cold_acceptance = ?tracker.acceptance_rate(0),
                        "optimising"
                    );
                }
                std::ops::ControlFlow::Continue(())
            })?;

            let json = serde_json::to_string_pretty(&result)?;
            match output {
                Some(path) => fs::write(path, json)?,
                None => println!("{json}"),
            }
        }
        Command::Grammar { name } => {
            println!("{}", grammars::builtin(&name)?.to_dot());
        }
    }
    Ok(())
}
