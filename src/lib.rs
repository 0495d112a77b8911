//! Scene generation from probabilistic graph grammars.
//!
//! A grammar derives a relationship graph (object types linked by spatial
//! relations); the graph is placed at random and the layout is then
//! optimised by replica-exchange MCMC against an energy function.
//! [`generate::generate_json`] runs the whole pipeline on a JSON parameter
//! document.

pub mod catalog;
pub mod chain;
pub mod collision;
pub mod config;
pub mod energy;
pub mod error;
pub mod generate;
pub mod grammar;
pub mod grammars;
pub mod graph;
pub mod layout;
pub mod morphism;
pub mod moves;
pub mod placement;
pub mod prng;
pub mod relationship;
pub mod rule;
pub mod scene;
pub mod tempering;

pub use error::{Error, Result};
pub use generate::{generate, generate_json};
