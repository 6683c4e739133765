//! Command implementations

pub mod plan;
pub mod run;

use gantry_core::ProjectConfig;
use gantry_tasks::{FunctionRegistry, InvocationGraph, Selection};

use crate::cli::Cli;

/// Load the project and resolve the command line into a graph
pub fn build_graph(cli: &Cli) -> anyhow::Result<(ProjectConfig, InvocationGraph)> {
    let config = cli.load_config()?;
    let selection = Selection::parse(cli.selection_tokens())?;
    let registry = FunctionRegistry::with_builtins();
    let graph = InvocationGraph::build(&config, &registry, &selection)?;
    Ok((config, graph))
}
