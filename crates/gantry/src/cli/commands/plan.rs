//! Plan command: show the execution waves without running anything

use crate::cli::{commands::build_graph, output, Cli, OutputFormat};
use crate::exit_codes;

pub fn execute(cli: &Cli) -> anyhow::Result<i32> {
    let (_, graph) = build_graph(cli)?;

    match cli.format {
        OutputFormat::Json => {
            let plan: Vec<serde_json::Value> = graph
                .waves()
                .iter()
                .enumerate()
                .map(|(i, wave)| {
                    serde_json::json!({
                        "wave": i,
                        "targets": wave.iter().map(|id| {
                            let node = graph.get(id);
                            serde_json::json!({
                                "id": id.to_string(),
                                "function": node.map(|n| n.function()),
                                "after": node
                                    .map(|n| n.dependencies().iter().map(|d| d.to_string()).collect::<Vec<_>>())
                                    .unwrap_or_default(),
                                "layers": node.map(|n| n.layers().to_vec()).unwrap_or_default(),
                            })
                        }).collect::<Vec<_>>(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        OutputFormat::Text => {
            output::info(&format!(
                "{} target{} in {} wave{}",
                graph.len(),
                if graph.len() == 1 { "" } else { "s" },
                graph.waves().len(),
                if graph.waves().len() == 1 { "" } else { "s" },
            ));
            if !graph.overrides().is_empty() {
                println!("{}", output::key_value("overrides", &graph.overrides().join(", ")));
            }
            println!();
            print!("{}", graph.execution_plan());
        }
    }

    Ok(exit_codes::SUCCESS)
}
