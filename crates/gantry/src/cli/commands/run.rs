//! Run command: execute (or clean) the selected targets

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use console::style;
use gantry_core::{Mode, Verbosity};
use gantry_tasks::{Executor, ExecutorOptions, RunSummary, TaskReporter, TracingReporter};
use tracing::info;

use crate::cli::commands::build_graph;
use crate::cli::output::{self, ConsoleReporter};
use crate::cli::{Cli, OutputFormat};
use crate::exit_codes;

pub async fn execute(cli: &Cli) -> anyhow::Result<i32> {
    let (config, graph) = build_graph(cli)?;
    let verbosity = cli.verbosity(&config);
    let mode = cli.mode();

    if cli.format == OutputFormat::Text && verbosity > Verbosity::Quiet {
        output::info(&format!(
            "{} {} target{}{}",
            if mode == Mode::Clean { "Cleaning" } else { "Running" },
            graph.len(),
            if graph.len() == 1 { "" } else { "s" },
            if cli.dry_run { " (dry run)" } else { "" },
        ));
        if verbosity == Verbosity::Verbose {
            println!();
            print!("{}", graph.execution_plan());
        }
        println!();
    }

    let reporter: Arc<dyn TaskReporter> = match cli.format {
        OutputFormat::Text => Arc::new(ConsoleReporter::new(verbosity)),
        OutputFormat::Json => Arc::new(TracingReporter),
    };

    let options = ExecutorOptions {
        concurrency: cli.concurrency.unwrap_or(config.settings.concurrency),
        mode,
        verbosity,
        dry_run: cli.dry_run,
        force: cli.force,
        fail_fast: cli.fail_fast,
        default_timeout: config.settings.default_timeout,
    };
    let executor = Executor::new(options, reporter);

    let interrupted = Arc::new(AtomicBool::new(false));
    let signal = {
        let token = executor.shutdown_token();
        let interrupted = interrupted.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupted.store(true, Ordering::SeqCst);
                output::warning("Interrupted, stopping targets");
                token.cancel();
            }
        })
    };

    let summary = executor.execute(Arc::new(graph)).await;
    signal.abort();
    info!(success = summary.is_success(), "run complete");

    if cli.format == OutputFormat::Json {
        print_json(&summary)?;
    }
    print_failures(&summary);

    Ok(exit_codes::for_summary(&summary, interrupted.load(Ordering::SeqCst)))
}

fn print_json(summary: &RunSummary) -> anyhow::Result<()> {
    let failures: Vec<serde_json::Value> = summary
        .failures()
        .map(|failure| {
            serde_json::json!({
                "id": failure.id.to_string(),
                "causes": output::cause_chain(failure),
            })
        })
        .collect();

    let mut value = serde_json::to_value(summary)?;
    if let Some(object) = value.as_object_mut() {
        object.insert("success".to_string(), summary.is_success().into());
        object.insert("failures".to_string(), failures.into());
    }
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_failures(summary: &RunSummary) {
    let failures: Vec<_> = summary.failures().collect();
    if failures.is_empty() {
        return;
    }

    eprintln!();
    eprintln!(
        "  {} {}/{} targets failed:",
        style("✗").red().bold(),
        failures.len(),
        summary.total()
    );
    for failure in failures {
        eprintln!("    {} {}", style("✗").red(), output::failure_summary(failure));
        for cause in output::cause_chain(failure).iter().skip(1) {
            eprintln!("      {} {}", style("caused by:").dim(), cause);
        }
    }
}
