//! Console reporter with live output

use console::style;
use gantry_core::Verbosity;
use gantry_tasks::{TaskEvent, TaskReporter};

fn seconds(duration: &std::time::Duration) -> String {
    format!("{:.1}s", duration.as_secs_f64())
}

/// Prints task events as they happen.
///
/// Quiet output keeps failures and the final summary only.
pub struct ConsoleReporter {
    verbosity: Verbosity,
}

impl ConsoleReporter {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    fn quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    fn verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }
}

impl TaskReporter for ConsoleReporter {
    fn report(&self, event: &TaskEvent) {
        match event {
            TaskEvent::Started { id, function } => {
                if self.quiet() {
                    return;
                }
                println!(
                    "  {} {} {}",
                    style("▸").dim(),
                    style(id).bold(),
                    if self.verbose() {
                        style(format!("({})", function)).dim().to_string()
                    } else {
                        String::new()
                    }
                );
            }
            TaskEvent::EffectStarted { verb, target, .. } => {
                if !self.quiet() {
                    println!("    {} {}", style(verb).cyan(), target);
                }
            }
            TaskEvent::EffectSkipped { verb, target, reason, .. } => {
                if !self.quiet() {
                    println!(
                        "    {} {} {}",
                        style(verb).dim(),
                        style(target).dim(),
                        style(format!("({})", reason)).dim()
                    );
                }
            }
            TaskEvent::EffectFailed { id, verb, target, error } => {
                eprintln!(
                    "    {} {} {} {}",
                    style(verb).red(),
                    target,
                    style(format!("[{}]", id)).dim(),
                    style(error).red().dim()
                );
            }
            TaskEvent::Output { id, line, is_stderr } => {
                if self.verbose() {
                    if *is_stderr {
                        println!("    {} {}", style(format!("[{}]", id)).red().dim(), line);
                    } else {
                        println!("    {} {}", style(format!("[{}]", id)).dim(), line);
                    }
                }
            }
            TaskEvent::Completed { id, duration, effects } => {
                if self.quiet() {
                    return;
                }
                let detail = if effects.skipped > 0 {
                    format!("{} run, {} skipped", effects.executed, effects.skipped)
                } else {
                    format!("{} run", effects.executed)
                };
                println!(
                    "  {} {} {} {}",
                    style("✓").green(),
                    style(id).green(),
                    style(format!("({})", detail)).dim(),
                    style(seconds(duration)).dim()
                );
            }
            TaskEvent::Skipped { id, reason } => {
                if !self.quiet() {
                    println!(
                        "  {} {} {}",
                        style("○").yellow(),
                        style(id).yellow(),
                        style(format!("({})", reason)).dim()
                    );
                }
            }
            TaskEvent::Failed { id, duration, error } => {
                eprintln!(
                    "  {} {} {} {}",
                    style("✗").red(),
                    style(id).red(),
                    style(seconds(duration)).dim(),
                    style(error).red().dim()
                );
            }
            TaskEvent::Canceled { id, reason } => {
                eprintln!(
                    "  {} {} {}",
                    style("⊘").magenta(),
                    style(id).magenta(),
                    style(format!("({})", reason)).dim()
                );
            }
            TaskEvent::AllCompleted {
                total,
                succeeded,
                skipped,
                failed,
                canceled,
                duration,
            } => {
                println!();
                println!(
                    "  {} {}/{} succeeded, {} skipped, {} failed, {} canceled ({})",
                    if *failed == 0 && *canceled == 0 {
                        style("✓").green().bold()
                    } else {
                        style("✗").red().bold()
                    },
                    succeeded,
                    total,
                    skipped,
                    failed,
                    canceled,
                    seconds(duration)
                );
            }
        }
    }
}
