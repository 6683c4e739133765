//! Output formatting utilities

mod reporter;

pub use reporter::ConsoleReporter;

use console::style;
use gantry_tasks::TaskFailedError;

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Print a warning message
pub fn warning(message: &str) {
    eprintln!("{} {}", style("!").yellow().bold(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", style("→").blue(), message);
}

/// Create a styled key-value line
pub fn key_value(key: &str, value: &str) -> String {
    format!("  {}: {}", style(key).dim(), value)
}

/// Messages of `error` and every error below it
pub fn cause_chain(error: &(dyn std::error::Error + 'static)) -> Vec<String> {
    std::iter::successors(Some(error), |e| e.source())
        .map(|e| e.to_string())
        .collect()
}

/// One line naming a failed target and the error that triggered it
pub fn failure_summary(failure: &TaskFailedError) -> String {
    let label = if failure.is_configuration() {
        format!("{} ", style("configuration error:").yellow())
    } else {
        String::new()
    };
    format!("{}: {}{}", failure.id, label, failure.source)
}

/// Print the error that ended the command with its causes
pub fn report_error(err: &anyhow::Error) {
    error(&err.to_string());
    for cause in err.chain().skip(1) {
        eprintln!("  {} {}", style("caused by:").dim(), cause);
    }
}
