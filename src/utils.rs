//! Utilities module.

use colored::Colorize;
use serde::Serialize;
use std::io::{self, Write};

/// Prints an error on the standard error output.
pub fn print_error<S: AsRef<str>>(error: S) {
    let _ = writeln!(
        io::stderr(),
        "{} {}",
        "Error:".bold().red(),
        error.as_ref().red()
    );
}

/// Prints a warning on the standard error output.
pub fn print_warning<S: AsRef<str>>(warning: S) {
    let _ = writeln!(
        io::stderr(),
        "{} {}",
        "Warning:".bold().yellow(),
        warning.as_ref().yellow()
    );
}

/// Prints a value as pretty JSON on the standard output.
pub fn print_json<T: Serialize>(value: &T) -> Result<(), failure::Error> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, value)?;
    writeln!(handle)?;
    Ok(())
}
