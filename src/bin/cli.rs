//! typeforge CLI - structural C# editing.
//!
//! Usage:
//!   typeforge types <file>                     # Types declared in a file
//!   typeforge type <file> <name>               # One type
//!   typeforge project [path]                   # Solution / project summary
//!   typeforge find <pattern>                   # Types by name pattern
//!   typeforge refs <type> [--member m]         # Textual references
//!   typeforge impact <type> [--member m]       # Change impact
//!   typeforge add-method <file> <type> <src>   # Add a method
//!   typeforge remove-method <file> <type> <n>  # Remove a method
//!   typeforge rename <old> <new> [--type t]    # Rename a type or member
//!   typeforge validate <file> <type> <op>      # Check an operation

use clap::Parser;
use typeforge::cli::{run, Cli};

fn main() {
    // Logs go to stderr; stdout carries JSON.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
