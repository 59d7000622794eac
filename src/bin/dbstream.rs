//! # dbstream CLI Entry Point
//!
//! ```bash
//! dbstream --create ./streams.db write ./files
//! dbstream ./streams.db read --column timestamp --from 1700000000000
//! RUST_LOG=dbstream=debug dbstream ./streams.db describe
//! ```

use clap::Parser;
use dbstream::cli::{run, Cli};
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
