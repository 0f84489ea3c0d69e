//! `rehook` binary entry point.
//!
//! Initializes tracing, parses the CLI, and drives [`rehook::cli::run`]
//! on a multi-threaded tokio runtime. Exits 0 on listing or a graceful
//! signal termination, 1 on any fatal error.

use clap::Parser;
use colored::Colorize;
use rehook::cli::{run, Cli};
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("{} failed to build tokio runtime: {err}", "[!] ERROR".red().bold());
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(run(cli)) {
        eprintln!("{} {err}", "[!] ERROR".red().bold());
        std::process::exit(1);
    }
}
