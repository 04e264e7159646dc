mod cli;
mod commands;
mod model;
mod naming;
mod normalize;
mod plan;
mod probe;
mod tools;
mod util;

use anyhow::{Result, bail};
use clap::Parser;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::tools::MissingTools;

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let parsed = Cli::try_parse();
    if let Err(err) = &parsed {
        if !err.use_stderr() {
            err.exit();
        }
    }

    // Missing tools are reported even when the command line is invalid.
    let required = match &parsed {
        Ok(cli) => commands::required_tools(&cli.command),
        Err(_) => tools::ALL_TOOLS,
    };
    let missing = tools::missing_tools(required);
    report_missing(&missing);

    let cli = match parsed {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            if missing.is_empty() {
                bail!("invalid command line");
            }
            bail!("invalid command line; missing required tools: {missing}");
        }
    };

    if !missing.is_empty() {
        bail!("missing required tools: {missing}");
    }

    match cli.command {
        Commands::Split(args) => commands::split::run(args),
        Commands::Chapters(args) => commands::chapters::run(args),
        Commands::Doctor => commands::doctor::run(),
    }
}

fn report_missing(missing: &MissingTools) {
    for (package, programs) in missing.groups() {
        warn!(package, tools = %programs.join(", "), "required tools not found; install the package");
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
