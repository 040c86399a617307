mod cli;
mod commands;
mod config;

use std::process;

use anyhow::Result;
use clap::Parser;
#[cfg(feature = "colored-output")]
use colored::*;
use comics_source::Locale;
use tracing::{Level, debug, error};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::cli::{Args, Commands};
use crate::config::AppConfig;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let json = args.json;

    if let Err(e) = run(args).await {
        if json {
            let error_json = serde_json::json!({
                "status": "error",
                "message": format!("{e:#}"),
            });
            println!("{error_json}");
        } else {
            error!("Application error: {e:#}");
            #[cfg(feature = "colored-output")]
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            #[cfg(not(feature = "colored-output"))]
            eprintln!("Error: {e:#}");
        }
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    init_logging(args.verbose, args.quiet);

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(lang) = args.lang.as_deref() {
        config.source.locale = lang.parse::<Locale>()?;
    }
    if args.cookie.is_some() {
        config.cookie = args.cookie;
    }
    debug!(locale = %config.source.locale, base_url = %config.source.base_url, "Loaded configuration");

    match args.command {
        Commands::Locale => commands::locale(config.source.locale.config(), args.json),
        Commands::Chapters { comic } => {
            let source = commands::build_source(config)?;
            commands::chapters(&source, &comic, args.json).await
        }
        Commands::Pages { chapter, resolve } => {
            let source = commands::build_source(config)?;
            commands::pages(&source, &chapter, resolve, args.json).await
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(verbose),
        )
        .init();
}
