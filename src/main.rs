use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use licon::config::Config;
use licon::proto::Command;
use licon::site::Site;

mod cli;
mod cmd;

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    init_logging(args.verbose);

    let mut config = Config::load(&args.configfile)?;
    if !args.sites.is_empty() {
        config.retain_sites(&args.sites)?;
    }
    let sites = Site::load_all(&config)
        .with_context(|| format!("invalid configuration in {}", args.configfile.display()))?;

    let verbose = args.verbose;
    match args.cmd {
        cli::Cmd::List => cmd::list::run(&sites),
        cli::Cmd::Scan => cmd::scan::run(&sites, verbose)?,
        cli::Cmd::Check => cmd::check::run(&sites, verbose),
        cli::Cmd::Level(opts) => {
            let level = opts.level;
            cmd::control::run(&sites, &opts.target, verbose, |a| Command::dapc(a, level))?
        }
        cli::Cmd::Off(opts) => cmd::control::run(&sites, &opts, verbose, Command::off)?,
        cli::Cmd::Up(opts) => cmd::control::run(&sites, &opts, verbose, Command::up)?,
        cli::Cmd::Down(opts) => cmd::control::run(&sites, &opts, verbose, Command::down)?,
    }
    Ok(())
}
