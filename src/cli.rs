use anyhow::anyhow;
use clap::{Args, Parser, Subcommand};
use licon::proto::Address;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Parser, Debug, Clone)]
#[command(name = "licon", about = "Lighting bus control and site health checks")]
pub struct Cli {
    /// Site inventory file
    #[arg(short = 'c', long, default_value = "config.toml")]
    pub configfile: PathBuf,
    /// Only act on this site (repeatable)
    #[arg(short, long = "site", global = true)]
    pub sites: Vec<String>,
    /// Report more detail
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Cmd {
    /// List configured gear
    List,
    /// Scan every address on every bus and compare with the inventory
    Scan,
    /// Check the health of configured gear
    Check,
    /// Set arc power level
    Level(LevelOpts),
    /// Switch off immediately without fading
    Off(TargetOpts),
    /// Dim up for 200ms
    Up(TargetOpts),
    /// Dim down for 200ms
    Down(TargetOpts),
}

#[derive(Args, Debug, Clone)]
pub struct TargetOpts {
    /// site[/bus[/address]]; address is a number or gN for a group
    pub target: Target,
    /// Print commands instead of sending them
    #[arg(short = 'n', long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LevelOpts {
    #[command(flatten)]
    pub target: TargetOpts,
    /// Arc power level (0..=254)
    #[arg(value_parser = clap::value_parser!(u8).range(0..=254))]
    pub level: u8,
}

/// Where a control command goes. Omitted parts mean every bus of the site,
/// and broadcast on each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub site: String,
    pub bus: Option<String>,
    pub address: Option<Address>,
}

impl FromStr for Target {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let mut parts = s.split('/');
        let site = parts.next().unwrap_or_default();
        if site.is_empty() {
            return Err(anyhow!("target must start with a site name"));
        }
        let bus = parts.next().filter(|b| !b.is_empty()).map(str::to_string);
        let address = parts.next().map(str::parse::<Address>).transpose()?;
        if parts.next().is_some() {
            return Err(anyhow!("target is site[/bus[/address]]"));
        }
        if address.is_some() && bus.is_none() {
            return Err(anyhow!("an address needs a bus"));
        }
        Ok(Target {
            site: site.to_string(),
            bus,
            address,
        })
    }
}
