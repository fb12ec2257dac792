use anyhow::{Context, Result, anyhow};

use licon::proto::{Address, Command, Response};
use licon::site::{Bus, Site};

use crate::cli::{Target, TargetOpts};

/// Buses and address a target resolves to.
fn resolve<'a>(sites: &'a [Site], target: &Target) -> Result<(Vec<&'a Bus>, Address)> {
    let site = sites
        .iter()
        .find(|s| s.key == target.site)
        .ok_or_else(|| anyhow!("site {} not known", target.site))?;
    let buses = match &target.bus {
        Some(key) => vec![
            site.bus(key)
                .ok_or_else(|| anyhow!("bus {key} not known at site {}", site.key))?,
        ],
        None => site.buses.values().collect(),
    };
    Ok((buses, target.address.unwrap_or(Address::Broadcast)))
}

/// Send the command built by `make` to every bus the target names.
pub fn run(
    sites: &[Site],
    opts: &TargetOpts,
    verbose: bool,
    make: impl Fn(Address) -> Command,
) -> Result<()> {
    let (buses, address) = resolve(sites, &opts.target)?;
    for bus in buses {
        let command = make(address);
        let label = command.to_string();
        if verbose || opts.dry_run {
            let verb = if opts.dry_run { "Would send" } else { "Sending" };
            println!("{verb} {label} on bus {}", bus.name);
        }
        if !opts.dry_run {
            let _: Option<Response> = bus
                .run(command, None)
                .with_context(|| format!("sending {label} on bus {}", bus.name))?;
        }
    }
    Ok(())
}
