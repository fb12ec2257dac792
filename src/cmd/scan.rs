use anyhow::{Result, bail};
use tracing::error;

use licon::diag::ScanEntry;
use licon::proto::command::DEVICE_TYPE_EMERGENCY;
use licon::sequence::Progress;
use licon::site::{Bus, BusObserver, Site};

use super::address_segment;

/// What a scanned address means relative to the inventory.
#[derive(Debug, PartialEq, Eq)]
enum Finding<'a> {
    Missing(&'a str),
    New,
    Configured(&'a str),
    EmergencyUnit,
    NotALight,
    Nothing,
}

fn classify<'a>(entry: &ScanEntry, configured: Option<&'a str>) -> Finding<'a> {
    match configured {
        Some(name) if !entry.present => Finding::Missing(name),
        Some(name) => Finding::Configured(name),
        None if !entry.present => Finding::Nothing,
        None if entry.has_level => Finding::New,
        None if entry.has_device_type(DEVICE_TYPE_EMERGENCY) => Finding::EmergencyUnit,
        None => Finding::NotALight,
    }
}

pub fn run(sites: &[Site], verbose: bool) -> Result<()> {
    let mut failed = 0;
    for site in sites {
        let show = |bus: &Bus, p: &Progress| eprintln!("{}/{} {p}", site.key, bus.key);
        let observer: Option<BusObserver<'_>> =
            if verbose { Some(&show) } else { None };

        for (bus, result) in site.scan(observer) {
            let entries = match result {
                Ok(entries) => entries,
                Err(e) => {
                    error!(site = %site.key, bus = %bus.key, error = %e, "scan failed");
                    failed += 1;
                    continue;
                }
            };
            for entry in entries {
                let idx = format!("{}/{}/{}", site.key, bus.key, address_segment(entry.address));
                let configured = site
                    .gear_at(&bus.key, entry.address)
                    .map(|g| g.name.as_str());
                match classify(&entry, configured) {
                    Finding::Missing(name) => println!("{idx}: {name} **MISSING**"),
                    Finding::New => println!("{idx}: **NEW**"),
                    Finding::Configured(name) if verbose => println!("{idx}: {name}"),
                    Finding::EmergencyUnit if verbose => println!("{idx}: **EMERGENCY UNIT**"),
                    Finding::NotALight if verbose => {
                        println!("{idx}: **NOT A LIGHT** device types {:?}", entry.device_types)
                    }
                    _ => {}
                }
            }
        }
    }
    if failed > 0 {
        bail!("{failed} bus(es) could not be scanned");
    }
    Ok(())
}
