use licon::sequence::Progress;
use licon::site::{Bus, BusObserver, Site};

use super::address_segment;

pub fn run(sites: &[Site], verbose: bool) {
    for site in sites {
        println!("Site: {}", site.name);
        let show = |bus: &Bus, p: &Progress| {
            if let Some(message) = &p.message {
                println!("    - {}/{}: {message}", site.key, bus.key);
            }
        };
        let observer: Option<BusObserver<'_>> = if verbose {
            println!("  - Gear:");
            Some(&show)
        } else {
            None
        };

        let report = site.check(observer);
        println!("  - Overall state: {}", report.verdict());
        println!("  - Results: {}", report.tally_text());
        for g in report.failures() {
            let path = format!("{}/{}/{}", site.key, g.bus, address_segment(g.address));
            println!("  - {path} {}: {}", g.name, g.outcome);
        }
    }
}
