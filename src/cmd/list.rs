use licon::site::Site;

use super::address_segment;

pub fn run(sites: &[Site]) {
    for site in sites {
        for gear in &site.gear {
            println!(
                "{}/{}/{}: {}",
                site.key,
                gear.bus,
                address_segment(gear.address),
                gear.name
            );
        }
    }
}
