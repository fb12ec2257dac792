//! Subcommand implementations.

pub mod check;
pub mod control;
pub mod list;
pub mod scan;

use licon::proto::Address;

/// The address part of a `site/bus/address` path.
pub fn address_segment(address: Address) -> String {
    match address {
        Address::Short(a) => a.to_string(),
        Address::Group(g) => format!("g{g}"),
        Address::Broadcast => "*".to_string(),
    }
}
