use crate::proto::{Address, Command, Numeric, YesNo};
use crate::proto::address::MAX_SHORT;
use crate::sequence::{self, Progress, Sequence, SequenceError, query};

use super::health::{Health, check_gear};

const DEVICE_TYPE_NONE: u8 = 254;
const DEVICE_TYPE_MULTIPLE: u8 = 255;

/// What one short address looked like during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub address: Address,
    pub present: bool,
    pub device_types: Vec<u8>,
    /// False when the actual-level query answered MASK.
    pub has_level: bool,
}

impl ScanEntry {
    pub fn has_device_type(&self, device_type: u8) -> bool {
        self.device_types.contains(&device_type)
    }
}

/// Device types implemented by the gear at `address`.
///
/// Gear with several types answers 255 and is then walked with
/// QueryNextDeviceType, which returns them in ascending order ending with 254.
pub fn query_device_types(address: Address) -> Sequence<Vec<u8>> {
    query::<Numeric>(Command::query_device_type(address)).and_then(move |r| {
        if r.is_empty() {
            return Sequence::done(Vec::new());
        }
        match r.value() {
            Some(DEVICE_TYPE_NONE) => Sequence::done(Vec::new()),
            Some(DEVICE_TYPE_MULTIPLE) | None => next_device_types(address, Vec::new()),
            Some(dt) => Sequence::done(vec![dt]),
        }
    })
}

fn next_device_types(address: Address, mut found: Vec<u8>) -> Sequence<Vec<u8>> {
    query::<Numeric>(Command::query_next_device_type(address)).and_then(move |r| {
        let Some(dt) = r.value() else {
            return Sequence::fail(SequenceError::Protocol(format!(
                "no clean answer to QueryNextDeviceType from {address}"
            )));
        };
        if dt == DEVICE_TYPE_NONE {
            if found.is_empty() {
                return Sequence::fail(SequenceError::Protocol(format!(
                    "{address} reported several device types but listed none"
                )));
            }
            return Sequence::done(found);
        }
        // Types come strictly ascending; 0 cannot follow the 255 that started the walk.
        let last = found.last().copied().unwrap_or(0);
        if dt <= last || dt == DEVICE_TYPE_MULTIPLE {
            return Sequence::fail(SequenceError::Protocol(format!(
                "device type {dt} out of order from {address}"
            )));
        }
        found.push(dt);
        next_device_types(address, found)
    })
}

pub fn scan_address(address: Address) -> Sequence<ScanEntry> {
    query::<YesNo>(Command::query_control_gear_present(address)).and_then(move |present| {
        let present = present.value();
        let types = if present {
            query_device_types(address)
        } else {
            Sequence::done(Vec::new())
        };
        types.and_then(move |device_types| {
            query::<Numeric>(Command::query_actual_level(address)).map(move |level| ScanEntry {
                address,
                present,
                device_types,
                has_level: !level.is_mask(),
            })
        })
    })
}

/// Scan every short address on the bus, reporting progress after each.
pub fn scan_bus() -> Sequence<Vec<ScanEntry>> {
    let size = usize::from(MAX_SHORT) + 1;
    sequence::all(Address::all_short().enumerate(), move |(i, address)| {
        scan_address(address).and_then(move |entry| {
            Sequence::progress(Progress::step(i + 1, size)).map(move |_| entry)
        })
    })
}

/// A configured piece of gear to check on one bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GearTarget {
    pub name: String,
    pub address: Address,
    pub related_emergency: Option<Address>,
}

/// Check every configured gear of one bus, reporting each result as progress.
pub fn audit_bus(targets: Vec<GearTarget>) -> Sequence<Vec<(GearTarget, Health)>> {
    let size = targets.len();
    sequence::all(targets.into_iter().enumerate(), move |(i, target)| {
        check_gear(target.address, target.related_emergency).and_then(move |health| {
            let note = format!("{} {}: {}", target.address, target.name, health);
            Sequence::progress(Progress::step(i + 1, size).with_message(note))
                .map(move |_| (target, health))
        })
    })
}
