//! Diagnostic procedures built from sequences.

pub mod health;
pub mod scan;

pub use health::{Health, check_gear, check_related_emergency};
pub use scan::{GearTarget, ScanEntry, audit_bus, query_device_types, scan_address, scan_bus};
