//! Client for lighting-bus gateway daemons, with the diagnostic sequences
//! used to audit the gear on them.

pub mod config;
pub mod diag;
pub mod gateway;
pub mod proto;
pub mod report;
pub mod sequence;
pub mod site;

#[cfg(test)]
mod test_support;
