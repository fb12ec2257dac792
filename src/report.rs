//! Results of checking a site.

use std::collections::BTreeMap;
use std::fmt;

use crate::diag::Health;
use crate::proto::Address;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Checked(Health),
    /// The bus could not be driven; carries the error text.
    Unreachable(String),
}

impl Outcome {
    pub fn summary(&self) -> &'static str {
        match self {
            Outcome::Checked(health) => health.summary(),
            Outcome::Unreachable(_) => "Unreachable",
        }
    }

    pub fn passes(&self) -> bool {
        matches!(self, Outcome::Checked(h) if h.passes())
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Checked(health) => write!(f, "{health}"),
            Outcome::Unreachable(error) => write!(f, "Unreachable ({error})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GearReport {
    pub bus: String,
    pub address: Address,
    pub name: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteReport {
    pub site: String,
    pub name: String,
    pub gear: Vec<GearReport>,
}

impl SiteReport {
    pub fn new(site: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            name: name.into(),
            gear: Vec::new(),
        }
    }

    pub fn push(&mut self, gear: GearReport) {
        self.gear.push(gear);
    }

    /// A site passes when every gear passes; an empty site passes.
    pub fn passes(&self) -> bool {
        self.gear.iter().all(|g| g.outcome.passes())
    }

    /// Gear count per summary text.
    pub fn tally(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for g in &self.gear {
            *counts.entry(g.outcome.summary()).or_insert(0) += 1;
        }
        counts
    }

    pub fn verdict(&self) -> &'static str {
        if self.passes() { "Pass" } else { "Fail" }
    }

    /// `Emergency lighting test in progress: 1, Ok: 3`
    pub fn tally_text(&self) -> String {
        self.tally()
            .iter()
            .map(|(summary, n)| format!("{summary}: {n}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn failures(&self) -> impl Iterator<Item = &GearReport> {
        self.gear.iter().filter(|g| !g.outcome.passes())
    }
}

impl fmt::Display for SiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.verdict())?;
        if !self.gear.is_empty() {
            write!(f, " ({})", self.tally_text())?;
        }
        Ok(())
    }
}
