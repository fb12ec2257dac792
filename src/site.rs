//! Sites, their buses and the gear configured on them.

use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{Config, ConfigError, SiteConfig};
use crate::diag::{GearTarget, ScanEntry, audit_bus, scan_bus};
use crate::gateway::Gateway;
use crate::proto::Address;
use crate::report::{GearReport, Outcome, SiteReport};
use crate::sequence::{Progress, RunError, Sequence, SequenceRunner};

/// Observer for progress from several buses at once.
pub type BusObserver<'o> = &'o (dyn Fn(&Bus, &Progress) + Sync);

/// One gateway daemon and the bus behind it.
#[derive(Debug, Clone)]
pub struct Bus {
    pub key: String,
    pub name: String,
    pub gateway: Gateway,
}

impl Bus {
    /// Run one sequence with exclusive use of the bus.
    pub fn run<T, S>(
        &self,
        sequence: S,
        progress: Option<&mut dyn FnMut(&Progress)>,
    ) -> Result<T, RunError>
    where
        T: Send + 'static,
        S: Into<Sequence<T>>,
    {
        let mut scope = self.gateway.scope()?;
        let result = match progress {
            Some(observer) => SequenceRunner::new(&mut scope)
                .with_progress(observer)
                .run(sequence),
            None => SequenceRunner::new(&mut scope).run(sequence),
        };
        if let Err(e) = scope.release() {
            debug!(bus = %self.key, error = %e, "closing gateway connection failed");
        }
        result
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gear {
    pub bus: String,
    pub address: Address,
    pub name: String,
    pub related_emergency: Option<Address>,
}

impl Gear {
    fn target(&self) -> GearTarget {
        GearTarget {
            name: self.name.clone(),
            address: self.address,
            related_emergency: self.related_emergency,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Site {
    pub key: String,
    pub name: String,
    pub buses: BTreeMap<String, Bus>,
    pub gear: Vec<Gear>,
}

impl Site {
    pub fn from_config(key: &str, config: &SiteConfig) -> Result<Self, ConfigError> {
        let mut buses = BTreeMap::new();
        for (bus_key, b) in &config.buses {
            if b.timeout_ms == Some(0) {
                return Err(ConfigError::ZeroTimeout {
                    site: key.to_string(),
                    bus: bus_key.clone(),
                });
            }
            let gateway = Gateway::new(b.hostname.clone(), b.port)
                .reuse_connection(true)
                .timeout(b.timeout_ms.map(Duration::from_millis));
            let bus = Bus {
                key: bus_key.clone(),
                name: b.name.clone().unwrap_or_else(|| bus_key.clone()),
                gateway,
            };
            buses.insert(bus_key.clone(), bus);
        }

        let address_err = |gear: &str, source| ConfigError::Address {
            site: key.to_string(),
            gear: gear.to_string(),
            source,
        };
        let mut gear = Vec::with_capacity(config.gear.len());
        for g in &config.gear {
            if !buses.contains_key(&g.bus) {
                return Err(ConfigError::UnknownBus {
                    site: key.to_string(),
                    gear: g.name.clone(),
                    bus: g.bus.clone(),
                });
            }
            let address = Address::short(g.address).map_err(|e| address_err(&g.name, e))?;
            if gear.iter().any(|seen: &Gear| seen.bus == g.bus && seen.address == address) {
                return Err(ConfigError::DuplicateGear {
                    site: key.to_string(),
                    gear: g.name.clone(),
                    bus: g.bus.clone(),
                    address: g.address,
                });
            }
            let related_emergency = g
                .related_emergency
                .map(Address::short)
                .transpose()
                .map_err(|e| address_err(&g.name, e))?;
            gear.push(Gear {
                bus: g.bus.clone(),
                address,
                name: g.name.clone(),
                related_emergency,
            });
        }

        Ok(Self {
            key: key.to_string(),
            name: config.name.clone(),
            buses,
            gear,
        })
    }

    /// Every site in the file, in key order.
    pub fn load_all(config: &Config) -> Result<Vec<Site>, ConfigError> {
        config
            .sites
            .iter()
            .map(|(key, site)| Site::from_config(key, site))
            .collect()
    }

    pub fn bus(&self, key: &str) -> Option<&Bus> {
        self.buses.get(key)
    }

    pub fn gear_on<'a, 'b>(
        &'a self,
        bus: &'b str,
    ) -> impl Iterator<Item = &'a Gear> + use<'a, 'b> {
        self.gear.iter().filter(move |g| g.bus == bus)
    }

    pub fn gear_at(&self, bus: &str, address: Address) -> Option<&Gear> {
        self.gear.iter().find(|g| g.bus == bus && g.address == address)
    }

    /// Run `job` for every bus, each on its own thread.
    fn each_bus<T: Send>(&self, job: impl Fn(&Bus) -> T + Sync) -> Vec<(&Bus, T)> {
        let job = &job;
        thread::scope(|s| {
            let workers: Vec<_> = self
                .buses
                .values()
                .map(|bus| (bus, s.spawn(move || job(bus))))
                .collect();
            workers
                .into_iter()
                .map(|(bus, w)| (bus, w.join().unwrap_or_else(|e| std::panic::resume_unwind(e))))
                .collect()
        })
    }

    /// Check the health of every configured gear.
    ///
    /// Buses are checked concurrently. A bus that fails marks all of its
    /// gear unreachable; the rest of the site is still checked.
    pub fn check(&self, observer: Option<BusObserver<'_>>) -> SiteReport {
        let results = self.each_bus(|bus| {
            let rows: Vec<usize> = (0..self.gear.len())
                .filter(|&i| self.gear[i].bus == bus.key)
                .collect();
            if rows.is_empty() {
                return (rows, Ok(Vec::new()));
            }
            let targets: Vec<GearTarget> = rows.iter().map(|&i| self.gear[i].target()).collect();
            let result = match observer {
                Some(observe) => {
                    let mut relay = |p: &Progress| observe(bus, p);
                    bus.run(audit_bus(targets), Some(&mut relay))
                }
                None => bus.run(audit_bus(targets), None),
            };
            (rows, result)
        });

        // One slot per configured gear, in file order.
        let mut outcomes: Vec<Option<Outcome>> = vec![None; self.gear.len()];
        for (bus, (rows, result)) in results {
            match result {
                Ok(checked) => {
                    for (row, (target, health)) in rows.into_iter().zip(checked) {
                        info!(site = %self.key, bus = %bus.key, gear = %target.name, %health, "checked");
                        outcomes[row] = Some(Outcome::Checked(health));
                    }
                }
                Err(e) => {
                    warn!(site = %self.key, bus = %bus.key, error = %e, "bus unreachable");
                    let error = e.to_string();
                    for row in rows {
                        outcomes[row] = Some(Outcome::Unreachable(error.clone()));
                    }
                }
            }
        }

        let mut report = SiteReport::new(&self.key, &self.name);
        for (g, outcome) in self.gear.iter().zip(outcomes) {
            report.push(GearReport {
                bus: g.bus.clone(),
                address: g.address,
                name: g.name.clone(),
                outcome: outcome.unwrap_or_else(|| Outcome::Unreachable("not checked".into())),
            });
        }
        report
    }

    /// Scan every short address of every bus.
    pub fn scan(
        &self,
        observer: Option<BusObserver<'_>>,
    ) -> Vec<(&Bus, Result<Vec<ScanEntry>, RunError>)> {
        self.each_bus(|bus| match observer {
            Some(observe) => {
                let mut relay = |p: &Progress| observe(bus, p);
                bus.run(scan_bus(), Some(&mut relay))
            }
            None => bus.run(scan_bus(), None),
        })
    }
}
