use std::fmt;

use crate::proto::{Address, Command, EmergencyMode, GearStatus, YesNo};
use crate::sequence::{Sequence, query};

/// Outcome of checking one piece of control gear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Health {
    Ok,
    /// Gear did not answer. `emergency_test` is set when its related
    /// emergency unit reports a test in progress, which explains the silence.
    NotPresent { emergency_test: bool },
    GearFailure,
    LampFailure,
}

impl Health {
    pub fn summary(&self) -> &'static str {
        match self {
            Health::Ok => "Ok",
            Health::NotPresent {
                emergency_test: true,
            } => "Emergency lighting test in progress",
            Health::NotPresent {
                emergency_test: false,
            } => "Not present",
            Health::GearFailure => "Gear failure",
            Health::LampFailure => "Lamp failure",
        }
    }

    pub fn passes(&self) -> bool {
        matches!(
            self,
            Health::Ok
                | Health::NotPresent {
                    emergency_test: true
                }
        )
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.summary())
    }
}

/// True when the emergency unit tied to some gear is running a function or
/// duration test. Issues no command when there is no related unit.
pub fn check_related_emergency(related: Option<Address>) -> Sequence<bool> {
    let Some(unit) = related else {
        return Sequence::done(false);
    };
    query::<EmergencyMode>(Command::query_emergency_mode(unit))
        .map(|em| !em.is_empty() && (em.function_test() || em.duration_test()))
}

/// Check one piece of control gear.
///
/// Presence first; absent gear only consults the related emergency unit.
/// Present gear has its status read, and a reported lamp failure is excused
/// while the related emergency unit is under test, since the unit takes the
/// lamp over for the duration.
pub fn check_gear(address: Address, related: Option<Address>) -> Sequence<Health> {
    query::<YesNo>(Command::query_control_gear_present(address)).and_then(move |present| {
        if !present.value() {
            return check_related_emergency(related)
                .map(|emergency_test| Health::NotPresent { emergency_test });
        }
        query::<GearStatus>(Command::query_status(address))
            .and_then(move |status| classify_status(status, related))
    })
}

fn classify_status(status: GearStatus, related: Option<Address>) -> Sequence<Health> {
    if status.is_empty() {
        return Sequence::done(Health::GearFailure);
    }
    let gear_failure = status.control_gear_failure();
    let settle = move || {
        if gear_failure {
            Health::GearFailure
        } else {
            Health::Ok
        }
    };
    if !status.lamp_failure() {
        return Sequence::done(settle());
    }
    check_related_emergency(related).map(move |under_test| {
        if under_test {
            settle()
        } else {
            Health::LampFailure
        }
    })
}
