//! Suspendable bus procedures.
//!
//! A [`Sequence`] is either finished or suspended on an [`Effect`] together
//! with the continuation that receives the effect's result. Sub-sequences are
//! delegated to with [`Sequence::and_then`]: every effect of the inner
//! sequence surfaces unchanged and its final value is handed to the next step
//! as soon as its last effect has been resumed.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::proto::{Command, FromResponse, Response};

pub mod runner;

pub use runner::{RunError, SequenceRunner, run_sequence};

/// Value a suspended sequence is resumed with. Only `SendCommand` produces `Some`.
pub type Resume = Option<Response>;

type Continuation<T> = Box<dyn FnOnce(Resume) -> Sequence<T> + Send>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("unexpected response to {command}")]
    UnexpectedResponse { command: String },
    #[error("{0}")]
    Protocol(String),
}

/// Progress report yielded by long-running sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Progress {
    pub message: Option<String>,
    pub completed: Option<usize>,
    pub size: Option<usize>,
}

impl Progress {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn step(completed: usize, size: usize) -> Self {
        Self {
            message: None,
            completed: Some(completed),
            size: Some(size),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(done), Some(size)) = (self.completed, self.size) {
            write!(f, "[{done}/{size}]")?;
            if self.message.is_some() {
                f.write_str(" ")?;
            }
        }
        if let Some(m) = &self.message {
            f.write_str(m)?;
        }
        Ok(())
    }
}

/// Something a sequence asks its driver to do.
#[derive(Debug, Clone)]
pub enum Effect {
    /// Transact a command; resumed with its decoded response.
    SendCommand(Command),
    /// Pause without bus traffic; resumed with `None`.
    Sleep(Duration),
    /// Observational only; resumed with `None`.
    Progress(Progress),
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Effect::SendCommand(_) => "send_command",
            Effect::Sleep(_) => "sleep",
            Effect::Progress(_) => "progress",
        }
    }
}

pub enum Sequence<T> {
    Suspended {
        effect: Effect,
        resume: Continuation<T>,
    },
    Completed(T),
    Failed(SequenceError),
}

impl<T> fmt::Debug for Sequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sequence::Suspended { effect, .. } => {
                f.debug_tuple("Suspended").field(effect).finish()
            }
            Sequence::Completed(_) => f.write_str("Completed"),
            Sequence::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
        }
    }
}

impl<T: Send + 'static> Sequence<T> {
    pub fn done(value: T) -> Self {
        Sequence::Completed(value)
    }

    pub fn fail(error: SequenceError) -> Self {
        Sequence::Failed(error)
    }

    pub fn suspend(
        effect: Effect,
        resume: impl FnOnce(Resume) -> Sequence<T> + Send + 'static,
    ) -> Self {
        Sequence::Suspended {
            effect,
            resume: Box::new(resume),
        }
    }

    /// Delegate: run `self` to completion, then continue with `next(value)`.
    pub fn and_then<U, F>(self, next: F) -> Sequence<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Sequence<U> + Send + 'static,
    {
        match self {
            Sequence::Completed(value) => next(value),
            Sequence::Failed(e) => Sequence::Failed(e),
            Sequence::Suspended { effect, resume } => Sequence::Suspended {
                effect,
                resume: Box::new(move |input| resume(input).and_then(next)),
            },
        }
    }

    pub fn map<U, F>(self, f: F) -> Sequence<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.and_then(move |value| Sequence::done(f(value)))
    }

    /// Feed one resume value in; the same step the driver takes.
    pub fn resume(self, input: Resume) -> Self {
        match self {
            Sequence::Suspended { resume, .. } => resume(input),
            finished => finished,
        }
    }

    pub fn pending_effect(&self) -> Option<&Effect> {
        match self {
            Sequence::Suspended { effect, .. } => Some(effect),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self, Sequence::Suspended { .. })
    }
}

impl Sequence<Resume> {
    /// Transact `command`, completing with whatever it decodes to.
    pub fn send(command: Command) -> Self {
        Sequence::suspend(Effect::SendCommand(command), Sequence::Completed)
    }
}

impl Sequence<()> {
    pub fn sleep(duration: Duration) -> Self {
        Sequence::suspend(Effect::Sleep(duration), |_| Sequence::Completed(()))
    }

    pub fn progress(progress: Progress) -> Self {
        Sequence::suspend(Effect::Progress(progress), |_| Sequence::Completed(()))
    }
}

/// Run `step` for every item in order, collecting the results.
pub fn all<T, I, U, F>(items: I, step: F) -> Sequence<Vec<U>>
where
    T: Send + 'static,
    I: IntoIterator<Item = T>,
    I::IntoIter: Send + 'static,
    U: Send + 'static,
    F: FnMut(T) -> Sequence<U> + Send + 'static,
{
    fn go<T, U, It, F>(mut items: It, mut step: F, mut acc: Vec<U>) -> Sequence<Vec<U>>
    where
        T: Send + 'static,
        U: Send + 'static,
        It: Iterator<Item = T> + Send + 'static,
        F: FnMut(T) -> Sequence<U> + Send + 'static,
    {
        match items.next() {
            None => Sequence::done(acc),
            Some(item) => step(item).and_then(move |value| {
                acc.push(value);
                go(items, step, acc)
            }),
        }
    }

    let items = items.into_iter();
    let (lower, _) = items.size_hint();
    go(items, step, Vec::with_capacity(lower))
}

/// Transact `command` and insist on a response of type `R`.
pub fn query<R>(command: Command) -> Sequence<R>
where
    R: FromResponse + Send + 'static,
{
    let label = command.to_string();
    Sequence::send(command).and_then(move |resp| match resp.and_then(R::from_response) {
        Some(r) => Sequence::done(r),
        None => Sequence::fail(SequenceError::UnexpectedResponse { command: label }),
    })
}

/// A bare command is the one-step sequence that sends it.
impl From<Command> for Sequence<Resume> {
    fn from(command: Command) -> Self {
        Sequence::send(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{Address, BackwardFrame, GearStatus, YesNo};

    fn yes() -> Resume {
        Some(YesNo::decode(Some(BackwardFrame::new(0xFF))))
    }

    fn sent_label(seq: &Sequence<impl Send + 'static>) -> String {
        match seq.pending_effect() {
            Some(Effect::SendCommand(c)) => c.to_string(),
            other => panic!("expected a command, got {other:?}"),
        }
    }

    fn child() -> Sequence<u32> {
        Sequence::send(Command::off(Address::Short(1)))
            .and_then(|_| Sequence::sleep(Duration::from_millis(5)))
            .and_then(|_| Sequence::send(Command::up(Address::Short(1))))
            .map(|_| 7)
    }

    #[test]
    fn delegated_effects_surface_unchanged() {
        let mut seen = Vec::new();
        let parent = Sequence::progress(Progress::message("start"))
            .and_then(|_| child())
            .map(|v| v * 6);

        let mut seq = parent;
        while let Some(effect) = seq.pending_effect() {
            seen.push(match effect {
                Effect::SendCommand(c) => c.to_string(),
                Effect::Sleep(d) => format!("sleep {}ms", d.as_millis()),
                Effect::Progress(p) => format!("progress {p}"),
            });
            seq = seq.resume(None);
        }
        assert_eq!(
            seen,
            vec![
                "progress start",
                "Off(GearShort(1))",
                "sleep 5ms",
                "Up(GearShort(1))",
            ]
        );
        assert!(matches!(seq, Sequence::Completed(42)));
    }

    #[test]
    fn child_value_available_right_after_last_resume() {
        let seq = child().and_then(|v| Sequence::done(format!("child said {v}")));
        let seq = seq.resume(None).resume(None);
        assert_eq!(sent_label(&seq), "Up(GearShort(1))");
        match seq.resume(None) {
            Sequence::Completed(s) => assert_eq!(s, "child said 7"),
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn failure_in_child_skips_parent_continuation() {
        let seq = query::<GearStatus>(Command::query_control_gear_present(Address::Short(2)))
            .map(|_| -> u8 { panic!("must not continue") });
        let done = seq.resume(yes());
        match done {
            Sequence::Failed(SequenceError::UnexpectedResponse { command }) => {
                assert_eq!(command, "QueryControlGearPresent(GearShort(2))")
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn query_yields_typed_response() {
        let seq = query::<YesNo>(Command::query_control_gear_present(Address::Short(0)))
            .map(|r| r.value());
        assert!(matches!(seq.resume(yes()), Sequence::Completed(true)));
    }

    #[test]
    fn query_fails_for_fire_and_forget_command() {
        let seq = query::<YesNo>(Command::off(Address::Short(0)));
        assert!(matches!(seq.resume(None), Sequence::Failed(_)));
    }

    #[test]
    fn all_runs_items_in_order() {
        let seq = all([3u8, 1, 2], |a| {
            Sequence::send(Command::off(Address::Short(a))).map(move |_| a * 10)
        });
        let mut labels = Vec::new();
        let mut seq = seq;
        while !seq.is_finished() {
            labels.push(sent_label(&seq));
            seq = seq.resume(None);
        }
        assert_eq!(labels, vec!["Off(GearShort(3))", "Off(GearShort(1))", "Off(GearShort(2))"]);
        assert!(matches!(seq, Sequence::Completed(v) if v == vec![30, 10, 20]));
    }

    #[test]
    fn all_of_nothing_completes_immediately() {
        let seq = all(Vec::<u8>::new(), |_| Sequence::done(()));
        assert!(matches!(seq, Sequence::Completed(v) if v.is_empty()));
    }

    #[test]
    fn bare_command_converts_to_one_step_sequence() {
        let seq: Sequence<Resume> = Command::query_status(Address::Short(4)).into();
        assert_eq!(sent_label(&seq), "QueryStatus(GearShort(4))");
        let status = GearStatus::decode(Some(BackwardFrame::new(2)));
        assert!(matches!(seq.resume(Some(status)), Sequence::Completed(Some(r)) if r == status));
    }

    #[test]
    fn progress_display() {
        assert_eq!(Progress::step(3, 64).to_string(), "[3/64]");
        assert_eq!(Progress::step(1, 2).with_message("hall").to_string(), "[1/2] hall");
        assert_eq!(Progress::message("x").to_string(), "x");
    }
}
