use std::thread;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, error};

use super::{Effect, Progress, Sequence, SequenceError};
use crate::gateway::{GatewayError, Link};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Sequence(#[from] SequenceError),
}

/// Drives sequences against one link, one effect at a time.
pub struct SequenceRunner<'a, L: Link + ?Sized> {
    link: &'a mut L,
    progress: Option<&'a mut dyn FnMut(&Progress)>,
}

impl<'a, L: Link + ?Sized> SequenceRunner<'a, L> {
    pub fn new(link: &'a mut L) -> Self {
        Self {
            link,
            progress: None,
        }
    }

    /// Observer called synchronously for every `Progress` effect.
    pub fn with_progress(mut self, observer: &'a mut dyn FnMut(&Progress)) -> Self {
        self.progress = Some(observer);
        self
    }

    /// Run `sequence` to completion. A bare [`Command`](crate::proto::Command)
    /// is accepted and runs as a one-step sequence.
    ///
    /// Any transport or protocol failure ends the run; the sequence is not
    /// resumed afterwards.
    pub fn run<T, S>(&mut self, sequence: S) -> Result<T, RunError>
    where
        T: Send + 'static,
        S: Into<Sequence<T>>,
    {
        let mut sequence = sequence.into();
        loop {
            let (effect, resume) = match sequence {
                Sequence::Completed(value) => return Ok(value),
                Sequence::Failed(e) => return Err(e.into()),
                Sequence::Suspended { effect, resume } => (effect, resume),
            };

            let response = match effect {
                Effect::SendCommand(command) => {
                    let start = Instant::now();
                    match self.link.transact(&command) {
                        Ok(response) => {
                            debug!(
                                %command,
                                elapsed_ms = start.elapsed().as_millis() as u64,
                                "sent"
                            );
                            response
                        }
                        Err(e) => {
                            error!(%command, error = %e, "transaction failed, abandoning sequence");
                            return Err(e.into());
                        }
                    }
                }
                Effect::Sleep(duration) => {
                    debug!(?duration, "sleeping");
                    thread::sleep(duration);
                    None
                }
                Effect::Progress(progress) => {
                    if let Some(observer) = self.progress.as_mut() {
                        observer(&progress);
                    }
                    None
                }
            };
            sequence = resume(response);
        }
    }
}

/// Run one sequence on `link`, relaying progress to `progress` if given.
pub fn run_sequence<'a, T, S, L>(
    link: &'a mut L,
    sequence: S,
    progress: Option<&'a mut dyn FnMut(&Progress)>,
) -> Result<T, RunError>
where
    T: Send + 'static,
    S: Into<Sequence<T>>,
    L: Link + ?Sized,
{
    let mut runner = SequenceRunner::new(link);
    runner.progress = progress;
    runner.run(sequence)
}
