//! One pool unit: a dedicated thread with a single-slot mailbox that runs a [`UnitTask`] per
//! message and reports back over the shared event channel.

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::{Receiver, Sender, bounded};
use log::debug;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Work executed inside a unit. Implementations hold only immutable configuration; everything a
/// unit produces travels back to the orchestrator as a message.
pub trait UnitTask: Send + Sync + 'static {
    type Input: Clone + Send + 'static;
    type Output: Send + 'static;

    fn execute(&self, input: Self::Input, progress: &ProgressReporter) -> Result<Self::Output>;
}

/// Handle passed to [`UnitTask::execute`] for non-terminal status messages.
pub struct ProgressReporter {
    send: Box<dyn Fn(String) + Send>,
}

impl ProgressReporter {
    pub fn report(&self, message: impl Into<String>) {
        (self.send)(message.into());
    }

    /// Reporter that discards everything (for calling tasks outside a pool).
    pub fn noop() -> Self {
        Self {
            send: Box::new(|_| {}),
        }
    }
}

/// Messages a unit sends to the pool.
pub(crate) enum UnitEvent<O> {
    Ready,
    Output(O),
    Failed(anyhow::Error),
    Progress(String),
}

/// A [`UnitEvent`] tagged with its sender. `generation` separates a replaced unit from its successor.
pub(crate) struct Envelope<O> {
    pub unit_id: usize,
    pub generation: u64,
    pub event: UnitEvent<O>,
}

/// Pool-side handle of a running unit.
pub(crate) struct UnitHandle<I> {
    pub mailbox: Sender<I>,
    pub join: Option<JoinHandle<()>>,
    pub generation: u64,
}

/// Spawn a unit thread. The unit announces itself with [`UnitEvent::Ready`] before taking work.
pub(crate) fn spawn_unit<T: UnitTask>(
    unit_id: usize,
    generation: u64,
    task: Arc<T>,
    events: Sender<Envelope<T::Output>>,
) -> Result<UnitHandle<T::Input>> {
    let (mailbox_tx, mailbox_rx) = bounded::<T::Input>(1);
    let join = thread::Builder::new()
        .name(format!("{}-unit-{unit_id}", env!("CARGO_PKG_NAME")))
        .spawn(move || unit_loop(unit_id, generation, task, mailbox_rx, events))
        .with_context(|| format!("spawn pool unit {unit_id}"))?;
    debug!("unit {unit_id} spawned (generation {generation})");
    Ok(UnitHandle {
        mailbox: mailbox_tx,
        join: Some(join),
        generation,
    })
}

/// Unit main loop. Any failure (error or panic) is reported once and ends the thread; the pool
/// replaces the unit with a fresh one.
fn unit_loop<T: UnitTask>(
    unit_id: usize,
    generation: u64,
    task: Arc<T>,
    mailbox: Receiver<T::Input>,
    events: Sender<Envelope<T::Output>>,
) {
    let send = |event: UnitEvent<T::Output>| {
        events
            .send(Envelope {
                unit_id,
                generation,
                event,
            })
            .is_ok()
    };
    if !send(UnitEvent::Ready) {
        return;
    }

    while let Ok(input) = mailbox.recv() {
        let progress_tx = events.clone();
        let progress = ProgressReporter {
            send: Box::new(move |message| {
                let _ = progress_tx.send(Envelope {
                    unit_id,
                    generation,
                    event: UnitEvent::Progress(message),
                });
            }),
        };
        let outcome = catch_unwind(AssertUnwindSafe(|| task.execute(input, &progress)));
        match outcome {
            Ok(Ok(output)) => {
                if !send(UnitEvent::Output(output)) {
                    break;
                }
            }
            Ok(Err(err)) => {
                send(UnitEvent::Failed(err));
                break;
            }
            Err(payload) => {
                send(UnitEvent::Failed(anyhow!(
                    "unit crashed: {}",
                    panic_message(payload.as_ref())
                )));
                break;
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
