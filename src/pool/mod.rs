//! Fixed-size worker pool with per-item failure isolation.
//!
//! Each unit is a thread with a single-slot mailbox. The pool hands out queued items in input
//! order, one per free unit, and reacts to the units' messages:
//!
//! - `Output` → [`PoolHandler::on_complete`], unit becomes free.
//! - `Failed` (error or panic) → [`PoolHandler::on_error`] with the original input; the unit is
//!   retired and a fresh one is spawned, which takes work only after its own `Ready`.
//! - `Progress` → [`PoolHandler::on_progress`], unit stays busy.
//!
//! Failed items are not retried. All callbacks run on the caller's thread, so handlers may hold
//! `&mut` state such as a store connection.

mod unit;

pub use unit::{ProgressReporter, UnitTask};

use anyhow::{Context, Result, bail};
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, warn};
use std::collections::VecDeque;
use std::sync::Arc;

use unit::{Envelope, UnitEvent, UnitHandle, spawn_unit};

/// Counters passed with each completion, in arrival order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolProgress {
    /// Items submitted to this run.
    pub total: usize,
    /// Completed items so far, including this one.
    pub finished: usize,
    /// Units busy when the result arrived, including the reporting unit.
    pub running: usize,
}

/// Totals of one [`WorkerPool::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Callbacks driven by [`WorkerPool::run`]. Returning `Err` from a callback aborts the run after
/// in-flight items have drained.
pub trait PoolHandler<I, O> {
    fn on_complete(&mut self, progress: PoolProgress, unit_id: usize, output: O) -> Result<()>;

    fn on_error(&mut self, _unit_id: usize, _input: I, _error: anyhow::Error) -> Result<()> {
        Ok(())
    }

    fn on_start(&mut self, _unit_id: usize, _input: &I) {}

    fn on_progress(&mut self, _unit_id: usize, _message: &str) {}
}

enum UnitState<I> {
    Starting,
    Free,
    Busy(I),
}

struct UnitSlot<I> {
    handle: UnitHandle<I>,
    state: UnitState<I>,
}

pub struct WorkerPool<T: UnitTask> {
    task: Arc<T>,
    units: Vec<UnitSlot<T::Input>>,
    events_tx: Sender<Envelope<T::Output>>,
    events_rx: Receiver<Envelope<T::Output>>,
    next_generation: u64,
    active: bool,
}

impl<T: UnitTask> WorkerPool<T> {
    /// Spawn `pool_size` units and wait until every one has signaled readiness.
    pub fn initialize(pool_size: usize, task: T) -> Result<Self> {
        if pool_size == 0 {
            bail!("worker pool needs at least one unit");
        }
        let (events_tx, events_rx) = unbounded();
        let mut pool = Self {
            task: Arc::new(task),
            units: Vec::with_capacity(pool_size),
            events_tx,
            events_rx,
            next_generation: 0,
            active: false,
        };
        for unit_id in 0..pool_size {
            let generation = pool.bump_generation();
            let handle = spawn_unit(
                unit_id,
                generation,
                Arc::clone(&pool.task),
                pool.events_tx.clone(),
            )?;
            pool.units.push(UnitSlot {
                handle,
                state: UnitState::Starting,
            });
        }
        while pool.units.iter().any(|u| matches!(u.state, UnitState::Starting)) {
            let envelope = pool
                .events_rx
                .recv()
                .context("worker pool event channel closed during startup")?;
            match envelope.event {
                UnitEvent::Ready => pool.units[envelope.unit_id].state = UnitState::Free,
                _ => bail!(
                    "unit {} sent a message before signaling readiness",
                    envelope.unit_id
                ),
            }
        }
        debug!("worker pool ready with {pool_size} units");
        Ok(pool)
    }

    pub fn size(&self) -> usize {
        self.units.len()
    }

    /// Process `items` and return once the queue is empty and every unit is free.
    pub fn run(
        &mut self,
        items: Vec<T::Input>,
        handler: &mut dyn PoolHandler<T::Input, T::Output>,
    ) -> Result<RunSummary> {
        if self.active {
            bail!("worker pool is already processing data");
        }
        self.revive_stopped_units()?;
        self.active = true;
        let result = self.process(items, handler);
        if result.is_err() {
            self.drain();
        }
        self.active = false;
        result
    }

    fn process(
        &mut self,
        items: Vec<T::Input>,
        handler: &mut dyn PoolHandler<T::Input, T::Output>,
    ) -> Result<RunSummary> {
        let total = items.len();
        let mut queue: VecDeque<T::Input> = items.into();
        let mut summary = RunSummary {
            total,
            ..RunSummary::default()
        };

        self.dispatch(&mut queue, handler)?;
        while !(queue.is_empty() && self.all_free()) {
            let envelope = self
                .events_rx
                .recv()
                .context("worker pool event channel closed")?;
            let unit_id = envelope.unit_id;
            if self.units[unit_id].handle.generation != envelope.generation {
                continue;
            }
            match envelope.event {
                UnitEvent::Ready => self.units[unit_id].state = UnitState::Free,
                UnitEvent::Progress(message) => handler.on_progress(unit_id, &message),
                UnitEvent::Output(output) => {
                    let running = self.busy_count();
                    self.units[unit_id].state = UnitState::Free;
                    summary.completed += 1;
                    let progress = PoolProgress {
                        total,
                        finished: summary.completed,
                        running,
                    };
                    handler.on_complete(progress, unit_id, output)?;
                }
                UnitEvent::Failed(error) => {
                    let state = std::mem::replace(&mut self.units[unit_id].state, UnitState::Starting);
                    summary.failed += 1;
                    let callback = match state {
                        UnitState::Busy(input) => handler.on_error(unit_id, input, error),
                        _ => {
                            warn!("unit {unit_id} failed while idle: {error:#}");
                            Ok(())
                        }
                    };
                    self.respawn(unit_id)?;
                    callback?;
                }
            }
            self.dispatch(&mut queue, handler)?;
        }
        Ok(summary)
    }

    /// Terminate all units. Fails if a run is still in progress.
    pub fn finalize(mut self) -> Result<()> {
        if self.active {
            bail!("cannot finalize worker pool while still processing data");
        }
        for slot in self.units.drain(..) {
            let UnitHandle { mailbox, join, .. } = slot.handle;
            drop(mailbox);
            if let Some(join) = join {
                // Unit threads only end by returning; join errors carry nothing to act on.
                let _ = join.join();
            }
        }
        debug!("worker pool finalized");
        Ok(())
    }

    /// Hand queued items to free units, lowest unit id first.
    fn dispatch(
        &mut self,
        queue: &mut VecDeque<T::Input>,
        handler: &mut dyn PoolHandler<T::Input, T::Output>,
    ) -> Result<()> {
        while !queue.is_empty() {
            let Some(unit_id) = self
                .units
                .iter()
                .position(|u| matches!(u.state, UnitState::Free))
            else {
                break;
            };
            let Some(input) = queue.pop_front() else {
                break;
            };
            handler.on_start(unit_id, &input);
            let slot = &mut self.units[unit_id];
            slot.state = UnitState::Busy(input.clone());
            if let Err(returned) = slot.handle.mailbox.send(input) {
                // The unit thread is gone before it saw the item: requeue it untouched.
                warn!("unit {unit_id} stopped unexpectedly, replacing it");
                queue.push_front(returned.into_inner());
                self.units[unit_id].state = UnitState::Starting;
                self.respawn(unit_id)?;
            }
        }
        Ok(())
    }

    /// Replace a unit with a fresh one in `Starting` state.
    fn respawn(&mut self, unit_id: usize) -> Result<()> {
        let generation = self.bump_generation();
        let handle = spawn_unit(
            unit_id,
            generation,
            Arc::clone(&self.task),
            self.events_tx.clone(),
        )?;
        let old = std::mem::replace(&mut self.units[unit_id].handle, handle);
        self.units[unit_id].state = UnitState::Starting;
        drop(old.mailbox);
        if let Some(join) = old.join {
            let _ = join.join();
        }
        debug!("unit {unit_id} replaced (generation {generation})");
        Ok(())
    }

    /// Wait for in-flight items after an aborted run, discarding their results. Units still
    /// starting report `Ready` to the next run.
    fn drain(&mut self) {
        while self.busy_count() > 0 {
            let Ok(envelope) = self.events_rx.recv() else {
                break;
            };
            let unit_id = envelope.unit_id;
            if self.units[unit_id].handle.generation != envelope.generation {
                continue;
            }
            match envelope.event {
                UnitEvent::Ready | UnitEvent::Output(_) => {
                    self.units[unit_id].state = UnitState::Free
                }
                UnitEvent::Progress(_) => {}
                UnitEvent::Failed(_) => {
                    if let Err(err) = self.respawn(unit_id) {
                        warn!("could not replace unit {unit_id}: {err:#}");
                        break;
                    }
                }
            }
        }
    }

    /// Respawn units whose thread ended without a successor, e.g. after a failed respawn.
    fn revive_stopped_units(&mut self) -> Result<()> {
        for unit_id in 0..self.units.len() {
            let slot = &self.units[unit_id];
            let stopped = slot.handle.join.as_ref().is_none_or(|j| j.is_finished());
            if matches!(slot.state, UnitState::Starting) && stopped {
                warn!("unit {unit_id} has no running thread, replacing it");
                self.respawn(unit_id)?;
            }
        }
        Ok(())
    }

    fn all_free(&self) -> bool {
        self.units.iter().all(|u| matches!(u.state, UnitState::Free))
    }

    fn busy_count(&self) -> usize {
        self.units
            .iter()
            .filter(|u| matches!(u.state, UnitState::Busy(_)))
            .count()
    }

    fn bump_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }
}
