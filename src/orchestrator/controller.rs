//! Run lifecycle controller.
//!
//! Owns the run timer, its tick source and the history store, and serialises
//! every user intent and tick through one loop.

use super::post_process::commit_run;
use crate::engine::{Clock, RunTimer, Scheduler, Ticks};
use crate::model::{InfoEvent, TimerEvent};
use crate::storage::{HistoryStore, KeyValueStore};
use anyhow::Result;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

/// Commands emitted by UI layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    Start,
    Stop,
    /// Start when idle, stop when running.
    Toggle,
    Rename { index: usize, name: String },
    Delete { index: usize },
    Quit,
}

pub struct Controller<C, S, K> {
    timer: RunTimer<C>,
    scheduler: S,
    store: HistoryStore<K>,
    tick_interval: Duration,
}

impl<C: Clock, S: Scheduler, K: KeyValueStore> Controller<C, S, K> {
    pub fn new(clock: C, scheduler: S, store: HistoryStore<K>, tick_interval: Duration) -> Self {
        Self {
            timer: RunTimer::new(clock),
            scheduler,
            store,
            tick_interval,
        }
    }

    /// Process commands until `Quit` or until every command sender is gone.
    pub async fn run(
        mut self,
        event_tx: UnboundedSender<TimerEvent>,
        mut cmd_rx: UnboundedReceiver<UiCommand>,
    ) -> Result<()> {
        let _ = event_tx.send(TimerEvent::HistoryChanged {
            history: self.store.list().to_vec(),
        });

        // Present only while running; dropping it cancels the periodic tick.
        let mut ticks: Option<Ticks> = None;

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(UiCommand::Start) => self.start(&mut ticks, &event_tx),
                        Some(UiCommand::Stop) => self.stop(&mut ticks, &event_tx),
                        Some(UiCommand::Toggle) => {
                            if self.timer.is_running() {
                                self.stop(&mut ticks, &event_tx);
                            } else {
                                self.start(&mut ticks, &event_tx);
                            }
                        }
                        Some(UiCommand::Rename { index, name }) => {
                            self.rename(index, name, &event_tx);
                        }
                        Some(UiCommand::Delete { index }) => self.delete(index, &event_tx),
                        Some(UiCommand::Quit) | None => break,
                    }
                }
                // Do not move the handle into this future; it has to survive when
                // the command branch wins.
                tick = async {
                    match ticks.as_mut() {
                        Some(t) => t.next().await,
                        None => futures::future::pending().await,
                    }
                } => {
                    match tick {
                        Some(()) => {
                            if let Some(sample) = self.timer.sample() {
                                let _ = event_tx.send(TimerEvent::Readout(sample));
                            }
                        }
                        None => {
                            warn!("tick source ended while running");
                            ticks = None;
                        }
                    }
                }
            }
        }

        if self.timer.is_running() {
            debug!("controller exiting mid-run; run discarded");
        }
        drop(ticks);
        Ok(())
    }

    fn start(&mut self, ticks: &mut Option<Ticks>, event_tx: &UnboundedSender<TimerEvent>) {
        if !self.timer.start() {
            return;
        }
        *ticks = Some(self.scheduler.every(self.tick_interval));
        let _ = event_tx.send(TimerEvent::Started);
    }

    fn stop(&mut self, ticks: &mut Option<Ticks>, event_tx: &UnboundedSender<TimerEvent>) {
        if !self.timer.is_running() {
            return;
        }
        // Cancel first so no queued tick can sample after the stop.
        *ticks = None;
        let committed = self.timer.stop();
        commit_run(&mut self.store, self.timer.readout(), committed, event_tx);
    }

    fn rename(&mut self, index: usize, name: String, event_tx: &UnboundedSender<TimerEvent>) {
        match self.store.rename(index, name) {
            Ok(true) => self.publish_history(event_tx),
            Ok(false) => self.report_out_of_range(index, event_tx),
            Err(e) => {
                warn!("rename failed: {e:#}");
                let _ = event_tx.send(TimerEvent::Info(InfoEvent::StorageFailed(format!("{e:#}"))));
                self.publish_history(event_tx);
            }
        }
    }

    fn delete(&mut self, index: usize, event_tx: &UnboundedSender<TimerEvent>) {
        match self.store.delete(index) {
            Ok(Some(_)) => self.publish_history(event_tx),
            Ok(None) => self.report_out_of_range(index, event_tx),
            Err(e) => {
                warn!("delete failed: {e:#}");
                let _ = event_tx.send(TimerEvent::Info(InfoEvent::StorageFailed(format!("{e:#}"))));
                self.publish_history(event_tx);
            }
        }
    }

    fn report_out_of_range(&self, index: usize, event_tx: &UnboundedSender<TimerEvent>) {
        let _ = event_tx.send(TimerEvent::Info(InfoEvent::IndexOutOfRange {
            index,
            len: self.store.list().len(),
        }));
    }

    fn publish_history(&self, event_tx: &UnboundedSender<TimerEvent>) {
        let _ = event_tx.send(TimerEvent::HistoryChanged {
            history: self.store.list().to_vec(),
        });
    }
}
