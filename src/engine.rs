//! Multi-stopwatch engine.
//!
//! The engine owns an ordered collection of [`Stopwatch`] values plus the id of
//! the active one, and republishes the whole collection as a fresh immutable
//! [`Snapshot`] on every change. Each running stopwatch gets its own ticker
//! thread that refreshes elapsed time from the wall clock.
//!
//! ## Locking
//!
//! All operations and all ticks run under one mutex. A ticker only writes
//! while the registry still holds its generation for its id, and every
//! operation that ends a run deregisters the ticker before releasing the
//! lock. Once `stop`, `reset` or `remove` returns, that ticker can no longer
//! touch the collection.
//!
//! ## Unknown ids
//!
//! Every operation taking an id is a silent no-op when the id is absent. No-ops
//! publish nothing.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use timer_core::{default_name, Stopwatch};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;

/// Immutable view of the collection at one point in time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Bumped by one on every published change.
    pub version: u64,
    /// Creation order.
    pub stopwatches: Vec<Stopwatch>,
    pub active_id: Option<String>,
}

impl Snapshot {
    pub fn get(&self, id: &str) -> Option<&Stopwatch> {
        self.stopwatches.iter().find(|sw| sw.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn active(&self) -> Option<&Stopwatch> {
        self.active_id.as_deref().and_then(|id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.stopwatches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stopwatches.is_empty()
    }
}

struct Ticker {
    generation: u64,
    // Dropping the sender wakes the ticker thread and ends it
    _cancel: Sender<()>,
    handle: JoinHandle<()>,
}

struct Session {
    snapshot: Arc<Snapshot>,
    tickers: HashMap<String, Ticker>,
    subscribers: Vec<Sender<()>>,
    next_generation: u64,
}

impl Session {
    fn publish(&mut self, stopwatches: Vec<Stopwatch>, active_id: Option<String>) {
        self.snapshot = Arc::new(Snapshot {
            version: self.snapshot.version + 1,
            stopwatches,
            active_id,
        });
        self.subscribers
            .retain(|tx| !matches!(tx.try_send(()), Err(TrySendError::Disconnected(_))));
    }

    /// Swaps in `next` for the entity with the same id.
    fn replace(&mut self, next: Stopwatch) {
        let stopwatches = self
            .snapshot
            .stopwatches
            .iter()
            .map(|sw| if sw.id == next.id { next.clone() } else { sw.clone() })
            .collect();
        let active_id = self.snapshot.active_id.clone();
        self.publish(stopwatches, active_id);
    }

    fn cancel_ticker(&mut self, id: &str) {
        if self.tickers.remove(id).is_some() {
            log::debug!("ticker for {} cancelled", id);
        }
    }
}

struct Shared {
    session: Mutex<Session>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl Shared {
    /// One ticker step. Returns false when the ticker should exit.
    fn tick(&self, id: &str, generation: u64) -> bool {
        let mut session = self.session.lock();
        if session.tickers.get(id).map(|t| t.generation) != Some(generation) {
            return false;
        }
        let now_ms = self.clock.now_ms();
        let ticked = session
            .snapshot
            .get(id)
            .map(|current| (current.elapsed_ms, current.ticked(now_ms)));
        match ticked {
            Some((before, Some(next))) => {
                if next.elapsed_ms != before {
                    log::trace!("tick {} -> {}ms", id, next.elapsed_ms);
                    session.replace(next);
                }
                true
            }
            _ => {
                // Gone or no longer running; drop our own registration
                session.tickers.remove(id);
                false
            }
        }
    }
}

fn run_ticker(shared: Arc<Shared>, id: String, generation: u64, cancel: Receiver<()>) {
    let interval = shared.config.tick_interval;
    loop {
        match cancel.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            _ => break,
        }
        if !shared.tick(&id, generation) {
            break;
        }
    }
    log::trace!("ticker {} (gen {}) exiting", id, generation);
}

/// Owns every stopwatch in the session.
pub struct TimerEngine {
    shared: Arc<Shared>,
}

impl TimerEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        log::info!(
            "timer engine up (label {:?}, tick {:?})",
            config.default_label,
            config.tick_interval
        );
        Self {
            shared: Arc::new(Shared {
                session: Mutex::new(Session {
                    snapshot: Arc::new(Snapshot::default()),
                    tickers: HashMap::new(),
                    subscribers: Vec::new(),
                    next_generation: 0,
                }),
                clock,
                config,
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.shared.session.lock().snapshot)
    }

    pub fn stopwatches(&self) -> Vec<Stopwatch> {
        self.snapshot().stopwatches.clone()
    }

    pub fn get(&self, id: &str) -> Option<Stopwatch> {
        self.snapshot().get(id).cloned()
    }

    pub fn active_id(&self) -> Option<String> {
        self.snapshot().active_id.clone()
    }

    /// The stopwatch currently marked active, if any.
    pub fn active(&self) -> Option<Stopwatch> {
        self.snapshot().active().cloned()
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let mut session = self.shared.session.lock();
        session.subscribers.push(tx);
        Subscription {
            rx,
            seen: session.snapshot.version,
            shared: Arc::clone(&self.shared),
        }
    }

    /// Creates "<label> <n>" with n = current count + 1 and returns its id.
    /// The first stopwatch added to an engine without an active id becomes active.
    pub fn add(&self) -> String {
        let id = Uuid::new_v4().to_string();
        let mut session = self.shared.session.lock();

        let name = default_name(&self.shared.config.default_label, session.snapshot.len() + 1);
        let mut stopwatches = session.snapshot.stopwatches.clone();
        stopwatches.push(Stopwatch::new(id.clone(), name.clone()));
        let active_id = session
            .snapshot
            .active_id
            .clone()
            .or_else(|| Some(id.clone()));

        session.publish(stopwatches, active_id);
        log::debug!("added {} ({})", id, name);
        id
    }

    pub fn remove(&self, id: &str) {
        let mut session = self.shared.session.lock();
        if !session.snapshot.contains(id) {
            log::debug!("remove: unknown id {}", id);
            return;
        }
        session.cancel_ticker(id);

        let stopwatches: Vec<Stopwatch> = session
            .snapshot
            .stopwatches
            .iter()
            .filter(|sw| sw.id != id)
            .cloned()
            .collect();
        let active_id = match session.snapshot.active_id.as_deref() {
            Some(active) if active == id => stopwatches.first().map(|sw| sw.id.clone()),
            _ => session.snapshot.active_id.clone(),
        };

        session.publish(stopwatches, active_id);
        log::debug!("removed {}", id);
    }

    pub fn start(&self, id: &str) {
        let mut session = self.shared.session.lock();
        let next = match session.snapshot.get(id) {
            Some(current) => match current.started(self.shared.clock.now_ms()) {
                Some(next) => next,
                None => return,
            },
            None => {
                log::debug!("start: unknown id {}", id);
                return;
            }
        };

        session.cancel_ticker(id);
        session.next_generation += 1;
        let generation = session.next_generation;
        let (cancel_tx, cancel_rx) = crossbeam_channel::bounded(1);
        let shared = Arc::clone(&self.shared);
        let ticker_id = id.to_string();
        let spawned = thread::Builder::new()
            .name(format!("ticker-{}", short_id(id)))
            .spawn(move || run_ticker(shared, ticker_id, generation, cancel_rx));
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("can't spawn ticker for {}: {:?}", id, e);
                return;
            }
        };

        session.tickers.insert(
            id.to_string(),
            Ticker {
                generation,
                _cancel: cancel_tx,
                handle,
            },
        );
        log::debug!("started {} at anchor {}", id, next.start_epoch_ms);
        session.replace(next);
    }

    /// Freezes elapsed at its last ticked value.
    pub fn stop(&self, id: &str) {
        let mut session = self.shared.session.lock();
        let next = match session.snapshot.get(id).and_then(Stopwatch::stopped) {
            Some(next) => next,
            None => return,
        };
        session.cancel_ticker(id);
        log::debug!("stopped {} at {}ms", id, next.elapsed_ms);
        session.replace(next);
    }

    pub fn record_lap(&self, id: &str) {
        let mut session = self.shared.session.lock();
        let next = match session.snapshot.get(id).and_then(Stopwatch::with_lap) {
            Some(next) => next,
            None => return,
        };
        if let Some(lap) = next.last_lap() {
            log::debug!(
                "lap {} on {}: {}ms (total {}ms)",
                lap.lap_number,
                id,
                lap.lap_time_ms,
                lap.total_time_ms
            );
        }
        session.replace(next);
    }

    /// Clears elapsed, laps and the anchor whether running or not.
    pub fn reset(&self, id: &str) {
        let mut session = self.shared.session.lock();
        let (current, next) = match session.snapshot.get(id) {
            Some(current) => (current.clone(), current.reset()),
            None => return,
        };
        session.cancel_ticker(id);
        if next != current {
            log::debug!("reset {}", id);
            session.replace(next);
        }
    }

    /// Blank or whitespace-only names fall back to the default label.
    pub fn rename(&self, id: &str, new_name: &str) {
        let mut session = self.shared.session.lock();
        let (current, next) = match session.snapshot.get(id) {
            Some(current) => (
                current.clone(),
                current.renamed(new_name, &self.shared.config.default_label),
            ),
            None => return,
        };
        if next != current {
            log::debug!("renamed {} to {:?}", id, next.name);
            session.replace(next);
        }
    }

    pub fn set_active(&self, id: &str) {
        let mut session = self.shared.session.lock();
        if !session.snapshot.contains(id) || session.snapshot.active_id.as_deref() == Some(id) {
            return;
        }
        let stopwatches = session.snapshot.stopwatches.clone();
        session.publish(stopwatches, Some(id.to_string()));
    }

    /// Ends the session: freezes every running stopwatch, cancels all tickers
    /// and waits for their threads. Open subscriptions are closed.
    pub fn shutdown(&self) {
        let tickers: Vec<Ticker> = {
            let mut session = self.shared.session.lock();
            let tickers = session.tickers.drain().map(|(_, t)| t).collect::<Vec<_>>();

            if session.snapshot.stopwatches.iter().any(|sw| sw.is_running) {
                let stopwatches = session
                    .snapshot
                    .stopwatches
                    .iter()
                    .map(|sw| sw.stopped().unwrap_or_else(|| sw.clone()))
                    .collect();
                let active_id = session.snapshot.active_id.clone();
                session.publish(stopwatches, active_id);
            }
            session.subscribers.clear();
            tickers
        };

        if tickers.is_empty() {
            return;
        }
        log::info!("shutting down {} ticker(s)", tickers.len());
        for ticker in tickers {
            let Ticker {
                _cancel: cancel,
                handle,
                ..
            } = ticker;
            drop(cancel);
            if handle.join().is_err() {
                log::error!("ticker thread panicked");
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn ticker_count(&self) -> usize {
        self.shared.session.lock().tickers.len()
    }
}

impl Drop for TimerEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Change feed for a [`TimerEngine`]. Notifications coalesce: a slow reader
/// is handed the newest snapshot, not every intermediate one.
pub struct Subscription {
    rx: Receiver<()>,
    seen: u64,
    shared: Arc<Shared>,
}

impl Subscription {
    /// Blocks until a newer snapshot is published. `None` once the engine has
    /// shut down.
    pub fn changed(&mut self) -> Option<Arc<Snapshot>> {
        loop {
            if let Some(latest) = self.take_newer() {
                return Some(latest);
            }
            self.rx.recv().ok()?;
        }
    }

    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<Arc<Snapshot>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(latest) = self.take_newer() {
                return Some(latest);
            }
            let remaining = deadline.checked_duration_since(Instant::now())?;
            self.rx.recv_timeout(remaining).ok()?;
        }
    }

    fn take_newer(&mut self) -> Option<Arc<Snapshot>> {
        let latest = Arc::clone(&self.shared.session.lock().snapshot);
        if latest.version > self.seen {
            self.seen = latest.version;
            Some(latest)
        } else {
            None
        }
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
