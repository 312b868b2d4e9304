use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::f1_fetch::{F1Source, FetchOutcome};
use crate::state::{Delta, MountId, StandingsBoard, ViewKind, ViewSnapshot, view_label};

pub type ViewFetch = Arc<dyn Fn() -> FetchOutcome<ViewSnapshot> + Send + Sync>;

/// Builds the per-tick fetch for a view. The standings view joins headshots onto the table.
pub fn view_fetcher(view: ViewKind, source: Arc<dyn F1Source>) -> ViewFetch {
    match view {
        ViewKind::Standings => Arc::new(move || {
            source
                .driver_standings()
                .zip(source.driver_images())
                .map(|(entries, images)| {
                    ViewSnapshot::Standings(StandingsBoard { entries, images })
                })
        }),
        ViewKind::Calendar => Arc::new(move || source.race_schedule().map(ViewSnapshot::Calendar)),
        ViewKind::Profiles => {
            Arc::new(move || source.driver_standings().map(ViewSnapshot::Profiles))
        }
        ViewKind::NextRace => Arc::new(move || source.next_race().map(ViewSnapshot::NextRace)),
    }
}

pub fn build_fetch_pool(threads: usize) -> Option<Arc<rayon::ThreadPool>> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|idx| format!("f1-fetch-{idx}"))
        .build()
        .ok()
        .map(Arc::new)
}

/// Shared flag between a poll handle and its callbacks. Writes happen under the lock, so once
/// `kill` returns no callback can still be mid-send.
#[derive(Clone)]
struct Liveness(Arc<Mutex<bool>>);

impl Liveness {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(true)))
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        // A panicking send cannot leave the flag half-written.
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_alive(&self) -> bool {
        *self.lock()
    }

    fn kill(&self) {
        *self.lock() = false;
    }

    fn with_alive<T>(&self, write: impl FnOnce() -> T) -> Option<T> {
        let guard = self.lock();
        if !*guard {
            return None;
        }
        Some(write())
    }
}

/// The timer callback of one mounted view. Running it after the owning handle is cancelled
/// is a no-op.
#[derive(Clone)]
pub struct TickTask {
    view: ViewKind,
    mount: MountId,
    alive: Liveness,
    fetch: ViewFetch,
    sink: Sender<Delta>,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl TickTask {
    /// Announces the tick and hands the fetch to the pool. Returns false when the view is gone.
    pub fn run(&self) -> bool {
        let announced = self.alive.with_alive(|| {
            self.sink
                .send(Delta::PollStarted {
                    view: self.view,
                    mount: self.mount,
                })
                .is_ok()
        });
        if announced != Some(true) {
            return false;
        }
        log::debug!("tick {} ({:?})", view_label(self.view), self.mount);

        let alive = self.alive.clone();
        let fetch = self.fetch.clone();
        let sink = self.sink.clone();
        let mount = self.mount;
        let job = move || {
            let (snapshot, degraded) = fetch().into_parts();
            // A slow fetch may outlive its view.
            alive.with_alive(|| {
                let _ = sink.send(Delta::PollFinished {
                    mount,
                    snapshot,
                    degraded,
                });
            });
        };

        if let Some(pool) = self.pool.as_ref() {
            pool.spawn(job);
        } else {
            thread::spawn(job);
        }
        true
    }
}

/// Owned timer for one mounted view. Dropping it cancels the timer.
pub struct PollHandle {
    view: ViewKind,
    task: TickTask,
    stop_tx: Option<Sender<()>>,
    ticker: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn is_active(&self) -> bool {
        self.task.alive.is_alive()
    }

    pub fn tick_task(&self) -> TickTask {
        self.task.clone()
    }

    /// Stops the timer and waits for the ticker thread; no delta is sent afterwards.
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.task.alive.kill();
        // Dropping the sender wakes the ticker out of its wait.
        self.stop_tx.take();
        if let Some(ticker) = self.ticker.take() {
            if ticker.join().is_err() {
                log::error!("poller for {} panicked", view_label(self.view));
            } else {
                log::info!("poller stopped for {}", view_label(self.view));
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Fires one tick now, then one every `interval` on a fixed schedule that does not wait for
/// fetches to finish. Missed ticks are skipped rather than replayed.
pub fn spawn_poller(
    view: ViewKind,
    mount: MountId,
    interval: Duration,
    fetch: ViewFetch,
    sink: Sender<Delta>,
    pool: Option<Arc<rayon::ThreadPool>>,
) -> PollHandle {
    let interval = interval.max(Duration::from_millis(1));
    let task = TickTask {
        view,
        mount,
        alive: Liveness::new(),
        fetch,
        sink,
        pool,
    };
    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    let ticker_task = task.clone();

    let ticker = thread::spawn(move || {
        let mut next_tick = Instant::now();
        loop {
            if !ticker_task.run() {
                break;
            }
            let now = Instant::now();
            let Some(due) = next_due(next_tick, interval, now) else {
                log::warn!("{} poll interval out of range, polling stopped", view_label(view));
                break;
            };
            next_tick = due;
            match stop_rx.recv_timeout(next_tick - now) {
                Err(RecvTimeoutError::Timeout) => {}
                _ => break,
            }
        }
    });
    log::info!(
        "poller started for {} every {}s",
        view_label(view),
        interval.as_secs()
    );

    PollHandle {
        view,
        task,
        stop_tx: Some(stop_tx),
        ticker: Some(ticker),
    }
}

/// First slot of the schedule `last + k * interval` that lies after `now`. Slots already in
/// the past are skipped. `None` when the next slot does not fit in an `Instant`.
fn next_due(last: Instant, interval: Duration, now: Instant) -> Option<Instant> {
    let due = last.checked_add(interval)?;
    if due > now {
        return Some(due);
    }
    let missed = (now - due).as_nanos() / interval.as_nanos();
    let skip = u32::try_from(missed + 1).ok()?;
    due.checked_add(interval.checked_mul(skip)?)
}
