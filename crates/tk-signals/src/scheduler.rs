//! The cycle driver ("thread") that owns and orders stateful nodes.
//!
//! A scheduler keeps its registered nodes in an insertion-ordered arena and
//! advances all of them once per cycle. Before any of them, it advances its
//! own elapsed-time node, so every node sampling [`Scheduler::dt`] during a
//! cycle sees the time elapsed in *this* cycle.
//!
//! Two modes, fixed at construction:
//! - **Manual**: a cycle runs when [`Scheduler::run`] is called (typically once
//!   per periodic callback of the host lifecycle driver).
//! - **Timed**: a dedicated thread runs cycles at a fixed wall-clock period
//!   and explicit `run` calls are ignored.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, TryLockError, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tk_core::{Clock, MonotonicClock, NodeKey, SchedulerId, ensure_positive};
use tracing::{debug, error, info, trace, warn};

use crate::error::{SignalError, SignalResult};
use crate::history::Delta;
use crate::node::{Advance, Link, Node, NodeHandle, lock};
use crate::signal::Num;

static NEXT_SCHEDULER: AtomicU32 = AtomicU32::new(0);

/// How cycles are triggered.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SchedulerMode {
    /// Cycles run only on explicit [`Scheduler::run`] calls.
    #[default]
    Manual,
    /// Cycles run every `period_s` seconds on a dedicated thread.
    Timed {
        /// Cycle period in seconds (must be positive).
        period_s: f64,
    },
}

impl SchedulerMode {
    /// Timed mode with the given period.
    pub fn timed(period: Duration) -> Self {
        Self::Timed {
            period_s: period.as_secs_f64(),
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, Self::Manual)
    }
}

/// Shared handle on a scheduler.
///
/// Clones refer to the same scheduler. A timed scheduler stops cycling once
/// [`Scheduler::stop`] is called or every handle to it is dropped. A
/// registered node that owns a `Scheduler` keeps its own scheduler alive, so
/// nodes that need to reach their scheduler hold a [`WeakScheduler`].
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<SchedulerShared>,
}

/// Non-owning handle on a [`Scheduler`].
#[derive(Clone, Debug)]
pub struct WeakScheduler {
    shared: Weak<SchedulerShared>,
}

impl WeakScheduler {
    /// The scheduler, if any strong handle to it is still alive.
    pub fn upgrade(&self) -> Option<Scheduler> {
        self.shared.upgrade().map(Scheduler::from_shared)
    }
}

pub(crate) struct SchedulerShared {
    id: SchedulerId,
    mode: SchedulerMode,
    t: Num,
    dt: Node<Delta<f64>>,
    arena: Mutex<Arena>,
    cycle: Mutex<()>,
    cycles: AtomicU64,
    timer: Mutex<Option<Timer>>,
}

/// Registered nodes in registration order.
///
/// Keys are handed out in increasing order and never reissued, so the vector
/// stays sorted by key and a removal is a binary search plus a shift.
#[derive(Default)]
struct Arena {
    next: u32,
    nodes: Vec<(NodeKey, Arc<dyn Advance>)>,
}

impl Arena {
    fn insert(&mut self, node: Arc<dyn Advance>) -> Option<NodeKey> {
        let key = NodeKey::from_index(self.next)?;
        self.next = self.next.checked_add(1)?;
        self.nodes.push((key, node));
        Some(key)
    }

    fn remove(&mut self, key: NodeKey) {
        if let Ok(pos) = self.nodes.binary_search_by_key(&key, |(k, _)| *k) {
            self.nodes.remove(pos);
        }
    }
}

struct Timer {
    stop: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

impl Scheduler {
    /// A manual scheduler on the wall clock.
    pub fn manual() -> Self {
        Self::from_shared(SchedulerShared::new(
            SchedulerMode::Manual,
            Arc::new(MonotonicClock::start()),
        ))
    }

    /// A timed scheduler on the wall clock; its first cycle runs immediately.
    pub fn timed(period: Duration) -> SignalResult<Self> {
        Self::new(SchedulerMode::timed(period))
    }

    /// A scheduler in `mode` on the wall clock.
    pub fn new(mode: SchedulerMode) -> SignalResult<Self> {
        Self::with_clock(mode, MonotonicClock::start())
    }

    /// A scheduler in `mode` whose `t` reads `clock`.
    pub fn with_clock(mode: SchedulerMode, clock: impl Clock + 'static) -> SignalResult<Self> {
        let period = match mode {
            SchedulerMode::Timed { period_s } => Some(timer_period(period_s)?),
            SchedulerMode::Manual => None,
        };
        let scheduler = Self::from_shared(SchedulerShared::new(mode, Arc::new(clock)));
        if let Some(period) = period {
            scheduler.start_timer(period)?;
        }
        Ok(scheduler)
    }

    pub(crate) fn from_shared(shared: Arc<SchedulerShared>) -> Self {
        Self { shared }
    }

    pub fn id(&self) -> SchedulerId {
        self.shared.id
    }

    pub fn downgrade(&self) -> WeakScheduler {
        WeakScheduler {
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub fn mode(&self) -> SchedulerMode {
        self.shared.mode
    }

    /// Seconds since this scheduler was constructed, read live from its clock.
    pub fn t(&self) -> Num {
        self.shared.t.clone()
    }

    /// Seconds elapsed between the previous cycle and the current one.
    ///
    /// Before the first cycle this reads `0.0`; on the first cycle it is the
    /// time since construction.
    pub fn dt(&self) -> Num {
        self.shared.dt.num()
    }

    /// Number of completed cycles.
    pub fn cycles(&self) -> u64 {
        self.shared.cycles.load(Ordering::Acquire)
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        lock(&self.shared.arena).nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `handle` is registered here.
    pub fn contains(&self, handle: &NodeHandle) -> bool {
        matches!(&*handle.link(), Link::Attached { id, .. } if *id == self.id())
    }

    /// Register `handle`, moving it off any other scheduler first.
    ///
    /// Registering a node that is already registered here does nothing, so
    /// a node can never be advanced twice per cycle.
    pub fn register(&self, handle: &NodeHandle) {
        let mut link = handle.link();
        if let Link::Attached { scheduler, id, key } = &*link {
            if *id == self.id() {
                return;
            }
            if let Some(previous) = scheduler.upgrade() {
                previous.remove(*key);
                debug!(node = %key, from = %id, to = %self.id(), "moving node between schedulers");
            }
        }
        *link = match self.shared.insert(handle.node().clone()) {
            Some(key) => {
                debug!(node = %key, scheduler = %self.id(), "registered node");
                Link::Attached {
                    scheduler: Arc::downgrade(&self.shared),
                    id: self.id(),
                    key,
                }
            }
            None => {
                error!(scheduler = %self.id(), "node keys exhausted; node left detached");
                Link::Detached
            }
        };
    }

    /// Deregister `handle`. Removing a node that is not registered here does nothing.
    pub fn deregister(&self, handle: &NodeHandle) {
        let mut link = handle.link();
        if let Link::Attached { id, key, .. } = &*link {
            if *id != self.id() {
                return;
            }
            self.shared.remove(*key);
            debug!(node = %key, scheduler = %self.id(), "deregistered node");
            *link = Link::Detached;
        }
    }

    /// Run one cycle now. Ignored in timed mode.
    ///
    /// Returns whether a cycle actually ran.
    pub fn run(&self) -> bool {
        if !self.shared.mode.is_manual() {
            trace!(scheduler = %self.id(), "run request ignored by timed scheduler");
            return false;
        }
        self.shared.run_cycle()
    }

    /// Reset every registered node.
    pub fn reset_all(&self) {
        for node in self.shared.snapshot() {
            node.reset();
        }
    }

    /// Stop a timed scheduler's thread. Does nothing for a manual scheduler.
    pub fn stop(&self) {
        let Some(timer) = lock(&self.shared.timer).take() else {
            return;
        };
        timer.stop.store(true, Ordering::Release);
        // A node may stop its own scheduler from inside a cycle.
        if timer.join.thread().id() != thread::current().id() && timer.join.join().is_err() {
            warn!(scheduler = %self.id(), "scheduler thread panicked");
        }
        info!(scheduler = %self.id(), "timed scheduler stopped");
    }

    /// Whether a timed scheduler's thread is still running.
    pub fn is_running(&self) -> bool {
        lock(&self.shared.timer)
            .as_ref()
            .is_some_and(|timer| !timer.join.is_finished())
    }

    fn start_timer(&self, period: Duration) -> SignalResult<()> {
        let weak = Arc::downgrade(&self.shared);
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let join = thread::Builder::new()
            .name(format!("tk-scheduler-{}", self.id()))
            .spawn(move || timer_loop(weak, flag, period))
            .map_err(|e| SignalError::Scheduler {
                what: format!("failed to spawn scheduler thread: {e}"),
            })?;
        info!(scheduler = %self.id(), period_s = period.as_secs_f64(), "timed scheduler started");
        *lock(&self.shared.timer) = Some(Timer { stop, join });
        Ok(())
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("id", &self.id())
            .field("mode", &self.mode())
            .field("nodes", &self.len())
            .field("cycles", &self.cycles())
            .finish()
    }
}

fn timer_period(period_s: f64) -> SignalResult<Duration> {
    ensure_positive(period_s, "scheduler period")?;
    Duration::try_from_secs_f64(period_s).map_err(|_| SignalError::InvalidArg {
        what: "scheduler period does not fit in a Duration",
    })
}

fn timer_loop(shared: Weak<SchedulerShared>, stop: Arc<AtomicBool>, period: Duration) {
    let mut deadline = Instant::now();
    while !stop.load(Ordering::Acquire) {
        let Some(scheduler) = shared.upgrade() else {
            break;
        };
        scheduler.run_cycle();
        drop(scheduler);

        deadline += period;
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        } else {
            // Overran; skip the missed cycles instead of bursting.
            deadline = now;
        }
    }
}

impl SchedulerShared {
    fn new(mode: SchedulerMode, clock: Arc<dyn Clock>) -> Arc<Self> {
        let raw = NEXT_SCHEDULER.fetch_add(1, Ordering::Relaxed);
        let id = SchedulerId::from_index(raw).unwrap_or(SchedulerId::FIRST);
        let t = Num::from_fn(move || clock.now());
        let dt = Node::detached(Delta::new(t.clone()));
        Arc::new(Self {
            id,
            mode,
            t,
            dt,
            arena: Mutex::new(Arena::default()),
            cycle: Mutex::new(()),
            cycles: AtomicU64::new(0),
            timer: Mutex::new(None),
        })
    }

    fn insert(&self, node: Arc<dyn Advance>) -> Option<NodeKey> {
        lock(&self.arena).insert(node)
    }

    fn remove(&self, key: NodeKey) {
        lock(&self.arena).remove(key);
    }

    fn snapshot(&self) -> Vec<Arc<dyn Advance>> {
        lock(&self.arena)
            .nodes
            .iter()
            .map(|(_, node)| node.clone())
            .collect()
    }

    fn run_cycle(&self) -> bool {
        let _cycle = match self.cycle.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                warn!(scheduler = %self.id, "cycle already in progress; skipping");
                return false;
            }
        };

        // Elapsed time first: every other node may sample it.
        advance_guarded(self.id, self.dt.handle().node().as_ref());

        // Iterate a snapshot so nodes may (de)register during the cycle.
        let nodes = self.snapshot();
        for node in &nodes {
            advance_guarded(self.id, node.as_ref());
        }

        let cycle = self.cycles.fetch_add(1, Ordering::AcqRel) + 1;
        trace!(scheduler = %self.id, cycle, nodes = nodes.len(), "cycle complete");
        true
    }
}

impl Drop for SchedulerShared {
    fn drop(&mut self) {
        if let Some(timer) = lock(&self.timer).take() {
            timer.stop.store(true, Ordering::Release);
        }
    }
}

/// Advance one node, containing a panic so the rest of the cycle still runs.
fn advance_guarded(scheduler: SchedulerId, node: &dyn Advance) {
    if panic::catch_unwind(AssertUnwindSafe(|| node.advance())).is_err() {
        error!(%scheduler, "node panicked during advance; continuing cycle");
    }
}
