//! Stateful node plumbing.
//!
//! A stateful node carries memory that a scheduler updates once per cycle
//! through [`Advance::advance`], independent of how often its value is read.
//! Its lifecycle is explicit: a node starts DETACHED, is attached to at most
//! one [`Scheduler`] at a time (which stores it under a [`NodeKey`]),
//! and may be detached or moved to another scheduler at any point. All of
//! these transitions are idempotent.

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tk_core::{NodeKey, SchedulerId};

use crate::scheduler::{Scheduler, SchedulerShared};
use crate::signal::{Bool, BoolSignal, Num, NumSignal};

/// Lock a node's internal state.
///
/// A cycle must never halt, so a lock poisoned by an earlier panic is
/// recovered instead of propagated.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-cycle behavior of a stateful node.
///
/// Implementations read their inputs before locking their own state, so a
/// node may safely sit on a feedback path that reads its own output.
pub trait Advance: Send + Sync {
    /// Update internal memory; called exactly once per scheduler cycle.
    fn advance(&self);

    /// Return internal memory to its zero state. Most nodes have nothing to reset.
    fn reset(&self) {}
}

/// Where a node currently lives.
pub(crate) enum Link {
    Detached,
    Attached {
        scheduler: Weak<SchedulerShared>,
        id: SchedulerId,
        key: NodeKey,
    },
}

struct Entry {
    node: Arc<dyn Advance>,
    link: Mutex<Link>,
}

/// Type-erased handle on a stateful node and its registration link.
#[derive(Clone)]
pub struct NodeHandle {
    entry: Arc<Entry>,
}

impl NodeHandle {
    /// Wrap a node in a detached handle.
    pub fn new<T: Advance + 'static>(node: Arc<T>) -> Self {
        Self::from_dyn(node)
    }

    /// Wrap an already type-erased node in a detached handle.
    pub fn from_dyn(node: Arc<dyn Advance>) -> Self {
        Self {
            entry: Arc::new(Entry {
                node,
                link: Mutex::new(Link::Detached),
            }),
        }
    }

    /// Advance the node by hand, e.g. when it is detached or gated.
    pub fn advance(&self) {
        self.entry.node.advance();
    }

    pub fn reset(&self) {
        self.entry.node.reset();
    }

    /// The scheduler this node is attached to, if it is attached to a live one.
    pub fn scheduler(&self) -> Option<Scheduler> {
        match &*self.link() {
            Link::Attached { scheduler, .. } => scheduler.upgrade().map(Scheduler::from_shared),
            Link::Detached => None,
        }
    }

    /// Slot of this node in its scheduler's arena.
    pub fn key(&self) -> Option<NodeKey> {
        match &*self.link() {
            Link::Attached { key, .. } => Some(*key),
            Link::Detached => None,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.scheduler().is_some()
    }

    /// Attach to `scheduler`, leaving any previous scheduler first.
    pub fn attach(&self, scheduler: &Scheduler) {
        scheduler.register(self);
    }

    /// Leave the current scheduler. Detaching a detached node does nothing.
    pub fn detach(&self) {
        match self.scheduler() {
            Some(scheduler) => scheduler.deregister(self),
            None => *self.link() = Link::Detached,
        }
    }

    /// Whether both handles refer to the same node.
    pub fn ptr_eq(&self, other: &NodeHandle) -> bool {
        Arc::ptr_eq(&self.entry, &other.entry)
    }

    pub(crate) fn link(&self) -> MutexGuard<'_, Link> {
        lock(&self.entry.link)
    }

    pub(crate) fn node(&self) -> &Arc<dyn Advance> {
        &self.entry.node
    }
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeHandle").field("key", &self.key()).finish()
    }
}

/// A typed stateful node: its concrete state plus its registration handle.
///
/// Dereferences to the node type, so node-specific operations (`bind`,
/// `add_set`, ...) are called directly on it.
pub struct Node<T> {
    inner: Arc<T>,
    handle: NodeHandle,
}

impl<T: Advance + 'static> Node<T> {
    /// Wrap `node` without registering it anywhere.
    pub fn detached(node: T) -> Self {
        let inner = Arc::new(node);
        let handle = NodeHandle::new(inner.clone());
        Self { inner, handle }
    }

    /// Wrap `node` and register it with `scheduler`.
    pub fn attached(node: T, scheduler: &Scheduler) -> Self {
        let node = Self::detached(node);
        scheduler.register(&node.handle);
        node
    }
}

impl<T> Node<T> {
    pub fn handle(&self) -> &NodeHandle {
        &self.handle
    }

    pub fn reset(&self) {
        self.handle.reset();
    }
}

impl<T: NumSignal + 'static> Node<T> {
    /// This node's output as a numeric signal.
    pub fn num(&self) -> Num {
        Num::from_arc(self.inner.clone())
    }
}

impl<T: BoolSignal + 'static> Node<T> {
    /// This node's output as a boolean signal.
    pub fn boolean(&self) -> Bool {
        Bool::from_arc(self.inner.clone())
    }
}

impl<T> Clone for Node<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            handle: self.handle.clone(),
        }
    }
}

impl<T> Deref for Node<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("type", &std::any::type_name::<T>())
            .field("key", &self.handle.key())
            .finish()
    }
}

impl<T: NumSignal + 'static> From<Node<T>> for Num {
    fn from(node: Node<T>) -> Self {
        node.num()
    }
}

impl<T: NumSignal + 'static> From<&Node<T>> for Num {
    fn from(node: &Node<T>) -> Self {
        node.num()
    }
}

impl<T: BoolSignal + 'static> From<Node<T>> for Bool {
    fn from(node: Node<T>) -> Self {
        node.boolean()
    }
}

impl<T: BoolSignal + 'static> From<&Node<T>> for Bool {
    fn from(node: &Node<T>) -> Self {
        node.boolean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl Advance for Counter {
        fn advance(&self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }

        fn reset(&self) {
            self.0.store(0, Ordering::Relaxed);
        }
    }

    impl NumSignal for Counter {
        fn get(&self) -> f64 {
            self.0.load(Ordering::Relaxed) as f64
        }
    }

    #[test]
    fn detached_node_advances_only_by_hand() {
        let node = Node::detached(Counter::default());
        assert!(!node.handle().is_attached());
        assert_eq!(node.handle().key(), None);

        node.handle().advance();
        node.handle().advance();
        assert_eq!(node.num().get(), 2.0);

        node.reset();
        assert_eq!(node.num().get(), 0.0);
    }

    #[test]
    fn detaching_a_detached_node_is_a_no_op() {
        let node = Node::detached(Counter::default());
        node.handle().detach();
        node.handle().detach();
        assert!(!node.handle().is_attached());
    }

    #[test]
    fn clones_share_state_and_identity() {
        let node = Node::detached(Counter::default());
        let copy = node.clone();
        copy.handle().advance();
        assert_eq!(node.num().get(), 1.0);
        assert!(node.handle().ptr_eq(copy.handle()));
        let other = Node::detached(Counter::default());
        assert!(!node.handle().ptr_eq(other.handle()));
    }
}
