//! Cooperative scheduling primitives for the display thread.
//!
//! - [`WorkQueue`] holds prioritized jobs and never keeps two equal jobs
//!   pending at once.
//! - [`Dispatcher`] owns the receiving end of a message channel on one
//!   thread; [`DispatcherHandle`]s let other threads post to it.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, ThreadId};
use std::time::Duration;

/// Scheduling priority. Higher priorities run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Work the user is waiting on, e.g. showing a busy indicator.
    Input,
    Normal,
    /// Heavy work that should yield to pending input.
    Background,
}

impl Priority {
    const ALL: [Self; 3] = [Self::Input, Self::Normal, Self::Background];

    const fn lane(self) -> usize {
        match self {
            Self::Input => 0,
            Self::Normal => 1,
            Self::Background => 2,
        }
    }
}

/// A queue of jobs executed one at a time by its owner.
pub trait Scheduler<J> {
    /// Queue `job`. Returns `false` if an equal job is already pending.
    fn post(&mut self, priority: Priority, job: J) -> bool;

    /// Take the next job, highest priority first, FIFO within a priority.
    fn next(&mut self) -> Option<J>;

    /// Number of pending jobs.
    fn pending(&self) -> usize;

    fn is_idle(&self) -> bool {
        self.pending() == 0
    }
}

/// In-memory [`Scheduler`] with one FIFO lane per priority.
#[derive(Debug)]
pub struct WorkQueue<J> {
    lanes: [VecDeque<J>; 3],
}

impl<J> Default for WorkQueue<J> {
    fn default() -> Self {
        Self {
            lanes: [VecDeque::new(), VecDeque::new(), VecDeque::new()],
        }
    }
}

impl<J> WorkQueue<J> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<J: PartialEq> Scheduler<J> for WorkQueue<J> {
    fn post(&mut self, priority: Priority, job: J) -> bool {
        if self.lanes.iter().any(|lane| lane.contains(&job)) {
            return false;
        }
        self.lanes[priority.lane()].push_back(job);
        true
    }

    fn next(&mut self) -> Option<J> {
        Priority::ALL
            .iter()
            .find_map(|p| self.lanes[p.lane()].pop_front())
    }

    fn pending(&self) -> usize {
        self.lanes.iter().map(VecDeque::len).sum()
    }
}

/// Receiving end of a message channel bound to the thread that created it.
#[derive(Debug)]
pub struct Dispatcher<M> {
    owner: ThreadId,
    tx: Sender<M>,
    rx: Receiver<M>,
}

impl<M> Default for Dispatcher<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Dispatcher<M> {
    /// Create a dispatcher owned by the current thread.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            owner: thread::current().id(),
            tx,
            rx,
        }
    }

    #[must_use]
    pub fn handle(&self) -> DispatcherHandle<M> {
        DispatcherHandle {
            owner: self.owner,
            tx: self.tx.clone(),
        }
    }

    /// Returns `true` when called on the owning thread.
    #[must_use]
    pub fn check_access(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Every message posted so far, without blocking.
    pub fn drain(&self) -> Vec<M> {
        self.rx.try_iter().collect()
    }

    /// Wait up to `timeout` for one message.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<M> {
        match self.rx.recv_timeout(timeout) {
            Ok(message) => Some(message),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

/// Cloneable, sendable poster for a [`Dispatcher`].
#[derive(Debug)]
pub struct DispatcherHandle<M> {
    owner: ThreadId,
    tx: Sender<M>,
}

impl<M> Clone for DispatcherHandle<M> {
    fn clone(&self) -> Self {
        Self {
            owner: self.owner,
            tx: self.tx.clone(),
        }
    }
}

impl<M> DispatcherHandle<M> {
    /// Post a message. Returns `false` if the dispatcher is gone.
    pub fn post(&self, message: M) -> bool {
        self.tx.send(message).is_ok()
    }

    #[must_use]
    pub fn check_access(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Hand `message` back for immediate handling when on the owning
    /// thread; otherwise post it and return `None`.
    pub fn marshal(&self, message: M) -> Option<M> {
        if self.check_access() {
            Some(message)
        } else {
            self.post(message);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_priority_runs_first() {
        let mut q = WorkQueue::new();
        q.post(Priority::Background, "rebuild");
        q.post(Priority::Normal, "paint");
        q.post(Priority::Input, "busy");
        assert_eq!(q.next(), Some("busy"));
        assert_eq!(q.next(), Some("paint"));
        assert_eq!(q.next(), Some("rebuild"));
        assert_eq!(q.next(), None);
    }

    #[test]
    fn equal_jobs_are_coalesced_across_lanes() {
        let mut q = WorkQueue::new();
        assert!(q.post(Priority::Background, 1));
        assert!(!q.post(Priority::Input, 1));
        assert!(q.post(Priority::Input, 2));
        assert_eq!(q.pending(), 2);
        q.next();
        q.next();
        assert!(q.is_idle());
        assert!(q.post(Priority::Normal, 1));
    }

    #[test]
    fn marshal_returns_message_on_owner_thread() {
        let dispatcher: Dispatcher<u32> = Dispatcher::new();
        let handle = dispatcher.handle();
        assert!(dispatcher.check_access());
        assert_eq!(handle.marshal(7), Some(7));
        assert!(dispatcher.drain().is_empty());
    }

    #[test]
    fn marshal_posts_from_other_threads() {
        let dispatcher: Dispatcher<u32> = Dispatcher::new();
        let handle = dispatcher.handle();
        let worker = thread::spawn(move || (handle.check_access(), handle.marshal(9)));
        let (on_owner, handled_inline) = worker.join().expect("join");
        assert!(!on_owner);
        assert_eq!(handled_inline, None);
        assert_eq!(dispatcher.recv_timeout(Duration::from_secs(1)), Some(9));
    }
}
