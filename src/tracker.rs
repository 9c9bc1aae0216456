use alloc::{sync::Arc, vec::Vec};
use core::{
    cell::RefCell,
    fmt::{self, Display, Formatter},
    sync::atomic::{AtomicU64, Ordering},
};
use parking_lot::Mutex;
use tracing::error;

use crate::{
    errors::{CyclePath, ResolveErrorKind},
    key::ServiceKey,
};

/// Process-unique identifier of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContainerId(u64);

impl ContainerId {
    #[must_use]
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for ContainerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A registration being resolved: the container owning it and its key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Frame {
    pub(crate) container: ContainerId,
    pub(crate) key: ServiceKey,
}

/// Ordered registrations currently being resolved on one call chain.
#[derive(Debug, Default)]
pub(crate) struct ResolutionTracker {
    in_flight: Vec<Frame>,
}

impl ResolutionTracker {
    #[inline]
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self { in_flight: Vec::new() }
    }

    #[inline]
    pub(crate) fn push(&mut self, frame: Frame) {
        self.in_flight.push(frame);
    }

    /// Removes the most recent occurrence of the frame.
    pub(crate) fn pop(&mut self, frame: &Frame) -> Option<Frame> {
        let index = self.in_flight.iter().rposition(|in_flight| in_flight == frame)?;
        Some(self.in_flight.remove(index))
    }

    #[inline]
    #[must_use]
    pub(crate) fn would_cycle(&self, frame: &Frame) -> bool {
        self.in_flight.contains(frame)
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn depth(&self) -> usize {
        self.in_flight.len()
    }

    /// Keys of the whole in-flight chain followed by the key requested again.
    #[must_use]
    pub(crate) fn cycle_path(&self, frame: &Frame) -> CyclePath {
        let keys: Vec<_> = self
            .in_flight
            .iter()
            .map(|in_flight| in_flight.key.clone())
            .chain([frame.key.clone()])
            .collect();
        CyclePath::new(keys.into_boxed_slice())
    }
}

/// State of one top-level resolution call, shared by all nested resolutions it triggers,
/// including the ones delegated to parent containers and the ones made through a container
/// handed to a running factory. Clones share the state.
#[derive(Clone)]
pub(crate) struct Session {
    tracker: Arc<Mutex<ResolutionTracker>>,
}

impl Session {
    #[inline]
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            tracker: Arc::new(Mutex::new(ResolutionTracker::new())),
        }
    }

    /// Marks the frame as in flight until the returned guard is dropped.
    ///
    /// # Errors
    /// Returns [`ResolveErrorKind::CircularDependency`] if the frame is already in flight.
    pub(crate) fn enter(&self, frame: Frame) -> Result<InFlight<'_>, ResolveErrorKind> {
        let mut tracker = self.tracker.lock();
        if tracker.would_cycle(&frame) {
            let err = ResolveErrorKind::CircularDependency {
                path: tracker.cycle_path(&frame),
            };
            error!("{}", err);
            return Err(err);
        }
        tracker.push(frame.clone());

        Ok(InFlight { session: self, frame })
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn depth(&self) -> usize {
        self.tracker.lock().depth()
    }

    #[cfg(test)]
    #[must_use]
    fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tracker, &other.tracker)
    }
}

/// Keeps a frame in flight, pops it on drop whatever way the resolution exits.
pub(crate) struct InFlight<'s> {
    session: &'s Session,
    frame: Frame,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.session.tracker.lock().pop(&self.frame);
    }
}

/// Sessions of the resolutions currently running a factory of one container, innermost last.
///
/// They're kept under the container's lock, so the sessions seen by a thread are its own.
#[derive(Default)]
pub(crate) struct ActiveSessions {
    sessions: RefCell<Vec<Session>>,
}

impl ActiveSessions {
    #[must_use]
    pub(crate) fn current(&self) -> Option<Session> {
        self.sessions.borrow().last().cloned()
    }

    /// Marks the session as running a factory until the returned guard is dropped.
    pub(crate) fn activate(&self, session: &Session) -> Active<'_> {
        self.sessions.borrow_mut().push(session.clone());
        Active { sessions: self }
    }
}

pub(crate) struct Active<'a> {
    sessions: &'a ActiveSessions,
}

impl Drop for Active<'_> {
    fn drop(&mut self) {
        self.sessions.sessions.borrow_mut().pop();
    }
}
