//! Circular dependency detection infrastructure.

use std::cell::RefCell;
use std::collections::HashMap;
use std::thread::{self, ThreadId};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::error::{DiError, DiResult};

// Thread-local resolution state for circular dependency detection
thread_local! {
    static RESOLUTION_STACK: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
}

/// Guard for managing the thread-local resolution stack.
///
/// Entering a name that is already on the stack fails with
/// [`DiError::Circular`] before any factory runs, so a cycle through a
/// singleton or scoped slot never waits on its own initialization.
pub(crate) struct StackGuard {
    name: &'static str,
}

impl StackGuard {
    pub(crate) fn enter(name: &'static str, max_depth: usize) -> DiResult<Self> {
        RESOLUTION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();

            if stack.iter().any(|&n| n == name) {
                let mut path = stack.clone();
                path.push(name);
                return Err(DiError::Circular(path));
            }

            if stack.len() >= max_depth {
                return Err(DiError::DepthExceeded(stack.len()));
            }

            stack.push(name);
            Ok(Self { name })
        })
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        RESOLUTION_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();
            debug_assert_eq!(popped, Some(self.name));
        });
    }
}

fn current_path() -> Vec<&'static str> {
    RESOLUTION_STACK.with(|stack| stack.borrow().clone())
}

/// Identity of one lazily built cache cell: owning scope and registration.
pub(crate) type CellId = (u64, usize);

/// Cross-thread view of the cache cells being built.
///
/// The thread-local stack only sees cycles within one thread. Two threads
/// building A and B, where A needs B and B needs A, would each block on the
/// other's cell forever. Every thread about to block on a cell records the
/// wait here first; a wait that leads back to a cell the waiting thread is
/// building fails with [`DiError::Circular`] instead.
#[derive(Default)]
pub(crate) struct InitTracker {
    state: Mutex<InitState>,
}

#[derive(Default)]
struct InitState {
    owners: HashMap<CellId, ThreadId>,
    waiting: HashMap<ThreadId, (CellId, &'static str)>,
}

impl InitTracker {
    /// Returns the value of `cell`, building it with `init` on first use.
    pub(crate) fn get_or_try_init<T: Clone>(
        &self,
        cell: &OnceCell<T>,
        id: CellId,
        name: &'static str,
        init: impl FnOnce() -> DiResult<T>,
    ) -> DiResult<T> {
        if let Some(value) = cell.get() {
            return Ok(value.clone());
        }

        let me = thread::current().id();
        self.begin_wait(id, name, me)?;
        let _waiting = WaitGuard { tracker: self, thread: me };

        cell.get_or_try_init(|| {
            let _owner = self.own(id, me);
            init()
        })
        .cloned()
    }

    fn begin_wait(&self, id: CellId, name: &'static str, me: ThreadId) -> DiResult<()> {
        let mut state = self.state.lock();
        let mut chain = Vec::new();
        let mut next = id;
        // Each hop follows one thread; a chain longer than the thread count
        // cannot come back to us.
        for _ in 0..=state.waiting.len() {
            let Some(&owner) = state.owners.get(&next) else {
                break;
            };
            if owner == me {
                return Err(DiError::Circular(cycle_path(name, chain)));
            }
            let Some(&(cell, cell_name)) = state.waiting.get(&owner) else {
                break;
            };
            chain.push(cell_name);
            next = cell;
        }
        state.waiting.insert(me, (id, name));
        Ok(())
    }

    fn own(&self, id: CellId, me: ThreadId) -> OwnerGuard<'_> {
        let mut state = self.state.lock();
        state.waiting.remove(&me);
        state.owners.insert(id, me);
        OwnerGuard { tracker: self, id }
    }
}

/// Path from the cell the current thread is building to `name` and on
/// through the cells other threads wait for.
fn cycle_path(name: &'static str, chain: Vec<&'static str>) -> Vec<&'static str> {
    let stack = current_path();
    let closing = chain.last().copied().unwrap_or(name);
    let start = stack.iter().position(|&n| n == closing).unwrap_or(0);
    let mut path = stack[start..].to_vec();
    if path.last() != Some(&name) {
        path.push(name);
    }
    if chain.is_empty() {
        path.push(name);
    } else {
        path.extend(chain);
    }
    path
}

struct WaitGuard<'a> {
    tracker: &'a InitTracker,
    thread: ThreadId,
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        self.tracker.state.lock().waiting.remove(&self.thread);
    }
}

struct OwnerGuard<'a> {
    tracker: &'a InitTracker,
    id: CellId,
}

impl Drop for OwnerGuard<'_> {
    fn drop(&mut self) {
        self.tracker.state.lock().owners.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reentering_a_name_reports_the_path() {
        let _a = StackGuard::enter("A", 16).unwrap();
        let _b = StackGuard::enter("B", 16).unwrap();
        match StackGuard::enter("A", 16) {
            Err(DiError::Circular(path)) => assert_eq!(path, vec!["A", "B", "A"]),
            _ => panic!("expected a circular error"),
        }
    }

    #[test]
    fn stack_unwinds_with_guards() {
        {
            let _a = StackGuard::enter("A", 16).unwrap();
        }
        assert!(StackGuard::enter("A", 16).is_ok());
    }

    #[test]
    fn depth_limit_is_enforced() {
        let _a = StackGuard::enter("A", 1).unwrap();
        assert!(matches!(StackGuard::enter("B", 1), Err(DiError::DepthExceeded(1))));
    }

    #[test]
    fn tracker_builds_once_and_keeps_failures_uncached() {
        let tracker = InitTracker::default();
        let cell = OnceCell::new();
        let failed = tracker.get_or_try_init(&cell, (0, 0), "A", || Err(DiError::NotFound("B")));
        assert!(failed.is_err());
        assert_eq!(tracker.get_or_try_init(&cell, (0, 0), "A", || Ok(1)).unwrap(), 1);
        assert_eq!(tracker.get_or_try_init(&cell, (0, 0), "A", || Ok(2)).unwrap(), 1);
        assert!(tracker.state.lock().owners.is_empty());
        assert!(tracker.state.lock().waiting.is_empty());
    }

    #[test]
    fn waiting_on_a_thread_that_waits_on_us_is_circular() {
        let tracker = InitTracker::default();
        let me = thread::current().id();
        let other = thread::spawn(|| thread::current().id()).join().unwrap();
        {
            let mut state = tracker.state.lock();
            state.owners.insert((0, 1), me);
            state.owners.insert((0, 2), other);
            state.waiting.insert(other, ((0, 1), "A"));
        }

        let _a = StackGuard::enter("A", 16).unwrap();
        let _b = StackGuard::enter("B", 16).unwrap();
        match tracker.begin_wait((0, 2), "B", me) {
            Err(DiError::Circular(path)) => assert_eq!(path, vec!["A", "B", "A"]),
            _ => panic!("expected a circular error"),
        }
        assert!(!tracker.state.lock().waiting.contains_key(&me));
    }
}
