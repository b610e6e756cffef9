//! Scope tree of the built-in backend.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};

use crate::descriptors::AnyArc;
use crate::error::{DiError, DiResult, DisposalError};
use crate::internal::{DisposeBag, Disposer};
use crate::key::Key;
use crate::provider::{ResolverScope, ScopeBackend, ServiceProvider};
use crate::traits::ResolverCore;

pub(crate) const ROOT_SCOPE_ID: u64 = 0;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(ROOT_SCOPE_ID + 1);

/// One node of the scope tree.
///
/// Owns its children, the Scoped instances created through it and the
/// dispose hooks registered while building them.
pub(crate) struct ScopeNode {
    pub(crate) id: u64,
    parent: Option<Weak<ScopeNode>>,
    children: Mutex<Vec<Arc<ScopeNode>>>,
    slots: RwLock<Option<Box<[OnceCell<AnyArc>]>>>,
    disposers: Mutex<DisposeBag>,
    released: AtomicBool,
}

impl ScopeNode {
    fn with_parent(id: u64, parent: Option<Weak<ScopeNode>>, slot_count: usize) -> Self {
        let slots: Box<[OnceCell<AnyArc>]> = (0..slot_count).map(|_| OnceCell::new()).collect();
        Self {
            id,
            parent,
            children: Mutex::new(Vec::new()),
            slots: RwLock::new(Some(slots)),
            disposers: Mutex::new(DisposeBag::default()),
            released: AtomicBool::new(false),
        }
    }

    pub(crate) fn root(slot_count: usize) -> Arc<Self> {
        Arc::new(Self::with_parent(ROOT_SCOPE_ID, None, slot_count))
    }

    pub(crate) fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub(crate) fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    pub(crate) fn child(self: &Arc<Self>, slot_count: usize) -> DiResult<Arc<Self>> {
        let mut children = self.children.lock();
        // Checked under the children lock: a concurrent release either sees
        // the new child or the child sees the release.
        if self.is_released() {
            return Err(DiError::ScopeReleased(self.id));
        }
        let id = NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed);
        let child = Arc::new(Self::with_parent(id, Some(Arc::downgrade(self)), slot_count));
        children.push(child.clone());
        Ok(child)
    }

    /// Hands the cache cell of `slot` to `fetch`, which returns the cached
    /// instance or builds it.
    pub(crate) fn scoped(
        &self,
        slot: usize,
        fetch: impl FnOnce(&OnceCell<AnyArc>) -> DiResult<AnyArc>,
    ) -> DiResult<AnyArc> {
        // Recursive read: a factory running under this lock may resolve
        // another Scoped service from the same node.
        let slots = self.slots.read_recursive();
        let slots = slots.as_ref().ok_or(DiError::ScopeReleased(self.id))?;
        let cell = slots.get(slot).ok_or(DiError::ScopeReleased(self.id))?;
        fetch(cell)
    }

    pub(crate) fn push_disposer(&self, service: &'static str, disposer: Disposer) {
        {
            let mut bag = self.disposers.lock();
            if !self.is_released() {
                bag.push(service, disposer);
                return;
            }
        }

        tracing::warn!(scope = self.id, service, "dispose hook registered on a released scope, running it now");
        if let Err(error) = disposer() {
            tracing::warn!(scope = self.id, service, %error, "dispose hook failed");
        }
    }

    /// Releases children first, then runs this node's hooks in LIFO order
    /// and drops its Scoped instances. Only the first call does any work.
    pub(crate) fn release(&self) -> Vec<DisposalError> {
        let Some(failures) = self.teardown() else {
            return Vec::new();
        };

        if let Some(parent) = self.parent.as_ref().and_then(Weak::upgrade) {
            parent.children.lock().retain(|child| child.id != self.id);
        }

        tracing::debug!(scope = self.id, failures = failures.len(), "scope node released");
        failures
    }

    fn teardown(&self) -> Option<Vec<DisposalError>> {
        let children = {
            let mut children = self.children.lock();
            if self.released.swap(true, Ordering::AcqRel) {
                return None;
            }
            std::mem::take(&mut *children)
        };

        let mut failures = Vec::new();
        // The parent already holds the detached list, children skip the
        // retain step.
        for child in children.iter().rev() {
            failures.extend(child.teardown().unwrap_or_default());
        }

        let bag = std::mem::take(&mut *self.disposers.lock());
        failures.extend(bag.run_all_reverse());

        let slots = self.slots.write().take();
        drop(slots);
        Some(failures)
    }

    pub(crate) fn has_disposers(&self) -> bool {
        !self.disposers.lock().is_empty()
    }

    pub(crate) fn disposer_count(&self) -> usize {
        self.disposers.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn child_count(&self) -> usize {
        self.children.lock().len()
    }
}

/// Scope backend of [`ServiceProvider`].
pub(crate) struct ServiceScope {
    pub(crate) provider: ServiceProvider,
    pub(crate) node: Arc<ScopeNode>,
}

impl ServiceScope {
    pub(crate) fn new(provider: ServiceProvider, node: Arc<ScopeNode>) -> Self {
        Self { provider, node }
    }
}

impl ResolverCore for ServiceScope {
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        self.provider.resolve_in(&self.node, self, key)
    }

    fn resolve_all_any(&self, key: &Key) -> DiResult<Vec<AnyArc>> {
        self.provider.resolve_all_in(&self.node, self, key)
    }

    fn create_scope(&self) -> DiResult<ResolverScope> {
        self.provider.scope_under(&self.node)
    }

    fn push_disposer(&self, service: &'static str, disposer: Disposer) {
        self.node.push_disposer(service, disposer);
    }
}

impl ScopeBackend for ServiceScope {
    fn id(&self) -> u64 {
        self.node.id
    }

    fn resolver(&self) -> &dyn ResolverCore {
        self
    }

    fn release(&self) -> Vec<DisposalError> {
        if self.node.is_released() {
            return Vec::new();
        }
        let failures = self.node.release();
        self.provider.observers().scope_released(self.node.id, failures.len());
        failures
    }

    fn is_released(&self) -> bool {
        self.node.is_released()
    }
}
