//! Internal disposal bag for managing cleanup hooks.

use crate::error::{BoxError, DisposalError};

/// Teardown hook registered by a factory.
pub type Disposer = Box<dyn FnOnce() -> Result<(), BoxError> + Send>;

/// Container for disposal hooks with LIFO execution order.
#[derive(Default)]
pub(crate) struct DisposeBag {
    hooks: Vec<(&'static str, Disposer)>,
}

impl DisposeBag {
    pub(crate) fn push(&mut self, service: &'static str, f: Disposer) {
        self.hooks.push((service, f));
    }

    /// Execute every hook in reverse registration order, collecting failures.
    pub(crate) fn run_all_reverse(mut self) -> Vec<DisposalError> {
        let mut failures = Vec::new();
        while let Some((service, f)) = self.hooks.pop() {
            if let Err(source) = (f)() {
                failures.push(DisposalError { service, source });
            }
        }
        failures
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }
}
