//! Disposal trait for resource cleanup.

use crate::error::BoxError;

/// Trait for synchronous resource disposal.
///
/// Implement this for services that need structured teardown (flushing
/// buffers, closing connections). Hooks registered with
/// [`Resolver::register_disposer`](crate::Resolver::register_disposer) run in
/// LIFO order when the owning scope is released.
///
/// A failing hook does not stop the others; the failure is reported in the
/// [`ReleaseError`](crate::ReleaseError) of the release.
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self) -> Result<(), BoxError>;
}
