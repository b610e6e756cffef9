//! Internal implementation details.

pub(crate) mod circular;
pub(crate) mod dispose_bag;

pub(crate) use circular::{InitTracker, StackGuard};
pub(crate) use dispose_bag::DisposeBag;
pub use dispose_bag::Disposer;
