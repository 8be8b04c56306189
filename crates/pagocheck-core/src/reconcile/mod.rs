//! Comparison of detected receipt totals against order expectations.

mod engine;

pub use engine::{reconcile, Reconciler};
