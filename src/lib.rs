//! Minimal cross-platform threading and mutual-exclusion primitives, so that
//! application code need not talk to the OS threading interface directly.
//!
//! Two independent pieces:
//!
//! * [`sync`]: a non-reentrant [`Lock`](sync::Lock) backed by the platform's
//!   native mutex, with debug-build ownership checking.
//! * [`thread`]: native OS thread creation, joining, identity, and scheduling
//!   hints.

/// Useful synchronization primitives.
pub mod sync;

/// Native OS thread utilities.
pub mod thread;
