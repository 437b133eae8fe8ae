//! Cooperative cancellation for plan runs.
//!
//! A single [`CancellationToken`] is shared by every executor of a run. It is
//! checked at launch boundaries and raced against blocking joins.

mod token;

pub use token::CancellationToken;
