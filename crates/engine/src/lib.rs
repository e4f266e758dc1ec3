//! Per-sender remediation queues.
//!
//! The [`registry::SenderRegistry`] owns one bounded queue per configured
//! sender; each queue is drained by a single [`worker`] task that hands
//! addresses to a [`remediation::Remediator`]. All workers share one
//! cancellation token and stop together.

pub mod registry;
pub mod remediation;
pub mod worker;
