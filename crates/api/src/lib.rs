//! HTTP surface of the bounce relay.
//!
//! Accepts SNS deliveries of SES bounce and complaint notifications on any
//! path and hands bounced recipients to the per-sender queues in
//! [`bounce_engine::registry::SenderRegistry`].

pub mod confirm;
pub mod middleware;
pub mod routes;
pub mod state;
