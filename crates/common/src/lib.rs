//! Shared building blocks for the bounce relay: configuration, errors,
//! database pools and the SNS/SES wire types.

pub mod config;
pub mod db;
pub mod error;
pub mod types;
