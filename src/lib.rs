//! Testlab add-on server library.
//!
//! Fetches JUnit artifacts of a build from object storage, parses them,
//! merges device-testing outcomes into the totals and reports step verdicts
//! to the CI host.

pub mod api;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
