//! Time-balance engine for PlayOps.
//!
//! Profiles hold a balance of hours that drains in real time, is topped up
//! by missions and question responses, and feeds an XP leaderboard.

pub mod api;
pub mod clock;
pub mod config;
pub mod contract;
pub mod domain;
pub mod gateways;
pub mod infra;
pub mod module;
pub mod scheduler;

pub use config::TimeEngineConfig;
pub use contract::{TimeEngineApi, TimeEngineError};
pub use module::TimeEngine;
