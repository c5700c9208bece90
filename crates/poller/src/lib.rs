#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::uninlined_format_args)]

//! # Poller
//!
//! Polls the National Weather Service active-alert feed, correlates updates
//! to the same hazard into one alert thread, matches threads against
//! SAME-code subscriptions, synthesizes and caches one spoken announcement
//! per (hazard code, thread), and pages each subscribed extension at most
//! once per thread.
//!
//! One invocation runs one poll cycle to completion; scheduling is external
//! (cron or a systemd timer). All work within a cycle is sequential.
//!
//! ## Example
//!
//! ```rust,ignore
//! use poller::config::PollerConfig;
//! use poller::cycle::{run_cycle, CycleDeps};
//!
//! let config = PollerConfig::default();
//! let deps = CycleDeps::from_config(&config);
//! let report = run_cycle(&config, &deps).await;
//! ```

// Audio cache and synthesis/encoding backends
pub mod audio;

// Runtime configuration
pub mod config;

// Per-cycle orchestration
pub mod cycle;

// Error types
pub mod error;

// Alert feed client
pub mod feed;

// Persisted dedup ledger
pub mod ledger;

// Single-instance cycle lock
pub mod lock;

// Subscription matching
pub mod matcher;

// Subscription store
pub mod subs;

// Artifact retention sweep
pub mod sweep;

// Alert thread resolution
pub mod thread;

pub use error::PollerError;
