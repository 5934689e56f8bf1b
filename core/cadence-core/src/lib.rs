//! # cadence-core
//!
//! Core library for Cadence, providing shared progress logic for all clients
//! (CLI status view, popup panel).
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. Clients can wrap with async if needed.
//! - **Daemon-backed**: The daemon owns all persisted state; this crate only reads
//!   and submits over its socket.
//! - **Single source of truth**: Completion math and band colors live here so every
//!   client renders the same numbers.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cadence_core::{DaemonClient, Panel};
//!
//! let client = DaemonClient::from_env()?;
//! let snapshot = client.fetch()?;
//! println!("{}", Panel::build(&snapshot).render());
//! ```

// Public modules
pub mod client;
pub mod error;
pub mod panel;
pub mod progress;

// Re-export commonly used items at crate root
pub use client::{default_socket_path, DaemonClient, SOCKET_ENV};
pub use error::{CoreError, Result};
pub use panel::{MetricRow, Panel};
pub use progress::{
    daily_completion, goal_ratio, metric_percent, weekly_completion, ProgressBand, DAILY_METRICS,
};
