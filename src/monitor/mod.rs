//! The fleet scheduler.
//!
//! One actor owns the whole polling lifecycle and is driven two ways: a
//! periodic cycle per environment, and on-demand checks arriving as
//! commands. Both paths share the same bounded worker pool and the same
//! persistence discipline.
//!
//! ```text
//! interval tick ──┐
//!                 ▼
//!          ┌─────────────┐   spawn (bounded)   ┌────────────┐
//!          │ FleetMonitor│ ───────────────────▶ │ poll_host  │ × N
//!          │   Actor     │ ◀─────────────────── │ (gateway)  │
//!          └─────────────┘   completion order   └────────────┘
//!                 ▲ │
//!     commands ───┘ └──▶ reload → merge → save (status store)
//! ```
//!
//! Failure containment: a host failure becomes its record, an environment
//! without credentials is skipped for the cycle, and a failed cycle is logged
//! and retried after a fixed backoff. Nothing in here terminates the process.

pub mod messages;
pub mod scheduler;

pub use messages::MonitorCommand;
pub use scheduler::{FleetMonitorActor, MonitorHandle};
