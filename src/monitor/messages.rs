//! Command messages for the fleet monitor actor.

use tokio::sync::oneshot;

use crate::{Environment, StatusRecord};

/// Commands that can be sent to the fleet monitor
#[derive(Debug)]
pub enum MonitorCommand {
    /// Poll one named host immediately, outside the periodic cycle.
    ///
    /// The fresh record is persisted and returned to the caller.
    CheckHost {
        environment: Environment,
        host_id: String,
        respond_to: oneshot::Sender<anyhow::Result<StatusRecord>>,
    },

    /// Poll every host in the environment immediately.
    ///
    /// Partial progress is persisted as hosts complete, so store consumers
    /// see the check advancing instead of one all-or-nothing update.
    /// Responds with the number of hosts checked.
    CheckFleet {
        environment: Environment,
        respond_to: oneshot::Sender<anyhow::Result<usize>>,
    },

    /// Gracefully shut down the monitor
    ///
    /// Any in-flight cycle finishes first; no new cycle starts.
    Shutdown,
}
