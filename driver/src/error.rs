/// Defines the errors a driver can hand back for a single action.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum DriverError {
    /// The device refused the action
    #[error("device '{device}' rejected the action: {reason}")]
    Rejected {
        /// The leaf device the action was addressed to
        device: String,
        /// Why the driver refused it
        reason: String,
    },
    /// The driver exists but cannot service requests right now
    #[error("driver unavailable: {0}")]
    Unavailable(String),
    /// The driver side of a channel went away
    #[error("driver disconnected")]
    Disconnected,
}
