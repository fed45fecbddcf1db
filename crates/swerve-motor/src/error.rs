use thiserror::Error;

/// Failure reported by an actuator or sensor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HardwareError {
    /// The device did not answer or is not present on the bus.
    #[error("{device} is unavailable")]
    Unavailable { device: String },
    /// The device answered too late; its last value is stale.
    #[error("{device} timed out after {timeout_ms} ms")]
    Timeout { device: String, timeout_ms: u32 },
    /// The device refused a configuration or command.
    #[error("{device} rejected request: {reason}")]
    Rejected { device: String, reason: String },
}

impl HardwareError {
    /// Name of the device that produced the error.
    pub fn device(&self) -> &str {
        match self {
            HardwareError::Unavailable { device }
            | HardwareError::Timeout { device, .. }
            | HardwareError::Rejected { device, .. } => device,
        }
    }
}
