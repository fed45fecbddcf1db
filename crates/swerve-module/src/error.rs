//! Errors surfaced by the module core.

use swerve_motor::HardwareError;
use thiserror::Error;

/// Errors surfaced by a [`SwerveModule`](crate::SwerveModule).
///
/// Nothing is retried or substituted here: a failed read is returned to the caller, which
/// decides whether to skip the control cycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModuleError {
    /// A sensor read failed or returned a stale value.
    #[error("sensor unavailable: {0}")]
    SensorUnavailable(#[source] HardwareError),
    /// A motor or encoder refused a command or a position write.
    #[error("actuator command failed: {0}")]
    Actuator(#[source] HardwareError),
    /// The module cannot be built safely from this configuration.
    #[error("invalid module configuration: {reason}")]
    Configuration {
        /// What was wrong with the configuration.
        reason: String,
        /// Device refusal behind the failure, if a device refused it.
        #[source]
        source: Option<HardwareError>,
    },
}

impl ModuleError {
    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        ModuleError::Configuration {
            reason: reason.into(),
            source: None,
        }
    }

    /// A device refused the configuration pushed to it at construction.
    pub(crate) fn rejected(err: HardwareError) -> Self {
        ModuleError::Configuration {
            reason: format!("{} refused its configuration", err.device()),
            source: Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_rejected_keeps_device_error_as_source() {
        let err = ModuleError::rejected(HardwareError::Rejected {
            device: "encoder 9".to_string(),
            reason: "magnet offset 270 out of range".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "invalid module configuration: encoder 9 refused its configuration"
        );
        let source = err.source().unwrap();
        assert_eq!(
            source.to_string(),
            "encoder 9 rejected request: magnet offset 270 out of range"
        );
    }

    #[test]
    fn test_validation_error_has_no_source() {
        let err = ModuleError::configuration("steering PID output range is empty");
        assert!(err.source().is_none());
    }
}
