use serde::{Deserialize, Serialize};

use crate::error::HardwareError;
use crate::traits::encoder::RelativeEncoder;

/// Closed-loop mode of a motor controller reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// Track a position setpoint in converted position units.
    Position,
}

/// Gains of a motor controller's on-board PID loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub p: f64,
    pub i: f64,
    pub d: f64,
    /// Lower bound of the normalized output, typically `-1.0`.
    pub output_min: f64,
    /// Upper bound of the normalized output, typically `1.0`.
    pub output_max: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        PidGains {
            p: 1.0,
            i: 0.0,
            d: 0.1,
            output_min: -1.0,
            output_max: 1.0,
        }
    }
}

/// Motor turning the wheel, commanded open loop by voltage.
pub trait DriveMotor: RelativeEncoder {
    /// Apply `volts` to the motor. Out-of-range values saturate in the controller.
    fn set_voltage(&mut self, volts: f64) -> Result<(), HardwareError>;
}

/// Motor rotating the wheel's heading, running a closed loop on its own controller.
pub trait SteeringMotor: RelativeEncoder {
    /// Set the controller's setpoint.
    fn set_reference(&mut self, value: f64, mode: ControlMode) -> Result<(), HardwareError>;

    /// Configure the on-board PID loop.
    fn set_pid(&mut self, gains: PidGains) -> Result<(), HardwareError>;
}
