//! Static configuration of one swerve module.

use std::f64::consts::PI;

use serde::Deserialize;
use swerve_motor::{AbsoluteEncoderConfig, BootStrategy, ConversionFactors, PidGains, SensorRange};

use crate::error::ModuleError;

/// Highest device id on the motor controller bus.
const MAX_DEVICE_ID: u8 = 62;

/// Static description of one swerve module.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModuleConfig {
    /// Human readable name, used in logs.
    #[serde(default = "default_name")]
    pub name: String,
    /// Bus id of the drive motor controller.
    pub drive_motor_id: u8,
    /// Bus id of the steering motor controller.
    pub steering_motor_id: u8,
    /// Bus id of the absolute angle sensor; also names the telemetry channels.
    pub absolute_encoder_id: u8,
    /// Magnet offset programmed into the absolute sensor so that straight ahead reads zero.
    #[serde(default)]
    pub magnet_offset_degrees: f64,
    /// Whether the absolute sensor counts up when the wheel turns clockwise.
    #[serde(default = "default_clockwise_positive")]
    pub clockwise_positive: bool,
    /// Speed at which the drive motor receives the full nominal voltage.
    pub max_speed_mps: f64,
    /// Supply voltage the drive command is scaled to. Not measured at runtime.
    #[serde(default = "default_nominal_voltage")]
    pub nominal_voltage: f64,
    /// Wheel diameter in metres.
    pub wheel_diameter_m: f64,
    /// Wheel rotations per drive motor rotation.
    pub drive_reduction: f64,
    /// Degrees of wheel heading per steering motor rotation.
    pub steering_degrees_per_rotation: f64,
    /// Gains of the steering motor's on-board position loop.
    #[serde(default)]
    pub steering_pid: PidGains,
    /// Update period requested from the absolute sensor.
    #[serde(default = "default_absolute_encoder_period_ms")]
    pub absolute_encoder_period_ms: u16,
}

fn default_name() -> String {
    "module".to_string()
}

fn default_clockwise_positive() -> bool {
    true
}

fn default_nominal_voltage() -> f64 {
    12.0
}

fn default_absolute_encoder_period_ms() -> u16 {
    100
}

fn require_positive(value: f64, field: &str) -> Result<(), ModuleError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ModuleError::configuration(format!(
            "{field} must be a positive number, got {value}"
        )))
    }
}

impl ModuleConfig {
    /// Check the configuration before any hardware is touched.
    ///
    /// # Errors
    ///
    /// Returns `Err(ModuleError::Configuration)` for out-of-range or clashing device ids, a
    /// magnet offset outside `[-180, 180]`, non-positive physical constants, or an empty
    /// steering output range.
    pub fn validate(&self) -> Result<(), ModuleError> {
        for (id, field) in [
            (self.drive_motor_id, "drive_motor_id"),
            (self.steering_motor_id, "steering_motor_id"),
            (self.absolute_encoder_id, "absolute_encoder_id"),
        ] {
            if id > MAX_DEVICE_ID {
                return Err(ModuleError::configuration(format!(
                    "{field} {id} exceeds {MAX_DEVICE_ID}"
                )));
            }
        }
        if self.drive_motor_id == self.steering_motor_id {
            return Err(ModuleError::configuration(format!(
                "drive and steering motors share id {}",
                self.drive_motor_id
            )));
        }
        if !self.magnet_offset_degrees.is_finite()
            || !(-180.0..=180.0).contains(&self.magnet_offset_degrees)
        {
            return Err(ModuleError::configuration(format!(
                "magnet_offset_degrees {} outside [-180, 180]",
                self.magnet_offset_degrees
            )));
        }

        require_positive(self.max_speed_mps, "max_speed_mps")?;
        require_positive(self.nominal_voltage, "nominal_voltage")?;
        require_positive(self.wheel_diameter_m, "wheel_diameter_m")?;
        require_positive(self.drive_reduction, "drive_reduction")?;
        require_positive(self.steering_degrees_per_rotation, "steering_degrees_per_rotation")?;

        if self.steering_pid.output_min >= self.steering_pid.output_max {
            return Err(ModuleError::configuration("steering PID output range is empty"));
        }
        Ok(())
    }

    /// Drive encoder conversion: metres of wheel travel per motor rotation.
    pub fn drive_conversion(&self) -> ConversionFactors {
        ConversionFactors::per_rotation(PI * self.wheel_diameter_m * self.drive_reduction)
    }

    /// Steering encoder conversion: radians of wheel heading per motor rotation.
    pub fn steering_conversion(&self) -> ConversionFactors {
        ConversionFactors::per_rotation(self.steering_degrees_per_rotation.to_radians())
    }

    /// Absolute sensor setup: signed range, boot to absolute, this module's offset.
    pub fn absolute_encoder_config(&self) -> AbsoluteEncoderConfig {
        AbsoluteEncoderConfig {
            range: SensorRange::Signed,
            boot: BootStrategy::AbsolutePosition,
            magnet_offset_degrees: self.magnet_offset_degrees,
            clockwise_positive: self.clockwise_positive,
            update_period_ms: self.absolute_encoder_period_ms,
        }
    }
}
