use serde::{Deserialize, Serialize};

use crate::error::HardwareError;

/// Scale factors a motor controller applies to its native encoder units.
///
/// Native units are motor rotations for position and RPM for velocity; the factors map
/// them to the mechanism's units (metres, radians, ...).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionFactors {
    /// Mechanism units per motor rotation.
    pub position: f64,
    /// Mechanism units per second, per RPM.
    pub velocity: f64,
}

impl ConversionFactors {
    /// Factors for a mechanism moving `per_rotation` units per motor rotation.
    /// Velocity is reported per second, so the factor is divided by 60.
    pub fn per_rotation(per_rotation: f64) -> Self {
        ConversionFactors {
            position: per_rotation,
            velocity: per_rotation / 60.0,
        }
    }
}

impl Default for ConversionFactors {
    fn default() -> Self {
        ConversionFactors::per_rotation(1.0)
    }
}

/// An incremental encoder integrated in a motor controller.
///
/// Reads must be consistent single-value reads so they can be issued from a thread other
/// than the one commanding the motor.
pub trait RelativeEncoder {
    /// Accumulated position in converted units. Unbounded.
    fn position(&self) -> Result<f64, HardwareError>;

    /// Velocity in converted units per second.
    fn velocity(&self) -> Result<f64, HardwareError>;

    /// Overwrite the accumulated position, in converted units.
    fn set_position(&mut self, position: f64) -> Result<(), HardwareError>;

    /// Configure the native-to-mechanism conversion. Set once at start-up.
    fn set_conversion_factors(&mut self, factors: ConversionFactors) -> Result<(), HardwareError>;
}

/// Reporting range of an absolute sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SensorRange {
    /// `[-180, 180)` degrees.
    #[default]
    Signed,
    /// `[0, 360)` degrees.
    Unsigned,
}

/// What an absolute sensor reports right after power-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BootStrategy {
    /// Start at the magnet's absolute position.
    #[default]
    AbsolutePosition,
    /// Start at zero.
    Zero,
}

/// One-time configuration of an absolute angle sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbsoluteEncoderConfig {
    pub range: SensorRange,
    pub boot: BootStrategy,
    /// Added to the raw magnet angle so that "straight ahead" reads zero.
    pub magnet_offset_degrees: f64,
    pub clockwise_positive: bool,
    /// Period of the sensor data frame.
    pub update_period_ms: u16,
}

impl Default for AbsoluteEncoderConfig {
    fn default() -> Self {
        AbsoluteEncoderConfig {
            range: SensorRange::Signed,
            boot: BootStrategy::AbsolutePosition,
            magnet_offset_degrees: 0.0,
            clockwise_positive: true,
            update_period_ms: 100,
        }
    }
}

/// A sensor reporting the mechanism's angle within one turn, independent of power cycles.
pub trait AbsoluteEncoder {
    /// Apply the sensor configuration. Called once before any read.
    fn configure(&mut self, config: AbsoluteEncoderConfig) -> Result<(), HardwareError>;

    /// Absolute angle in degrees, within the configured [`SensorRange`].
    fn absolute_position(&self) -> Result<f64, HardwareError>;
}
