//! Hardware collaborators of a swerve module.
//!
//! The traits in [`traits`] are the only surface the module core talks to: a drive motor
//! taking voltage commands, a steering motor running its own closed position loop, and an
//! absolute angle sensor. [`devices`] provides simulated implementations for tests and for
//! running the module without a robot.

pub mod devices;
pub mod error;
pub mod traits;

pub use devices::{SimAbsoluteEncoder, SimDriveMotor, SimFault, SimSteeringMotor};
pub use error::HardwareError;
pub use traits::encoder::{
    AbsoluteEncoder, AbsoluteEncoderConfig, BootStrategy, ConversionFactors, RelativeEncoder,
    SensorRange,
};
pub use traits::motor::{ControlMode, DriveMotor, PidGains, SteeringMotor};
