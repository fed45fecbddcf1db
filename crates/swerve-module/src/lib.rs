//! Control core of a single swerve module.
//!
//! A [`SwerveModule`] owns one drive motor, one steering motor and one absolute angle
//! sensor. Each control cycle, [`SwerveModule::set_desired_state`] optimizes the requested
//! state against the present heading, turns the speed into a drive voltage and unwraps the
//! heading into a continuous reference for the steering motor's position loop.
//! [`SwerveModule::synchronize`] re-seeds the steering encoder from the absolute sensor.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod module;
pub mod telemetry;

pub use config::ModuleConfig;
pub use error::ModuleError;
pub use module::SwerveModule;
pub use telemetry::{NullTelemetry, TelemetrySink};
