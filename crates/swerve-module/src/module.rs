//! The swerve module core.

use std::sync::Arc;

use swerve_kinematics::{ModulePosition, ModuleState, unwrap_reference};
use swerve_motor::{AbsoluteEncoder, ControlMode, DriveMotor, SteeringMotor};
use tracing::{debug, info, trace, warn};

use crate::config::ModuleConfig;
use crate::error::ModuleError;
use crate::telemetry::TelemetrySink;

/// One steerable, driven wheel.
///
/// The module exclusively owns its drive motor `D`, steering motor `S` and absolute sensor
/// `A`; they are never handed out. Commands take `&mut self` and readbacks `&self`, so a
/// single owner can never interleave [`synchronize`](Self::synchronize) with
/// [`set_desired_state`](Self::set_desired_state).
pub struct SwerveModule<D, S, A> {
    config: ModuleConfig,
    drive: D,
    steering: S,
    absolute: A,
    telemetry: Arc<dyn TelemetrySink>,
    absolute_channel: String,
    reference_channel: String,
    /// Unbounded steering setpoint sent on the last successful command.
    reference: Option<f64>,
}

impl<D, S, A> SwerveModule<D, S, A>
where
    D: DriveMotor,
    S: SteeringMotor,
    A: AbsoluteEncoder,
{
    /// Configure the hardware and seed the steering encoder from the absolute sensor.
    ///
    /// # Errors
    ///
    /// Returns `Err(ModuleError::Configuration)` if the configuration is invalid or a device
    /// refuses it, and the error of [`synchronize`](Self::synchronize) if the initial
    /// synchronization fails. A module that fails here must not be driven.
    pub fn new(
        config: ModuleConfig,
        mut drive: D,
        mut steering: S,
        mut absolute: A,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Result<Self, ModuleError> {
        config.validate()?;

        absolute
            .configure(config.absolute_encoder_config())
            .map_err(ModuleError::rejected)?;
        drive
            .set_conversion_factors(config.drive_conversion())
            .map_err(ModuleError::rejected)?;
        steering
            .set_conversion_factors(config.steering_conversion())
            .map_err(ModuleError::rejected)?;
        steering.set_pid(config.steering_pid).map_err(ModuleError::rejected)?;

        let id = config.absolute_encoder_id;
        let mut module = SwerveModule {
            config,
            drive,
            steering,
            absolute,
            telemetry,
            absolute_channel: format!("module/{id}/measured_abs_rotation"),
            reference_channel: format!("module/{id}/reference"),
            reference: None,
        };
        module.synchronize()?;

        info!(
            module = %module.config.name,
            drive = module.config.drive_motor_id,
            steering = module.config.steering_motor_id,
            encoder = id,
            "Swerve module initialized"
        );
        Ok(module)
    }

    /// Configuration the module was built from.
    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    /// Unbounded steering setpoint from the last command, if any.
    pub fn reference(&self) -> Option<f64> {
        self.reference
    }

    fn steering_angle(&self) -> Result<f64, ModuleError> {
        self.steering.position().map_err(ModuleError::SensorUnavailable)
    }

    /// Measured wheel speed and heading.
    pub fn state(&self) -> Result<ModuleState, ModuleError> {
        let speed = self.drive.velocity().map_err(ModuleError::SensorUnavailable)?;
        Ok(ModuleState::new(speed, self.steering_angle()?))
    }

    /// Cumulative wheel distance and heading, for odometry.
    pub fn position(&self) -> Result<ModulePosition, ModuleError> {
        let distance = self.drive.position().map_err(ModuleError::SensorUnavailable)?;
        Ok(ModulePosition::new(distance, self.steering_angle()?))
    }

    /// Heading reported by the absolute sensor, in radians.
    pub fn absolute_angle(&self) -> Result<f64, ModuleError> {
        let degrees = self
            .absolute
            .absolute_position()
            .map_err(ModuleError::SensorUnavailable)?;
        Ok(degrees.to_radians())
    }

    /// `desired` rewritten to need at most a quarter turn of steering from the present heading.
    pub fn optimize(&self, desired: ModuleState) -> Result<ModuleState, ModuleError> {
        let current = self.steering_angle()?;
        Ok(ModuleState::new(desired.speed, desired.angle).optimize(current))
    }

    /// Command the module for one control cycle.
    ///
    /// The drive voltage is `speed / max_speed * nominal_voltage` and is not clamped: callers
    /// keep `|speed| <= max_speed_mps`, beyond that the motor controller saturates.
    ///
    /// # Errors
    ///
    /// Returns `Err(ModuleError::SensorUnavailable)` without commanding anything if the
    /// steering encoder cannot be read, and `Err(ModuleError::Actuator)` if a motor refuses
    /// its command. The steering reference is sent before the drive voltage; if it is
    /// refused the drive is stopped, so the wheel never drives a heading it was not sent.
    pub fn set_desired_state(&mut self, desired: ModuleState) -> Result<(), ModuleError> {
        let current = self.steering_angle()?;
        let state = ModuleState::new(desired.speed, desired.angle).optimize(current);

        let reference = unwrap_reference(current, state.angle);
        if let Err(err) = self.steering.set_reference(reference, ControlMode::Position) {
            if let Err(stop_err) = self.drive.set_voltage(0.0) {
                warn!(module = %self.config.name, error = %stop_err, "Failed to stop drive");
            }
            return Err(ModuleError::Actuator(err));
        }
        self.reference = Some(reference);

        let volts = state.speed / self.config.max_speed_mps * self.config.nominal_voltage;
        self.drive.set_voltage(volts).map_err(ModuleError::Actuator)?;

        trace!(
            module = %self.config.name,
            %desired,
            optimized = %state,
            current,
            reference,
            volts,
            "Module commanded"
        );
        Ok(())
    }

    /// Overwrite the steering encoder's position with the absolute sensor's reading.
    ///
    /// Any drift accumulated by the steering encoder is gone once this returns; readbacks
    /// reflect the new baseline immediately.
    ///
    /// # Errors
    ///
    /// Returns `Err(ModuleError::SensorUnavailable)` if the absolute sensor cannot be read,
    /// leaving the baseline untouched, and `Err(ModuleError::Actuator)` if the steering
    /// encoder refuses the new position.
    pub fn synchronize(&mut self) -> Result<(), ModuleError> {
        let degrees = self
            .absolute
            .absolute_position()
            .map_err(ModuleError::SensorUnavailable)?;
        info!(
            module = %self.config.name,
            encoder = self.config.absolute_encoder_id,
            degrees,
            "Synchronizing steering encoder to absolute sensor"
        );
        self.steering
            .set_position(degrees.to_radians())
            .map_err(ModuleError::Actuator)
    }

    /// Zero the drive encoder's cumulative distance.
    ///
    /// # Errors
    ///
    /// Returns `Err(ModuleError::Actuator)` if the drive encoder refuses the write.
    pub fn reset_encoders(&mut self) -> Result<(), ModuleError> {
        debug!(module = %self.config.name, "Resetting drive distance");
        self.drive
            .set_position(0.0)
            .map_err(ModuleError::Actuator)
    }

    /// Push the measured absolute heading and the last steering setpoint to the telemetry sink.
    ///
    /// # Errors
    ///
    /// Returns `Err(ModuleError::SensorUnavailable)` if the absolute sensor cannot be read;
    /// nothing is recorded then.
    pub fn publish_telemetry(&self) -> Result<(), ModuleError> {
        let angle = self.absolute_angle()?;
        self.telemetry.record(&self.absolute_channel, angle);
        if let Some(reference) = self.reference {
            self.telemetry.record(&self.reference_channel, reference);
        }
        Ok(())
    }
}
