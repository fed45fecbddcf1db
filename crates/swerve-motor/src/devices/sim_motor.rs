use std::sync::Arc;

use parking_lot::Mutex;

use super::{SimFault, check_fault};
use crate::error::HardwareError;
use crate::traits::encoder::{ConversionFactors, RelativeEncoder};
use crate::traits::motor::{ControlMode, DriveMotor, PidGains, SteeringMotor};

/// Free speed of a NEO brushless motor.
const DEFAULT_FREE_SPEED_RPM: f64 = 5676.0;

/// Native encoder state shared by both simulated motors.
#[derive(Debug)]
struct EncoderState {
    name: String,
    rotations: f64,
    rpm: f64,
    factors: ConversionFactors,
    fault: SimFault,
}

impl EncoderState {
    fn new(name: String) -> Self {
        EncoderState {
            name,
            rotations: 0.0,
            rpm: 0.0,
            factors: ConversionFactors::default(),
            fault: SimFault::Healthy,
        }
    }

    fn check(&self) -> Result<(), HardwareError> {
        check_fault(self.fault, &self.name)
    }

    fn position(&self) -> Result<f64, HardwareError> {
        self.check()?;
        Ok(self.rotations * self.factors.position)
    }

    fn velocity(&self) -> Result<f64, HardwareError> {
        self.check()?;
        Ok(self.rpm * self.factors.velocity)
    }

    fn set_position(&mut self, position: f64) -> Result<(), HardwareError> {
        self.check()?;
        self.rotations = position / self.factors.position;
        Ok(())
    }

    fn set_factors(&mut self, factors: ConversionFactors) -> Result<(), HardwareError> {
        self.check()?;
        if factors.position == 0.0 || !factors.position.is_finite() || !factors.velocity.is_finite() {
            return Err(HardwareError::Rejected {
                device: self.name.clone(),
                reason: format!("invalid conversion factors {factors:?}"),
            });
        }
        self.factors = factors;
        Ok(())
    }

    fn integrate(&mut self, rpm: f64, dt: f64) {
        self.rpm = rpm;
        self.rotations += rpm / 60.0 * dt;
    }
}

#[derive(Debug)]
struct DriveInner {
    encoder: EncoderState,
    volts: f64,
    nominal_voltage: f64,
    free_speed_rpm: f64,
}

/// Simulated voltage-driven wheel motor.
///
/// Speed follows the applied voltage instantly: `rpm = volts / nominal * free_speed`, with
/// the voltage saturating at the nominal supply.
#[derive(Debug, Clone)]
pub struct SimDriveMotor {
    inner: Arc<Mutex<DriveInner>>,
}

impl SimDriveMotor {
    pub fn new(name: impl Into<String>) -> Self {
        SimDriveMotor {
            inner: Arc::new(Mutex::new(DriveInner {
                encoder: EncoderState::new(name.into()),
                volts: 0.0,
                nominal_voltage: 12.0,
                free_speed_rpm: DEFAULT_FREE_SPEED_RPM,
            })),
        }
    }

    /// Voltage last commanded through [`DriveMotor::set_voltage`], before saturation.
    pub fn applied_voltage(&self) -> f64 {
        self.inner.lock().volts
    }

    pub fn set_available(&self, available: bool) {
        self.set_fault(SimFault::from_available(available));
    }

    /// Make every following read and command fail as `fault` describes.
    pub fn set_fault(&self, fault: SimFault) {
        self.inner.lock().encoder.fault = fault;
    }

    /// Advance the motor by `dt` seconds.
    pub fn step(&self, dt: f64) {
        let mut inner = self.inner.lock();
        let nominal = inner.nominal_voltage;
        let volts = inner.volts.clamp(-nominal, nominal);
        let rpm = volts / nominal * inner.free_speed_rpm;
        inner.encoder.integrate(rpm, dt);
    }
}

impl RelativeEncoder for SimDriveMotor {
    fn position(&self) -> Result<f64, HardwareError> {
        self.inner.lock().encoder.position()
    }

    fn velocity(&self) -> Result<f64, HardwareError> {
        self.inner.lock().encoder.velocity()
    }

    fn set_position(&mut self, position: f64) -> Result<(), HardwareError> {
        self.inner.lock().encoder.set_position(position)
    }

    fn set_conversion_factors(&mut self, factors: ConversionFactors) -> Result<(), HardwareError> {
        self.inner.lock().encoder.set_factors(factors)
    }
}

impl DriveMotor for SimDriveMotor {
    fn set_voltage(&mut self, volts: f64) -> Result<(), HardwareError> {
        let mut inner = self.inner.lock();
        inner.encoder.check()?;
        inner.volts = volts;
        Ok(())
    }
}

#[derive(Debug)]
struct SteeringInner {
    encoder: EncoderState,
    reference: Option<f64>,
    gains: PidGains,
    free_speed_rpm: f64,
}

/// Simulated steering motor running an on-board position loop.
///
/// The loop works in converted units, like a real controller with conversion factors set.
/// Only the proportional gain moves the simulated shaft; the clamped output is scaled to the
/// free speed.
#[derive(Debug, Clone)]
pub struct SimSteeringMotor {
    inner: Arc<Mutex<SteeringInner>>,
}

impl SimSteeringMotor {
    pub fn new(name: impl Into<String>) -> Self {
        SimSteeringMotor {
            inner: Arc::new(Mutex::new(SteeringInner {
                encoder: EncoderState::new(name.into()),
                reference: None,
                gains: PidGains::default(),
                free_speed_rpm: DEFAULT_FREE_SPEED_RPM,
            })),
        }
    }

    /// Position setpoint last commanded, in converted units.
    pub fn reference(&self) -> Option<f64> {
        self.inner.lock().reference
    }

    /// Gains last applied through [`SteeringMotor::set_pid`].
    pub fn gains(&self) -> PidGains {
        self.inner.lock().gains
    }

    pub fn set_available(&self, available: bool) {
        self.set_fault(SimFault::from_available(available));
    }

    /// Make every following read and command fail as `fault` describes.
    pub fn set_fault(&self, fault: SimFault) {
        self.inner.lock().encoder.fault = fault;
    }

    /// Move the shaft without going through the controller, e.g. a wheel pushed by hand
    /// or encoder drift. `delta` is in converted units.
    pub fn nudge(&self, delta: f64) {
        let mut inner = self.inner.lock();
        let factor = inner.encoder.factors.position;
        inner.encoder.rotations += delta / factor;
    }

    /// Advance the position loop by `dt` seconds.
    pub fn step(&self, dt: f64) {
        let mut inner = self.inner.lock();
        let Some(reference) = inner.reference else {
            inner.encoder.integrate(0.0, dt);
            return;
        };

        let position = inner.encoder.rotations * inner.encoder.factors.position;
        let gains = inner.gains;
        let output = (gains.p * (reference - position)).clamp(gains.output_min, gains.output_max);
        let rpm = output * inner.free_speed_rpm;
        inner.encoder.integrate(rpm, dt);
    }
}

impl RelativeEncoder for SimSteeringMotor {
    fn position(&self) -> Result<f64, HardwareError> {
        self.inner.lock().encoder.position()
    }

    fn velocity(&self) -> Result<f64, HardwareError> {
        self.inner.lock().encoder.velocity()
    }

    fn set_position(&mut self, position: f64) -> Result<(), HardwareError> {
        self.inner.lock().encoder.set_position(position)
    }

    fn set_conversion_factors(&mut self, factors: ConversionFactors) -> Result<(), HardwareError> {
        self.inner.lock().encoder.set_factors(factors)
    }
}

impl SteeringMotor for SimSteeringMotor {
    fn set_reference(&mut self, value: f64, mode: ControlMode) -> Result<(), HardwareError> {
        let mut inner = self.inner.lock();
        inner.encoder.check()?;
        match mode {
            ControlMode::Position => inner.reference = Some(value),
        }
        Ok(())
    }

    fn set_pid(&mut self, gains: PidGains) -> Result<(), HardwareError> {
        let mut inner = self.inner.lock();
        inner.encoder.check()?;
        if gains.output_min >= gains.output_max {
            return Err(HardwareError::Rejected {
                device: inner.encoder.name.clone(),
                reason: "empty output range".to_string(),
            });
        }
        inner.gains = gains;
        Ok(())
    }
}
