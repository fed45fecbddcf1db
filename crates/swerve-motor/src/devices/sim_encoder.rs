use std::sync::Arc;

use parking_lot::Mutex;

use super::{SimFault, check_fault};
use crate::error::HardwareError;
use crate::traits::encoder::{AbsoluteEncoder, AbsoluteEncoderConfig, SensorRange};

#[derive(Debug)]
struct Inner {
    name: String,
    /// Raw magnet angle in degrees, before offset and direction.
    magnet_degrees: f64,
    config: AbsoluteEncoderConfig,
    fault: SimFault,
}

/// Simulated magnetic absolute encoder.
#[derive(Debug, Clone)]
pub struct SimAbsoluteEncoder {
    inner: Arc<Mutex<Inner>>,
}

impl SimAbsoluteEncoder {
    pub fn new(name: impl Into<String>) -> Self {
        SimAbsoluteEncoder {
            inner: Arc::new(Mutex::new(Inner {
                name: name.into(),
                magnet_degrees: 0.0,
                config: AbsoluteEncoderConfig::default(),
                fault: SimFault::Healthy,
            })),
        }
    }

    /// Move the magnet to `degrees` (raw, before the configured offset).
    pub fn set_magnet_degrees(&self, degrees: f64) {
        self.inner.lock().magnet_degrees = degrees;
    }

    /// Simulate the sensor dropping off the bus (`false`) or coming back.
    pub fn set_available(&self, available: bool) {
        self.set_fault(SimFault::from_available(available));
    }

    /// Make every following call fail as `fault` describes, until cleared with
    /// [`SimFault::Healthy`].
    pub fn set_fault(&self, fault: SimFault) {
        self.inner.lock().fault = fault;
    }

    /// Configuration last applied through [`AbsoluteEncoder::configure`].
    pub fn config(&self) -> AbsoluteEncoderConfig {
        self.inner.lock().config
    }
}

fn wrap_degrees(degrees: f64, range: SensorRange) -> f64 {
    match range {
        SensorRange::Signed => (degrees + 180.0).rem_euclid(360.0) - 180.0,
        SensorRange::Unsigned => degrees.rem_euclid(360.0),
    }
}

impl AbsoluteEncoder for SimAbsoluteEncoder {
    fn configure(&mut self, config: AbsoluteEncoderConfig) -> Result<(), HardwareError> {
        let mut inner = self.inner.lock();
        check_fault(inner.fault, &inner.name)?;
        if !config.magnet_offset_degrees.is_finite()
            || !(-180.0..=180.0).contains(&config.magnet_offset_degrees)
        {
            return Err(HardwareError::Rejected {
                device: inner.name.clone(),
                reason: format!("magnet offset {} out of range", config.magnet_offset_degrees),
            });
        }
        inner.config = config;
        Ok(())
    }

    fn absolute_position(&self) -> Result<f64, HardwareError> {
        let inner = self.inner.lock();
        check_fault(inner.fault, &inner.name)?;
        let raw = if inner.config.clockwise_positive {
            inner.magnet_degrees
        } else {
            -inner.magnet_degrees
        };
        Ok(wrap_degrees(raw + inner.config.magnet_offset_degrees, inner.config.range))
    }
}
