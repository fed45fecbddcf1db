//! Simulated devices.
//!
//! Every simulated device is a cheap, cloneable handle around shared state, so a test or a
//! plant model can keep one clone to drive and inspect the device while the module owns
//! another.

mod sim_encoder;
mod sim_motor;

pub use sim_encoder::SimAbsoluteEncoder;
pub use sim_motor::{SimDriveMotor, SimSteeringMotor};

use crate::error::HardwareError;

/// Failure injected into a simulated device. Applies to every read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimFault {
    /// Every call succeeds.
    #[default]
    Healthy,
    /// Off the bus: calls fail with [`HardwareError::Unavailable`].
    Unavailable,
    /// Answers too late: calls fail with [`HardwareError::Timeout`].
    Timeout { timeout_ms: u32 },
}

impl SimFault {
    fn from_available(available: bool) -> Self {
        if available {
            SimFault::Healthy
        } else {
            SimFault::Unavailable
        }
    }
}

fn check_fault(fault: SimFault, device: &str) -> Result<(), HardwareError> {
    match fault {
        SimFault::Healthy => Ok(()),
        SimFault::Unavailable => Err(HardwareError::Unavailable {
            device: device.to_string(),
        }),
        SimFault::Timeout { timeout_ms } => Err(HardwareError::Timeout {
            device: device.to_string(),
            timeout_ms,
        }),
    }
}
