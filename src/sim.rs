use std::sync::Arc;

use parking_lot::Mutex;
use swerve_kinematics::normalize_angle;
use swerve_motor::{RelativeEncoder, SimAbsoluteEncoder, SimDriveMotor, SimSteeringMotor};

/// Physical model tying the three simulated devices of one module together.
///
/// The absolute sensor follows the true wheel heading. The steering encoder integrates the
/// steering motor's motion plus a slow drift, which only a resync removes. Clones share the
/// same devices and heading.
#[derive(Debug, Clone)]
pub struct SimPlant {
    pub drive: SimDriveMotor,
    pub steering: SimSteeringMotor,
    pub absolute: SimAbsoluteEncoder,
    magnet_offset_degrees: f64,
    true_heading: Arc<Mutex<f64>>,
    drift_rad_per_s: f64,
}

impl SimPlant {
    /// A module whose wheel rests at `initial_heading` radians.
    pub fn new(magnet_offset_degrees: f64, initial_heading: f64, drift_rad_per_s: f64) -> Self {
        let plant = SimPlant {
            drive: SimDriveMotor::new("drive"),
            steering: SimSteeringMotor::new("steering"),
            absolute: SimAbsoluteEncoder::new("absolute"),
            magnet_offset_degrees,
            true_heading: Arc::new(Mutex::new(initial_heading)),
            drift_rad_per_s,
        };
        plant.update_magnet();
        plant
    }

    pub fn true_heading(&self) -> f64 {
        normalize_angle(*self.true_heading.lock())
    }

    fn update_magnet(&self) {
        let degrees = self.true_heading().to_degrees();
        self.absolute
            .set_magnet_degrees(degrees - self.magnet_offset_degrees);
    }

    /// Advance every device by `dt` seconds.
    pub fn step(&self, dt: f64) {
        let before = self.steering.position();
        self.steering.step(dt);
        if let (Ok(before), Ok(after)) = (before, self.steering.position()) {
            *self.true_heading.lock() += after - before;
        }
        self.steering.nudge(self.drift_rad_per_s * dt);
        self.drive.step(dt);
        self.update_magnet();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swerve_motor::{AbsoluteEncoder, AbsoluteEncoderConfig};

    #[test]
    fn test_absolute_sensor_reads_true_heading() {
        let plant = SimPlant::new(-37.5, 1.0, 0.0);
        let mut absolute = plant.absolute.clone();
        absolute
            .configure(AbsoluteEncoderConfig {
                magnet_offset_degrees: -37.5,
                ..AbsoluteEncoderConfig::default()
            })
            .unwrap();
        let degrees = absolute.absolute_position().unwrap();
        assert!((degrees.to_radians() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_drift_only_moves_the_encoder() {
        let plant = SimPlant::new(0.0, 0.0, 0.1);
        for _ in 0..50 {
            plant.step(0.02);
        }
        assert!(plant.true_heading().abs() < 1e-9);
        assert!((plant.steering.position().unwrap() - 0.1).abs() < 1e-9);
    }
}
