//! Module state and position snapshots, and reverse-drive optimization.

use core::f64::consts::{FRAC_PI_2, PI};
use core::fmt;
use libm::{cos, fabs, sin};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::angle::{normalize_angle, shortest_delta};

/// Commanded or measured velocity of a single swerve module.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModuleState {
    /// Signed wheel ground speed (m/s). Negative drives the wheel in reverse.
    pub speed: f64,
    /// Wheel heading (rad), normalized to `[-PI, PI)`.
    pub angle: f64,
}

impl ModuleState {
    /// Construct a new module state.
    ///
    /// # Arguments
    ///
    /// * `speed`: Signed wheel speed in m/s.
    /// * `angle`: Wheel heading in radians. Normalized to `[-PI, PI)`.
    pub fn new(speed: f64, angle: f64) -> Self {
        ModuleState {
            speed,
            angle: normalize_angle(angle),
        }
    }

    /// Returns the equivalent state that needs the least steering travel from `current_angle`.
    ///
    /// A wheel pointing at `angle + PI` and spinning backwards produces the same ground
    /// velocity as the requested state, so whenever the heading change would exceed a quarter
    /// turn the speed is negated and the heading rotated by half a turn instead. The returned
    /// heading is never more than `PI / 2` away from `current_angle`.
    ///
    /// # Arguments
    ///
    /// * `current_angle`: The module's present heading in radians (any range).
    ///
    /// # Returns
    ///
    /// Either `self` unchanged or the reversed, half-turn-rotated state.
    pub fn optimize(self, current_angle: f64) -> ModuleState {
        let delta = shortest_delta(current_angle, self.angle);
        if fabs(delta) > FRAC_PI_2 {
            ModuleState {
                speed: -self.speed,
                angle: normalize_angle(self.angle + PI),
            }
        } else {
            self
        }
    }

    /// Ground velocity vector `(vx, vy)` in the module frame produced by this state.
    pub fn velocity_vector(&self) -> (f64, f64) {
        (self.speed * cos(self.angle), self.speed * sin(self.angle))
    }
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(v: {:.2} m/s, θ: {:.3} rad)", self.speed, self.angle)
    }
}

/// Odometry snapshot of a single swerve module.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModulePosition {
    /// Cumulative signed distance travelled by the wheel (m).
    pub distance: f64,
    /// Wheel heading (rad), normalized to `[-PI, PI)`.
    pub angle: f64,
}

impl ModulePosition {
    /// Construct a new module position. `angle` is normalized to `[-PI, PI)`.
    pub fn new(distance: f64, angle: f64) -> Self {
        ModulePosition {
            distance,
            angle: normalize_angle(angle),
        }
    }
}

impl fmt::Display for ModulePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(d: {:.3} m, θ: {:.3} rad)", self.distance, self.angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_new_normalizes_angle() {
        let state = ModuleState::new(1.0, 3.0 * PI / 2.0);
        assert!((state.angle - (-PI / 2.0)).abs() < EPSILON);

        let position = ModulePosition::new(4.2, PI);
        assert!((position.angle - (-PI)).abs() < EPSILON);
        assert_eq!(position.distance, 4.2);
    }

    #[test]
    fn test_optimize_keeps_small_delta() {
        // Wrapping across +-PI: the short way round is about 0.88 rad
        let desired = ModuleState::new(2.0, 2.5);
        let optimized = desired.optimize(-2.9);
        assert_eq!(optimized, desired);
    }

    #[test]
    fn test_optimize_flips_large_delta() {
        let desired = ModuleState::new(2.0, 3.0);
        let optimized = desired.optimize(0.0);
        assert!((optimized.speed - (-2.0)).abs() < EPSILON);
        assert!((optimized.angle - (3.0 - PI)).abs() < EPSILON);
    }

    #[test]
    fn test_optimize_quarter_turn_does_not_flip() {
        let desired = ModuleState::new(1.0, FRAC_PI_2);
        assert_eq!(desired.optimize(0.0), desired);
    }

    #[test]
    fn test_optimize_bound_random_sweep() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20_000 {
            let desired = ModuleState::new(rng.random_range(-4.0..4.0), rng.random_range(-PI..PI));
            let current: f64 = rng.random_range(-PI..PI);

            let optimized = desired.optimize(current);
            let delta = shortest_delta(current, optimized.angle);
            assert!(
                delta.abs() <= FRAC_PI_2 + EPSILON,
                "desired: {desired}, current: {current}, optimized: {optimized}"
            );
            assert!((-PI..PI).contains(&optimized.angle));
        }
    }

    #[test]
    fn test_optimize_preserves_velocity_vector() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..5_000 {
            let desired = ModuleState::new(rng.random_range(-4.0..4.0), rng.random_range(-PI..PI));
            let current: f64 = rng.random_range(-PI..PI);

            let (vx, vy) = desired.velocity_vector();
            let (ox, oy) = desired.optimize(current).velocity_vector();
            assert!((vx - ox).abs() < 1e-9);
            assert!((vy - oy).abs() < 1e-9);
        }
    }

    #[test]
    fn test_velocity_vector() {
        let (vx, vy) = ModuleState::new(2.0, FRAC_PI_2).velocity_vector();
        assert!(vx.abs() < EPSILON);
        assert!((vy - 2.0).abs() < EPSILON);
    }
}
