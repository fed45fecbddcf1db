//! Angle folding and unwrapping.
//!
//! A steering motor's integrated encoder reports an unbounded, continuous angle that keeps
//! counting across full rotations, while commanded headings arrive bounded to `[-PI, PI)`.
//! The helpers here translate between the two representations.

use core::f64::consts::{PI, TAU};

/// Normalize an angle to be within `[-PI, PI)`.
///
/// Angles at `PI` will be normalized to `-PI`.
///
/// # Arguments
///
/// * `angle`: The angle in radians to normalize.
///
/// # Returns
///
/// The normalized angle in radians.
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle % TAU;
    if a >= PI {
        a - TAU
    } else if a < -PI {
        a + TAU
    } else {
        a
    }
}

/// Fold an unbounded angle into `[0, 2PI)`.
///
/// The `%` operator keeps the sign of the dividend, so negative angles produce a negative
/// remainder that has to be shifted back up by one turn.
pub fn fold_angle(angle: f64) -> f64 {
    let mut folded = angle % TAU;
    if folded < 0.0 {
        folded += TAU;
    }
    // A tiny negative remainder plus TAU can round up to exactly TAU.
    if folded >= TAU { 0.0 } else { folded }
}

/// Re-express a bounded target heading as an unbounded reference for a position controller.
///
/// The reference keeps the turn count of `current` and then takes the shorter way around,
/// so the controller is never asked to travel more than `PI` radians from the mechanism's
/// present folded position.
///
/// # Arguments
///
/// * `current`: The continuous angle reported by the steering encoder (rad, unbounded).
/// * `target`: The desired heading in radians, expected within `[-PI, PI)`.
///
/// # Returns
///
/// The unbounded reference angle in radians. `|reference - current| <= PI` and
/// `reference` is congruent to `target` modulo `2PI`.
pub fn unwrap_reference(current: f64, target: f64) -> f64 {
    let folded = fold_angle(current);
    let delta = target - folded;

    let mut reference = target + (current - folded);
    if delta > PI {
        reference -= TAU;
    } else if delta < -PI {
        reference += TAU;
    }
    reference
}

/// Shortest signed difference `to - from`, normalized to `(-PI, PI]`.
pub fn shortest_delta(from: f64, to: f64) -> f64 {
    let d = normalize_angle(to - from);
    // normalize_angle yields [-PI, PI); the optimizer wants the half-open side flipped.
    if d <= -PI { d + TAU } else { d }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    const EPSILON: f64 = 1e-9;

    /// Distance between two angles on the circle.
    fn circular_distance(a: f64, b: f64) -> f64 {
        let d = fold_angle(a - b);
        d.min(TAU - d)
    }

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(0.0) - 0.0).abs() < EPSILON);
        assert!((normalize_angle(PI) - (-PI)).abs() < EPSILON);
        assert!((normalize_angle(-PI) - (-PI)).abs() < EPSILON);
        assert!((normalize_angle(2.5 * PI) - 0.5 * PI).abs() < EPSILON);
        assert!((normalize_angle(-2.5 * PI) - (-0.5 * PI)).abs() < EPSILON);
        assert!((normalize_angle(3.0 + TAU) - 3.0).abs() < EPSILON);
    }

    #[test]
    fn test_fold_angle_negative_dividend() {
        // -1 rad is one radian short of a full turn
        assert!((fold_angle(-1.0) - (TAU - 1.0)).abs() < EPSILON);
        assert!((fold_angle(-TAU - 1.0) - (TAU - 1.0)).abs() < EPSILON);
        assert!((fold_angle(3.0) - 3.0).abs() < EPSILON);
        assert!((fold_angle(3.0 * TAU + 0.5) - 0.5).abs() < EPSILON);
        assert_eq!(fold_angle(0.0), 0.0);
    }

    #[test]
    fn test_fold_angle_stays_below_full_turn() {
        let folded = fold_angle(-1e-18);
        assert!((0.0..TAU).contains(&folded));
    }

    #[test]
    fn test_unwrap_wraps_forward_past_pi() {
        // current sits just below PI, target just above -PI: go forward 0.283 rad
        let reference = unwrap_reference(3.0, -3.0);
        assert!((reference - (TAU - 3.0)).abs() < EPSILON);
        assert!((reference - 3.283_185_307).abs() < 1e-6);
        assert!((reference - 3.0).abs() <= PI);
    }

    #[test]
    fn test_unwrap_keeps_turn_count() {
        // two full turns plus a quarter, asking for a half turn heading
        let current = 2.0 * TAU + 0.25;
        let reference = unwrap_reference(current, 1.0);
        assert!((reference - (2.0 * TAU + 1.0)).abs() < EPSILON);
    }

    #[test]
    fn test_unwrap_negative_current() {
        // -0.5 rad folds to TAU - 0.5; target 0.5 must step forward one radian, not back
        let reference = unwrap_reference(-0.5, 0.5);
        assert!((reference - 0.5).abs() < EPSILON);

        let reference = unwrap_reference(-TAU - 0.5, 0.5);
        assert!((reference - (-TAU + 0.5)).abs() < EPSILON);
    }

    #[test]
    fn test_unwrap_at_exact_half_turn() {
        // |target - folded| == PI may go either way
        let reference = unwrap_reference(0.0, -PI);
        assert!((reference - PI).abs() < EPSILON || (reference + PI).abs() < EPSILON);
    }

    #[test]
    fn test_unwrap_continuity_random_sweep() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..20_000 {
            let current: f64 = rng.random_range(-50.0..50.0);
            let target: f64 = rng.random_range(-PI..PI);

            let reference = unwrap_reference(current, target);
            assert!(
                (reference - current).abs() <= PI + EPSILON,
                "current: {current}, target: {target}, reference: {reference}"
            );
            assert!(
                circular_distance(reference, target) < 1e-9,
                "current: {current}, target: {target}, reference: {reference}"
            );
        }
    }

    #[test]
    fn test_unwrap_is_deterministic() {
        let first = unwrap_reference(-17.3, 2.2);
        let second = unwrap_reference(-17.3, 2.2);
        assert_eq!(first.to_bits(), second.to_bits());
    }

    #[test]
    fn test_shortest_delta_range() {
        assert!((shortest_delta(-2.9, 2.5) - (5.4 - TAU)).abs() < EPSILON);
        assert!((shortest_delta(0.0, PI) - PI).abs() < EPSILON);
        assert!((shortest_delta(0.0, -PI) - PI).abs() < EPSILON);
        assert!((shortest_delta(1.0, 0.5) - (-0.5)).abs() < EPSILON);
    }
}
