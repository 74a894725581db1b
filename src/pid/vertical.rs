// src/pid/vertical.rs

//! # Vertical PID Control Module
//!
//! This module provides a compute function and control data structure for the
//! altitude loop. The altitude error plus a hover offset is clamped to
//! [-1, 1] and cubed before it reaches the gains. Near the target the response
//! is soft, far from it the response is steep but bounded by `kp`.

use crate::{clamp, Number};
use piddiy::PidController;

/// Control data for the vertical PID callback.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VerticalControlData<T> {
    /// Measured altitude.
    pub altitude: T,
    /// Offset added to the altitude error before shaping.
    pub hover_offset: T,
    /// The time delta since the last computation.
    pub dt: T,
    /// The maximum allowed value for the integral term, used to prevent integral windup.
    pub integral_limit: T,
    /// Flag to reset the integral term, typically used when the vehicle is disarmed.
    pub reset_integral: bool,
}

/// Clamps the offset altitude error to [-1, 1].
pub fn vertical_difference<T: Number>(altitude_error: T, hover_offset: T) -> T {
    clamp(altitude_error + hover_offset, -T::one(), T::one())
}

/// Cubic response to a clamped altitude difference.
pub fn cubic_response<T: Number>(z_diff: T) -> T {
    z_diff * z_diff * z_diff
}

/// Vertical PID compute callback.
pub fn compute_vertical<T: Number>(
    pid: &mut PidController<T, VerticalControlData<T>>,
    data: VerticalControlData<T>,
) -> (T, T, T) {
    let z_diff = vertical_difference(pid.set_point - data.altitude, data.hover_offset);
    let error = cubic_response(z_diff);
    if data.reset_integral {
        return (error, T::zero(), T::zero());
    }
    let integral = clamp(
        pid.integral + error * data.dt,
        -data.integral_limit,
        data.integral_limit,
    );
    let derivative = (error - pid.error) / data.dt;

    (error, integral, derivative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn vertical_pid(kp: f32) -> PidController<f32, VerticalControlData<f32>> {
        let mut pid = PidController::new();
        pid.compute_fn(compute_vertical)
            .set_point(3.0)
            .kp(kp)
            .ki(0.0)
            .kd(0.0);
        pid
    }

    /// Test that a large climb saturates at kp.
    #[test]
    fn test_pid_vertical_saturation() {
        let mut pid = vertical_pid(3.0);
        let data = VerticalControlData {
            altitude: 1.0,
            hover_offset: 0.6,
            dt: 0.008,
            integral_limit: 0.0,
            reset_integral: false,
        };
        let (error, _, _) = compute_vertical(&mut pid, data);
        let output = pid.compute(data);
        assert!(value_close(1.0, error), "Difference should clamp to 1.");
        assert!(value_close(3.0, output), "Output should be kp.");
    }

    /// Test the soft response near the target.
    #[test]
    fn test_pid_vertical_soft_settling() {
        let mut pid = vertical_pid(3.0);
        let data = VerticalControlData {
            altitude: 3.4,
            hover_offset: 0.6,
            dt: 0.008,
            integral_limit: 0.0,
            reset_integral: false,
        };
        let output = pid.compute(data);
        // (3.0 - 3.4 + 0.6)^3 = 0.008
        assert!(value_close(0.024, output), "Output should be 3 * 0.2^3.");
    }

    /// Test that the response is odd and monotonic.
    #[test]
    fn test_cubic_response_odd_monotonic() {
        let mut previous = cubic_response(-1.0f32);
        for step in 1..=200 {
            let z = -1.0 + step as f32 * 0.01;
            let response = cubic_response(z);
            assert!(previous <= response, "Response should not decrease.");
            assert!(
                value_close(-response, cubic_response(-z)),
                "Response should be odd."
            );
            assert!(response.abs() <= 1.0, "Response should be bounded.");
            previous = response;
        }
    }

    /// Test the clamped difference.
    #[test]
    fn test_vertical_difference_clamps() {
        assert!(value_close(1.0, vertical_difference(2.0f32, 0.6)));
        assert!(value_close(-1.0, vertical_difference(-5.0f32, 0.6)));
        assert!(value_close(0.1, vertical_difference(-0.5f32, 0.6)));
    }
}
