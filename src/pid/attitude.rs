// src/pid/attitude.rs

//! # Attitude PID Control Module
//!
//! This module provides a compute function and control data structure for the
//! inner attitude loop. The proportional term acts on the measured angle,
//! bounded to the linear range of the airframe, and the derivative term is the
//! gyro rate itself rather than a differenced error.

use crate::{clamp, Number};
use piddiy::PidController;

/// Control data for the attitude PID callback.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AttitudeControlData<T> {
    /// Measured angle, typically reported by the inertial unit.
    pub angle: T,
    /// Angular rate fed to the derivative term, typically reported by a gyro.
    /// The caller chooses its sign for the axis convention.
    pub rate: T,
    /// Symmetric bound on the angle error.
    pub angle_limit: T,
    /// The time delta since the last computation.
    pub dt: T,
    /// The maximum allowed value for the integral term, used to prevent integral windup.
    pub integral_limit: T,
    /// Flag to reset the integral term, typically used when the vehicle is disarmed.
    pub reset_integral: bool,
}

/// Attitude PID compute callback.
pub fn compute_attitude<T: Number>(
    pid: &mut PidController<T, AttitudeControlData<T>>,
    data: AttitudeControlData<T>,
) -> (T, T, T) {
    let error = clamp(
        data.angle - pid.set_point,
        -data.angle_limit,
        data.angle_limit,
    );
    let integral = if !data.reset_integral {
        clamp(
            pid.integral + error * data.dt,
            -data.integral_limit,
            data.integral_limit,
        )
    } else {
        T::zero()
    };
    let derivative = data.rate;

    (error, integral, derivative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn attitude_pid(kp: f32, kd: f32) -> PidController<f32, AttitudeControlData<f32>> {
        let mut pid = PidController::new();
        pid.compute_fn(compute_attitude)
            .set_point(0.0)
            .kp(kp)
            .ki(0.0)
            .kd(kd);
        pid
    }

    /// Test the proportional-plus-rate response inside the linear range.
    #[test]
    fn test_pid_attitude_response() {
        let mut pid = attitude_pid(50.0, 1.0);
        let data = AttitudeControlData {
            angle: 0.1,
            rate: 0.5,
            angle_limit: 1.0,
            dt: 0.008,
            integral_limit: 4.0,
            reset_integral: false,
        };
        let (error, _, derivative) = compute_attitude(&mut pid, data);
        let output = pid.compute(data);

        assert!(value_close(0.1, error), "Error should be the angle.");
        assert!(value_close(0.5, derivative), "Derivative should be the rate.");
        assert!(value_close(5.5, output), "Output should be 50 * 0.1 + 0.5.");
    }

    /// Test that large angles saturate at the angle limit.
    #[test]
    fn test_pid_attitude_angle_saturation() {
        let mut pid = attitude_pid(30.0, 1.0);
        let data = AttitudeControlData {
            angle: -2.5,
            rate: 0.0,
            angle_limit: 1.0,
            dt: 0.008,
            integral_limit: 4.0,
            reset_integral: false,
        };
        let output = pid.compute(data);
        assert!(value_close(-30.0, output), "Output should saturate at -kp.");
    }

    /// Test that the rate sign is passed through untouched.
    #[test]
    fn test_pid_attitude_negated_rate() {
        let mut pid = attitude_pid(30.0, 1.0);
        let data = AttitudeControlData {
            angle: 0.0,
            rate: -0.75,
            angle_limit: 1.0,
            dt: 0.008,
            integral_limit: 4.0,
            reset_integral: false,
        };
        let output = pid.compute(data);
        assert!(value_close(-0.75, output), "Output should follow the rate sign.");
    }

    /// Test the behavior when the reset_integral flag is true.
    #[test]
    fn test_pid_attitude_integral_reset() {
        let mut pid = attitude_pid(1.0, 0.0);
        pid.ki(1.0);
        let data = AttitudeControlData {
            angle: 1.0,
            rate: 0.0,
            angle_limit: 1.0,
            dt: 1.0,
            integral_limit: 4.0,
            reset_integral: false,
        };
        for _ in 0..10 {
            let _ = pid.compute(data);
        }
        assert!(value_close(4.0, pid.integral), "Integral should be clamped.");

        let _ = pid.compute(AttitudeControlData {
            reset_integral: true,
            ..data
        });
        assert!(value_close(0.0, pid.integral), "Integral should be zero.");
    }
}
