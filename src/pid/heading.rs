// src/pid/heading.rs

//! # Heading PID Control Module
//!
//! This module provides a compute function and control data structure for the
//! heading loop. The set point is the target yaw and the measurement is the
//! compass heading, both in radians. With `ki` and `kd` left at zero the loop
//! is purely proportional.

use crate::{clamp, Number};
use piddiy::PidController;

/// Control data for the heading PID callback.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HeadingControlData<T> {
    /// The current heading, typically derived from a compass.
    pub heading: T,
    /// The time delta since the last computation.
    pub dt: T,
    /// The maximum allowed value for the integral term, used to prevent integral windup.
    pub integral_limit: T,
    /// Flag to reset the integral term, typically used when the vehicle is disarmed.
    pub reset_integral: bool,
}

/// Heading PID compute callback.
pub fn compute_heading<T: Number>(
    pid: &mut PidController<T, HeadingControlData<T>>,
    data: HeadingControlData<T>,
) -> (T, T, T) {
    let error = pid.set_point - data.heading;
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
