// src/pid/position.rs

//! # Position PID Control Module
//!
//! This module provides a compute function and control data structure for the
//! outer horizontal position loop. The error is measured position minus
//! target, which is the sign the attitude loop expects after rotation into
//! the body frame.

use crate::{clamp, Number};
use piddiy::PidController;

/// Control data for the position PID callback.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PositionControlData<T> {
    /// Measured world position along the controlled axis.
    pub position: T,
    /// The time delta since the last computation.
    pub dt: T,
    /// The maximum allowed value for the integral term, used to prevent integral windup.
    pub integral_limit: T,
    /// Flag to reset the integral term, typically used when the vehicle is disarmed.
    pub reset_integral: bool,
}

/// Position PID compute callback.
pub fn compute_position<T: Number>(
    pid: &mut PidController<T, PositionControlData<T>>,
    data: PositionControlData<T>,
) -> (T, T, T) {
    let error = data.position - pid.set_point;
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
