// src/controller.rs

//! # Cascaded PID Flight Controller
//!
//! Turns the vehicle state and the active setpoint into the four pre-mix
//! command values: vertical, roll, pitch and yaw.
//!
//! ## Loops
//!
//! - **Position** (outer, per horizontal axis): measured minus target
//!   position, bounded and rotated from the world frame into the body frame.
//! - **Attitude** (inner, roll and pitch): bounded angle plus gyro rate, with
//!   the outer loop correction added on top.
//! - **Heading**: proportional on target yaw minus compass heading.
//! - **Vertical**: cubic response to the offset altitude error.
//!
//! Every loop is a `piddiy::PidController` driven by a compute callback from
//! [`crate::pid`]. Integrators are clamped every tick and reset while the
//! vehicle is disarmed.

use crate::config::ControllerConfig;
use crate::mode::{FlightMode, Setpoint};
use crate::pid::{
    compute_attitude, compute_heading, compute_position, compute_vertical, AttitudeControlData,
    HeadingControlData, PositionControlData, VerticalControlData,
};
use crate::state::VehicleState;
use crate::{clamp, Number};
use num_traits::Float;
use piddiy::PidController;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pre-mix command values, each bounded by its axis output limit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ControlCommand<T> {
    /// Collective thrust correction added to the hover throttle.
    pub vertical: T,
    /// Roll command.
    pub roll: T,
    /// Pitch command.
    pub pitch: T,
    /// Yaw command.
    pub yaw: T,
}

impl<T: Number> ControlCommand<T> {
    /// All-zero command.
    pub fn zero() -> Self {
        Self {
            vertical: T::zero(),
            roll: T::zero(),
            pitch: T::zero(),
            yaw: T::zero(),
        }
    }
}

/// A trait for flight controllers that turn state and setpoint into
/// pre-mix commands.
pub trait FlightController<T: Number> {
    /// Computes the command for one tick.
    ///
    /// - `state`: The vehicle state snapshot for this tick.
    /// - `setpoint`: The active position, altitude and yaw targets.
    /// - `mode`: The active flight mode. Integrators are held at zero while
    ///   the mode is disarmed.
    fn control(
        &mut self,
        state: &VehicleState<T>,
        setpoint: &Setpoint<T>,
        mode: FlightMode,
    ) -> ControlCommand<T>;

    /// Clears all integrator and error memory.
    fn reset(&mut self);
}

/// Rotates a world-frame horizontal vector into the body frame.
///
/// Returns `(forward, lateral)`, which the controller feeds to pitch and roll.
/// A positive heading is a counter-clockwise turn, so the world vector is
/// rotated clockwise by the same angle.
pub fn world_to_body<T: Number>(heading: T, world: (T, T)) -> (T, T) {
    let (sin, cos) = Float::sin_cos(heading);
    (cos * world.0 + sin * world.1, cos * world.1 - sin * world.0)
}

/// Inverse of [`world_to_body`].
pub fn body_to_world<T: Number>(heading: T, body: (T, T)) -> (T, T) {
    let (sin, cos) = Float::sin_cos(heading);
    (cos * body.0 - sin * body.1, sin * body.0 + cos * body.1)
}

/// Position, attitude, heading and vertical loops in one cascade.
pub struct CascadedPidController<T: Number> {
    position_x_pid: PidController<T, PositionControlData<T>>,
    position_y_pid: PidController<T, PositionControlData<T>>,
    roll_pid: PidController<T, AttitudeControlData<T>>,
    pitch_pid: PidController<T, AttitudeControlData<T>>,
    yaw_pid: PidController<T, HeadingControlData<T>>,
    vertical_pid: PidController<T, VerticalControlData<T>>,
    config: ControllerConfig<T>,
}

impl<T: Number> CascadedPidController<T> {
    /// Creates a new controller using the provided configuration.
    ///
    /// ```
    /// use quad_flight_pipeline::{CascadedPidController, ControllerConfig};
    ///
    /// let mut config = ControllerConfig::<f32>::new();
    /// config.gains.roll.kp = 40.0;
    /// config.position_error_limit = 0.8;
    ///
    /// let controller = CascadedPidController::with_config(config);
    /// ```
    pub fn with_config(config: ControllerConfig<T>) -> Self {
        let gains = config.gains;

        let mut position_x_pid = PidController::new();
        position_x_pid
            .compute_fn(compute_position)
            .kp(gains.position_x.kp)
            .ki(gains.position_x.ki)
            .kd(gains.position_x.kd);

        let mut position_y_pid = PidController::new();
        position_y_pid
            .compute_fn(compute_position)
            .kp(gains.position_y.kp)
            .ki(gains.position_y.ki)
            .kd(gains.position_y.kd);

        let mut roll_pid = PidController::new();
        roll_pid
            .compute_fn(compute_attitude)
            .set_point(T::zero())
            .kp(gains.roll.kp)
            .ki(gains.roll.ki)
            .kd(gains.roll.kd);

        let mut pitch_pid = PidController::new();
        pitch_pid
            .compute_fn(compute_attitude)
            .set_point(T::zero())
            .kp(gains.pitch.kp)
            .ki(gains.pitch.ki)
            .kd(gains.pitch.kd);

        let mut yaw_pid = PidController::new();
        yaw_pid
            .compute_fn(compute_heading)
            .kp(gains.yaw.kp)
            .ki(gains.yaw.ki)
            .kd(gains.yaw.kd);

        let mut vertical_pid = PidController::new();
        vertical_pid
            .compute_fn(compute_vertical)
            .kp(gains.vertical.kp)
            .ki(gains.vertical.ki)
            .kd(gains.vertical.kd);

        CascadedPidController {
            position_x_pid,
            position_y_pid,
            roll_pid,
            pitch_pid,
            yaw_pid,
            vertical_pid,
            config,
        }
    }

    /// Creates a new controller with default settings.
    pub fn new() -> Self {
        Self::with_config(ControllerConfig::new())
    }

    /// Bounded world-frame position correction for both horizontal axes.
    fn position_errors(&mut self, state: &VehicleState<T>, reset_integral: bool) -> (T, T) {
        let gains = self.config.gains;
        let limit = self.config.position_error_limit;
        let dt = self.config.dt;

        let x_data = PositionControlData {
            position: state.x,
            dt,
            integral_limit: gains.position_x.i_limit,
            reset_integral,
        };
        let y_data = PositionControlData {
            position: state.y,
            dt,
            integral_limit: gains.position_y.i_limit,
            reset_integral,
        };

        let x_err = bounded(self.position_x_pid.compute(x_data), gains.position_x.output_limit);
        let y_err = bounded(self.position_y_pid.compute(y_data), gains.position_y.output_limit);
        (bounded(x_err, limit), bounded(y_err, limit))
    }
}

impl<T: Number> Default for CascadedPidController<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Number> FlightController<T> for CascadedPidController<T> {
    fn control(
        &mut self,
        state: &VehicleState<T>,
        setpoint: &Setpoint<T>,
        mode: FlightMode,
    ) -> ControlCommand<T> {
        let reset_integral = !mode.is_armed();
        let gains = self.config.gains;
        let dt = self.config.dt;

        // Set the targets for the outer loops
        self.position_x_pid.set_point(setpoint.target_x);
        self.position_y_pid.set_point(setpoint.target_y);
        self.yaw_pid.set_point(setpoint.target_yaw);
        self.vertical_pid.set_point(setpoint.target_z);

        let world_err = self.position_errors(state, reset_integral);
        let (pitch_err, roll_err) = world_to_body(state.heading, world_err);

        let roll_data = AttitudeControlData {
            angle: state.roll,
            rate: state.roll_rate,
            angle_limit: self.config.attitude_limit,
            dt,
            integral_limit: gains.roll.i_limit,
            reset_integral,
        };
        let pitch_data = AttitudeControlData {
            angle: state.pitch,
            rate: -state.pitch_rate,
            angle_limit: self.config.attitude_limit,
            dt,
            integral_limit: gains.pitch.i_limit,
            reset_integral,
        };
        let yaw_data = HeadingControlData {
            heading: state.heading,
            dt,
            integral_limit: gains.yaw.i_limit,
            reset_integral,
        };
        let vertical_data = VerticalControlData {
            altitude: state.z,
            hover_offset: self.config.hover_offset,
            dt,
            integral_limit: gains.vertical.i_limit,
            reset_integral,
        };

        let one = T::one();
        let roll = self.roll_pid.compute(roll_data) + bounded(roll_err, one);
        let pitch = self.pitch_pid.compute(pitch_data) - bounded(pitch_err, one);
        let yaw = self.yaw_pid.compute(yaw_data);
        let vertical = self.vertical_pid.compute(vertical_data);

        ControlCommand {
            vertical: bounded(vertical, gains.vertical.output_limit),
            roll: bounded(roll, gains.roll.output_limit),
            pitch: bounded(pitch, gains.pitch.output_limit),
            yaw: bounded(yaw, gains.yaw.output_limit),
        }
    }

    fn reset(&mut self) {
        self.position_x_pid.integral = T::zero();
        self.position_x_pid.error = T::zero();
        self.position_y_pid.integral = T::zero();
        self.position_y_pid.error = T::zero();
        self.roll_pid.integral = T::zero();
        self.roll_pid.error = T::zero();
        self.pitch_pid.integral = T::zero();
        self.pitch_pid.error = T::zero();
        self.yaw_pid.integral = T::zero();
        self.yaw_pid.error = T::zero();
        self.vertical_pid.integral = T::zero();
        self.vertical_pid.error = T::zero();
    }
}

/// Symmetric clamp. Non-finite values collapse to zero.
fn bounded<T: Number>(value: T, limit: T) -> T {
    if Float::is_finite(value) {
        clamp(value, -limit, limit)
    } else {
        T::zero()
    }
}
