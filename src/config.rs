// src/config.rs

//! # Flight Pipeline Configuration
//!
//! Numeric abstraction and tunable parameters for the flight pipeline. Every
//! structure here is plain data with public fields and a `new()` constructor
//! that fills in defaults tuned for a Mavic-class quadrotor in simulation.
//! These should be replaced with values tuned for the actual airframe.
//!
//! Configuration is constant during flight. `FlightConfig::validate` rejects
//! values that would let a clamp invert or a division degenerate.

use crate::error::ConfigError;
use num_traits::{Float, FloatConst, NumCast};
use piddiy::Number as PiddiyNumber;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Custom trait to encapsulate base number requirements.
///
/// The pipeline needs trigonometry for heading and frame rotation, so the
/// PID number type is further constrained to floating point.
pub trait Number: PiddiyNumber + Float + FloatConst {}

impl<T: PiddiyNumber + Float + FloatConst> Number for T {}

/// Clamps a `PartialOrd` value within a given range.
pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
    if value < min {
        min
    } else if max < value {
        max
    } else {
        value
    }
}

/// Converts an `f64` literal into the pipeline number type.
pub(crate) fn lit<T: Number>(value: f64) -> T {
    <T as NumCast>::from(value).unwrap_or_else(T::zero)
}

/// PID gains and limits for a single control axis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AxisGains<T> {
    /// Proportional gain.
    pub kp: T,
    /// Integral gain.
    pub ki: T,
    /// Derivative gain. For attitude axes this scales the gyro rate.
    pub kd: T,
    /// Upper limit for the integral term to prevent integral windup.
    pub i_limit: T,
    /// Symmetric bound applied to the axis output.
    pub output_limit: T,
}

impl<T: Number> AxisGains<T> {
    /// Creates a full PID triple with its limits.
    pub fn new(kp: T, ki: T, kd: T, i_limit: T, output_limit: T) -> Self {
        Self {
            kp,
            ki,
            kd,
            i_limit,
            output_limit,
        }
    }

    /// Creates a proportional-only axis.
    pub fn proportional(kp: T, output_limit: T) -> Self {
        Self::new(kp, T::zero(), T::zero(), T::zero(), output_limit)
    }
}

/// Gains for every loop of the cascaded controller.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Gains<T> {
    /// World X position loop.
    pub position_x: AxisGains<T>,
    /// World Y position loop.
    pub position_y: AxisGains<T>,
    /// Roll attitude loop.
    pub roll: AxisGains<T>,
    /// Pitch attitude loop.
    pub pitch: AxisGains<T>,
    /// Heading loop.
    pub yaw: AxisGains<T>,
    /// Altitude loop.
    pub vertical: AxisGains<T>,
}

impl<T: Number> Gains<T> {
    /// Creates the default gain set.
    pub fn new() -> Self {
        let position = AxisGains::new(T::one(), T::zero(), T::zero(), lit(4.0), lit(2.5));
        Self {
            position_x: position,
            position_y: position,
            roll: AxisGains::new(lit(50.0), T::zero(), T::one(), lit(4.0), lit(60.0)),
            pitch: AxisGains::new(lit(30.0), T::zero(), T::one(), lit(4.0), lit(40.0)),
            yaw: AxisGains::proportional(lit(0.5), lit(2.5)),
            vertical: AxisGains::proportional(lit(3.0), lit(5.0)),
        }
    }
}

/// Settings for the cascaded PID controller.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ControllerConfig<T> {
    /// Loop gains.
    pub gains: Gains<T>,
    /// Bound on each horizontal position error before rotation into the body frame.
    pub position_error_limit: T,
    /// Bound on the measured roll and pitch angles fed to the attitude loop.
    pub attitude_limit: T,
    /// Constant added to the altitude error before cubic shaping.
    pub hover_offset: T,
    /// Control tick period in seconds.
    pub dt: T,
}

impl<T: Number> ControllerConfig<T> {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            gains: Gains::new(),
            position_error_limit: T::one(),
            attitude_limit: T::one(),
            hover_offset: lit(0.6),
            dt: lit(0.008),
        }
    }
}

/// Settings for the X-configuration motor mixer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MixerConfig<T> {
    /// Baseline rotor speed that roughly holds the vehicle in a hover.
    pub hover_throttle: T,
    /// Upper bound on each rotor speed.
    pub max_speed: T,
}

impl<T: Number> MixerConfig<T> {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            hover_throttle: lit(68.5),
            max_speed: lit(100.0),
        }
    }
}

/// Settings for the camera gimbal.
///
/// Tuples are ordered (roll, pitch, yaw). Ranges are (min, max) in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GimbalConfig<T> {
    /// Gyro rate compensation gain per axis.
    pub rate_gain: (T, T, T),
    /// Initial operator bias per axis. Pitch 1.6 points the camera down.
    pub bias: (T, T, T),
    /// Mechanical roll range.
    pub roll_range: (T, T),
    /// Mechanical pitch range.
    pub pitch_range: (T, T),
    /// Mechanical yaw range.
    pub yaw_range: (T, T),
    /// Pitch bias change per operator nudge.
    pub bias_step: T,
    /// Whether rate stabilization starts enabled.
    pub stabilize: bool,
}

impl<T: Number> GimbalConfig<T> {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            rate_gain: (lit(0.115), lit(0.1), lit(0.115)),
            bias: (T::zero(), lit(1.6), T::zero()),
            roll_range: (lit(-0.5), lit(0.5)),
            pitch_range: (lit(-0.5), lit(1.7)),
            yaw_range: (lit(-1.7), lit(1.7)),
            bias_step: lit(0.005),
            stabilize: true,
        }
    }
}

/// Settings for the flight mode state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModeConfig<T> {
    /// Altitude targeted on arming.
    pub takeoff_altitude: T,
    /// Altitude band around the target that completes a takeoff.
    pub takeoff_tolerance: T,
    /// Altitude at or below which a landing vehicle is considered down.
    pub landed_altitude: T,
    /// Altitude targeted by return-home.
    pub home_altitude: T,
    /// Horizontal distance per axis within which the vehicle is home.
    pub home_radius: T,
    /// Land automatically once return-home arrives.
    pub land_at_home: bool,
    /// Horizontal setpoint change per nudge.
    pub position_step: T,
    /// Altitude setpoint change per nudge.
    pub altitude_step: T,
    /// Yaw setpoint change per nudge, in radians.
    pub yaw_step: T,
    /// Ticks during which a repeated discrete command is ignored.
    pub debounce_ticks: u64,
    /// Scale from normalized marker offset to horizontal displacement.
    pub vision_gain: T,
}

impl<T: Number> ModeConfig<T> {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            takeoff_altitude: lit(3.0),
            takeoff_tolerance: lit(0.2),
            landed_altitude: lit(0.15),
            home_altitude: lit(10.0),
            home_radius: T::one(),
            land_at_home: false,
            position_step: lit(0.01),
            altitude_step: lit(0.01),
            yaw_step: lit(0.01),
            debounce_ticks: 30,
            vision_gain: lit(1.5),
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FlightConfig<T> {
    /// Cascaded controller settings.
    pub controller: ControllerConfig<T>,
    /// Motor mixer settings.
    pub mixer: MixerConfig<T>,
    /// Gimbal settings.
    pub gimbal: GimbalConfig<T>,
    /// Mode machine settings.
    pub mode: ModeConfig<T>,
}

impl<T: Number> FlightConfig<T> {
    /// Creates a new configuration with default values for all parameters.
    ///
    /// Example Usage
    /// ```
    /// use quad_flight_pipeline::FlightConfig;
    ///
    /// let mut config = FlightConfig::<f32>::new();
    ///
    /// // Stiffer altitude hold and a lower takeoff.
    /// config.controller.gains.vertical.kp = 4.0;
    /// config.mode.takeoff_altitude = 2.0;
    ///
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn new() -> Self {
        Self {
            controller: ControllerConfig::new(),
            mixer: MixerConfig::new(),
            gimbal: GimbalConfig::new(),
            mode: ModeConfig::new(),
        }
    }

    /// Checks the configuration for values the pipeline cannot fly with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let controller = &self.controller;
        if !(controller.dt > T::zero() && Float::is_finite(controller.dt)) {
            return Err(ConfigError::NonPositiveTimeStep);
        }

        let gains = &controller.gains;
        let axes = [
            ("position x", gains.position_x),
            ("position y", gains.position_y),
            ("roll", gains.roll),
            ("pitch", gains.pitch),
            ("yaw", gains.yaw),
            ("vertical", gains.vertical),
        ];
        for (name, axis) in axes {
            non_negative(name, axis.i_limit)?;
            non_negative(name, axis.output_limit)?;
            for value in [axis.kp, axis.ki, axis.kd, axis.i_limit, axis.output_limit] {
                finite(name, value)?;
            }
        }
        non_negative("position error", controller.position_error_limit)?;
        non_negative("attitude", controller.attitude_limit)?;
        finite("position error limit", controller.position_error_limit)?;
        finite("attitude limit", controller.attitude_limit)?;
        finite("hover offset", controller.hover_offset)?;

        let mixer = &self.mixer;
        if !(mixer.max_speed > T::zero()) {
            return Err(ConfigError::NonPositiveMaxSpeed);
        }
        if !(mixer.hover_throttle >= T::zero() && mixer.hover_throttle <= mixer.max_speed) {
            return Err(ConfigError::HoverThrottleOutOfRange);
        }
        finite("max speed", mixer.max_speed)?;

        let gimbal = &self.gimbal;
        ordered("gimbal roll", gimbal.roll_range)?;
        ordered("gimbal pitch", gimbal.pitch_range)?;
        ordered("gimbal yaw", gimbal.yaw_range)?;
        let (rate_roll, rate_pitch, rate_yaw) = gimbal.rate_gain;
        let (bias_roll, bias_pitch, bias_yaw) = gimbal.bias;
        for value in [rate_roll, rate_pitch, rate_yaw] {
            finite("gimbal rate gain", value)?;
        }
        for value in [bias_roll, bias_pitch, bias_yaw] {
            finite("gimbal bias", value)?;
        }
        for (min, max) in [gimbal.roll_range, gimbal.pitch_range, gimbal.yaw_range] {
            finite("gimbal range", min)?;
            finite("gimbal range", max)?;
        }
        finite("gimbal bias step", gimbal.bias_step)?;

        let mode = &self.mode;
        non_negative("landed altitude", mode.landed_altitude)?;
        non_negative("takeoff tolerance", mode.takeoff_tolerance)?;
        non_negative("home radius", mode.home_radius)?;
        finite("takeoff altitude", mode.takeoff_altitude)?;
        finite("takeoff tolerance", mode.takeoff_tolerance)?;
        finite("landed altitude", mode.landed_altitude)?;
        finite("home altitude", mode.home_altitude)?;
        finite("home radius", mode.home_radius)?;
        finite("position step", mode.position_step)?;
        finite("altitude step", mode.altitude_step)?;
        finite("yaw step", mode.yaw_step)?;
        finite("vision gain", mode.vision_gain)?;
        Ok(())
    }
}

fn non_negative<T: Number>(name: &'static str, value: T) -> Result<(), ConfigError> {
    // Written as a negated comparison so NaN is rejected too.
    if !(value >= T::zero()) {
        return Err(ConfigError::NegativeLimit(name));
    }
    Ok(())
}

fn finite<T: Number>(name: &'static str, value: T) -> Result<(), ConfigError> {
    if !Float::is_finite(value) {
        return Err(ConfigError::NonFinite(name));
    }
    Ok(())
}

fn ordered<T: Number>(name: &'static str, range: (T, T)) -> Result<(), ConfigError> {
    if !(range.0 <= range.1) {
        return Err(ConfigError::InvertedRange(name));
    }
    Ok(())
}
