// src/mixer.rs

//! # X-Configuration Motor Mixer
//!
//! Maps the four pre-mix command values onto the four rotors of an
//! X-configuration quadrotor and saturates each rotor to `[0, max_speed]`.
//!
//! ```text
//! FL = T + Z - R - P + Y
//! FR = T + Z + R - P - Y
//! RL = T + Z - R + P - Y
//! RR = T + Z + R + P + Y
//! ```
//!
//! `T` is the hover throttle, `Z` vertical, `R` roll, `P` pitch and `Y` yaw.
//! Front-right and rear-left spin the other way; that sign is applied only
//! when a `RotorCommand` is converted to `ActuatorSpeeds`.

use crate::config::MixerConfig;
use crate::controller::ControlCommand;
use crate::{clamp, Number};
use num_traits::Float;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Unsigned rotor speeds, each within `[0, max_speed]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RotorCommand<T> {
    /// Front-left rotor.
    pub front_left: T,
    /// Front-right rotor.
    pub front_right: T,
    /// Rear-left rotor.
    pub rear_left: T,
    /// Rear-right rotor.
    pub rear_right: T,
}

/// Signed rotor speeds as written to the motors.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ActuatorSpeeds<T> {
    /// Front-left rotor.
    pub front_left: T,
    /// Front-right rotor, negated.
    pub front_right: T,
    /// Rear-left rotor, negated.
    pub rear_left: T,
    /// Rear-right rotor.
    pub rear_right: T,
}

impl<T: Number> RotorCommand<T> {
    /// All rotors stopped.
    pub fn zero() -> Self {
        Self {
            front_left: T::zero(),
            front_right: T::zero(),
            rear_left: T::zero(),
            rear_right: T::zero(),
        }
    }

    /// Applies the spin direction of each rotor.
    pub fn to_actuation(&self) -> ActuatorSpeeds<T> {
        ActuatorSpeeds {
            front_left: self.front_left,
            front_right: -self.front_right,
            rear_left: -self.rear_left,
            rear_right: self.rear_right,
        }
    }

    /// Rotor speeds in front-left, front-right, rear-left, rear-right order.
    pub fn as_array(&self) -> [T; 4] {
        [
            self.front_left,
            self.front_right,
            self.rear_left,
            self.rear_right,
        ]
    }

    /// Whether every rotor is finite and within `[0, max_speed]`.
    pub fn is_within(&self, max_speed: T) -> bool {
        self.as_array()
            .iter()
            .all(|&speed| Float::is_finite(speed) && speed >= T::zero() && speed <= max_speed)
    }
}

/// Mixer for an X-configuration quadrotor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorMixer<T> {
    config: MixerConfig<T>,
}

impl<T: Number> MotorMixer<T> {
    /// Creates a mixer using the provided configuration.
    pub fn new(config: MixerConfig<T>) -> Self {
        Self { config }
    }

    /// Upper bound on each rotor speed.
    pub fn max_speed(&self) -> T {
        self.config.max_speed
    }

    /// Mixes one command into saturated rotor speeds.
    pub fn mix(&self, command: &ControlCommand<T>) -> RotorCommand<T> {
        let base = self.config.hover_throttle + command.vertical;
        let (roll, pitch, yaw) = (command.roll, command.pitch, command.yaw);

        RotorCommand {
            front_left: self.saturate(base - roll - pitch + yaw),
            front_right: self.saturate(base + roll - pitch - yaw),
            rear_left: self.saturate(base - roll + pitch - yaw),
            rear_right: self.saturate(base + roll + pitch + yaw),
        }
    }

    fn saturate(&self, speed: T) -> T {
        if Float::is_finite(speed) {
            clamp(speed, T::zero(), self.config.max_speed)
        } else {
            T::zero()
        }
    }
}

impl<T: Number> Default for MotorMixer<T> {
    fn default() -> Self {
        Self::new(MixerConfig::new())
    }
}
