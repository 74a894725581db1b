// src/gimbal.rs

//! # Camera Gimbal Controller
//!
//! Counter-rotates the camera against the body rates and adds an operator
//! bias. With stabilization off the gimbal simply holds the bias pose. Each
//! output is clamped to the mechanical range of its joint.

use crate::config::GimbalConfig;
use crate::logging::info;
use crate::mode::OperatorCommand;
use crate::state::VehicleState;
use crate::{clamp, Number};
use num_traits::Float;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Gimbal joint angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GimbalCommand<T> {
    /// Roll joint.
    pub roll: T,
    /// Pitch joint.
    pub pitch: T,
    /// Yaw joint.
    pub yaw: T,
}

/// Rate-compensating gimbal controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GimbalController<T> {
    config: GimbalConfig<T>,
    bias: (T, T, T),
    stabilize: bool,
}

impl<T: Number> GimbalController<T> {
    /// Creates a controller using the provided configuration.
    pub fn new(config: GimbalConfig<T>) -> Self {
        Self {
            config,
            bias: config.bias,
            stabilize: config.stabilize,
        }
    }

    /// Current (roll, pitch, yaw) bias.
    pub fn bias(&self) -> (T, T, T) {
        self.bias
    }

    /// Whether rate stabilization is active.
    pub fn is_stabilizing(&self) -> bool {
        self.stabilize
    }

    /// Computes the joint angles for one tick.
    pub fn control(&self, state: &VehicleState<T>) -> GimbalCommand<T> {
        let (roll, pitch, yaw) = if self.stabilize {
            let gain = self.config.rate_gain;
            (
                self.bias.0 - gain.0 * state.roll_rate,
                self.bias.1 - gain.1 * state.pitch_rate,
                self.bias.2 - gain.2 * state.yaw_rate,
            )
        } else {
            self.bias
        };

        GimbalCommand {
            roll: joint(roll, self.config.roll_range),
            pitch: joint(pitch, self.config.pitch_range),
            yaw: joint(yaw, self.config.yaw_range),
        }
    }

    /// Applies a gimbal command. Returns `false` for commands it does not own.
    pub fn apply(&mut self, command: OperatorCommand) -> bool {
        let (min, max) = self.config.pitch_range;
        match command {
            OperatorCommand::ToggleGimbal => {
                self.stabilize = !self.stabilize;
                if self.stabilize {
                    self.bias.1 = self.config.bias.1;
                }
                info!("gimbal stabilization {}", self.stabilize);
            }
            OperatorCommand::GimbalUp => {
                self.bias.1 = clamp(self.bias.1 - self.config.bias_step, min, max);
            }
            OperatorCommand::GimbalDown => {
                self.bias.1 = clamp(self.bias.1 + self.config.bias_step, min, max);
            }
            _ => return false,
        }
        true
    }
}

impl<T: Number> Default for GimbalController<T> {
    fn default() -> Self {
        Self::new(GimbalConfig::new())
    }
}

fn joint<T: Number>(angle: T, range: (T, T)) -> T {
    if Float::is_finite(angle) {
        clamp(angle, range.0, range.1)
    } else {
        clamp(T::zero(), range.0, range.1)
    }
}
