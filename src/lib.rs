// src/lib.rs

//! # Quadrotor Flight Pipeline
//!
//! A `no_std`, no-alloc flight-control pipeline for an X-configuration
//! quadrotor with a stabilized camera gimbal. Each tick turns one set of
//! sensor readings and any pending operator commands into four rotor speeds
//! and three gimbal angles:
//!
//! - [`state`] builds the per-tick `VehicleState` snapshot.
//! - [`mode`] runs the operator-driven flight mode state machine and owns the
//!   setpoint.
//! - [`vision`] turns fiducial marker detections into body-relative errors.
//! - [`controller`] cascades position, attitude, heading and vertical PID
//!   loops built on `piddiy`.
//! - [`mixer`] maps command values onto the four rotors.
//! - [`gimbal`] counter-rotates the camera against body rates.
//! - [`pipeline`] threads all of the above through one tick against a
//!   [`FlightHost`].
//!
//! ```
//! use quad_flight_pipeline::FlightPipeline;
//!
//! let pipeline = FlightPipeline::<f32>::new();
//! assert!(!pipeline.mode().is_armed());
//! ```

#![no_std]
#![deny(missing_docs)]

mod logging;

pub mod config;
pub mod controller;
pub mod error;
pub mod gimbal;
pub mod mixer;
pub mod mode;
pub mod pid;
pub mod pipeline;
pub mod state;
pub mod vision;

#[doc(inline)]
pub use config::{
    clamp, AxisGains, ControllerConfig, FlightConfig, Gains, GimbalConfig, MixerConfig,
    ModeConfig, Number,
};
#[doc(inline)]
pub use controller::{CascadedPidController, ControlCommand, FlightController};
#[doc(inline)]
pub use error::{ConfigError, FlightError, SensorError, SensorKind};
#[doc(inline)]
pub use gimbal::{GimbalCommand, GimbalController};
#[doc(inline)]
pub use mixer::{ActuatorSpeeds, MotorMixer, RotorCommand};
#[doc(inline)]
pub use mode::{CommandOutcome, FlightMode, FlightModeStateMachine, OperatorCommand, Setpoint};
#[doc(inline)]
pub use pipeline::{FlightHost, FlightPipeline, TickOutput};
#[doc(inline)]
pub use state::{RawSensorSample, VehicleState};
#[doc(inline)]
pub use vision::{MarkerDetection, VisionError, VisionObservation, VisionTargetAdapter};

#[cfg(test)]
mod test_utils;
