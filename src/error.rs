// src/error.rs

//! Error types for the flight pipeline.
//!
//! Only two things can stop a tick: a sensor that cannot be read or returns a
//! non-finite sample, and a configuration the pipeline refuses to fly with.
//! Rejected operator commands and missing vision targets are not errors.

use core::fmt;
use thiserror::Error;

/// Sensor feeding the state snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorKind {
    /// Inertial unit roll, pitch, yaw.
    Attitude,
    /// Gyro angular rate.
    AngularRate,
    /// GPS position.
    Position,
    /// Compass magnetic vector.
    Magnetometer,
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SensorKind::Attitude => "attitude",
            SensorKind::AngularRate => "angular rate",
            SensorKind::Position => "position",
            SensorKind::Magnetometer => "magnetometer",
        };
        f.write_str(name)
    }
}

/// Sensor faults. Always fatal for the tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// The host could not provide a sample.
    #[error("{0} sensor unavailable")]
    Unavailable(SensorKind),
    /// The sample contained NaN or infinity.
    #[error("{0} sample is not finite")]
    Malformed(SensorKind),
}

/// Configuration rejected by `FlightConfig::validate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// The control tick period is zero, negative, infinite or NaN.
    #[error("time step must be positive and finite")]
    NonPositiveTimeStep,
    /// A gain, step, altitude or bound is infinite or NaN.
    #[error("{0} must be finite")]
    NonFinite(&'static str),
    /// A (min, max) range has min above max.
    #[error("{0} range is inverted")]
    InvertedRange(&'static str),
    /// A limit or threshold is negative.
    #[error("{0} limit must be non-negative")]
    NegativeLimit(&'static str),
    /// The rotor speed ceiling is not positive.
    #[error("maximum rotor speed must be positive")]
    NonPositiveMaxSpeed,
    /// The hover baseline lies outside the rotor speed range.
    #[error("hover throttle must lie within [0, max speed]")]
    HoverThrottleOutOfRange,
}

/// Top-level pipeline error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlightError {
    /// Sensor fault. Actuation has been halted.
    #[error("sensor fault: {0}")]
    Sensor(#[from] SensorError),
    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::string::ToString;

    /// Test the error messages.
    #[test]
    fn test_error_display() {
        let err = FlightError::from(SensorError::Malformed(SensorKind::Magnetometer));
        assert_eq!(
            "sensor fault: magnetometer sample is not finite",
            err.to_string()
        );
        let err = FlightError::from(ConfigError::InvertedRange("gimbal yaw"));
        assert_eq!(
            "invalid configuration: gimbal yaw range is inverted",
            err.to_string()
        );
        let err = FlightError::from(ConfigError::NonFinite("vision gain"));
        assert_eq!(
            "invalid configuration: vision gain must be finite",
            err.to_string()
        );
    }
}
