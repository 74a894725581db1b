// src/state.rs

//! # Vehicle State Snapshot
//!
//! One immutable `VehicleState` is built per tick from the raw sensor values
//! supplied by the host. The builder applies the hover roll reference and
//! derives a heading from the magnetic vector. Nothing is filtered or fused:
//! attitude, rates and position arrive already resolved.

use crate::error::{SensorError, SensorKind};
use crate::Number;
use num_traits::Float;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Raw sensor values for one tick.
///
/// Position is (x, y, z) in the world frame with z as altitude; hosts with a
/// different vertical axis reorder before handing the sample over.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawSensorSample<T> {
    /// Inertial unit (roll, pitch, yaw) in radians.
    pub attitude: (T, T, T),
    /// Gyro (roll, pitch, yaw) rates in rad/s.
    pub angular_rate: (T, T, T),
    /// GPS (x, y, z) position.
    pub position: (T, T, T),
    /// Compass north vector in the body frame.
    pub magnetic: (T, T, T),
}

/// Resolved vehicle state for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VehicleState<T> {
    /// Body roll in radians, zero at the hover attitude.
    pub roll: T,
    /// Body pitch in radians.
    pub pitch: T,
    /// Body yaw in radians.
    pub yaw: T,
    /// Roll rate in rad/s.
    pub roll_rate: T,
    /// Pitch rate in rad/s.
    pub pitch_rate: T,
    /// Yaw rate in rad/s.
    pub yaw_rate: T,
    /// World X position.
    pub x: T,
    /// World Y position.
    pub y: T,
    /// Altitude.
    pub z: T,
    /// Compass heading in (-π, π].
    pub heading: T,
}

impl<T: Number> VehicleState<T> {
    /// Builds the snapshot, rejecting any non-finite input.
    pub fn from_raw(sample: &RawSensorSample<T>) -> Result<Self, SensorError> {
        let (roll, pitch, yaw) = finite(sample.attitude, SensorKind::Attitude)?;
        let (roll_rate, pitch_rate, yaw_rate) =
            finite(sample.angular_rate, SensorKind::AngularRate)?;
        let (x, y, z) = finite(sample.position, SensorKind::Position)?;
        let magnetic = finite(sample.magnetic, SensorKind::Magnetometer)?;

        Ok(Self {
            roll: roll + T::FRAC_PI_2(),
            pitch,
            yaw,
            roll_rate,
            pitch_rate,
            yaw_rate,
            x,
            y,
            z,
            heading: heading_from_magnetic(magnetic),
        })
    }
}

/// Heading from a compass north vector, wrapped once into (-π, π].
///
/// `atan2` yields [-π, π], so after the quarter-turn shift a single wrap is
/// enough. The branch cut at exactly -π maps to π.
pub fn heading_from_magnetic<T: Number>(magnetic: (T, T, T)) -> T {
    let heading = Float::atan2(magnetic.0, magnetic.1) - T::FRAC_PI_2();
    if heading <= -T::PI() {
        heading + T::PI() + T::PI()
    } else {
        heading
    }
}

fn finite<T: Number>(values: (T, T, T), kind: SensorKind) -> Result<(T, T, T), SensorError> {
    if Float::is_finite(values.0) && Float::is_finite(values.1) && Float::is_finite(values.2) {
        Ok(values)
    } else {
        Err(SensorError::Malformed(kind))
    }
}
