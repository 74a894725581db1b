// src/vision.rs

//! # Vision Target Adapter
//!
//! Converts the output of a fiducial marker detector into a normalized,
//! body-relative error. Pixel detection itself belongs to the host; this
//! module only sees the four marker corners and the frame size.
//!
//! A marker centered in the frame yields (0, 0) and a marker on the frame edge
//! yields ±1 on that axis. Degenerate geometry never produces NaN or infinity:
//! any component that cannot be computed is reported as zero.

use crate::Number;
use num_traits::Float;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Corners of one detected marker, in pixels, with the frame it was found in.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MarkerDetection<T> {
    /// Corner (x, y) pixel coordinates in detector order. Corners 0 and 2 are
    /// diagonal, as are 1 and 3.
    pub corners: [(T, T); 4],
    /// Frame width in pixels.
    pub frame_width: T,
    /// Frame height in pixels.
    pub frame_height: T,
}

/// Marker offset from the frame center, normalized to half-frame units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VisionError<T> {
    /// Horizontal offset, positive to the right of center.
    pub dx: T,
    /// Vertical offset, positive below center.
    pub dy: T,
}

/// Result of one vision observation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VisionObservation<T> {
    /// No marker in the frame.
    NoTarget,
    /// Marker found at the given offset.
    Target(VisionError<T>),
}

/// Converts marker detections into body-relative errors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisionTargetAdapter<T> {
    gain: T,
}

impl<T: Number> VisionTargetAdapter<T> {
    /// Creates an adapter scaling normalized offsets by `gain`.
    pub fn new(gain: T) -> Self {
        Self { gain }
    }

    /// Observes the detector output for this tick.
    pub fn observe(&self, detection: Option<&MarkerDetection<T>>) -> VisionObservation<T> {
        match detection {
            Some(detection) => VisionObservation::Target(normalized_error(detection)),
            None => VisionObservation::NoTarget,
        }
    }

    /// Body-frame horizontal offset (forward, lateral) of the vehicle from
    /// the marker, in the same sense as measured minus target position.
    ///
    /// The down-facing camera has its top edge toward the tail, so image rows
    /// run against the forward axis and columns along the lateral axis.
    pub fn displacement(&self, error: &VisionError<T>) -> (T, T) {
        (-error.dy * self.gain, error.dx * self.gain)
    }
}

/// Marker centroid from the midpoints of its two diagonals.
pub fn marker_centroid<T: Number>(corners: &[(T, T); 4]) -> (T, T) {
    let two = T::one() + T::one();
    let midpoint = |a: (T, T), b: (T, T)| ((a.0 + b.0) / two, (a.1 + b.1) / two);
    midpoint(
        midpoint(corners[0], corners[2]),
        midpoint(corners[1], corners[3]),
    )
}

/// Normalized offset of the marker centroid from the frame center.
pub fn normalized_error<T: Number>(detection: &MarkerDetection<T>) -> VisionError<T> {
    let two = T::one() + T::one();
    let (cx, cy) = marker_centroid(&detection.corners);
    VisionError {
        dx: normalize(cx, detection.frame_width / two),
        dy: normalize(cy, detection.frame_height / two),
    }
}

fn normalize<T: Number>(pixel: T, half: T) -> T {
    if !(Float::abs(half) > <T as Float>::epsilon()) {
        return T::zero();
    }
    let value = (pixel - half) / half;
    if Float::is_finite(value) {
        value
    } else {
        T::zero()
    }
}
