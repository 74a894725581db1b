// src/pid.rs

//! # PID Control Module
//!
//! This module provides compute callbacks and control data structures for
//! each loop of the cascaded flight controller. Every callback plugs into a
//! `piddiy::PidController` and returns `(error, integral, derivative)`; the
//! controller weighs them with its `kp`, `ki` and `kd`.

pub mod attitude;
pub use attitude::*;
pub mod heading;
pub use heading::*;
pub mod position;
pub use position::*;
pub mod vertical;
pub use vertical::*;
