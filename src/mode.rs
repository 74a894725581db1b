// src/mode.rs

//! # Flight Mode State Machine
//!
//! Owns the two pieces of state carried from one tick to the next: the active
//! `FlightMode` and the `Setpoint`. Nothing else in the pipeline mutates them.
//!
//! Each tick runs in three phases:
//!
//! 1. `begin_tick` applies the automatic transitions that depend on the
//!    measured state (takeoff complete, touchdown, arrival home).
//! 2. `apply` is called once per operator command, in arrival order.
//! 3. `apply_vision` retargets the horizontal setpoint while tracking a marker.
//!
//! Commands that make no sense in the current mode are ignored and logged.
//! Discrete commands are debounced so a held key cannot toggle a mode back and
//! forth on consecutive ticks.

use crate::config::ModeConfig;
use crate::controller::body_to_world;
use crate::logging::info;
use crate::state::VehicleState;
use crate::vision::{VisionObservation, VisionTargetAdapter};
use crate::{clamp, Number};
use num_traits::Float;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Active flight mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FlightMode {
    /// Motors stopped. The only mode in which the vehicle is disarmed.
    #[default]
    Idle,
    /// Armed this tick; climbing starts on the next one.
    Armed,
    /// Climbing to the takeoff altitude.
    Takeoff,
    /// Holding the operator setpoint.
    Hover,
    /// Following a visual marker.
    VisionTrack,
    /// Descending to the ground.
    Landing,
}

impl FlightMode {
    /// Whether the rotors may spin in this mode.
    pub fn is_armed(self) -> bool {
        self != FlightMode::Idle
    }

    fn is_airborne(self) -> bool {
        matches!(
            self,
            FlightMode::Armed | FlightMode::Takeoff | FlightMode::Hover | FlightMode::VisionTrack
        )
    }
}

/// Position, altitude and yaw targets.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Setpoint<T> {
    /// Target world X position.
    pub target_x: T,
    /// Target world Y position.
    pub target_y: T,
    /// Target altitude.
    pub target_z: T,
    /// Target heading in radians, within [-π, π].
    pub target_yaw: T,
}

impl<T: Number> Setpoint<T> {
    /// Creates a setpoint.
    pub fn new(target_x: T, target_y: T, target_z: T, target_yaw: T) -> Self {
        Self {
            target_x,
            target_y,
            target_z,
            target_yaw,
        }
    }
}

/// Symbolic operator commands drained from the host each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OperatorCommand {
    /// Arm and take off.
    Arm,
    /// Descend and disarm on touchdown.
    Land,
    /// Switch between hover and marker tracking.
    ToggleVision,
    /// Switch gimbal rate stabilization on or off.
    ToggleGimbal,
    /// Fly back over the origin at the home altitude.
    ReturnHome,
    /// Nudge the target along +X.
    Forward,
    /// Nudge the target along -X.
    Backward,
    /// Nudge the target along +Y.
    Left,
    /// Nudge the target along -Y.
    Right,
    /// Raise the target altitude.
    Up,
    /// Lower the target altitude.
    Down,
    /// Turn the target heading counterclockwise.
    YawLeft,
    /// Turn the target heading clockwise.
    YawRight,
    /// Tilt the camera pitch bias up.
    GimbalUp,
    /// Tilt the camera pitch bias down.
    GimbalDown,
}

const DEBOUNCED_COMMANDS: usize = 5;

impl OperatorCommand {
    /// Debounce slot for discrete commands. Nudges are never debounced.
    fn debounce_slot(self) -> Option<usize> {
        match self {
            OperatorCommand::Arm => Some(0),
            OperatorCommand::Land => Some(1),
            OperatorCommand::ToggleVision => Some(2),
            OperatorCommand::ToggleGimbal => Some(3),
            OperatorCommand::ReturnHome => Some(4),
            _ => None,
        }
    }
}

/// What became of one operator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandOutcome {
    /// The command changed the mode or setpoint.
    Applied,
    /// The command is not valid in the current mode.
    Rejected,
    /// A repeat of the command arrived inside the debounce window.
    Debounced,
    /// The command passed debouncing and belongs to the gimbal.
    Gimbal,
}

/// Operator-driven flight mode state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightModeStateMachine<T> {
    config: ModeConfig<T>,
    mode: FlightMode,
    setpoint: Setpoint<T>,
    tick: u64,
    last_accepted: [Option<u64>; DEBOUNCED_COMMANDS],
    returning_home: bool,
}

impl<T: Number> FlightModeStateMachine<T> {
    /// Creates an idle machine with a zero setpoint.
    pub fn with_config(config: ModeConfig<T>) -> Self {
        Self {
            config,
            mode: FlightMode::Idle,
            setpoint: Setpoint::new(T::zero(), T::zero(), T::zero(), T::zero()),
            tick: 0,
            last_accepted: [None; DEBOUNCED_COMMANDS],
            returning_home: false,
        }
    }

    /// Creates a machine with default settings.
    pub fn new() -> Self {
        Self::with_config(ModeConfig::new())
    }

    /// Active mode.
    pub fn mode(&self) -> FlightMode {
        self.mode
    }

    /// Current setpoint.
    pub fn setpoint(&self) -> Setpoint<T> {
        self.setpoint
    }

    /// Number of ticks begun so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Whether a return-home is still in progress.
    pub fn is_returning_home(&self) -> bool {
        self.returning_home
    }

    /// Starts a tick and applies the state-driven transitions.
    pub fn begin_tick(&mut self, state: &VehicleState<T>) {
        self.tick = self.tick.wrapping_add(1);

        match self.mode {
            FlightMode::Landing if state.z <= self.config.landed_altitude => {
                self.returning_home = false;
                self.transition(FlightMode::Idle);
            }
            FlightMode::Armed => self.transition(FlightMode::Takeoff),
            FlightMode::Takeoff
                if Float::abs(state.z - self.setpoint.target_z) <= self.config.takeoff_tolerance =>
            {
                self.transition(FlightMode::Hover);
            }
            _ => {}
        }

        if self.returning_home && self.mode.is_airborne() && self.is_home(state) {
            info!("home reached at tick {}", self.tick);
            self.returning_home = false;
            if self.config.land_at_home {
                self.land();
            }
        }
    }

    /// Applies one operator command.
    pub fn apply(&mut self, command: OperatorCommand) -> CommandOutcome {
        let slot = command.debounce_slot();
        if let Some(last) = slot.and_then(|slot| self.last_accepted[slot]) {
            if self.tick.wrapping_sub(last) < self.config.debounce_ticks {
                info!("{} debounced in {}", command, self.mode);
                return CommandOutcome::Debounced;
            }
        }

        let outcome = self.dispatch(command);
        match outcome {
            CommandOutcome::Applied | CommandOutcome::Gimbal => {
                if let Some(slot) = slot {
                    self.last_accepted[slot] = Some(self.tick);
                }
            }
            CommandOutcome::Rejected => info!("{} ignored in {}", command, self.mode),
            CommandOutcome::Debounced => {}
        }
        outcome
    }

    /// Retargets the horizontal setpoint on the marker while tracking.
    ///
    /// The body-frame offset from the marker is rotated into the world frame
    /// and the target placed so the position loop sees exactly that offset
    /// on this tick. Without
    /// a marker the previous setpoint is held.
    pub fn apply_vision(
        &mut self,
        observation: &VisionObservation<T>,
        state: &VehicleState<T>,
        adapter: &VisionTargetAdapter<T>,
    ) {
        if self.mode != FlightMode::VisionTrack {
            return;
        }
        if let VisionObservation::Target(error) = observation {
            let (world_x, world_y) = body_to_world(state.heading, adapter.displacement(error));
            self.setpoint.target_x = state.x - world_x;
            self.setpoint.target_y = state.y - world_y;
        }
    }

    /// Drops to idle after a fatal fault.
    pub fn force_idle(&mut self) {
        self.returning_home = false;
        self.transition(FlightMode::Idle);
    }

    fn dispatch(&mut self, command: OperatorCommand) -> CommandOutcome {
        let config = self.config;
        match command {
            OperatorCommand::Arm => match self.mode {
                FlightMode::Idle | FlightMode::Landing => {
                    self.setpoint.target_z = config.takeoff_altitude;
                    self.transition(FlightMode::Armed);
                    CommandOutcome::Applied
                }
                _ => CommandOutcome::Rejected,
            },
            OperatorCommand::Land if self.mode.is_airborne() => {
                self.land();
                CommandOutcome::Applied
            }
            OperatorCommand::ToggleVision => match self.mode {
                FlightMode::Armed | FlightMode::Takeoff | FlightMode::Hover => {
                    self.transition(FlightMode::VisionTrack);
                    CommandOutcome::Applied
                }
                FlightMode::VisionTrack => {
                    self.transition(FlightMode::Hover);
                    CommandOutcome::Applied
                }
                _ => CommandOutcome::Rejected,
            },
            OperatorCommand::ReturnHome if self.mode.is_armed() => {
                self.setpoint =
                    Setpoint::new(T::zero(), T::zero(), config.home_altitude, T::zero());
                self.returning_home = true;
                if matches!(self.mode, FlightMode::Landing | FlightMode::VisionTrack) {
                    self.transition(FlightMode::Hover);
                }
                CommandOutcome::Applied
            }
            OperatorCommand::Land | OperatorCommand::ReturnHome => CommandOutcome::Rejected,
            OperatorCommand::ToggleGimbal
            | OperatorCommand::GimbalUp
            | OperatorCommand::GimbalDown => CommandOutcome::Gimbal,
            OperatorCommand::Forward => {
                self.setpoint.target_x = self.setpoint.target_x + config.position_step;
                CommandOutcome::Applied
            }
            OperatorCommand::Backward => {
                self.setpoint.target_x = self.setpoint.target_x - config.position_step;
                CommandOutcome::Applied
            }
            OperatorCommand::Left => {
                self.setpoint.target_y = self.setpoint.target_y + config.position_step;
                CommandOutcome::Applied
            }
            OperatorCommand::Right => {
                self.setpoint.target_y = self.setpoint.target_y - config.position_step;
                CommandOutcome::Applied
            }
            OperatorCommand::Up => {
                self.setpoint.target_z = self.setpoint.target_z + config.altitude_step;
                CommandOutcome::Applied
            }
            OperatorCommand::Down => {
                self.setpoint.target_z =
                    Float::max(self.setpoint.target_z - config.altitude_step, T::zero());
                CommandOutcome::Applied
            }
            OperatorCommand::YawLeft => {
                self.setpoint.target_yaw =
                    clamp(self.setpoint.target_yaw + config.yaw_step, -T::PI(), T::PI());
                CommandOutcome::Applied
            }
            OperatorCommand::YawRight => {
                self.setpoint.target_yaw =
                    clamp(self.setpoint.target_yaw - config.yaw_step, -T::PI(), T::PI());
                CommandOutcome::Applied
            }
        }
    }

    fn land(&mut self) {
        self.setpoint.target_z = T::zero();
        self.returning_home = false;
        self.transition(FlightMode::Landing);
    }

    fn is_home(&self, state: &VehicleState<T>) -> bool {
        let radius = self.config.home_radius;
        Float::abs(state.x - self.setpoint.target_x) <= radius
            && Float::abs(state.y - self.setpoint.target_y) <= radius
    }

    fn transition(&mut self, to: FlightMode) {
        if self.mode != to {
            info!("mode {} -> {} at tick {}", self.mode, to, self.tick);
            self.mode = to;
        }
    }
}
