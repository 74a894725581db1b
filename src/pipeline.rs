// src/pipeline.rs

//! # Flight Pipeline
//!
//! One `FlightPipeline` owns every stateful component and runs them in order
//! once per tick:
//!
//! ```text
//! sensors -> VehicleState -> mode machine (+ vision) -> controller -> mixer -> rotors
//!                        \-> gimbal -> camera
//! ```
//!
//! The host supplies sensors, operator commands, marker detections and the
//! actuators through [`FlightHost`]. The sensor sample is read and validated
//! before any carried state changes and every later step is infallible, so a
//! failed tick leaves the setpoint untouched. A sensor fault forces the mode
//! to idle and stops the rotors.

use crate::config::FlightConfig;
use crate::controller::{CascadedPidController, ControlCommand, FlightController};
use crate::error::{FlightError, SensorError};
use crate::gimbal::{GimbalCommand, GimbalController};
use crate::logging::warn;
use crate::mixer::{ActuatorSpeeds, MotorMixer, RotorCommand};
use crate::mode::{CommandOutcome, FlightMode, FlightModeStateMachine, OperatorCommand, Setpoint};
use crate::state::{RawSensorSample, VehicleState};
use crate::vision::{MarkerDetection, VisionObservation, VisionTargetAdapter};
use crate::Number;

/// The runtime the pipeline flies in: a simulator, a test double, or the
/// board support code of a real vehicle.
pub trait FlightHost<T: Number> {
    /// Reads the raw sensors for this tick.
    fn read_sensors(&mut self) -> Result<RawSensorSample<T>, SensorError>;

    /// Returns the next pending operator command without blocking.
    fn poll_command(&mut self) -> Option<OperatorCommand>;

    /// Runs the marker detector on the current camera frame.
    ///
    /// Only called while tracking. May block; a slow detector lengthens the
    /// tick but does not change its result.
    fn detect_marker(&mut self) -> Option<MarkerDetection<T>>;

    /// Writes signed rotor speeds.
    fn write_rotors(&mut self, speeds: ActuatorSpeeds<T>);

    /// Writes gimbal joint angles.
    fn write_gimbal(&mut self, command: GimbalCommand<T>);
}

/// Everything the pipeline computed in one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutput<T> {
    /// Tick number, starting at one.
    pub tick: u64,
    /// State snapshot the tick was computed from.
    pub state: VehicleState<T>,
    /// Mode after commands were applied.
    pub mode: FlightMode,
    /// Setpoint after commands and vision were applied.
    pub setpoint: Setpoint<T>,
    /// Pre-mix command values.
    pub control: ControlCommand<T>,
    /// Unsigned rotor speeds.
    pub rotors: RotorCommand<T>,
    /// Signed rotor speeds as written to the host.
    pub actuation: ActuatorSpeeds<T>,
    /// Gimbal joint angles as written to the host.
    pub gimbal: GimbalCommand<T>,
    /// Marker observation, present only while tracking.
    pub vision: Option<VisionObservation<T>>,
}

/// Explicit per-vehicle context threaded through every tick.
pub struct FlightPipeline<T: Number, C = CascadedPidController<T>> {
    machine: FlightModeStateMachine<T>,
    controller: C,
    mixer: MotorMixer<T>,
    gimbal: GimbalController<T>,
    vision: VisionTargetAdapter<T>,
}

impl<T: Number> FlightPipeline<T> {
    /// Creates a pipeline with the cascaded PID controller.
    ///
    /// ```
    /// use quad_flight_pipeline::{FlightConfig, FlightMode, FlightPipeline};
    ///
    /// let mut config = FlightConfig::<f32>::new();
    /// config.mode.takeoff_altitude = 2.0;
    ///
    /// let pipeline = FlightPipeline::with_config(config).unwrap();
    /// assert_eq!(FlightMode::Idle, pipeline.mode());
    /// ```
    pub fn with_config(config: FlightConfig<T>) -> Result<Self, FlightError> {
        Self::with_controller(config, CascadedPidController::with_config(config.controller))
    }

    /// Creates a pipeline with default settings.
    pub fn new() -> Self {
        Self::assemble(FlightConfig::new(), CascadedPidController::new())
    }
}

impl<T: Number> Default for FlightPipeline<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Number, C: FlightController<T>> FlightPipeline<T, C> {
    /// Creates a pipeline around a custom flight controller.
    pub fn with_controller(config: FlightConfig<T>, controller: C) -> Result<Self, FlightError> {
        config.validate()?;
        Ok(Self::assemble(config, controller))
    }

    fn assemble(config: FlightConfig<T>, controller: C) -> Self {
        Self {
            machine: FlightModeStateMachine::with_config(config.mode),
            controller,
            mixer: MotorMixer::new(config.mixer),
            gimbal: GimbalController::new(config.gimbal),
            vision: VisionTargetAdapter::new(config.mode.vision_gain),
        }
    }

    /// Active flight mode.
    pub fn mode(&self) -> FlightMode {
        self.machine.mode()
    }

    /// Current setpoint.
    pub fn setpoint(&self) -> Setpoint<T> {
        self.machine.setpoint()
    }

    /// Gimbal controller state.
    pub fn gimbal(&self) -> &GimbalController<T> {
        &self.gimbal
    }

    /// Runs one tick against the host.
    ///
    /// A sensor fault is fatal: the vehicle is forced to idle, zero rotor
    /// speeds are written and the error is returned.
    pub fn tick<H: FlightHost<T>>(&mut self, host: &mut H) -> Result<TickOutput<T>, FlightError> {
        let state = match host
            .read_sensors()
            .and_then(|sample| VehicleState::from_raw(&sample))
        {
            Ok(state) => state,
            Err(error) => {
                self.fault(host, error);
                return Err(error.into());
            }
        };

        self.machine.begin_tick(&state);
        while let Some(command) = host.poll_command() {
            if self.machine.apply(command) == CommandOutcome::Gimbal {
                self.gimbal.apply(command);
            }
        }

        let vision = if self.machine.mode() == FlightMode::VisionTrack {
            let detection = host.detect_marker();
            let observation = self.vision.observe(detection.as_ref());
            self.machine.apply_vision(&observation, &state, &self.vision);
            Some(observation)
        } else {
            None
        };

        let mode = self.machine.mode();
        let setpoint = self.machine.setpoint();
        let (control, rotors) = if mode.is_armed() {
            let control = self.controller.control(&state, &setpoint, mode);
            (control, self.mixer.mix(&control))
        } else {
            self.controller.reset();
            (ControlCommand::zero(), RotorCommand::zero())
        };
        debug_assert!(rotors.is_within(self.mixer.max_speed()));

        let gimbal = self.gimbal.control(&state);
        let actuation = rotors.to_actuation();
        host.write_rotors(actuation);
        host.write_gimbal(gimbal);

        Ok(TickOutput {
            tick: self.machine.tick(),
            state,
            mode,
            setpoint,
            control,
            rotors,
            actuation,
            gimbal,
            vision,
        })
    }

    fn fault<H: FlightHost<T>>(&mut self, host: &mut H, error: SensorError) {
        warn!("sensor fault: {}", error);
        self.machine.force_idle();
        self.controller.reset();
        host.write_rotors(RotorCommand::<T>::zero().to_actuation());
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::error::{ConfigError, SensorKind};
    use crate::test_utils::*;
    use core::f32::consts::FRAC_PI_2;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::collections::VecDeque;
    use std::time::Duration;
    use std::vec::Vec;

    struct MockHost {
        sample: Result<RawSensorSample<f32>, SensorError>,
        commands: VecDeque<OperatorCommand>,
        marker: Option<MarkerDetection<f32>>,
        detector_delay: Duration,
        detections: usize,
        rotors: Vec<ActuatorSpeeds<f32>>,
        gimbals: Vec<GimbalCommand<f32>>,
    }

    impl MockHost {
        fn at(x: f32, y: f32, z: f32) -> Self {
            MockHost {
                sample: Ok(sample_at(x, y, z)),
                commands: VecDeque::new(),
                marker: None,
                detector_delay: Duration::ZERO,
                detections: 0,
                rotors: Vec::new(),
                gimbals: Vec::new(),
            }
        }

        fn command(&mut self, command: OperatorCommand) -> &mut Self {
            self.commands.push_back(command);
            self
        }

        fn move_to(&mut self, x: f32, y: f32, z: f32) {
            self.sample = Ok(sample_at(x, y, z));
        }
    }

    impl FlightHost<f32> for MockHost {
        fn read_sensors(&mut self) -> Result<RawSensorSample<f32>, SensorError> {
            self.sample
        }

        fn poll_command(&mut self) -> Option<OperatorCommand> {
            self.commands.pop_front()
        }

        fn detect_marker(&mut self) -> Option<MarkerDetection<f32>> {
            self.detections += 1;
            if !self.detector_delay.is_zero() {
                std::thread::sleep(self.detector_delay);
            }
            self.marker
        }

        fn write_rotors(&mut self, speeds: ActuatorSpeeds<f32>) {
            self.rotors.push(speeds);
        }

        fn write_gimbal(&mut self, command: GimbalCommand<f32>) {
            self.gimbals.push(command);
        }
    }

    /// Level, still, facing heading zero.
    fn sample_at(x: f32, y: f32, z: f32) -> RawSensorSample<f32> {
        RawSensorSample {
            attitude: (-FRAC_PI_2, 0.0, 0.0),
            angular_rate: (0.0, 0.0, 0.0),
            position: (x, y, z),
            magnetic: (1.0, 0.0, 0.0),
        }
    }

    fn marker(cx: f32, cy: f32) -> MarkerDetection<f32> {
        MarkerDetection {
            corners: [
                (cx - 5.0, cy - 5.0),
                (cx + 5.0, cy - 5.0),
                (cx + 5.0, cy + 5.0),
                (cx - 5.0, cy + 5.0),
            ],
            frame_width: 400.0,
            frame_height: 240.0,
        }
    }

    /// Arm on the ground and climb to a steady hover at 3 m.
    fn hovering(host: &mut MockHost) -> FlightPipeline<f32> {
        let mut pipeline = FlightPipeline::new();
        host.move_to(0.0, 0.0, 0.0);
        host.command(OperatorCommand::Arm);
        pipeline.tick(host).unwrap();
        host.move_to(0.0, 0.0, 3.0);
        for _ in 0..40 {
            pipeline.tick(host).unwrap();
        }
        assert_eq!(FlightMode::Hover, pipeline.mode());
        pipeline
    }

    /// Test that an idle vehicle keeps its rotors stopped.
    #[test]
    fn test_pipeline_idle_rotors_stopped() {
        let mut pipeline = FlightPipeline::<f32>::new();
        let mut host = MockHost::at(0.0, 0.0, 0.0);
        let output = pipeline.tick(&mut host).unwrap();

        assert_eq!(FlightMode::Idle, output.mode);
        assert_eq!(RotorCommand::zero(), output.rotors);
        assert_eq!(ControlCommand::zero(), output.control);
        assert_eq!(Some(&RotorCommand::<f32>::zero().to_actuation()), host.rotors.last());
        assert_eq!(1, host.gimbals.len());
    }

    /// Test arming in the tick the command arrives.
    #[test]
    fn test_pipeline_arm_same_tick() {
        let mut pipeline = FlightPipeline::<f32>::new();
        let mut host = MockHost::at(0.0, 0.0, 0.0);
        host.command(OperatorCommand::Arm);
        let output = pipeline.tick(&mut host).unwrap();

        assert_eq!(FlightMode::Armed, output.mode);
        assert!(value_close(3.0, output.setpoint.target_z));
        // Full climb: 68.5 + 3
        for speed in output.rotors.as_array() {
            assert!(value_close(71.5, speed));
        }
    }

    /// Test that a level vehicle on its setpoint spins all rotors equally.
    #[test]
    fn test_pipeline_steady_hover() {
        let mut host = MockHost::at(0.0, 0.0, 3.0);
        let mut pipeline = hovering(&mut host);
        let output = pipeline.tick(&mut host).unwrap();

        // 68.5 + 3 * 0.6^3
        for speed in output.rotors.as_array() {
            assert!(value_close(69.148, speed));
        }
        let written = host.rotors.last().unwrap();
        assert!(value_close(69.148, written.front_left));
        assert!(value_close(-69.148, written.front_right));
        assert!(value_close(-69.148, written.rear_left));
        assert!(value_close(69.148, written.rear_right));
    }

    /// Test that a sensor fault forces idle and stops the rotors.
    #[test]
    fn test_pipeline_sensor_fault() {
        let mut host = MockHost::at(0.0, 0.0, 3.0);
        let mut pipeline = hovering(&mut host);
        let setpoint = pipeline.setpoint();

        host.sample = Err(SensorError::Unavailable(SensorKind::Position));
        let result = pipeline.tick(&mut host);
        assert_eq!(
            Err(FlightError::Sensor(SensorError::Unavailable(
                SensorKind::Position
            ))),
            result
        );
        assert_eq!(FlightMode::Idle, pipeline.mode());
        assert_eq!(Some(&RotorCommand::<f32>::zero().to_actuation()), host.rotors.last());
        assert_eq!(setpoint, pipeline.setpoint(), "Setpoint is left untouched.");
    }

    /// Test that malformed readings are faults as well.
    #[test]
    fn test_pipeline_malformed_sample() {
        let mut host = MockHost::at(0.0, 0.0, 3.0);
        let mut pipeline = hovering(&mut host);
        let mut sample = sample_at(0.0, 0.0, 3.0);
        sample.attitude.1 = f32::NAN;
        host.sample = Ok(sample);

        assert_eq!(
            Err(FlightError::Sensor(SensorError::Malformed(
                SensorKind::Attitude
            ))),
            pipeline.tick(&mut host)
        );
        assert_eq!(FlightMode::Idle, pipeline.mode());
    }

    /// Test that commands within one tick apply in arrival order.
    #[test]
    fn test_pipeline_command_order() {
        let mut pipeline = FlightPipeline::<f32>::new();
        let mut host = MockHost::at(0.0, 0.0, 0.0);
        host.command(OperatorCommand::Arm)
            .command(OperatorCommand::Up)
            .command(OperatorCommand::Land);
        let output = pipeline.tick(&mut host).unwrap();

        assert_eq!(FlightMode::Landing, output.mode);
        assert!(value_close(0.0, output.setpoint.target_z));

        let output = pipeline.tick(&mut host).unwrap();
        assert_eq!(FlightMode::Idle, output.mode, "Already on the ground.");

        let mut pipeline = FlightPipeline::<f32>::new();
        host.command(OperatorCommand::Arm)
            .command(OperatorCommand::Land)
            .command(OperatorCommand::Up);
        let output = pipeline.tick(&mut host).unwrap();
        assert!(value_close(0.01, output.setpoint.target_z));
    }

    /// Test that gimbal commands reach the gimbal.
    #[test]
    fn test_pipeline_gimbal_commands() {
        let mut pipeline = FlightPipeline::<f32>::new();
        let mut host = MockHost::at(0.0, 0.0, 0.0);
        host.command(OperatorCommand::ToggleGimbal)
            .command(OperatorCommand::ToggleGimbal)
            .command(OperatorCommand::GimbalUp);
        pipeline.tick(&mut host).unwrap();

        assert!(!pipeline.gimbal().is_stabilizing(), "Repeat is debounced.");
        assert!(value_close(1.595, pipeline.gimbal().bias().1));
        assert_eq!(FlightMode::Idle, pipeline.mode());
    }

    /// Test tracking a marker and holding when it is lost.
    #[test]
    fn test_pipeline_vision_track_and_hold() {
        let mut host = MockHost::at(0.0, 0.0, 3.0);
        let mut pipeline = hovering(&mut host);
        assert_eq!(0, host.detections, "Detector idle outside tracking.");

        host.command(OperatorCommand::ToggleVision);
        host.marker = Some(marker(200.0, 60.0));
        let output = pipeline.tick(&mut host).unwrap();
        assert_eq!(FlightMode::VisionTrack, output.mode);
        assert_eq!(1, host.detections);
        // dy = -0.5, forward = 0.5 * 1.5
        assert!(value_close(-0.75, output.setpoint.target_x));
        assert!(value_close(0.0, output.setpoint.target_y));
        // The position loop sees the vision error directly.
        assert!(value_close(-0.75, output.control.pitch));
        let tracked = output;

        host.marker = None;
        let output = pipeline.tick(&mut host).unwrap();
        assert_eq!(Some(VisionObservation::NoTarget), output.vision);
        assert_eq!(tracked.setpoint, output.setpoint, "Setpoint held.");
        assert!(value_close(tracked.control.pitch, output.control.pitch));
        assert!(output.rotors.is_within(100.0));
    }

    /// Test that a slow detector changes nothing but the tick duration.
    #[test]
    fn test_pipeline_slow_detector() {
        let mut fast_host = MockHost::at(0.0, 0.0, 3.0);
        let mut fast = hovering(&mut fast_host);
        let mut slow_host = MockHost::at(0.0, 0.0, 3.0);
        let mut slow = hovering(&mut slow_host);
        slow_host.detector_delay = Duration::from_millis(20);

        for host in [&mut fast_host, &mut slow_host] {
            host.command(OperatorCommand::ToggleVision);
            host.marker = Some(marker(300.0, 100.0));
        }
        for _ in 0..3 {
            let expected = fast.tick(&mut fast_host).unwrap();
            let output = slow.tick(&mut slow_host).unwrap();
            assert_eq!(expected, output);
        }
        assert_eq!(fast_host.rotors, slow_host.rotors);
    }

    /// Test that an invalid configuration is rejected.
    #[test]
    fn test_pipeline_rejects_invalid_config() {
        let mut config = FlightConfig::<f32>::new();
        config.controller.dt = 0.0;
        assert!(matches!(
            FlightPipeline::with_config(config),
            Err(FlightError::Config(ConfigError::NonPositiveTimeStep))
        ));
    }

    /// Test that outputs stay in bounds for random states and commands.
    #[test]
    fn test_pipeline_bounds_property() {
        const COMMANDS: [OperatorCommand; 15] = [
            OperatorCommand::Arm,
            OperatorCommand::Land,
            OperatorCommand::ToggleVision,
            OperatorCommand::ToggleGimbal,
            OperatorCommand::ReturnHome,
            OperatorCommand::Forward,
            OperatorCommand::Backward,
            OperatorCommand::Left,
            OperatorCommand::Right,
            OperatorCommand::Up,
            OperatorCommand::Down,
            OperatorCommand::YawLeft,
            OperatorCommand::YawRight,
            OperatorCommand::GimbalUp,
            OperatorCommand::GimbalDown,
        ];
        let mut pipeline = FlightPipeline::<f32>::new();
        let mut host = MockHost::at(0.0, 0.0, 0.0);
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..5_000 {
            host.sample = Ok(RawSensorSample {
                attitude: (
                    rng.gen_range(-3.0..3.0),
                    rng.gen_range(-1.5..1.5),
                    rng.gen_range(-3.0..3.0),
                ),
                angular_rate: (
                    rng.gen_range(-20.0..20.0),
                    rng.gen_range(-20.0..20.0),
                    rng.gen_range(-20.0..20.0),
                ),
                position: (
                    rng.gen_range(-50.0..50.0),
                    rng.gen_range(-50.0..50.0),
                    rng.gen_range(0.0..20.0),
                ),
                magnetic: (
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                ),
            });
            for _ in 0..rng.gen_range(0..3) {
                host.command(COMMANDS[rng.gen_range(0..COMMANDS.len())]);
            }
            host.marker = if rng.gen_bool(0.5) {
                Some(marker(rng.gen_range(0.0..400.0), rng.gen_range(0.0..240.0)))
            } else {
                None
            };

            let output = pipeline.tick(&mut host).unwrap();
            assert!(output.rotors.is_within(100.0), "{:?}", output);
            assert!((-0.5..=0.5).contains(&output.gimbal.roll));
            assert!((-0.5..=1.7).contains(&output.gimbal.pitch));
            assert!((-1.7..=1.7).contains(&output.gimbal.yaw));
        }
    }
}
