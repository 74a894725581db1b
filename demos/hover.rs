// demos/hover.rs

//! Simulated session: take off, hover, track a marker, then land.
//!
//! The host is a crude point-mass model. It is only good enough to show the
//! pipeline closing its loops, not to predict a real airframe.

use quad_flight_pipeline::{
    ActuatorSpeeds, FlightConfig, FlightHost, FlightPipeline, GimbalCommand, MarkerDetection,
    OperatorCommand, RawSensorSample, SensorError,
};
use std::collections::VecDeque;
use std::f32::consts::FRAC_PI_2;

const DT: f32 = 0.008;
const HOVER_THROTTLE: f32 = 68.5;
const FRAME: (f32, f32) = (400.0, 240.0);
const MARKER: (f32, f32) = (1.5, -0.8);

struct SimHost {
    position: (f32, f32, f32),
    velocity: (f32, f32, f32),
    attitude: (f32, f32),
    tick: u64,
    script: VecDeque<(u64, OperatorCommand)>,
    pending: VecDeque<OperatorCommand>,
    gimbal: GimbalCommand<f32>,
}

impl SimHost {
    fn new(script: &[(u64, OperatorCommand)]) -> Self {
        SimHost {
            position: (0.0, 0.0, 0.0),
            velocity: (0.0, 0.0, 0.0),
            attitude: (0.0, 0.0),
            tick: 0,
            script: script.iter().copied().collect(),
            pending: VecDeque::new(),
            gimbal: GimbalCommand::default(),
        }
    }
}

impl FlightHost<f32> for SimHost {
    fn read_sensors(&mut self) -> Result<RawSensorSample<f32>, SensorError> {
        self.tick += 1;
        while let Some(&(at, command)) = self.script.front() {
            if at > self.tick {
                break;
            }
            self.pending.push_back(command);
            self.script.pop_front();
        }

        Ok(RawSensorSample {
            attitude: (self.attitude.0 - FRAC_PI_2, self.attitude.1, 0.0),
            angular_rate: (0.0, 0.0, 0.0),
            position: self.position,
            magnetic: (1.0, 0.0, 0.0),
        })
    }

    fn poll_command(&mut self) -> Option<OperatorCommand> {
        self.pending.pop_front()
    }

    fn detect_marker(&mut self) -> Option<MarkerDetection<f32>> {
        // Offset of the vehicle from the marker, seen by a down-facing camera.
        let gain = FlightConfig::<f32>::new().mode.vision_gain;
        let dx = (self.position.1 - MARKER.1) / gain;
        let dy = -(self.position.0 - MARKER.0) / gain;
        if dx.abs() > 1.0 || dy.abs() > 1.0 {
            return None;
        }
        let cx = FRAME.0 / 2.0 * (1.0 + dx);
        let cy = FRAME.1 / 2.0 * (1.0 + dy);
        Some(MarkerDetection {
            corners: [
                (cx - 8.0, cy - 8.0),
                (cx + 8.0, cy - 8.0),
                (cx + 8.0, cy + 8.0),
                (cx - 8.0, cy + 8.0),
            ],
            frame_width: FRAME.0,
            frame_height: FRAME.1,
        })
    }

    fn write_rotors(&mut self, speeds: ActuatorSpeeds<f32>) {
        let front_left = speeds.front_left;
        let front_right = -speeds.front_right;
        let rear_left = -speeds.rear_left;
        let rear_right = speeds.rear_right;

        let thrust = (front_left + front_right + rear_left + rear_right) / 4.0;
        let roll = (front_right + rear_right - front_left - rear_left) / 4.0;
        let pitch = (rear_left + rear_right - front_left - front_right) / 4.0;

        // simulate response
        self.attitude.0 = 0.9 * self.attitude.0 - 0.002 * roll;
        self.attitude.1 = 0.9 * self.attitude.1 - 0.002 * pitch;
        let lift = if thrust > 0.0 {
            (thrust - HOVER_THROTTLE) * 2.0
        } else {
            -9.81
        };
        self.velocity.0 += (-40.0 * self.attitude.1 - 0.8 * self.velocity.0) * DT;
        self.velocity.1 += (40.0 * self.attitude.0 - 0.8 * self.velocity.1) * DT;
        self.velocity.2 += (lift - 1.2 * self.velocity.2) * DT;
        self.position.0 += self.velocity.0 * DT;
        self.position.1 += self.velocity.1 * DT;
        self.position.2 = (self.position.2 + self.velocity.2 * DT).max(0.0);
        if self.position.2 == 0.0 {
            self.velocity = (0.0, 0.0, 0.0);
        }
    }

    fn write_gimbal(&mut self, command: GimbalCommand<f32>) {
        self.gimbal = command;
    }
}

fn main() {
    let mut config = FlightConfig::<f32>::new();
    config.controller.dt = DT;
    config.mode.takeoff_altitude = 3.0;

    let mut pipeline = FlightPipeline::with_config(config).expect("default config is valid");
    let mut host = SimHost::new(&[
        (1, OperatorCommand::Arm),
        (1_500, OperatorCommand::ToggleVision),
        (4_000, OperatorCommand::ToggleVision),
        (4_001, OperatorCommand::Land),
    ]);

    println!(" tick  mode          x        y        z      FL      FR      RL      RR   gimbal");
    for _ in 0..6_000 {
        let output = match pipeline.tick(&mut host) {
            Ok(output) => output,
            Err(error) => {
                println!("fault: {}", error);
                break;
            }
        };

        if output.tick % 250 == 0 {
            let rotors = output.rotors;
            println!(
                "{:5}  {:<11} {:-8.3} {:-8.3} {:-8.3} {:7.2} {:7.2} {:7.2} {:7.2} {:7.3}",
                output.tick,
                format!("{:?}", output.mode),
                output.state.x,
                output.state.y,
                output.state.z,
                rotors.front_left,
                rotors.front_right,
                rotors.rear_left,
                rotors.rear_right,
                host.gimbal.pitch,
            );
        }
    }
}
