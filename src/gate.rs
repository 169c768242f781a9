use crate::command::Command;
use crate::config::GateConfig;
use crate::consts::Degrees;
use crate::servo::{Calibration, Servo, ServoError};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Where the barrier is, as far as we know. Nothing is sensed; the state
/// follows the last command we gave the servo.
#[derive(Eq, PartialEq, Clone, Copy, Debug)]
pub enum GateState {
    Closed,
    /// Servo told to open, travel time not elapsed yet.
    Opening,
    Open,
    /// Servo told to close, travel time not elapsed yet.
    Closing,
}

impl GateState {
    /// Collapse movement into the state it is heading to.
    pub fn nominal(self) -> GateState {
        match self {
            GateState::Closed | GateState::Closing => GateState::Closed,
            GateState::Open | GateState::Opening => GateState::Open,
        }
    }

    /// Wire name used in status lines.
    pub fn label(self) -> &'static str {
        match self {
            GateState::Closed => "FECHADA",
            GateState::Opening => "ABRINDO",
            GateState::Open => "ABERTA",
            GateState::Closing => "FECHANDO",
        }
    }
}

/// A gate barrier driven by a single servo.
pub struct Gate<S: Servo> {
    servo: S,
    open_angle: Degrees,
    closed_angle: Degrees,
    move_time: Duration,
    state: GateState,
    /// When the current move is assumed finished.
    deadline: Option<Instant>,
}

impl<S: Servo> Gate<S> {
    /// Attach the servo and force the closed position.
    pub fn new(
        mut servo: S,
        config: &GateConfig,
        calibration: Calibration,
    ) -> Result<Self, ServoError> {
        servo.attach(calibration)?;
        servo.write_angle(config.closed_angle)?;
        info!(
            "Gate initialized closed at {} deg (open at {} deg, travel {:?})",
            config.closed_angle,
            config.open_angle,
            config.move_time()
        );

        Ok(Self {
            servo,
            open_angle: config.open_angle,
            closed_angle: config.closed_angle,
            move_time: config.move_time(),
            state: GateState::Closed,
            deadline: None,
        })
    }

    /// Move to the open angle. Returns states to report.
    pub fn open(&mut self, now: Instant) -> Result<Vec<GateState>, ServoError> {
        self.drive(Command::Open, now)
    }

    /// Move to the closed angle. Returns states to report.
    pub fn close(&mut self, now: Instant) -> Result<Vec<GateState>, ServoError> {
        self.drive(Command::Close, now)
    }

    pub fn apply(
        &mut self,
        command: Command,
        now: Instant,
    ) -> Result<Vec<GateState>, ServoError> {
        self.drive(command, now)
    }

    fn drive(&mut self, command: Command, now: Instant) -> Result<Vec<GateState>, ServoError> {
        let (angle, moving, done) = match command {
            Command::Open => (self.open_angle, GateState::Opening, GateState::Open),
            Command::Close => (self.closed_angle, GateState::Closing, GateState::Closed),
        };

        // Redundant commands still reach the servo.
        self.servo.write_angle(angle)?;

        let previous = self.state;
        if self.move_time.is_zero() {
            self.state = done;
            self.deadline = None;
        } else {
            self.state = moving;
            self.deadline = Some(now + self.move_time);
        }
        debug!("Gate {:?} -> {:?} ({} deg)", previous, self.state, angle);

        Ok(vec![self.state])
    }

    /// Finish a move whose travel time has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<GateState> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        self.deadline = None;
        self.state = self.state.nominal();
        debug!("Gate move finished: {:?}", self.state);
        Some(self.state)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn angle(&self) -> Option<Degrees> {
        self.servo.angle()
    }

    pub fn servo(&self) -> &S {
        &self.servo
    }
}
