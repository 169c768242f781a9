use crate::comm::Comm;
use crate::command::Command;
use crate::config::Config;
use crate::gate::{Gate, GateState};
use crate::reader::{LineError, LineReader};
use crate::reply::{Dialect, Reply};
use crate::servo::{Servo, ServoError};
use std::time::Instant;
use tracing::{error, info, warn};

/// Serial commands in, servo moves and status lines out.
pub struct Controller<S: Servo> {
    reader: LineReader,
    gate: Gate<S>,
    dialect: Dialect,
}

impl<S: Servo> Controller<S> {
    pub fn new(servo: S, config: &Config) -> Result<Self, ServoError> {
        let gate = Gate::new(servo, &config.gate, config.servo.calibration)?;
        Ok(Self {
            reader: LineReader::new(config.max_line_length),
            gate,
            dialect: config.dialect,
        })
    }

    /// Lines announced once the loop starts.
    pub fn startup(&self) -> Vec<Reply> {
        vec![Reply::Started, Reply::Status(self.gate.state())]
    }

    /// Dispatch one trimmed line.
    pub fn handle_line(&mut self, line: &str, now: Instant) -> Vec<Reply> {
        let mut replies = vec![Reply::Received(line.to_string())];

        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(err) => {
                warn!("{}", err);
                replies.push(Reply::Invalid(self.dialect));
                return replies;
            }
        };

        info!("Command {} in state {:?}", command, self.gate.state());
        match self.gate.apply(command, now) {
            Ok(states) => replies.extend(states.into_iter().map(Reply::Status)),
            Err(err) => error!("Unable to move gate for {}: {}", command, err),
        }
        replies
    }

    /// Consume raw serial bytes.
    pub fn feed(&mut self, bytes: &[u8], now: Instant) -> Vec<Reply> {
        let mut replies = Vec::new();
        for line in self.reader.push(bytes) {
            match line {
                Ok(line) => replies.extend(self.handle_line(&line, now)),
                Err(LineError::TooLong(_)) => replies.push(Reply::LineTooLong),
            }
        }
        replies
    }

    /// Report a move that finished since the last call.
    pub fn poll(&mut self, now: Instant) -> Vec<Reply> {
        self.gate.poll(now).map(Reply::Status).into_iter().collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.gate.next_deadline()
    }

    /// Input received but not yet terminated.
    pub fn pending_input(&self) -> usize {
        self.reader.pending()
    }

    pub fn state(&self) -> GateState {
        self.gate.state()
    }

    pub fn gate(&self) -> &Gate<S> {
        &self.gate
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}

/// Main loop. Serial input is read even while the gate is moving.
/// Returns when the port reader goes away.
pub async fn run<S: Servo>(
    controller: &mut Controller<S>,
    comm: &mut Comm,
) -> anyhow::Result<()> {
    for reply in controller.startup() {
        comm.tx.send(reply.to_string()).await?;
    }

    loop {
        let deadline = controller.next_deadline();
        let replies = tokio::select! {
            chunk = comm.rx.recv() => {
                match chunk {
                    Some(chunk) => controller.feed(&chunk, Instant::now()),
                    None => {
                        // The other end died.
                        break;
                    }
                }
            }
            _ = sleep_until(deadline) => controller.poll(Instant::now()),
        };

        for reply in replies {
            info!("TX: {}", reply);
            comm.tx.send(reply.to_string()).await?;
        }
    }

    let pending = controller.pending_input();
    if pending > 0 {
        warn!("Dropping {} bytes of unterminated input", pending);
    }
    info!("Serial reader finished, stopping controller");
    Ok(())
}
