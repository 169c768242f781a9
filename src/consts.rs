/// Software version
pub const GATE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GATE_NAME: &str = "servo-gate";

/// Serial line speed used by the controller and the client.
pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_PORT_NAME: &str = "/dev/ttyACM0";

/// Longest accepted command line, terminator excluded.
pub const MAX_LINE_LENGTH: usize = 256;

/// Angle in degrees. Servos we drive accept 0-180.
pub type Degrees = u8;
pub const MAX_ANGLE: Degrees = 180;

pub const DEFAULT_CLOSED_ANGLE: Degrees = 0;
pub const DEFAULT_OPEN_ANGLE: Degrees = 90;

/// SG90-like servo. 0 deg at 500us, 180 deg at 2500us, 50Hz.
pub const DEFAULT_MIN_PULSE_US: u32 = 500;
pub const DEFAULT_MAX_PULSE_US: u32 = 2500;
pub const DEFAULT_PERIOD_US: u32 = 20_000;

/// Commands on the wire.
pub const CMD_OPEN: &str = "ABRIR";
pub const CMD_CLOSE: &str = "FECHAR";
