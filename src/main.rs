use clap::{Parser, Subcommand, ValueEnum};
use servo_gate::client::GateClient;
use servo_gate::comm;
use servo_gate::config::Config;
use servo_gate::consts;
use servo_gate::controller::{self, Controller};
use servo_gate::servo::{Servo, SimulatedServo};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = consts::GATE_NAME, version = consts::GATE_VERSION)]
struct Args {
    // USB Connection
    #[arg(long, global = true, default_value = consts::DEFAULT_PORT_NAME)]
    port_name: String,
    #[arg(long, global = true, default_value_t = consts::DEFAULT_BAUD_RATE)]
    baud_rate: u32,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Drive the gate servo from commands read on the serial port.
    Serve {
        #[arg(long, default_value = "config.yaml")]
        config_path: String,
        /// Do not touch hardware; log servo moves instead.
        #[arg(long)]
        simulate: bool,
    },
    /// Send a single command to a gate controller.
    Send {
        action: Action,
        /// Wait after opening the port; Arduino boards reset on connect.
        #[arg(long, default_value_t = 2000)]
        settle_ms: u64,
        /// Print status lines returned by the controller.
        #[arg(long)]
        wait_reply: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Action {
    Open,
    Close,
}

fn init_log() {
    let timer = fmt::time::ChronoLocal::new("%H:%M:%S%.3f".to_string());

    // Configure a custom event formatter
    let format = fmt::format()
        .with_level(true)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_source_location(true)
        .with_timer(timer)
        .compact();

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::DEBUG.into())
        .from_env()
        .expect("RUST_LOG configuration is valid");

    fmt().event_format(format).with_env_filter(filter).init();
}

#[cfg(feature = "rpi")]
fn hardware_servo(config: &Config) -> anyhow::Result<Box<dyn Servo>> {
    let servo = servo_gate::servo::PwmServo::new(config.servo.pwm_channel)?;
    Ok(Box::new(servo))
}

#[cfg(not(feature = "rpi"))]
fn hardware_servo(_config: &Config) -> anyhow::Result<Box<dyn Servo>> {
    anyhow::bail!("Built without the `rpi` feature. Use --simulate.");
}

async fn serve(args: &Args, config_path: &str, simulate: bool) -> anyhow::Result<()> {
    let config = Config::load_or_default(config_path)?;
    info!("Starting {}. Args: {:?} Config: {:?}", consts::GATE_NAME, args, config);

    let servo: Box<dyn Servo> = if simulate {
        Box::new(SimulatedServo::new())
    } else {
        hardware_servo(&config)?
    };
    let mut controller = Controller::new(servo, &config)?;

    let mut comm = comm::run(args.port_name.clone(), args.baud_rate).await?;
    info!("servo-gate initialized.");

    let result = controller::run(&mut controller, &mut comm).await;
    let transport = comm.shutdown().await;
    result.and(transport)
}

async fn send(
    args: &Args,
    action: Action,
    settle_ms: u64,
    wait_reply: bool,
) -> anyhow::Result<()> {
    let mut client = GateClient::connect(
        &args.port_name,
        args.baud_rate,
        Duration::from_millis(settle_ms),
    )
    .await?;

    match action {
        Action::Open => client.open_gate().await?,
        Action::Close => client.close_gate().await?,
    }

    if wait_reply {
        while let Some(line) = client.read_reply(Duration::from_secs(2)).await? {
            println!("{}", line);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_log();
    let args = Args::parse();

    match &args.mode {
        Mode::Serve {
            config_path,
            simulate,
        } => serve(&args, config_path, *simulate).await,
        Mode::Send {
            action,
            settle_ms,
            wait_reply,
        } => send(&args, *action, *settle_ms, *wait_reply).await,
    }
}
