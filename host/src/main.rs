use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use sensor_reporter_common::{
    FrameDecoder, Paired, Reporter, ReporterConfig, SensorKind, SharedStatus,
};

mod receiver;
mod simulated;

use receiver::Receiver;
use simulated::{SimulatedSensor, StdDelay};

/// Runs the sensor reporter on the host, or receives its status records over serial.
#[derive(Parser)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the reporter against a simulated sensor
    Report(ReportArgs),

    /// Read status records from a serial port
    Receive {
        /// Serial port, detected if omitted
        #[arg(short, long)]
        port: Option<String>,

        /// Serial baud rate
        #[arg(short, long, default_value = "9600")]
        baud: u32,

        /// Print a JSON snapshot after every record
        #[arg(long)]
        json: bool,
    },

    /// List the available serial ports
    Ports,
}

#[derive(clap::Args)]
struct ReportArgs {
    /// Sensor family, decides the minimum cycle interval
    #[arg(long, value_enum, default_value_t = Kind::Dht22)]
    sensor: Kind,

    /// Data pin reported in diagnostics
    #[arg(long, default_value_t = ReporterConfig::DEFAULT.pin)]
    pin: u8,

    /// Warm-up before the trial read, in milliseconds
    #[arg(long, default_value_t = 2000)]
    warm_up_ms: u64,

    /// Wait before every read, in milliseconds
    #[arg(long, default_value_t = 2000)]
    interval_ms: u64,

    /// Make every n-th acquisition fail, 0 for never
    #[arg(long, default_value_t = 0)]
    fail_every: u32,

    /// Write to this serial port instead of stdout
    #[arg(short, long)]
    port: Option<String>,

    /// Serial baud rate
    #[arg(short, long, default_value = "9600")]
    baud: u32,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Dht11,
    Dht22,
}

impl From<Kind> for SensorKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Dht11 => SensorKind::Dht11,
            Kind::Dht22 => SensorKind::Dht22,
        }
    }
}

impl ReportArgs {
    fn config(&self) -> ReporterConfig {
        ReporterConfig {
            sensor: self.sensor.into(),
            pin: self.pin,
            warm_up: Duration::from_millis(self.warm_up_ms),
            cycle_interval: Duration::from_millis(self.interval_ms),
        }
    }
}

fn report(args: ReportArgs) -> anyhow::Result<()> {
    let config = args.config();
    let sensor = Paired::new(SimulatedSensor::new(22.0, 50.0).fail_every(args.fail_every));

    let output: Box<dyn std::io::Write> = match &args.port {
        Some(port) => Box::new(
            serialport::new(port, args.baud)
                .timeout(write_timeout(args.baud))
                .open()
                .with_context(|| format!("opening {port}"))?,
        ),
        None => Box::new(std::io::stdout()),
    };

    log::info!("Reporting with {config:?}");
    let reporter = Reporter::new(sensor, StdDelay, output, config)?;
    match reporter.run()? {}
}

/// Long enough to drain a few of the longest lines at `baud`, and never under a second.
fn write_timeout(baud: u32) -> Duration {
    // 8N1 framing: ten bits on the wire per byte, plus the line ending.
    let line_bits = (FrameDecoder::MAX_FRAME_LEN as u64 + 2) * 10;
    let line_time = Duration::from_micros(line_bits * 1_000_000 / u64::from(baud.max(1)));
    (line_time * 4).max(Duration::from_secs(1))
}

fn receive(port: Option<String>, baud: u32, json: bool) -> anyhow::Result<()> {
    let mut receiver = Receiver::new(port, baud, SharedStatus::new());
    if json {
        receiver = receiver.on_record(|_, status| match serde_json::to_string(&status.snapshot()) {
            Ok(line) => println!("{line}"),
            Err(e) => log::error!("Failed to encode snapshot: {e}"),
        });
    }

    match receiver.run()? {}
}

fn ports() -> anyhow::Result<()> {
    for (name, description) in receiver::list_ports()? {
        println!("{name}: {description}");
    }
    Ok(())
}

/// A minimal main function that parses the command line and runs the command.
fn main() -> anyhow::Result<()> {
    env_logger::init();

    match Cli::parse().command {
        Command::Report(args) => report(args),
        Command::Receive { port, baud, json } => receive(port, baud, json),
        Command::Ports => ports(),
    }
}

#[test]
fn test_cli_defaults_match_firmware() {
    let cli = Cli::try_parse_from(["sensor-reporter", "report"]).unwrap();
    let Command::Report(args) = cli.command else {
        panic!("expected the report command");
    };
    assert_eq!(args.config(), ReporterConfig::DEFAULT);
}

#[test]
fn test_cli_rejects_short_interval() {
    let cli = Cli::try_parse_from([
        "sensor-reporter",
        "report",
        "--interval-ms",
        "1000",
        "--warm-up-ms",
        "0",
    ])
    .unwrap();
    let Command::Report(args) = cli.command else {
        panic!("expected the report command");
    };

    let result = Reporter::new(
        Paired::new(SimulatedSensor::new(22.0, 50.0)),
        StdDelay,
        Vec::new(),
        args.config(),
    );
    assert!(result.is_err());
}

#[test]
fn test_write_timeout_covers_slow_links() {
    assert_eq!(write_timeout(9600), Duration::from_secs(1));
    assert_eq!(write_timeout(115_200), Duration::from_secs(1));

    // 1300 bits at 300 baud take 4.33 s per line.
    let slow = write_timeout(300);
    assert!(slow > Duration::from_secs(17));
    assert!(slow < Duration::from_secs(18));

    assert!(write_timeout(0) > Duration::from_secs(1));
}
