use std::convert::Infallible;
use std::io::{ErrorKind, Read};
use std::time::{Duration, Instant};

use anyhow::Context;
use log::{debug, info, warn};
use sensor_reporter_common::{FrameDecoder, FrameError, SharedStatus, StatusRecord};
use serialport::{SerialPort, SerialPortInfo, SerialPortType};

/// What the receiver needs from the outside world: finding and opening
/// ports, waiting, and telling the time.
pub trait Link {
    type Port: Read;

    fn detect(&mut self) -> anyhow::Result<String>;

    fn open(&mut self, port_name: &str, baud: u32) -> anyhow::Result<Self::Port>;

    fn sleep(&mut self, duration: Duration);

    fn now(&mut self) -> Instant;
}

/// The real serial ports of this machine.
pub struct SerialLink;

impl SerialLink {
    const READ_TIMEOUT: Duration = Duration::from_secs(1);
    /// Opening the port resets most boards, give them time to boot.
    const RESET_WAIT: Duration = Duration::from_secs(2);
}

impl Link for SerialLink {
    type Port = Box<dyn SerialPort>;

    fn detect(&mut self) -> anyhow::Result<String> {
        pick_port(&list_ports()?).context("no serial port found")
    }

    fn open(&mut self, port_name: &str, baud: u32) -> anyhow::Result<Self::Port> {
        let port = serialport::new(port_name, baud)
            .timeout(Self::READ_TIMEOUT)
            .open()
            .with_context(|| format!("opening {port_name}"))?;

        std::thread::sleep(Self::RESET_WAIT);
        port.clear(serialport::ClearBuffer::All)
            .context("clearing pending data")?;

        Ok(port)
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }

    fn now(&mut self) -> Instant {
        Instant::now()
    }
}

/// Keeps a serial link to the reporter alive and collects its status records.
pub struct Receiver<L: Link = SerialLink> {
    link: L,
    port_name: Option<String>,
    explicit_port: bool,
    baud: u32,
    failures: u32,
    status: SharedStatus,
    decoder: FrameDecoder,
    on_record: Option<Box<dyn FnMut(&StatusRecord, &SharedStatus) + Send>>,
}

impl Receiver {
    pub fn new(port_name: Option<String>, baud: u32, status: SharedStatus) -> Self {
        Self::with_link(SerialLink, port_name, baud, status)
    }
}

impl<L: Link> Receiver<L> {
    const SILENCE_TIMEOUT: Duration = Duration::from_secs(10);
    const RECONNECT_DELAY: Duration = Duration::from_secs(5);
    const MAX_OPEN_FAILURES: u32 = 3;

    /// Hints that a USB serial port has a microcontroller board behind it.
    const BOARD_HINTS: [&'static str; 3] = ["Arduino", "CH340", "CP210"];

    pub fn with_link(link: L, port_name: Option<String>, baud: u32, status: SharedStatus) -> Self {
        Self {
            link,
            explicit_port: port_name.is_some(),
            port_name,
            baud,
            failures: 0,
            status,
            decoder: FrameDecoder::new(),
            on_record: None,
        }
    }

    /// Called after every record has been stored.
    pub fn on_record(
        mut self,
        callback: impl FnMut(&StatusRecord, &SharedStatus) + Send + 'static,
    ) -> Self {
        self.on_record = Some(Box::new(callback));
        self
    }

    /// Reads from the port until the process is terminated, reconnecting as needed.
    ///
    /// Only a failure to find any port at startup is returned.
    pub fn run(&mut self) -> anyhow::Result<Infallible> {
        if self.port_name.is_none() {
            let name = self.link.detect()?;
            info!("Using serial port {name}");
            self.port_name = Some(name);
        }

        loop {
            self.attempt();
        }
    }

    /// One connection attempt: detect if needed, open, and read until the link drops.
    fn attempt(&mut self) {
        let port_name = match &self.port_name {
            Some(name) => name.clone(),
            None => match self.link.detect() {
                Ok(name) => {
                    info!("Using serial port {name}");
                    self.port_name = Some(name.clone());
                    name
                }
                Err(e) => {
                    warn!("Port detection failed: {e:#}");
                    self.link.sleep(Self::RECONNECT_DELAY);
                    return;
                }
            },
        };

        match self.link.open(&port_name, self.baud) {
            Ok(port) => {
                self.failures = 0;
                self.status.set_connected(true);
                info!("Connected to {port_name} at {} baud", self.baud);
                self.session(port);
                self.status.set_connected(false);
                info!("Disconnected from {port_name}");
            }
            Err(e) => {
                self.failures += 1;
                warn!("Failed to open {port_name}: {e:#}");
                self.status.set_connected(false);

                if self.failures >= Self::MAX_OPEN_FAILURES && !self.explicit_port {
                    debug!("Giving up on {port_name}, detecting ports again");
                    self.port_name = None;
                    self.failures = 0;
                }

                self.link.sleep(Self::RECONNECT_DELAY);
            }
        }
    }

    /// Reads a freshly opened port. Bytes of an earlier connection never
    /// complete a frame of this one.
    fn session(&mut self, port: impl Read) {
        self.decoder.reset();
        self.pump(port);
    }

    /// Feeds everything read from `port` into the decoder. Returns once the
    /// port fails, reaches end of file or stays silent for too long.
    fn pump(&mut self, mut port: impl Read) {
        let mut buffer = [0u8; 256];
        let mut last_rx = self.link.now();

        loop {
            match port.read(&mut buffer) {
                Ok(0) => return,
                Ok(n) => {
                    last_rx = self.link.now();
                    for result in self.decoder.feed(&buffer[..n]) {
                        match result {
                            Ok(record) => self.store(record),
                            Err(e @ FrameError::Overflow) => warn!("Dropped frame: {e}"),
                            Err(e) => debug!("Dropped frame: {e}"),
                        }
                    }
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("Serial read failed: {e}");
                    return;
                }
            }

            if self.link.now().duration_since(last_rx) > Self::SILENCE_TIMEOUT {
                warn!(
                    "No data for {}s, reconnecting",
                    Self::SILENCE_TIMEOUT.as_secs()
                );
                return;
            }
        }
    }

    fn store(&mut self, record: StatusRecord) {
        info!(
            "Temperature: {:.1}°C, Humidity: {:.1}%",
            record.temperature(),
            record.humidity()
        );
        self.status.update(record);

        if let Some(callback) = self.on_record.as_mut() {
            callback(&record, &self.status);
        }
    }
}

/// Lists the serial ports with a human readable description each.
pub fn list_ports() -> anyhow::Result<Vec<(String, String)>> {
    let ports = serialport::available_ports().context("listing serial ports")?;
    Ok(ports.iter().map(|port| (port.port_name.clone(), describe(port))).collect())
}

fn describe(port: &SerialPortInfo) -> String {
    match &port.port_type {
        SerialPortType::UsbPort(usb) => {
            let parts: Vec<&str> = [usb.manufacturer.as_deref(), usb.product.as_deref()]
                .into_iter()
                .flatten()
                .collect();
            format!("USB {:04x}:{:04x} {}", usb.vid, usb.pid, parts.join(" "))
        }
        SerialPortType::PciPort => "PCI".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        SerialPortType::Unknown => "Unknown".to_string(),
    }
}

/// Prefers a port that looks like a microcontroller board, then any port.
fn pick_port(ports: &[(String, String)]) -> Option<String> {
    ports
        .iter()
        .find(|(_, description)| {
            Receiver::<SerialLink>::BOARD_HINTS
                .iter()
                .any(|hint| description.contains(hint))
        })
        .or_else(|| ports.first())
        .map(|(name, _)| name.clone())
}
