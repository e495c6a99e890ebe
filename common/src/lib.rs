//! Sensor reporting shared between the firmware and the host tools.
//!
//! The firmware side runs a [`Reporter`], which polls a humidity/temperature
//! [`Sensor`] and prints one [`StatusRecord`] line per valid reading. The host
//! side turns that serial stream back into records with a [`FrameDecoder`] and
//! keeps the latest one in a [`SharedStatus`].

mod config;
mod error;
mod frame;
mod reading;
mod record;
mod reporter;
mod sensor;
mod status;

pub use config::ReporterConfig;
pub use error::{Error, Result};
pub use frame::{FrameDecoder, FrameError};
pub use reading::Reading;
pub use record::StatusRecord;
pub use reporter::{ReadyReporter, Reporter};
pub use sensor::{Paired, PairedSensor, Sensor, SensorKind};
pub use status::{SharedStatus, StatusSnapshot};

/// Re-exported so platforms can implement the reporter's delay without naming the crate.
pub use embedded_hal::delay::DelayNs;
