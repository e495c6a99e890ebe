// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: MIT

use std::time::Duration;

/// The humidity/temperature sensor families the reporter knows about.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SensorKind {
    Dht11,
    #[default]
    Dht22,
}

impl SensorKind {
    /// Reads closer together than this return stale or invalid data.
    pub const fn min_sampling_interval(self) -> Duration {
        match self {
            SensorKind::Dht11 => Duration::from_secs(1),
            SensorKind::Dht22 => Duration::from_secs(2),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            SensorKind::Dht11 => "DHT11",
            SensorKind::Dht22 => "DHT22",
        }
    }
}

/// A humidity/temperature sensor.
///
/// To be implemented for each platform's driver.
pub trait Sensor {
    type Error: core::fmt::Debug;

    /// Claims the peripheral. Called once, before the warm-up delay.
    fn begin(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Relative humidity in percent.
    fn read_humidity(&mut self) -> Result<f32, Self::Error>;

    /// Temperature in degrees Celsius.
    fn read_temperature(&mut self) -> Result<f32, Self::Error>;
}


/// A sensor that delivers both values from a single bus transaction.
pub trait PairedSensor {
    type Error: core::fmt::Debug + Clone;

    /// Claims the peripheral. Called once, before the warm-up delay.
    fn begin(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Runs one acquisition, returning `(temperature, humidity)`.
    fn acquire(&mut self) -> Result<(f32, f32), Self::Error>;
}

/// Adapts a [`PairedSensor`] to the per-field [`Sensor`] reads.
///
/// Reading humidity always starts a new acquisition. The temperature read
/// that follows takes its value from that same acquisition, and never from
/// one of an earlier cycle.
pub struct Paired<P: PairedSensor> {
    inner: P,
    pending: Option<Result<(f32, f32), P::Error>>,
}

impl<P: PairedSensor> Paired<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            pending: None,
        }
    }
}

impl<P: PairedSensor> Sensor for Paired<P> {
    type Error = P::Error;

    fn begin(&mut self) -> Result<(), Self::Error> {
        self.pending = None;
        self.inner.begin()
    }

    fn read_humidity(&mut self) -> Result<f32, Self::Error> {
        let result = self.inner.acquire();
        self.pending = Some(result.clone());
        result.map(|(_, humidity)| humidity)
    }

    fn read_temperature(&mut self) -> Result<f32, Self::Error> {
        let result = match self.pending.take() {
            Some(result) => result,
            None => self.inner.acquire(),
        };
        result.map(|(temperature, _)| temperature)
    }
}
