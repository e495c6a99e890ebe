// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: MIT

use std::convert::Infallible;
use std::io::Write;
use std::time::Duration;

use embedded_hal::delay::DelayNs;

use crate::config::ReporterConfig;
use crate::error::Result;
use crate::reading::Reading;
use crate::record::StatusRecord;
use crate::sensor::Sensor;

/// Polls a sensor and writes one status line per valid reading.
///
/// The reporter owns the sensor for its whole lifetime. Diagnostics and data
/// lines share the same output channel, typically a serial console.
///
/// `initialize` turns it into a [`ReadyReporter`], which runs the cycles.
pub struct Reporter<S, D, W> {
    sensor: S,
    delay: D,
    output: W,
    config: ReporterConfig,
}

/// A reporter past its trial read.
pub struct ReadyReporter<S, D, W> {
    inner: Reporter<S, D, W>,
}

impl<S, D, W> Reporter<S, D, W>
where
    S: Sensor,
    D: DelayNs,
    W: Write,
{
    pub fn new(sensor: S, delay: D, output: W, config: ReporterConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            sensor,
            delay,
            output,
            config,
        })
    }

    /// Claims the sensor, waits for it to settle and does one trial read.
    ///
    /// A failed trial read only produces diagnostics. Errors are returned
    /// solely when the output channel cannot be written.
    pub fn initialize(mut self) -> Result<ReadyReporter<S, D, W>> {
        let name = self.config.sensor.name();
        let pin = self.config.pin;

        self.line(format_args!("Initializing {name} sensor on pin {pin}..."))?;
        if let Err(e) = self.sensor.begin() {
            log::debug!("Sensor begin failed: {e:?}");
        }

        wait(&mut self.delay, self.config.warm_up);

        match StatusRecord::try_from(self.acquire()) {
            Ok(record) => {
                self.line(format_args!("{name} sensor initialized successfully"))?;
                self.line(format_args!(
                    "Initial reading: temperature {:.1} C, humidity {:.1} %",
                    record.temperature(),
                    record.humidity()
                ))?;
            }
            Err(e) => {
                log::debug!("Trial read failed: {e}");
                self.line(format_args!(
                    "Failed to read from {name} sensor during initialization!"
                ))?;
                self.line(format_args!(
                    "Check wiring: sensor data line connected to pin {pin}"
                ))?;
                self.line(format_args!(
                    "Check that a 10k pull-up resistor is fitted between data and VCC"
                ))?;
                self.line(format_args!("Check the sensor power supply (3.3V to 5V)"))?;
            }
        }

        Ok(ReadyReporter { inner: self })
    }

    /// Initializes and then cycles forever.
    pub fn run(self) -> Result<Infallible> {
        let mut reporter = self.initialize()?;

        loop {
            reporter.run_cycle()?;
        }
    }

    /// Reads humidity first, then temperature.
    fn acquire(&mut self) -> Reading {
        let humidity = self
            .sensor
            .read_humidity()
            .map_err(|e| log::debug!("Humidity read failed: {e:?}"))
            .ok();
        let temperature = self
            .sensor
            .read_temperature()
            .map_err(|e| log::debug!("Temperature read failed: {e:?}"))
            .ok();

        Reading::new(temperature, humidity)
    }

    fn line(&mut self, args: std::fmt::Arguments<'_>) -> Result<()> {
        writeln!(self.output, "{args}")?;
        self.output.flush()?;
        Ok(())
    }
}

impl<S, D, W> ReadyReporter<S, D, W>
where
    S: Sensor,
    D: DelayNs,
    W: Write,
{
    /// One wait-read-validate-emit cycle.
    ///
    /// Returns the emitted record, or `None` if the reading was invalid and
    /// only a diagnostic was written.
    pub fn run_cycle(&mut self) -> Result<Option<StatusRecord>> {
        let reporter = &mut self.inner;
        wait(&mut reporter.delay, reporter.config.cycle_interval);

        let reading = reporter.acquire();
        match StatusRecord::try_from(reading) {
            Ok(record) => {
                log::trace!("Emitting {reading:?}");
                reporter.line(format_args!("{record}"))?;
                Ok(Some(record))
            }
            Err(e) => {
                log::debug!("Skipping cycle: {e}");
                // Whole seconds print without a fraction: "2", "2.5".
                let retry = reporter.config.cycle_interval.as_secs_f64();
                reporter.line(format_args!(
                    "Failed to read from DHT sensor! Retrying in {retry} seconds..."
                ))?;
                Ok(None)
            }
        }
    }

    #[cfg(test)]
    fn into_parts(self) -> (S, D, W) {
        let Reporter {
            sensor,
            delay,
            output,
            ..
        } = self.inner;
        (sensor, delay, output)
    }
}

fn wait(delay: &mut impl DelayNs, duration: Duration) {
    let millis = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
    delay.delay_ms(millis);
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::error::Error;
    use crate::sensor::SensorKind;

    #[derive(Debug)]
    struct Timeout;

    /// Hands out scripted (temperature, humidity) pairs, `None` meaning a failed read.
    #[derive(Default)]
    struct ScriptedSensor {
        script: VecDeque<(Option<f32>, Option<f32>)>,
        begun: bool,
        calls: Vec<&'static str>,
    }

    impl ScriptedSensor {
        fn new(script: &[(Option<f32>, Option<f32>)]) -> Self {
            Self {
                script: script.iter().copied().collect(),
                ..Default::default()
            }
        }
    }

    impl Sensor for ScriptedSensor {
        type Error = Timeout;

        fn begin(&mut self) -> Result<(), Timeout> {
            self.begun = true;
            Ok(())
        }

        fn read_humidity(&mut self) -> Result<f32, Timeout> {
            self.calls.push("humidity");
            self.script.front().and_then(|(_, h)| *h).ok_or(Timeout)
        }

        fn read_temperature(&mut self) -> Result<f32, Timeout> {
            self.calls.push("temperature");
            self.script.pop_front().and_then(|(t, _)| t).ok_or(Timeout)
        }
    }

    #[derive(Default)]
    struct RecordingDelay {
        waits_ms: Vec<u32>,
    }

    impl DelayNs for RecordingDelay {
        fn delay_ns(&mut self, _ns: u32) {}

        fn delay_ms(&mut self, ms: u32) {
            self.waits_ms.push(ms);
        }
    }

    fn reporter(
        script: &[(Option<f32>, Option<f32>)],
    ) -> Reporter<ScriptedSensor, RecordingDelay, Vec<u8>> {
        Reporter::new(
            ScriptedSensor::new(script),
            RecordingDelay::default(),
            Vec::new(),
            ReporterConfig::DEFAULT,
        )
        .unwrap()
    }

    fn lines(output: &[u8]) -> Vec<String> {
        String::from_utf8(output.to_vec())
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    fn data_lines(output: &[u8]) -> Vec<String> {
        lines(output)
            .into_iter()
            .filter(|line| line.starts_with('{'))
            .collect()
    }

    #[test]
    fn test_initialize_success_reports_values() {
        let reporter = reporter(&[(Some(22.0), Some(50.0))]).initialize().unwrap();
        let (sensor, delay, output) = reporter.into_parts();

        assert!(sensor.begun);
        assert_eq!(delay.waits_ms, vec![2000]);
        assert_eq!(
            lines(&output),
            vec![
                "Initializing DHT22 sensor on pin 4...",
                "DHT22 sensor initialized successfully",
                "Initial reading: temperature 22.0 C, humidity 50.0 %",
            ]
        );
    }

    #[test]
    fn test_initialize_failure_is_not_fatal() {
        let mut reporter = reporter(&[(None, None), (Some(21.0), Some(45.0))])
            .initialize()
            .unwrap();

        let record = reporter.run_cycle().unwrap();
        assert!(record.is_some());

        let (_, _, output) = reporter.into_parts();
        assert_eq!(
            lines(&output),
            vec![
                "Initializing DHT22 sensor on pin 4...",
                "Failed to read from DHT22 sensor during initialization!",
                "Check wiring: sensor data line connected to pin 4",
                "Check that a 10k pull-up resistor is fitted between data and VCC",
                "Check the sensor power supply (3.3V to 5V)",
                r#"{"temperature":21.0,"humidity":45.0}"#,
            ]
        );
    }

    #[test]
    fn test_cycle_emits_rounded_record() {
        let mut reporter = reporter(&[(Some(22.0), Some(50.0)), (Some(23.45), Some(60.2))])
            .initialize()
            .unwrap();

        let record = reporter.run_cycle().unwrap().unwrap();
        assert_eq!(record, StatusRecord::new(23.5, 60.2));

        let (sensor, delay, output) = reporter.into_parts();
        assert_eq!(delay.waits_ms, vec![2000, 2000]);
        assert_eq!(
            sensor.calls,
            vec!["humidity", "temperature", "humidity", "temperature"]
        );
        assert_eq!(
            lines(&output).last().unwrap(),
            r#"{"temperature":23.5,"humidity":60.2}"#
        );
    }

    #[test]
    fn test_invalid_cycles_are_skipped() {
        for (temperature, humidity) in [(None, Some(55.0)), (Some(20.0), None), (None, None)] {
            let mut reporter = reporter(&[(Some(22.0), Some(50.0)), (temperature, humidity)])
                .initialize()
                .unwrap();
            let before = reporter.inner.output.len();

            assert_eq!(reporter.run_cycle().unwrap(), None);

            let (_, _, output) = reporter.into_parts();
            assert_eq!(
                lines(&output[before..]),
                vec!["Failed to read from DHT sensor! Retrying in 2 seconds..."]
            );
        }
    }

    #[test]
    fn test_retry_line_keeps_fractional_seconds() {
        let config = ReporterConfig {
            cycle_interval: Duration::from_millis(2500),
            ..ReporterConfig::DEFAULT
        };
        let mut reporter = Reporter::new(
            ScriptedSensor::new(&[(Some(22.0), Some(50.0)), (None, None)]),
            RecordingDelay::default(),
            Vec::new(),
            config,
        )
        .unwrap()
        .initialize()
        .unwrap();

        assert_eq!(reporter.run_cycle().unwrap(), None);

        let (_, delay, output) = reporter.into_parts();
        assert_eq!(delay.waits_ms, vec![2000, 2500]);
        assert_eq!(
            lines(&output).last().unwrap(),
            "Failed to read from DHT sensor! Retrying in 2.5 seconds..."
        );
    }

    #[test]
    fn test_cycles_retry_without_limit() {
        let mut script = vec![(Some(22.0), Some(50.0))];
        script.extend(std::iter::repeat((None, None)).take(20));
        script.push((Some(19.94), Some(33.36)));

        let mut reporter = reporter(&script).initialize().unwrap();
        for _ in 0..20 {
            assert_eq!(reporter.run_cycle().unwrap(), None);
        }
        assert!(reporter.run_cycle().unwrap().is_some());

        let (_, delay, output) = reporter.into_parts();
        assert_eq!(delay.waits_ms.len(), 22);
        assert_eq!(
            data_lines(&output),
            vec![r#"{"temperature":19.9,"humidity":33.4}"#]
        );
    }

    #[test]
    fn test_identical_readings_give_identical_lines() {
        let mut reporter = reporter(&[
            (Some(22.0), Some(50.0)),
            (Some(24.06), Some(51.25)),
            (Some(24.06), Some(51.25)),
        ])
        .initialize()
        .unwrap();
        reporter.run_cycle().unwrap();
        reporter.run_cycle().unwrap();

        let (_, _, output) = reporter.into_parts();
        let data = data_lines(&output);
        assert_eq!(data.len(), 2);
        assert_eq!(data[0], data[1]);
        assert_eq!(data[0], r#"{"temperature":24.1,"humidity":51.3}"#);
    }

    #[test]
    fn test_rejects_cycle_shorter_than_sensor_minimum() {
        let config = ReporterConfig {
            sensor: SensorKind::Dht22,
            cycle_interval: Duration::from_millis(500),
            ..ReporterConfig::DEFAULT
        };
        let result = Reporter::new(
            ScriptedSensor::default(),
            RecordingDelay::default(),
            Vec::new(),
            config,
        );
        assert!(matches!(result, Err(Error::CycleTooShort { .. })));
    }
}
