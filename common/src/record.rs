// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: MIT

use std::fmt;

use crate::error::Error;
use crate::reading::Reading;

/// A validated reading, rounded to one decimal place.
///
/// Values are rounded once, at construction, so the same reading always
/// formats to the same bytes. Rounding is half away from zero on the exact
/// value the sensor produced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StatusRecord {
    temperature: f64,
    humidity: f64,
}

impl StatusRecord {
    pub fn new(temperature: f64, humidity: f64) -> Self {
        Self {
            temperature: round_to_tenth(temperature),
            humidity: round_to_tenth(humidity),
        }
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn humidity(&self) -> f64 {
        self.humidity
    }
}

impl TryFrom<Reading> for StatusRecord {
    type Error = Error;

    fn try_from(reading: Reading) -> Result<Self, Self::Error> {
        match (reading.temperature, reading.humidity) {
            // f32 -> f64 is lossless, and so is the multiplication by ten.
            (Some(temperature), Some(humidity)) => {
                Ok(Self::new(f64::from(temperature), f64::from(humidity)))
            }
            (temperature, humidity) => Err(Error::InvalidReading {
                temperature: temperature.is_some(),
                humidity: humidity.is_some(),
            }),
        }
    }
}

/// Writes the data line, without the trailing newline:
/// `{"temperature":<T>,"humidity":<H>}`.
impl fmt::Display for StatusRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{\"temperature\":{:.1},\"humidity\":{:.1}}}",
            self.temperature, self.humidity
        )
    }
}

fn round_to_tenth(value: f64) -> f64 {
    // `round` ties away from zero.
    let rounded = (value * 10.0).round() / 10.0;
    // Folds -0.0 into 0.0.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(temperature: f32, humidity: f32) -> String {
        StatusRecord::try_from(Reading::from_raw(temperature, humidity))
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_data_line_layout() {
        assert_eq!(line(23.45, 60.2), r#"{"temperature":23.5,"humidity":60.2}"#);
        assert_eq!(line(22.0, 50.0), r#"{"temperature":22.0,"humidity":50.0}"#);
        assert_eq!(line(-7.0, 100.0), r#"{"temperature":-7.0,"humidity":100.0}"#);
    }

    #[test]
    fn test_rounding_half_away_from_zero() {
        assert_eq!(line(0.25, 0.75), r#"{"temperature":0.3,"humidity":0.8}"#);
        assert_eq!(line(-0.25, 12.04), r#"{"temperature":-0.3,"humidity":12.0}"#);
        assert_eq!(line(-12.96, 99.99), r#"{"temperature":-13.0,"humidity":100.0}"#);
    }

    #[test]
    fn test_no_negative_zero() {
        assert_eq!(line(-0.04, 0.0), r#"{"temperature":0.0,"humidity":0.0}"#);
    }

    #[test]
    fn test_large_values_keep_their_magnitude() {
        assert_eq!(
            line(1.0e10, 50.0),
            r#"{"temperature":10000000000.0,"humidity":50.0}"#
        );
        assert_eq!(
            line(-3.0e9, 0.5),
            r#"{"temperature":-3000000000.0,"humidity":0.5}"#
        );
    }

    #[test]
    fn test_invalid_reading_is_rejected() {
        let err = StatusRecord::try_from(Reading::from_raw(f32::NAN, 55.0)).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidReading { temperature: false, humidity: true }
        ));

        let err = StatusRecord::try_from(Reading::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidReading { temperature: false, humidity: false }
        ));
    }

    #[test]
    fn test_data_line_is_valid_json() {
        let value: serde_json::Value = serde_json::from_str(&line(18.26, 43.71)).unwrap();
        assert_eq!(value["temperature"], 18.3);
        assert_eq!(value["humidity"], 43.7);
    }
}
