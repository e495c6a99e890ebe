// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: MIT

/// One sampled temperature/humidity pair.
///
/// A field is `None` when the acquisition failed for it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Reading {
    /// Temperature in degrees Celsius.
    pub temperature: Option<f32>,
    /// Relative humidity in percent.
    pub humidity: Option<f32>,
}

impl Reading {
    /// Builds a reading, treating NaN and infinities as invalid.
    pub fn new(temperature: Option<f32>, humidity: Option<f32>) -> Self {
        Self {
            temperature: temperature.filter(|value| value.is_finite()),
            humidity: humidity.filter(|value| value.is_finite()),
        }
    }

    pub fn from_raw(temperature: f32, humidity: f32) -> Self {
        Self::new(Some(temperature), Some(humidity))
    }
}

#[test]
fn test_reading_from_raw() {
    let reading = Reading::from_raw(21.5, 40.0);
    assert_eq!(reading.temperature, Some(21.5));
    assert_eq!(reading.humidity, Some(40.0));

    let reading = Reading::from_raw(f32::NAN, 40.0);
    assert_eq!(reading.temperature, None);
    assert_eq!(reading.humidity, Some(40.0));

    let reading = Reading::from_raw(10.0, f32::INFINITY);
    assert_eq!(reading.humidity, None);

    let reading = Reading::new(None, Some(f32::NAN));
    assert_eq!(reading, Reading::default());
}
