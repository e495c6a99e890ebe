// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: MIT

use std::time::Duration;

use crate::error::{Error, Result};
use crate::sensor::SensorKind;

/// Build-time settings of the reporter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReporterConfig {
    pub sensor: SensorKind,
    /// Data pin the sensor hangs off. Only used in diagnostics.
    pub pin: u8,
    /// Settling time between claiming the sensor and the trial read.
    pub warm_up: Duration,
    /// Wait before every read.
    pub cycle_interval: Duration,
}

impl ReporterConfig {
    pub const DEFAULT: Self = Self {
        sensor: SensorKind::Dht22,
        pin: 4,
        warm_up: Duration::from_secs(2),
        cycle_interval: Duration::from_secs(2),
    };

    pub fn validate(&self) -> Result<()> {
        let minimum = self.sensor.min_sampling_interval();
        if self.cycle_interval < minimum {
            return Err(Error::CycleTooShort {
                interval: self.cycle_interval,
                minimum,
            });
        }

        Ok(())
    }
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[test]
fn test_validate_cycle_interval() {
    assert!(ReporterConfig::DEFAULT.validate().is_ok());

    let config = ReporterConfig {
        cycle_interval: Duration::from_millis(1500),
        ..ReporterConfig::DEFAULT
    };
    assert!(matches!(config.validate(), Err(Error::CycleTooShort { .. })));

    let config = ReporterConfig {
        sensor: SensorKind::Dht11,
        ..config
    };
    assert!(config.validate().is_ok());
}
