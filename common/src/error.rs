// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: MIT

use std::time::Duration;

/// Errors raised by the reporter and its building blocks.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The sensor did not deliver a usable value for one or both fields.
    #[error("invalid reading (temperature valid: {temperature}, humidity valid: {humidity})")]
    InvalidReading { temperature: bool, humidity: bool },

    #[error("cycle interval of {interval:?} is shorter than the sensor minimum of {minimum:?}")]
    CycleTooShort { interval: Duration, minimum: Duration },

    /// Writing to the output channel failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
