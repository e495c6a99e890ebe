// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: MIT

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::record::StatusRecord;

/// What a receiver knows about the remote sensor at one point in time.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub temperature: f64,
    pub humidity: f64,
    /// `HH:MM:SS` of the last record or connection change, `"Never"` before that.
    pub last_update: String,
    pub connected: bool,
}

#[derive(Debug, Default)]
struct Latest {
    record: Option<StatusRecord>,
    last_update: Option<DateTime<Local>>,
    connected: bool,
}

/// Latest status record, shared between the thread reading the serial port
/// and whoever wants to look at the data.
///
/// The last good values survive a disconnect.
#[derive(Clone, Debug, Default)]
pub struct SharedStatus(Arc<Mutex<Latest>>);

impl SharedStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `record` as the latest one and marks the link as connected.
    pub fn update(&self, record: StatusRecord) {
        let mut latest = self.lock();
        latest.record = Some(record);
        latest.last_update = Some(Local::now());
        latest.connected = true;
    }

    pub fn set_connected(&self, connected: bool) {
        let mut latest = self.lock();
        if latest.connected != connected {
            latest.connected = connected;
            latest.last_update = Some(Local::now());
        }
    }

    pub fn latest(&self) -> Option<StatusRecord> {
        self.lock().record
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let latest = self.lock();

        StatusSnapshot {
            temperature: latest.record.map_or(0.0, |r| r.temperature()),
            humidity: latest.record.map_or(0.0, |r| r.humidity()),
            last_update: latest.last_update.map_or_else(
                || "Never".to_string(),
                |when| when.format("%H:%M:%S").to_string(),
            ),
            connected: latest.connected,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Latest> {
        // The data stays consistent even if a holder panicked.
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
