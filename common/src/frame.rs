// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: MIT

use serde::Deserialize;

use crate::record::StatusRecord;

/// Why a frame could not be turned into a status record.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame exceeded {} bytes", FrameDecoder::MAX_FRAME_LEN)]
    Overflow,

    #[error("frame is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("frame is not a status record: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct RecordFrame {
    temperature: f64,
    humidity: f64,
}

/// Pulls `{...}` status frames out of a serial byte stream.
///
/// Bytes outside of a frame, such as diagnostic lines, are skipped. An
/// opening brace always starts a new frame, dropping any partial one.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    in_frame: bool,
}

impl FrameDecoder {
    pub const MAX_FRAME_LEN: usize = 128;

    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one byte. Returns a result whenever a frame closes.
    pub fn push(&mut self, byte: u8) -> Option<Result<StatusRecord, FrameError>> {
        match byte {
            b'{' => {
                self.buffer.clear();
                self.buffer.push(byte);
                self.in_frame = true;
                None
            }
            _ if !self.in_frame => None,
            _ if self.buffer.len() >= Self::MAX_FRAME_LEN => {
                self.reset();
                Some(Err(FrameError::Overflow))
            }
            b'}' => {
                self.buffer.push(byte);
                let result = Self::parse(&self.buffer);
                self.reset();
                Some(result)
            }
            _ => {
                self.buffer.push(byte);
                None
            }
        }
    }

    /// Feeds a chunk, returning the outcome of every frame it completed.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Result<StatusRecord, FrameError>> {
        bytes.iter().filter_map(|&byte| self.push(byte)).collect()
    }

    /// Drops any partial frame, as after reconnecting to the stream.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.in_frame = false;
    }

    fn parse(frame: &[u8]) -> Result<StatusRecord, FrameError> {
        let text = std::str::from_utf8(frame)?;
        let frame: RecordFrame = serde_json::from_str(text)?;
        Ok(StatusRecord::new(frame.temperature, frame.humidity))
    }
}
