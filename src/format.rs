//! Output format description and the table of formats a decoder may produce.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::encoding::Encoding;
use crate::engine::EngineError;

/// Sample rates defined by MPEG-1, MPEG-2 and MPEG-2.5 audio.
pub const STANDARD_RATES: [u32; 9] = [
    8_000, 11_025, 12_000, 16_000, 22_050, 24_000, 32_000, 44_100, 48_000,
];

/// A concrete PCM output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputFormat {
    pub rate: u32,
    pub channels: u16,
    pub encoding: Encoding,
}

impl OutputFormat {
    pub fn new(rate: u32, channels: u16, encoding: Encoding) -> Self {
        Self {
            rate,
            channels,
            encoding,
        }
    }

    /// Bytes per interleaved frame (one sample for every channel).
    pub fn frame_size(&self) -> Option<usize> {
        self.encoding
            .sample_size()
            .map(|size| size * self.channels as usize)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {} ch, {}",
            self.rate, self.channels, self.encoding
        )
    }
}

/// The set of output formats a decoder is allowed to produce.
///
/// Keyed by `(rate, channels)`; each entry holds a mask of allowed encodings.
/// Entries with an empty mask are never stored.
#[derive(Debug, Clone, Default)]
pub struct FormatTable {
    allowed: BTreeMap<(u32, u16), Encoding>,
}

impl FormatTable {
    /// A table allowing every standard rate, mono and stereo, in any encoding.
    pub fn all() -> Self {
        let mut table = Self::default();
        table.allow_all();
        table
    }

    pub fn clear(&mut self) {
        self.allowed.clear();
    }

    pub fn allow_all(&mut self) {
        for rate in STANDARD_RATES {
            for channels in [1, 2] {
                self.allowed.insert((rate, channels), Encoding::ANY);
            }
        }
    }

    /// Replace the allowed encodings for one `(rate, channels)` pair.
    pub fn set(&mut self, rate: u32, channels: u16, encodings: Encoding) -> Result<(), EngineError> {
        if rate == 0 {
            return Err(EngineError::new("output rate must be positive"));
        }
        if !matches!(channels, 1 | 2) {
            return Err(EngineError::new(format!(
                "unsupported output channel count {channels} (expected 1 or 2)"
            )));
        }

        let encodings = encodings & Encoding::ANY;
        if encodings.is_empty() {
            self.allowed.remove(&(rate, channels));
        } else {
            self.allowed.insert((rate, channels), encodings);
        }
        Ok(())
    }

    pub fn get(&self, rate: u32, channels: u16) -> Encoding {
        self.allowed
            .get(&(rate, channels))
            .copied()
            .unwrap_or(Encoding::NONE)
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    /// The single format the table pins, if it allows exactly one `(rate, channels)` pair.
    pub fn pinned(&self) -> Option<OutputFormat> {
        if self.allowed.len() != 1 {
            return None;
        }
        let (&(rate, channels), mask) = self.allowed.iter().next()?;
        let encoding = mask.preferred()?;
        Some(OutputFormat::new(rate, channels, encoding))
    }

    /// Choose the output format for a stream with the given rate and channel count.
    ///
    /// The native channel layout wins; otherwise the other layout at the same rate is used and
    /// the PCM stage maps channels. Rates are never converted.
    pub fn select(&self, rate: u32, stream_channels: u16) -> Option<OutputFormat> {
        let fallback = if stream_channels == 1 { 2 } else { 1 };
        [stream_channels, fallback].into_iter().find_map(|channels| {
            self.get(rate, channels)
                .preferred()
                .map(|encoding| OutputFormat::new(rate, channels, encoding))
        })
    }
}
