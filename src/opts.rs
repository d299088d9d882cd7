use serde::{Deserialize, Serialize};

use crate::decoder_reader::DEFAULT_CHUNK_SIZE;
use crate::encoding::Encoding;

/// Options that control how a [`crate::DecoderReader`] is built.
///
/// This is library-level configuration: applications can construct it programmatically or
/// deserialize it from their own config files. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOpts {
    /// Output sample rate in Hz. Streams at other rates fail to decode; nothing is resampled.
    pub rate: u32,

    /// Output channel count, 1 or 2.
    ///
    /// Stereo streams are averaged down when only mono output is allowed, and mono streams are
    /// duplicated when only stereo is allowed.
    pub channels: u16,

    /// Output encoding (a concrete encoding, or a mask the decoder picks from).
    pub encoding: Encoding,

    /// Tear the decoder down on the first upstream or decode error.
    pub paranoid: bool,

    /// Bytes requested from the upstream source per feed cycle.
    pub chunk_size: usize,
}

impl Default for ReaderOpts {
    fn default() -> Self {
        Self {
            rate: 44_100,
            channels: 2,
            encoding: Encoding::SIGNED_16,
            paranoid: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() -> anyhow::Result<()> {
        let opts: ReaderOpts = serde_json::from_str(r#"{ "channels": 1, "paranoid": true }"#)?;
        assert_eq!(opts.rate, 44_100);
        assert_eq!(opts.channels, 1);
        assert_eq!(opts.encoding, Encoding::SIGNED_16);
        assert!(opts.paranoid);
        assert_eq!(opts.chunk_size, 64 * 1024);
        Ok(())
    }

    #[test]
    fn encoding_is_serialized_as_its_flag_bits() -> anyhow::Result<()> {
        let opts = ReaderOpts {
            encoding: Encoding::FLOAT_32,
            ..ReaderOpts::default()
        };
        let json = serde_json::to_value(&opts)?;
        assert_eq!(json["encoding"], 0x200);

        let back: ReaderOpts = serde_json::from_value(json)?;
        assert_eq!(back, opts);
        Ok(())
    }
}
