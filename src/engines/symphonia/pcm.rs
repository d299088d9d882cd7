//! Conversion of decoded `f32` samples into the negotiated PCM byte layout.

use symphonia::core::conv::FromSample;
use symphonia::core::sample::{i24, u24};

use crate::encoding::Encoding;
use crate::format::OutputFormat;

/// Append interleaved `samples` (with `src_channels` channels) to `dst` in `format`.
///
/// Channel layouts are mapped when they differ: stereo is averaged down to mono, mono is
/// duplicated up to stereo. Sample values are written in native byte order.
pub(crate) fn encode_interleaved(
    samples: &[f32],
    src_channels: usize,
    format: &OutputFormat,
    dst: &mut Vec<u8>,
) {
    let out_channels = format.channels as usize;
    let Some(sample_size) = format.encoding.sample_size() else {
        return;
    };

    let frames = samples.len() / src_channels.max(1);
    dst.reserve(frames * out_channels * sample_size);

    if src_channels == out_channels {
        for &s in samples {
            write_sample(s, format.encoding, dst);
        }
    } else if out_channels == 1 {
        for frame in samples.chunks_exact(src_channels) {
            write_sample(downmix(frame), format.encoding, dst);
        }
    } else {
        for frame in samples.chunks_exact(src_channels) {
            let s = downmix(frame);
            for _ in 0..out_channels {
                write_sample(s, format.encoding, dst);
            }
        }
    }
}

/// Equal-weight average across the channels of one frame.
fn downmix(frame: &[f32]) -> f32 {
    if frame.len() == 1 {
        return frame[0];
    }
    frame.iter().sum::<f32>() / frame.len() as f32
}

fn write_sample(s: f32, encoding: Encoding, dst: &mut Vec<u8>) {
    match encoding {
        Encoding::SIGNED_16 => dst.extend_from_slice(&i16::from_sample(s).to_ne_bytes()),
        Encoding::UNSIGNED_16 => dst.extend_from_slice(&u16::from_sample(s).to_ne_bytes()),
        Encoding::SIGNED_32 => dst.extend_from_slice(&i32::from_sample(s).to_ne_bytes()),
        Encoding::UNSIGNED_32 => dst.extend_from_slice(&u32::from_sample(s).to_ne_bytes()),
        Encoding::SIGNED_24 => put_24(i24::from_sample(s).inner() as u32, dst),
        Encoding::UNSIGNED_24 => put_24(u24::from_sample(s).inner(), dst),
        Encoding::FLOAT_32 => dst.extend_from_slice(&s.to_ne_bytes()),
        Encoding::FLOAT_64 => dst.extend_from_slice(&f64::from(s).to_ne_bytes()),
        Encoding::SIGNED_8 => dst.push(i8::from_sample(s) as u8),
        Encoding::UNSIGNED_8 => dst.push(u8::from_sample(s)),
        Encoding::ULAW_8 => dst.push(linear_to_ulaw(i16::from_sample(s))),
        Encoding::ALAW_8 => dst.push(linear_to_alaw(i16::from_sample(s))),
        _ => {}
    }
}

/// Write the low three bytes of a 24-bit value in native order.
fn put_24(value: u32, dst: &mut Vec<u8>) {
    if cfg!(target_endian = "big") {
        dst.extend_from_slice(&value.to_be_bytes()[1..]);
    } else {
        dst.extend_from_slice(&value.to_le_bytes()[..3]);
    }
}

/// G.711 µ-law companding.
pub(crate) fn linear_to_ulaw(sample: i16) -> u8 {
    const BIAS: i32 = 0x84;
    const CLIP: i32 = 32_635;

    let mut pcm = i32::from(sample);
    let sign = if pcm < 0 {
        pcm = -pcm;
        0x80
    } else {
        0
    };
    pcm = pcm.min(CLIP) + BIAS;

    let mut exponent = 7;
    let mut mask = 0x4000;
    while exponent > 0 && pcm & mask == 0 {
        exponent -= 1;
        mask >>= 1;
    }
    let mantissa = (pcm >> (exponent + 3)) & 0x0f;

    !(sign | (exponent << 4) | mantissa) as u8
}

/// G.711 A-law companding.
pub(crate) fn linear_to_alaw(sample: i16) -> u8 {
    const SEGMENT_END: [i32; 8] = [0x1f, 0x3f, 0x7f, 0xff, 0x1ff, 0x3ff, 0x7ff, 0xfff];

    let mut pcm = i32::from(sample) >> 3;
    let mask = if pcm >= 0 {
        0xd5
    } else {
        pcm = -pcm - 1;
        0x55
    };

    let Some(segment) = SEGMENT_END.iter().position(|&end| pcm <= end) else {
        return (0x7f ^ mask) as u8;
    };

    let segment = segment as i32;
    let mut value = segment << 4;
    if segment < 2 {
        value |= (pcm >> 1) & 0x0f;
    } else {
        value |= (pcm >> segment) & 0x0f;
    }

    (value ^ mask) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s16(bytes: &[u8]) -> Vec<i16> {
        bytes
            .chunks_exact(2)
            .map(|b| i16::from_ne_bytes([b[0], b[1]]))
            .collect()
    }

    #[test]
    fn same_layout_is_copied_sample_for_sample() {
        let fmt = OutputFormat::new(44_100, 2, Encoding::SIGNED_16);
        let mut out = Vec::new();
        encode_interleaved(&[0.0, 0.5, -0.5, 0.0], 2, &fmt, &mut out);

        let samples = s16(&out);
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0], 0);
        assert!(samples[1] > 16_000);
        assert!(samples[2] < -16_000);
    }

    #[test]
    fn stereo_to_mono_averages_channels() {
        let fmt = OutputFormat::new(44_100, 1, Encoding::FLOAT_32);
        let mut out = Vec::new();
        // Two frames of stereo: (1.0, 0.0), (-0.5, -0.5) => mono: 0.5, -0.5
        encode_interleaved(&[1.0, 0.0, -0.5, -0.5], 2, &fmt, &mut out);

        let mono: Vec<f32> = out
            .chunks_exact(4)
            .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        assert_eq!(mono, vec![0.5, -0.5]);
    }

    #[test]
    fn mono_to_stereo_duplicates() {
        let fmt = OutputFormat::new(44_100, 2, Encoding::UNSIGNED_8);
        let mut out = Vec::new();
        encode_interleaved(&[0.0, 0.0], 1, &fmt, &mut out);
        assert_eq!(out, vec![128, 128, 128, 128]);
    }

    #[test]
    fn output_size_matches_encoding_width() {
        let samples = [0.25f32; 6];
        for encoding in Encoding::ANY.concrete() {
            let fmt = OutputFormat::new(48_000, 2, encoding);
            let mut out = Vec::new();
            encode_interleaved(&samples, 2, &fmt, &mut out);
            assert_eq!(Some(out.len()), fmt.frame_size().map(|size| size * 3));
        }
    }

    #[test]
    fn companding_maps_silence_to_idle_codes() {
        assert_eq!(linear_to_ulaw(0), 0xff);
        assert_eq!(linear_to_alaw(0), 0xd5);
        assert_eq!(linear_to_ulaw(i16::MAX), 0x80);
        assert_eq!(linear_to_ulaw(i16::MIN), 0x00);
        assert_eq!(linear_to_alaw(i16::MAX), 0xaa);
    }
}
