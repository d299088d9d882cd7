//! Synthetic MPEG-1 Layer III input shared by the integration tests.
#![allow(dead_code)]

/// 44.1 kHz, 128 kbit/s, stereo.
pub const STEREO_HEADER: [u8; 4] = [0xff, 0xfb, 0x90, 0x00];
/// 44.1 kHz, 128 kbit/s, mono.
pub const MONO_HEADER: [u8; 4] = [0xff, 0xfb, 0x90, 0xc0];
/// 48 kHz, 128 kbit/s, stereo.
pub const STEREO_48K_HEADER: [u8; 4] = [0xff, 0xfb, 0x94, 0x00];

/// Frame length of the 44.1 kHz headers above.
pub const FRAME_LEN: usize = 417;
/// PCM frames produced per Layer III frame.
pub const SAMPLES_PER_FRAME: usize = 1152;

/// Eight mono 44.1 kHz Layer III frames of low-level noise.
///
/// Each frame codes pseudo-random values in the count1 region and every frame after the first
/// borrows 100 bytes of main data from its predecessor, so decoding depends on frame order and
/// on the bit reservoir.
pub const NOISE_MONO: &[u8] = include_bytes!("../fixtures/noise_mono.mp3");
pub const NOISE_FRAMES: usize = 8;

/// Length in bytes of a frame with the given MPEG-1 Layer III header.
pub fn frame_len(header: [u8; 4]) -> usize {
    const KBPS: [usize; 15] = [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];
    const RATES: [usize; 3] = [44_100, 48_000, 32_000];

    let kbps = KBPS[(header[2] >> 4) as usize];
    let rate = RATES[((header[2] >> 2) & 0b11) as usize];
    let padding = ((header[2] >> 1) & 1) as usize;
    144 * kbps * 1000 / rate + padding
}

/// A frame with zeroed side info and main data. It decodes to silence.
pub fn silent_frame(header: [u8; 4]) -> Vec<u8> {
    let mut frame = vec![0u8; frame_len(header)];
    frame[..4].copy_from_slice(&header);
    frame
}

/// `count` consecutive silent frames.
pub fn silent_stream(header: [u8; 4], count: usize) -> Vec<u8> {
    (0..count).flat_map(|_| silent_frame(header)).collect()
}

/// An ID3v2.4 tag with `payload_len` bytes of zeroed payload.
pub fn id3v2_tag(payload_len: usize) -> Vec<u8> {
    let size = payload_len as u32;
    let mut tag = b"ID3\x04\x00\x00".to_vec();
    tag.extend([
        ((size >> 21) & 0x7f) as u8,
        ((size >> 14) & 0x7f) as u8,
        ((size >> 7) & 0x7f) as u8,
        (size & 0x7f) as u8,
    ]);
    tag.resize(tag.len() + payload_len, 0);
    tag
}

/// A 128-byte ID3v1 trailer.
pub fn id3v1_tag() -> Vec<u8> {
    let mut tag = b"TAG".to_vec();
    tag.resize(128, b' ');
    tag
}
