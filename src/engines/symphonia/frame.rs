//! MPEG audio frame headers and stream synchronization.
//!
//! The framer finds complete frames in a byte queue so that each one can be handed to the codec
//! as a single packet. It skips ID3v2/ID3v1 tags and junk between frames.

use super::input::InputQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MpegVersion {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Layer {
    I,
    II,
    III,
}

const BITRATES_V1: [[u32; 15]; 3] = [
    [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448],
    [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384],
    [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320],
];

const BITRATES_V2: [[u32; 15]; 2] = [
    [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256],
    [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160],
];

pub(crate) const HEADER_LEN: usize = 4;
const ID3V2_HEADER_LEN: usize = 10;
const ID3V1_LEN: usize = 128;

/// A parsed 32-bit MPEG audio frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrameHeader {
    pub version: MpegVersion,
    pub layer: Layer,
    pub crc: bool,
    pub bitrate_kbps: u32,
    pub sample_rate: u32,
    pub padding: bool,
    pub channels: u16,
    pub frame_len: usize,
}

impl FrameHeader {
    /// Parse a header, rejecting reserved values and free-format streams.
    pub fn parse(bytes: [u8; 4]) -> Option<Self> {
        let word = u32::from_be_bytes(bytes);
        if word >> 21 != 0x7ff {
            return None;
        }

        let version = match (word >> 19) & 0b11 {
            0b00 => MpegVersion::Mpeg25,
            0b10 => MpegVersion::Mpeg2,
            0b11 => MpegVersion::Mpeg1,
            _ => return None,
        };
        let layer = match (word >> 17) & 0b11 {
            0b01 => Layer::III,
            0b10 => Layer::II,
            0b11 => Layer::I,
            _ => return None,
        };
        let crc = (word >> 16) & 1 == 0;

        let bitrate_index = ((word >> 12) & 0xf) as usize;
        if bitrate_index == 0 || bitrate_index == 0xf {
            return None;
        }
        let bitrate_kbps = match (version, layer) {
            (MpegVersion::Mpeg1, Layer::I) => BITRATES_V1[0][bitrate_index],
            (MpegVersion::Mpeg1, Layer::II) => BITRATES_V1[1][bitrate_index],
            (MpegVersion::Mpeg1, Layer::III) => BITRATES_V1[2][bitrate_index],
            (_, Layer::I) => BITRATES_V2[0][bitrate_index],
            (_, _) => BITRATES_V2[1][bitrate_index],
        };

        let rate_index = ((word >> 10) & 0b11) as usize;
        if rate_index == 3 {
            return None;
        }
        let sample_rate = match version {
            MpegVersion::Mpeg1 => [44_100, 48_000, 32_000][rate_index],
            MpegVersion::Mpeg2 => [22_050, 24_000, 16_000][rate_index],
            MpegVersion::Mpeg25 => [11_025, 12_000, 8_000][rate_index],
        };

        let padding = (word >> 9) & 1 == 1;
        let channels = if (word >> 6) & 0b11 == 0b11 { 1 } else { 2 };

        // Emphasis value 2 is reserved.
        if word & 0b11 == 0b10 {
            return None;
        }

        let bitrate = bitrate_kbps * 1000;
        let pad = u32::from(padding);
        let frame_len = match (version, layer) {
            (_, Layer::I) => (12 * bitrate / sample_rate + pad) * 4,
            (MpegVersion::Mpeg1, _) | (_, Layer::II) => 144 * bitrate / sample_rate + pad,
            (_, Layer::III) => 72 * bitrate / sample_rate + pad,
        } as usize;

        Some(Self {
            version,
            layer,
            crc,
            bitrate_kbps,
            sample_rate,
            padding,
            channels,
            frame_len,
        })
    }

    /// PCM frames (per channel) one MPEG frame decodes to.
    pub fn samples_per_frame(&self) -> usize {
        match (self.layer, self.version) {
            (Layer::I, _) => 384,
            (Layer::II, _) | (Layer::III, MpegVersion::Mpeg1) => 1152,
            (Layer::III, _) => 576,
        }
    }

    /// Whether two headers plausibly belong to the same elementary stream.
    pub fn same_stream(&self, other: &FrameHeader) -> bool {
        self.version == other.version
            && self.layer == other.layer
            && self.sample_rate == other.sample_rate
    }

    /// Byte offset of the layer III side-information end, where Xing/Info tags live.
    fn side_info_end(&self) -> usize {
        let side_info = match (self.version, self.channels) {
            (MpegVersion::Mpeg1, 1) => 17,
            (MpegVersion::Mpeg1, _) => 32,
            (_, 1) => 9,
            (_, _) => 17,
        };
        HEADER_LEN + if self.crc { 2 } else { 0 } + side_info
    }

    /// Whether a complete frame carries a Xing/Info VBR tag instead of audio.
    pub fn is_info_frame(&self, frame: &[u8]) -> bool {
        if self.layer != Layer::III {
            return false;
        }
        let start = self.side_info_end();
        frame
            .get(start..start + 4)
            .is_some_and(|tag| tag == b"Xing" || tag == b"Info")
    }
}

/// Result of one synchronization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sync {
    /// A complete frame sits at the head of the queue.
    Frame(FrameHeader),
    /// More input is required to find or complete a frame.
    NeedMore,
}

/// Locates frames in the input queue.
#[derive(Debug, Default)]
pub(crate) struct Framer {
    // Remaining bytes of an ID3v2 tag still to discard.
    tag_remaining: usize,
    // Set after discarding junk; the next candidate must be confirmed by the header after it.
    resyncing: bool,
    skipped_bytes: u64,
}

impl Framer {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn skipped_bytes(&self) -> u64 {
        self.skipped_bytes
    }

    /// Advance the queue to the next complete frame.
    ///
    /// `at_eof` tells the framer no further input will arrive, so partial tags are dropped
    /// instead of waited on.
    pub fn sync(&mut self, queue: &mut InputQueue, at_eof: bool) -> Sync {
        loop {
            if self.tag_remaining > 0 {
                let n = self.tag_remaining.min(queue.len());
                queue.consume(n);
                self.tag_remaining -= n;
                if self.tag_remaining > 0 {
                    return Sync::NeedMore;
                }
            }

            let head = queue.as_slice();
            if head.len() < HEADER_LEN {
                let leftover = head.len();
                if at_eof {
                    self.discard(queue, leftover);
                }
                return Sync::NeedMore;
            }

            if head.starts_with(b"ID3") {
                if head.len() < ID3V2_HEADER_LEN {
                    return Sync::NeedMore;
                }
                if let Some(len) = id3v2_len(&head[..ID3V2_HEADER_LEN]) {
                    self.tag_remaining = len;
                    continue;
                }
            }

            if head.starts_with(b"TAG") {
                if head.len() >= ID3V1_LEN {
                    queue.consume(ID3V1_LEN);
                    continue;
                }
                if !at_eof {
                    return Sync::NeedMore;
                }
            }

            let Some(header) = FrameHeader::parse([head[0], head[1], head[2], head[3]]) else {
                // Drop everything up to the next possible sync byte.
                let skip = head[1..]
                    .iter()
                    .position(|&b| b == 0xff)
                    .map_or(head.len(), |pos| pos + 1);
                self.discard(queue, skip);
                continue;
            };

            if head.len() < header.frame_len {
                if at_eof {
                    self.discard(queue, 1);
                    continue;
                }
                return Sync::NeedMore;
            }

            if self.resyncing {
                let next = &head[header.frame_len..];
                // A candidate that ends exactly at the end of input has nothing to confirm it.
                let last_frame = at_eof && next.is_empty();
                if next.len() < HEADER_LEN && !last_frame {
                    if at_eof {
                        self.discard(queue, 1);
                        continue;
                    }
                    return Sync::NeedMore;
                }
                let confirmed = last_frame
                    || next.starts_with(b"TAG")
                    || FrameHeader::parse([next[0], next[1], next[2], next[3]])
                        .is_some_and(|next| next.same_stream(&header));
                if !confirmed {
                    self.discard(queue, 1);
                    continue;
                }
                tracing::debug!(skipped = self.skipped_bytes, "regained frame sync");
                self.resyncing = false;
            }

            return Sync::Frame(header);
        }
    }

    fn discard(&mut self, queue: &mut InputQueue, n: usize) {
        if n == 0 {
            return;
        }
        queue.consume(n);
        self.skipped_bytes += n as u64;
        self.resyncing = true;
    }
}

/// Total size of an ID3v2 tag from its 10-byte header, including an optional footer.
fn id3v2_len(header: &[u8]) -> Option<usize> {
    let size_bytes = &header[6..10];
    if size_bytes.iter().any(|b| b & 0x80 != 0) {
        return None;
    }
    let size = size_bytes
        .iter()
        .fold(0usize, |acc, &b| (acc << 7) | b as usize);
    let footer = if header[5] & 0x10 != 0 { 10 } else { 0 };
    Some(ID3V2_HEADER_LEN + size + footer)
}
