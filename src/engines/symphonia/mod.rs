//! Decode engine backed by Symphonia's MPEG audio codec (layers I, II and III).
//!
//! Symphonia decodes one frame per packet. This engine supplies everything around that:
//! - an input queue filled by `feed` or pulled from a reader
//! - frame synchronization (tags and junk are skipped)
//! - the output format table and per-stream format selection
//! - conversion of decoded audio into the negotiated PCM encoding

mod frame;
mod input;
mod pcm;

use std::io::Read;
use std::sync::OnceLock;

use anyhow::{Context, anyhow, bail};
use symphonia::core::audio::{AudioBufferRef, Channels, SampleBuffer, SignalSpec};
use symphonia::core::codecs::{
    CODEC_TYPE_MP1, CODEC_TYPE_MP2, CODEC_TYPE_MP3, CodecParameters, Decoder as CodecDecoder,
    DecoderOptions,
};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::Packet;

use crate::encoding::Encoding;
use crate::engine::{Engine, EngineError, Status};
use crate::format::{FormatTable, OutputFormat};

use self::frame::{FrameHeader, Framer, Layer, Sync};
use self::input::{Input, InputQueue, PcmQueue};

/// Decoder names accepted by [`SymphoniaEngine::new`].
pub const DECODERS: &[&str] = &["generic"];

static INIT: OnceLock<Result<(), EngineError>> = OnceLock::new();

/// One-time, process-wide engine initialization.
///
/// Verifies that the MPEG audio codecs are registered with Symphonia. Safe to call any number
/// of times; every call after the first returns the cached outcome.
pub fn init() -> Result<(), EngineError> {
    INIT.get_or_init(|| {
        let codecs = symphonia::default::get_codecs();
        for codec in [CODEC_TYPE_MP1, CODEC_TYPE_MP2, CODEC_TYPE_MP3] {
            if codecs.get_codec(codec).is_none() {
                return Err(EngineError::new(format!(
                    "MPEG audio codec {codec:?} is not available"
                )));
            }
        }
        tracing::debug!("MPEG audio engine initialized");
        Ok(())
    })
    .clone()
}

/// The production [`Engine`].
pub struct SymphoniaEngine {
    formats: FormatTable,
    input: Input,
    queue: InputQueue,
    framer: Framer,
    pcm: PcmQueue,
    codec: Option<Codec>,
    current: Option<OutputFormat>,
    frames_seen: u64,
    timestamp: u64,
    pending_error: Option<String>,
    last_error: String,
}

impl SymphoniaEngine {
    /// Create an engine instance.
    ///
    /// `decoder` selects one of [`DECODERS`]; `None` or an empty name picks the default.
    pub fn new(decoder: Option<&str>) -> Result<Self, EngineError> {
        init()?;

        if let Some(name) = decoder.filter(|name| !name.is_empty()) {
            if !DECODERS.contains(&name) {
                return Err(EngineError::new(format!(
                    "unknown decoder '{name}' (available: {})",
                    DECODERS.join(", ")
                )));
            }
        }

        Ok(Self {
            formats: FormatTable::all(),
            input: Input::Closed,
            queue: InputQueue::default(),
            framer: Framer::default(),
            pcm: PcmQueue::default(),
            codec: None,
            current: None,
            frames_seen: 0,
            timestamp: 0,
            pending_error: None,
            last_error: String::new(),
        })
    }

    pub fn decoders() -> &'static [&'static str] {
        DECODERS
    }

    /// Bytes discarded while searching for frame sync since the input was opened.
    pub fn skipped_bytes(&self) -> u64 {
        self.framer.skipped_bytes()
    }

    fn record(&mut self, err: EngineError) -> EngineError {
        self.last_error = err.message().to_owned();
        err
    }

    fn ensure_closed(&mut self) -> Result<(), EngineError> {
        if self.input.is_open() {
            return Err(self.record(EngineError::new("input already open; close it first")));
        }
        Ok(())
    }

    fn reset_stream(&mut self) {
        self.queue.clear();
        self.framer.reset();
        self.pcm.clear();
        self.codec = None;
        self.current = None;
        self.frames_seen = 0;
        self.timestamp = 0;
        self.pending_error = None;
    }

    /// Report a failure. Output already produced in this call is returned first and the error
    /// is delivered by the next `read`.
    fn fail(&mut self, written: usize, message: String) -> (usize, Status) {
        if written > 0 {
            self.pending_error = Some(message);
            return (written, Status::Ok);
        }
        tracing::debug!(error = %message, "decode failed");
        self.last_error = message;
        (0, Status::Error)
    }

    fn input_exhausted(&self) -> bool {
        self.input.is_exhausted()
    }

    /// Sync to the next complete frame, pulling from a reader input when needed.
    fn next_frame(&mut self) -> Result<Option<FrameHeader>, String> {
        loop {
            let at_eof = self.input_exhausted();
            if let Sync::Frame(header) = self.framer.sync(&mut self.queue, at_eof) {
                return Ok(Some(header));
            }

            match &mut self.input {
                Input::Reader { reader, eof } if !*eof => {
                    let n = self
                        .queue
                        .fill_from(reader.as_mut())
                        .map_err(|err| format!("failed to read input: {err}"))?;
                    if n == 0 {
                        *eof = true;
                    }
                }
                _ => return Ok(None),
            }
        }
    }

    /// Decode the frame at the head of the queue into the PCM queue.
    ///
    /// The frame is consumed whether or not decoding succeeds.
    fn decode_head_frame(
        &mut self,
        header: FrameHeader,
        format: OutputFormat,
    ) -> anyhow::Result<()> {
        let result = self.decode_frame(&header, &format);
        self.queue.consume(header.frame_len);
        self.frames_seen += 1;
        result
    }

    fn decode_frame(&mut self, header: &FrameHeader, format: &OutputFormat) -> anyhow::Result<()> {
        let frame = &self.queue.as_slice()[..header.frame_len];

        if self.frames_seen == 0 && header.is_info_frame(frame) {
            tracing::debug!("skipping Xing/Info frame");
            return Ok(());
        }

        // Symphonia's decoder is bound to one layer, rate and channel layout.
        let codec = match self.codec.take() {
            Some(codec) if codec.accepts(header) => self.codec.insert(codec),
            previous => {
                if previous.is_some() {
                    tracing::debug!(
                        rate = header.sample_rate,
                        channels = header.channels,
                        "stream parameters changed, rebuilding codec"
                    );
                }
                self.codec.insert(Codec::new(header)?)
            }
        };

        let duration = header.samples_per_frame() as u64;
        let packet = Packet::new_from_slice(0, self.timestamp, duration, frame);
        codec.decode(&packet, format, &mut self.pcm)?;
        self.timestamp += duration;
        Ok(())
    }
}

impl Engine for SymphoniaEngine {
    fn format_none(&mut self) {
        self.formats.clear();
    }

    fn format_all(&mut self) {
        self.formats.allow_all();
    }

    fn format(&mut self, rate: u32, channels: u16, encodings: Encoding) -> Result<(), EngineError> {
        self.formats
            .set(rate, channels, encodings)
            .map_err(|err| self.record(err))
    }

    fn get_format(&self) -> Option<OutputFormat> {
        self.current.or_else(|| self.formats.pinned())
    }

    fn open_reader(&mut self, reader: Box<dyn Read + Send>) -> Result<(), EngineError> {
        self.ensure_closed()?;
        self.reset_stream();
        self.input = Input::Reader { reader, eof: false };
        Ok(())
    }

    fn open_feed(&mut self) -> Result<(), EngineError> {
        self.ensure_closed()?;
        self.reset_stream();
        self.input = Input::Feed { eof: false };
        Ok(())
    }

    fn close(&mut self) -> Result<(), EngineError> {
        self.input = Input::Closed;
        self.reset_stream();
        Ok(())
    }

    fn feed(&mut self, bytes: &[u8]) -> Result<(), EngineError> {
        match self.input {
            Input::Feed { eof: false } => {
                self.queue.push(bytes);
                Ok(())
            }
            Input::Feed { eof: true } => {
                Err(self.record(EngineError::new("input already ended")))
            }
            _ => Err(self.record(EngineError::new("decoder is not opened for feeding"))),
        }
    }

    fn feed_eof(&mut self) -> Result<(), EngineError> {
        if let Input::Feed { eof } = &mut self.input {
            *eof = true;
            return Ok(());
        }
        Err(self.record(EngineError::new("decoder is not opened for feeding")))
    }

    fn read(&mut self, out: &mut [u8]) -> (usize, Status) {
        if let Some(message) = self.pending_error.take() {
            return self.fail(0, message);
        }
        if !self.input.is_open() {
            return self.fail(0, "no input opened".to_owned());
        }

        let mut written = 0;
        loop {
            written += self.pcm.drain_into(&mut out[written..]);
            if written == out.len() {
                return (written, Status::Ok);
            }

            let header = match self.next_frame() {
                Ok(Some(header)) => header,
                Ok(None) if self.input_exhausted() => return (written, Status::Done),
                Ok(None) => return (written, Status::NeedMore),
                Err(message) => return self.fail(written, message),
            };

            let Some(format) = self.formats.select(header.sample_rate, header.channels) else {
                self.queue.consume(header.frame_len);
                let message = format!(
                    "no allowed output format for {} Hz with {} channel(s)",
                    header.sample_rate, header.channels
                );
                return self.fail(written, message);
            };

            if self.current != Some(format) {
                if written > 0 {
                    return (written, Status::Ok);
                }
                self.current = Some(format);
                return (0, Status::NewFormat);
            }

            if let Err(err) = self.decode_head_frame(header, format) {
                return self.fail(written, format!("{err:#}"));
            }
        }
    }

    fn strerror(&self) -> String {
        self.last_error.clone()
    }
}

/// A Symphonia codec instance for one MPEG layer.
struct Codec {
    layer: Layer,
    rate: u32,
    channels: u16,
    decoder: Box<dyn CodecDecoder>,
    samples: Option<(SignalSpec, u64, SampleBuffer<f32>)>,
}

impl Codec {
    fn new(header: &FrameHeader) -> anyhow::Result<Self> {
        let codec = match header.layer {
            Layer::I => CODEC_TYPE_MP1,
            Layer::II => CODEC_TYPE_MP2,
            Layer::III => CODEC_TYPE_MP3,
        };
        let channels = if header.channels == 1 {
            Channels::FRONT_LEFT
        } else {
            Channels::FRONT_LEFT | Channels::FRONT_RIGHT
        };

        let mut params = CodecParameters::new();
        params
            .for_codec(codec)
            .with_sample_rate(header.sample_rate)
            .with_channels(channels);

        let decoder_opts: DecoderOptions = Default::default();
        let decoder = symphonia::default::get_codecs()
            .make(&params, &decoder_opts)
            .map_err(|e| anyhow!(e))
            .context("failed to create MPEG audio decoder")?;

        Ok(Self {
            layer: header.layer,
            rate: header.sample_rate,
            channels: header.channels,
            decoder,
            samples: None,
        })
    }

    fn accepts(&self, header: &FrameHeader) -> bool {
        self.layer == header.layer
            && self.rate == header.sample_rate
            && self.channels == header.channels
    }

    /// Decode one packet and append the converted PCM to `pcm`.
    ///
    /// Corrupt frames are skipped (`Ok(false)`); any other codec error is fatal.
    fn decode(
        &mut self,
        packet: &Packet,
        format: &OutputFormat,
        pcm: &mut PcmQueue,
    ) -> anyhow::Result<bool> {
        match self.decoder.decode(packet) {
            Ok(decoded) => {
                let channels = decoded.spec().channels.count();
                if channels == 0 {
                    bail!("decoded audio had zero channels");
                }

                let buf = ensure_sample_buffer(&mut self.samples, &decoded);
                buf.copy_interleaved_ref(decoded);
                pcm::encode_interleaved(buf.samples(), channels, format, pcm.buffer_mut());
                Ok(true)
            }

            Err(SymphoniaError::DecodeError(reason)) => {
                tracing::debug!(reason, "skipping undecodable frame");
                Ok(false)
            }

            Err(e) => Err(anyhow!(e)).context("codec failure"),
        }
    }
}

fn ensure_sample_buffer<'a>(
    slot: &'a mut Option<(SignalSpec, u64, SampleBuffer<f32>)>,
    decoded: &AudioBufferRef<'_>,
) -> &'a mut SampleBuffer<f32> {
    let spec = *decoded.spec();
    let duration = decoded.capacity() as u64;

    // Reallocate when the layout changes or a frame outgrows the buffer.
    let reusable = matches!(
        slot.as_ref(),
        Some((s, d, _)) if s.rate == spec.rate && s.channels == spec.channels && *d >= duration
    );
    if !reusable {
        *slot = None;
    }

    let (_, _, buf) =
        slot.get_or_insert_with(|| (spec, duration, SampleBuffer::<f32>::new(duration, spec)));
    buf
}
