//! The decoder handle: one engine instance plus its lifecycle.
//!
//! A `Decoder` can be used directly (open a file or feed bytes, then `read`) or converted into a
//! [`DecoderReader`] for pull-based streaming.

use std::io::Read;
use std::path::Path;

use crate::decoder_reader::DecoderReader;
use crate::encoding::Encoding;
use crate::engine::{Engine, Status};
use crate::engines::symphonia::SymphoniaEngine;
use crate::error::{Error, Result};
use crate::format::OutputFormat;
use crate::opts::ReaderOpts;

/// A handle owning exactly one decode engine instance.
///
/// Every data operation takes `&mut self`, so a handle is only ever driven by one caller at a
/// time. Dropping the handle releases the engine.
pub struct Decoder<E: Engine = SymphoniaEngine> {
    engine: E,
}

impl Decoder<SymphoniaEngine> {
    /// Create a decoder using the built-in engine.
    ///
    /// `decoder` optionally names an engine variant (see [`SymphoniaEngine::decoders`]).
    pub fn new(decoder: Option<&str>) -> Result<Self> {
        let engine = SymphoniaEngine::new(decoder).map_err(Error::Init)?;
        Ok(Self::with_engine(engine))
    }
}

impl<E: Engine> Decoder<E> {
    /// Wrap an already constructed engine.
    pub fn with_engine(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Release the engine. Equivalent to dropping the handle.
    pub fn delete(self) {
        drop(self);
    }

    /// Close the input (ignoring failures) and release the engine.
    pub fn teardown(mut self) {
        if let Err(err) = self.close() {
            tracing::debug!(error = %err, "ignoring close failure during teardown");
        }
    }

    /// Disable all output formats. Use before allowing the formats you support.
    pub fn format_none(&mut self) {
        self.engine.format_none();
    }

    /// Enable all standard output formats. This is the default.
    pub fn format_all(&mut self) {
        self.engine.format_all();
    }

    /// Allow `encodings` for the given rate and channel count (1 or 2).
    pub fn format(&mut self, rate: u32, channels: u16, encodings: Encoding) -> Result<()> {
        Ok(self.engine.format(rate, channels, encodings)?)
    }

    /// Current output format.
    ///
    /// Before any audio has been decoded this reports the single allowed format, if the format
    /// table pins exactly one.
    pub fn get_format(&self) -> Option<OutputFormat> {
        self.engine.get_format()
    }

    /// Open an MP3 file for decoding.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<()> {
        Ok(self.engine.open_path(path.as_ref())?)
    }

    /// Decode from an open file descriptor.
    ///
    /// The descriptor is duplicated; the caller keeps ownership of the original.
    #[cfg(unix)]
    pub fn open_fd(&mut self, fd: impl std::os::fd::AsFd) -> Result<()> {
        let owned = fd.as_fd().try_clone_to_owned()?;
        let file = std::fs::File::from(owned);
        Ok(self.engine.open_reader(Box::new(file))?)
    }

    /// Decode from any reader; the engine pulls from it on demand.
    pub fn open_reader(&mut self, reader: impl Read + Send + 'static) -> Result<()> {
        Ok(self.engine.open_reader(Box::new(reader))?)
    }

    /// Prepare for direct feeding via [`Decoder::feed`].
    pub fn open_feed(&mut self) -> Result<()> {
        Ok(self.engine.open_feed()?)
    }

    /// Close the current input.
    pub fn close(&mut self) -> Result<()> {
        Ok(self.engine.close()?)
    }

    /// Push compressed bytes into the decoder.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<()> {
        Ok(self.engine.feed(bytes)?)
    }

    /// Tell the decoder that the fed input is complete.
    pub fn feed_eof(&mut self) -> Result<()> {
        Ok(self.engine.feed_eof()?)
    }

    /// Decode into `buf`, returning the bytes written and the stream status.
    ///
    /// `Status::Done` may come with a non-zero count: those bytes are the tail of the stream.
    /// An engine failure is returned as [`Error::Decode`].
    pub fn read(&mut self, buf: &mut [u8]) -> Result<(usize, Status)> {
        match self.engine.read(buf) {
            (_, Status::Error) => Err(Error::Decode(self.engine.strerror())),
            (n, status) => Ok((n, status)),
        }
    }

    /// Turn this handle into a streaming reader over `src`.
    ///
    /// All formats are disabled except `(rate, channels, encoding)`. The handle must already be
    /// opened with [`Decoder::open_feed`].
    pub fn decoder_reader<R: Read>(
        mut self,
        src: R,
        rate: u32,
        channels: u16,
        encoding: Encoding,
    ) -> Result<DecoderReader<R, E>> {
        self.format_none();
        self.format(rate, channels, encoding)?;
        Ok(DecoderReader::new(
            self,
            src,
            OutputFormat::new(rate, channels, encoding),
        ))
    }

    /// [`Decoder::decoder_reader`] for streams known to be mono.
    pub fn mono_decoder_reader<R: Read>(
        self,
        src: R,
        rate: u32,
        encoding: Encoding,
    ) -> Result<DecoderReader<R, E>> {
        self.decoder_reader(src, rate, 1, encoding)
    }

    /// [`Decoder::decoder_reader`] configured from [`ReaderOpts`].
    pub fn reader_with_opts<R: Read>(self, src: R, opts: &ReaderOpts) -> Result<DecoderReader<R, E>> {
        if opts.chunk_size == 0 {
            return Err(Error::msg("reader chunk size must be positive"));
        }

        let reader = self
            .decoder_reader(src, opts.rate, opts.channels, opts.encoding)?
            .with_chunk_size(opts.chunk_size);

        Ok(if opts.paranoid {
            reader.paranoid()
        } else {
            reader
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::scripted::{Call, ScriptedEngine, Step};

    #[test]
    fn delete_releases_without_closing() {
        let engine = ScriptedEngine::new(vec![]);
        let log = engine.log();
        Decoder::with_engine(engine).delete();
        assert_eq!(log.calls(), vec![Call::Dropped]);
    }

    #[test]
    fn teardown_closes_then_releases() {
        let engine = ScriptedEngine::new(vec![]);
        let log = engine.log();
        Decoder::with_engine(engine).teardown();
        assert_eq!(log.calls(), vec![Call::Close, Call::Dropped]);
    }

    #[test]
    fn engine_errors_during_read_become_decode_errors() {
        let engine = ScriptedEngine::new(vec![Step::Fail("lost sync".into())]);
        let mut decoder = Decoder::with_engine(engine);
        let mut buf = [0u8; 4];
        match decoder.read(&mut buf) {
            Err(Error::Decode(message)) => assert_eq!(message, "lost sync"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn engine_accessor_exposes_the_wrapped_engine() {
        let decoder = Decoder::with_engine(ScriptedEngine::new(vec![]));
        assert!(decoder.engine().strerror().is_empty());
    }
}

