//! Pull-based streaming decode.
//!
//! `DecoderReader` bridges a push-fed engine (feed bytes, then poll for PCM) to `std::io::Read`.
//! Each `read` call runs feed/poll cycles until it can hand back decoded bytes or the stream is
//! over:
//! - read a chunk from the upstream source and feed it to the decoder
//! - poll the decoder into the caller's buffer
//! - return as soon as any PCM was produced
//!
//! Upstream EOF only means no more input will arrive. The stream ends when upstream is at EOF
//! *and* a poll produced nothing, at which point the decoder is torn down and `read` returns
//! `Ok(0)`.

use std::io::{self, Read};

use crate::decoder::Decoder;
use crate::engine::{Engine, Status};
use crate::engines::symphonia::SymphoniaEngine;
use crate::error::Error;
use crate::format::OutputFormat;

/// Default size of the upstream read chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

enum State<E: Engine> {
    Streaming(Decoder<E>),
    /// End-of-stream was reached and the decoder released.
    Finished,
    /// Torn down after a fatal error in paranoid mode.
    Aborted,
}

/// A `Read` adapter that decodes MP3 from `src` into PCM.
///
/// Built with [`Decoder::decoder_reader`]. The reader owns the decoder but not the upstream
/// source: it never closes `src`. Pass `&mut src` to keep using the source afterwards, or take
/// it back with [`DecoderReader::into_inner`].
pub struct DecoderReader<R, E: Engine = SymphoniaEngine> {
    state: State<E>,
    src: R,
    format: OutputFormat,
    paranoid: bool,
    scratch: Vec<u8>,
    upstream_eof: bool,
    // After a decode error, poll queued input before reading more from upstream.
    drain_first: bool,
}

impl<R: Read, E: Engine> DecoderReader<R, E> {
    pub(crate) fn new(decoder: Decoder<E>, src: R, format: OutputFormat) -> Self {
        Self {
            state: State::Streaming(decoder),
            src,
            format,
            paranoid: false,
            scratch: vec![0u8; DEFAULT_CHUNK_SIZE],
            upstream_eof: false,
            drain_first: false,
        }
    }

    /// Tear the decoder down on any upstream or decode error.
    ///
    /// Useful when the source is a duplex network stream that should not be left half-open.
    /// After such a teardown every further `read` fails.
    pub fn paranoid(mut self) -> Self {
        self.paranoid = true;
        self
    }

    /// Change how many bytes are requested from upstream per cycle.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.scratch = vec![0u8; chunk_size.max(1)];
        self
    }

    pub fn is_paranoid(&self) -> bool {
        self.paranoid
    }

    /// The output format requested at construction.
    pub fn requested_format(&self) -> OutputFormat {
        self.format
    }

    /// The decoder's current output format, while the decoder is alive.
    pub fn current_format(&self) -> Option<OutputFormat> {
        match &self.state {
            State::Streaming(decoder) => decoder.get_format(),
            State::Finished | State::Aborted => None,
        }
    }

    /// Whether end-of-stream was reached.
    pub fn is_finished(&self) -> bool {
        matches!(self.state, State::Finished)
    }

    /// Whether the decoder was torn down, either at end-of-stream or after an error.
    pub fn is_torn_down(&self) -> bool {
        !matches!(self.state, State::Streaming(_))
    }

    pub fn get_ref(&self) -> &R {
        &self.src
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.src
    }

    /// Release the decoder and return the upstream source.
    pub fn into_inner(mut self) -> R {
        self.nuke();
        self.src
    }

    /// Close and release the decoder now. Later reads behave as after end-of-stream.
    ///
    /// Calling this more than once is harmless.
    pub fn nuke(&mut self) {
        self.release(State::Finished);
    }

    fn release(&mut self, next: State<E>) {
        if let State::Streaming(decoder) = std::mem::replace(&mut self.state, next) {
            tracing::debug!("tearing down decoder");
            decoder.teardown();
        }
    }

    fn abort(&mut self) {
        if self.paranoid {
            self.release(State::Aborted);
        }
    }

    /// Feed one upstream chunk to the decoder, or note that upstream is exhausted.
    fn feed_upstream(&mut self) -> io::Result<()> {
        if self.upstream_eof {
            return Ok(());
        }

        let n = loop {
            match self.src.read(&mut self.scratch) {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    tracing::warn!(error = %err, paranoid = self.paranoid, "upstream read failed");
                    self.abort();
                    return Err(err);
                }
            }
        };

        let State::Streaming(decoder) = &mut self.state else {
            return Ok(());
        };

        if n == 0 {
            tracing::debug!("upstream reached end of input");
            self.upstream_eof = true;
            if let Err(err) = decoder.feed_eof() {
                tracing::warn!(error = %err, "failed to signal end of input");
            }
            return Ok(());
        }

        if let Err(err) = decoder.feed(&self.scratch[..n]) {
            tracing::warn!(error = %err, "failed to feed decoder");
        }
        Ok(())
    }

    /// Poll the decoder into `buf`, returning how many bytes it produced.
    fn poll(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let State::Streaming(decoder) = &mut self.state else {
                return Ok(0);
            };

            match decoder.read(buf) {
                Ok((n, Status::NewFormat)) => {
                    if let Some(format) = decoder.get_format() {
                        tracing::info!(
                            rate = format.rate,
                            channels = format.channels,
                            encoding = %format.encoding,
                            "new output format"
                        );
                    }
                    // The announcement never carries the end of the stream; poll again.
                    if n > 0 {
                        return Ok(n);
                    }
                }
                Ok((n, status)) => {
                    tracing::trace!(bytes = n, ?status, "polled decoder");
                    return Ok(n);
                }
                Err(err) => {
                    tracing::warn!(error = %err, paranoid = self.paranoid, "decoder failed");
                    self.drain_first = true;
                    self.abort();
                    return Err(err.into());
                }
            }
        }
    }
}

impl<R: Read, E: Engine> Read for DecoderReader<R, E> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.state {
            State::Streaming(_) => {}
            State::Finished => return Ok(0),
            State::Aborted => return Err(Error::Closed.into()),
        }
        if buf.is_empty() {
            return Ok(0);
        }

        if std::mem::take(&mut self.drain_first) {
            let n = self.poll(buf)?;
            if n > 0 {
                return Ok(n);
            }
        }

        loop {
            self.feed_upstream()?;

            let n = self.poll(buf)?;
            if n > 0 {
                return Ok(n);
            }

            if self.upstream_eof {
                self.release(State::Finished);
                return Ok(0);
            }
        }
    }
}
