use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;

use crate::encoding::Encoding;
use crate::format::OutputFormat;

/// Diagnostic reported by a decode engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct EngineError(String);

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        Self(format!("{err:#}"))
    }
}

/// Signal returned alongside the byte count of every [`Engine::read`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Output was produced and decoding can continue.
    Ok,
    /// The engine reached the logical end of its input. Bytes returned with this status are the
    /// tail of the stream and must still be consumed.
    Done,
    /// The engine needs more fed input before it can produce output.
    NeedMore,
    /// A new output format was negotiated; query it with [`Engine::get_format`].
    NewFormat,
    /// Hard failure; details are available from [`Engine::strerror`].
    Error,
}

/// A push-fed MPEG audio decode engine.
///
/// The engine is a black box behind this operation set: input is opened or fed, then output is
/// polled with [`Engine::read`]. Implementations own all decoding state; a handle is used from
/// one caller at a time (`&mut self`).
///
/// Construction and one-time global initialization are provided by concrete engines.
/// Resources are released on drop.
pub trait Engine: Send {
    /// Disallow every output format. Use before allowing specific formats.
    fn format_none(&mut self);

    /// Allow every standard output format.
    fn format_all(&mut self);

    /// Allow `encodings` for one `(rate, channels)` pair, replacing any previous setting.
    fn format(&mut self, rate: u32, channels: u16, encodings: Encoding) -> Result<(), EngineError>;

    /// The negotiated output format, or the single pinned one before any data was decoded.
    fn get_format(&self) -> Option<OutputFormat>;

    /// Open a file by path for decoding.
    fn open_path(&mut self, path: &Path) -> Result<(), EngineError> {
        let file = File::open(path)
            .map_err(|err| EngineError::new(format!("cannot open {}: {err}", path.display())))?;
        self.open_reader(Box::new(file))
    }

    /// Decode from a reader the engine pulls from on demand.
    fn open_reader(&mut self, reader: Box<dyn Read + Send>) -> Result<(), EngineError>;

    /// Prepare for input pushed through [`Engine::feed`].
    fn open_feed(&mut self) -> Result<(), EngineError>;

    /// Close the current input and reset stream state. The format table is kept.
    fn close(&mut self) -> Result<(), EngineError>;

    /// Append compressed bytes to the pending input.
    fn feed(&mut self, bytes: &[u8]) -> Result<(), EngineError>;

    /// Signal that no more bytes will be fed.
    ///
    /// Frames still queued are decoded, and once they run out `read` reports `Status::Done`
    /// instead of `Status::NeedMore`.
    fn feed_eof(&mut self) -> Result<(), EngineError>;

    /// Decode into `out`, returning how many bytes were written and the stream status.
    fn read(&mut self, out: &mut [u8]) -> (usize, Status);

    /// The most recent error message.
    fn strerror(&self) -> String;
}
