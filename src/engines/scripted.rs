//! Test doubles: an engine that replays scripted poll results and a source with scripted reads.

use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::{Arc, Mutex};

use crate::encoding::Encoding;
use crate::engine::{Engine, EngineError, Status};
use crate::format::{FormatTable, OutputFormat};

/// One scripted poll result.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Output(Vec<u8>, Status),
    Fail(String),
}

/// Calls observed by a [`ScriptedEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Feed(Vec<u8>),
    FeedEof,
    Read,
    Close,
    Dropped,
}

/// Shared view of the calls an engine received, usable after the engine moved into a decoder.
#[derive(Debug, Clone, Default)]
pub(crate) struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    fn push(&self, call: Call) {
        if let Ok(mut calls) = self.0.lock() {
            calls.push(call);
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    /// All fed bytes, concatenated.
    pub fn fed(&self) -> Vec<u8> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Feed(bytes) => Some(bytes),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn feed_sizes(&self) -> Vec<usize> {
        self.calls()
            .iter()
            .filter_map(|c| match c {
                Call::Feed(bytes) => Some(bytes.len()),
                _ => None,
            })
            .collect()
    }
}

/// Engine that returns a fixed sequence of poll results, then `(0, NeedMore)` forever.
pub(crate) struct ScriptedEngine {
    script: VecDeque<Step>,
    formats: FormatTable,
    reject_feeds: bool,
    last_error: String,
    log: CallLog,
}

impl ScriptedEngine {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script: script.into(),
            formats: FormatTable::all(),
            reject_feeds: false,
            last_error: String::new(),
            log: CallLog::default(),
        }
    }

    pub fn reject_feeds(mut self) -> Self {
        self.reject_feeds = true;
        self
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }
}

impl Engine for ScriptedEngine {
    fn format_none(&mut self) {
        self.formats.clear();
    }

    fn format_all(&mut self) {
        self.formats.allow_all();
    }

    fn format(&mut self, rate: u32, channels: u16, encodings: Encoding) -> Result<(), EngineError> {
        self.formats.set(rate, channels, encodings)
    }

    fn get_format(&self) -> Option<OutputFormat> {
        self.formats.pinned()
    }

    fn open_reader(&mut self, _reader: Box<dyn Read + Send>) -> Result<(), EngineError> {
        Ok(())
    }

    fn open_feed(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), EngineError> {
        self.log.push(Call::Close);
        Ok(())
    }

    fn feed(&mut self, bytes: &[u8]) -> Result<(), EngineError> {
        self.log.push(Call::Feed(bytes.to_vec()));
        if self.reject_feeds {
            return Err(EngineError::new("feed rejected"));
        }
        Ok(())
    }

    fn feed_eof(&mut self) -> Result<(), EngineError> {
        self.log.push(Call::FeedEof);
        Ok(())
    }

    fn read(&mut self, out: &mut [u8]) -> (usize, Status) {
        self.log.push(Call::Read);
        match self.script.pop_front() {
            None => (0, Status::NeedMore),
            Some(Step::Fail(message)) => {
                self.last_error = message;
                (0, Status::Error)
            }
            Some(Step::Output(bytes, status)) => {
                let n = bytes.len().min(out.len());
                out[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    self.script
                        .push_front(Step::Output(bytes[n..].to_vec(), status));
                    return (n, Status::Ok);
                }
                (n, status)
            }
        }
    }

    fn strerror(&self) -> String {
        self.last_error.clone()
    }
}

impl Drop for ScriptedEngine {
    fn drop(&mut self) {
        self.log.push(Call::Dropped);
    }
}

/// Upstream source with scripted reads.
pub(crate) struct ScriptedSource {
    interrupt_first: bool,
    chunks: VecDeque<Vec<u8>>,
    failure: Option<io::ErrorKind>,
    recover: bool,
}

impl ScriptedSource {
    /// Yield each chunk in turn, then EOF.
    pub fn chunks(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            interrupt_first: false,
            chunks: chunks.into(),
            failure: None,
            recover: false,
        }
    }

    /// Yield each chunk, then fail with `kind` on every later read.
    pub fn failing_after(chunks: Vec<Vec<u8>>, kind: io::ErrorKind) -> Self {
        Self {
            failure: Some(kind),
            ..Self::chunks(chunks)
        }
    }

    /// Fail with `ErrorKind::Interrupted` once before yielding the chunks.
    pub fn interrupted_then(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            interrupt_first: true,
            ..Self::chunks(chunks)
        }
    }

    /// Fail only once, then report EOF.
    pub fn then_recover(mut self) -> Self {
        self.recover = true;
        self
    }
}

impl Read for ScriptedSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.interrupt_first {
            self.interrupt_first = false;
            return Err(io::ErrorKind::Interrupted.into());
        }

        if let Some(mut chunk) = self.chunks.pop_front() {
            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            if n < chunk.len() {
                self.chunks.push_front(chunk.split_off(n));
            }
            return Ok(n);
        }

        match self.failure {
            Some(kind) => {
                if self.recover {
                    self.failure = None;
                }
                Err(io::Error::new(kind, "scripted upstream failure"))
            }
            None => Ok(0),
        }
    }
}
