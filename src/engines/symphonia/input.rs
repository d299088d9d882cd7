use std::io::{self, Read};

/// Size of each pull from a reader-backed input.
pub(crate) const READ_CHUNK: usize = 16 * 1024;

/// Bytes waiting to be framed and decoded.
///
/// Consumed bytes are tracked with a cursor and compacted away periodically, so repeated small
/// feeds don't shift the whole buffer every time.
#[derive(Debug, Default)]
pub(crate) struct InputQueue {
    buf: Vec<u8>,
    pos: usize,
}

impl InputQueue {
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf[self.pos..]
    }

    pub fn len(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn consume(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.buf.len());

        if self.pos == self.buf.len() {
            self.buf.clear();
            self.pos = 0;
        } else if self.pos >= 65_536 && self.pos * 2 >= self.buf.len() {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.pos = 0;
    }

    /// Pull one chunk from `reader` into the queue, returning the number of bytes read.
    pub fn fill_from(&mut self, reader: &mut dyn Read) -> io::Result<usize> {
        let start = self.buf.len();
        self.buf.resize(start + READ_CHUNK, 0);
        let res = loop {
            match reader.read(&mut self.buf[start..]) {
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                res => break res,
            }
        };
        let n = *res.as_ref().unwrap_or(&0);
        self.buf.truncate(start + n);
        res
    }
}

/// Where the engine's compressed input comes from.
pub(crate) enum Input {
    Closed,
    /// Bytes pushed by the caller. `eof` is set once the caller signals the end of input.
    Feed { eof: bool },
    Reader {
        reader: Box<dyn Read + Send>,
        eof: bool,
    },
}

impl Input {
    pub fn is_open(&self) -> bool {
        !matches!(self, Input::Closed)
    }

    /// No more input will arrive beyond what is already queued.
    pub fn is_exhausted(&self) -> bool {
        matches!(
            self,
            Input::Feed { eof: true } | Input::Reader { eof: true, .. }
        )
    }
}

/// Decoded PCM bytes not yet handed to the caller.
#[derive(Debug, Default)]
pub(crate) struct PcmQueue {
    buf: Vec<u8>,
    pos: usize,
}

impl PcmQueue {
    pub fn buffer_mut(&mut self) -> &mut Vec<u8> {
        if self.pos == self.buf.len() {
            self.buf.clear();
            self.pos = 0;
        }
        &mut self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Copy as many pending bytes as fit into `dst`.
    pub fn drain_into(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.len());
        if n == 0 {
            return 0;
        }
        dst[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;

        if self.pos == self.buf.len() {
            self.buf.clear();
            self.pos = 0;
        }

        n
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.pos = 0;
    }
}
