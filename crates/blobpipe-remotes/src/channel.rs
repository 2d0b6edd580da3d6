//! Synchronous in-memory byte pipe.
//!
//! [`pipe`] returns a connected [`PipeReader`] / [`PipeWriter`] pair with no
//! internal buffer: a write hands its bytes to the reader directly and does
//! not return until readers have consumed all of them, or until either end is
//! closed.
//!
//! Reader and writer must run on different threads. A single thread that
//! writes before reading blocks forever.

use std::io;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::error::RemotesError;

/// Creates a synchronous in-memory pipe.
///
/// # Examples
///
/// ```
/// use std::io::{Read, Write};
///
/// let (mut reader, mut writer) = blobpipe_remotes::pipe();
/// let handle = std::thread::spawn(move || {
///     writer.write_all(b"hello").unwrap();
///     writer.close();
/// });
///
/// let mut out = String::new();
/// reader.read_to_string(&mut out).unwrap();
/// handle.join().unwrap();
/// assert_eq!(out, "hello");
/// ```
#[must_use]
pub fn pipe() -> (PipeReader, PipeWriter) {
    let shared = Arc::new(Shared::default());
    (
        PipeReader {
            shared: Arc::clone(&shared),
        },
        PipeWriter { shared },
    )
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    /// Signalled when bytes are offered or an end is closed.
    readable: Condvar,
    /// Signalled when offered bytes are fully consumed or an end is closed.
    drained: Condvar,
    /// Serializes writers so offered bytes never interleave.
    turn: Mutex<()>,
}

#[derive(Default)]
struct State {
    offered: Vec<u8>,
    consumed: usize,
    write_closed: Option<WriteClose>,
    read_closed: bool,
}

enum WriteClose {
    Eof,
    Aborted(String),
}

impl State {
    fn pending(&self) -> usize {
        self.offered.len() - self.consumed
    }

    fn check_writable(&self) -> Result<(), RemotesError> {
        if self.read_closed || self.write_closed.is_some() {
            return Err(RemotesError::ChannelClosed);
        }
        Ok(())
    }

    fn retract_offer(&mut self) -> usize {
        let written = self.consumed;
        self.offered.clear();
        self.consumed = 0;
        written
    }
}

/// A write that failed after part of the data may have been consumed.
#[derive(Debug)]
pub struct WriteError {
    /// Bytes the reader consumed before the failure.
    pub written: usize,
    /// Why the write stopped.
    pub source: RemotesError,
}

impl From<WriteError> for RemotesError {
    fn from(err: WriteError) -> Self {
        err.source
    }
}

/// The read end of a [`pipe`].
///
/// Clones share the same end; bytes are delivered to whichever clone reads
/// first.
#[derive(Clone)]
pub struct PipeReader {
    shared: Arc<Shared>,
}

impl PipeReader {
    /// Reads bytes into `buf`, blocking until a writer offers bytes or the
    /// write end is closed.
    ///
    /// Returns `Ok(0)` once the write end is closed and all offered bytes
    /// have been read.
    ///
    /// # Errors
    ///
    /// Returns [`RemotesError::ChannelClosed`] if this read end was closed and
    /// [`RemotesError::Aborted`] if the writer closed the pipe with an error.
    pub fn read_bytes(&self, buf: &mut [u8]) -> Result<usize, RemotesError> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut state = self.shared.state.lock();
        loop {
            if state.read_closed {
                return Err(RemotesError::ChannelClosed);
            }

            let pending = state.pending();
            if pending > 0 {
                let n = pending.min(buf.len());
                let start = state.consumed;
                buf[..n].copy_from_slice(&state.offered[start..start + n]);
                state.consumed += n;
                if state.pending() == 0 {
                    self.shared.drained.notify_all();
                }
                return Ok(n);
            }

            match &state.write_closed {
                Some(WriteClose::Eof) => return Ok(0),
                Some(WriteClose::Aborted(reason)) => {
                    return Err(RemotesError::Aborted {
                        reason: reason.clone(),
                    })
                }
                None => self.shared.readable.wait(&mut state),
            }
        }
    }

    /// Closes the read end. Pending and later writes fail with
    /// [`RemotesError::ChannelClosed`].
    pub fn close(&self) {
        let mut state = self.shared.state.lock();
        state.read_closed = true;
        self.shared.drained.notify_all();
        self.shared.readable.notify_all();
    }
}

impl io::Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_bytes(buf)?)
    }
}

impl std::fmt::Debug for PipeReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeReader").finish_non_exhaustive()
    }
}

/// The write end of a [`pipe`].
///
/// Clones share the same end; concurrent writes are serialized.
#[derive(Clone)]
pub struct PipeWriter {
    shared: Arc<Shared>,
}

impl PipeWriter {
    /// Offers `data` to the reader and blocks until all of it is consumed.
    ///
    /// An empty write returns `Ok(0)` without waiting for a reader.
    ///
    /// # Errors
    ///
    /// Returns a [`WriteError`] carrying the number of bytes consumed before
    /// either end was closed.
    pub fn send(&self, data: &[u8]) -> Result<usize, WriteError> {
        let _turn = self.shared.turn.lock();
        let mut state = self.shared.state.lock();
        state
            .check_writable()
            .map_err(|source| WriteError { written: 0, source })?;
        if data.is_empty() {
            return Ok(0);
        }

        state.offered.extend_from_slice(data);
        state.consumed = 0;
        self.shared.readable.notify_all();

        while state.pending() > 0 {
            if let Err(source) = state.check_writable() {
                let written = state.retract_offer();
                return Err(WriteError { written, source });
            }
            self.shared.drained.wait(&mut state);
        }

        Ok(state.retract_offer())
    }

    /// Closes the write end. Readers drain in-flight bytes and then see
    /// end-of-stream. Closing an already-closed end does nothing.
    pub fn close(&self) {
        self.close_with(WriteClose::Eof);
    }

    /// Closes the write end with an error. Readers drain in-flight bytes and
    /// then see [`RemotesError::Aborted`]. The first close wins.
    pub fn close_with_error(&self, reason: impl Into<String>) {
        self.close_with(WriteClose::Aborted(reason.into()));
    }

    /// Returns `true` once the write end has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().write_closed.is_some()
    }

    fn close_with(&self, how: WriteClose) {
        let mut state = self.shared.state.lock();
        if state.write_closed.is_none() {
            state.write_closed = Some(how);
        }
        self.shared.readable.notify_all();
        self.shared.drained.notify_all();
    }
}

impl io::Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.send(buf) {
            Ok(n) => Ok(n),
            Err(err) if err.written > 0 => Ok(err.written),
            Err(err) => Err(err.source.into()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for PipeWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeWriter")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
