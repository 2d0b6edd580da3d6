//! Push side of a pipe.
//!
//! [`PipePusher`] accepts writes against a descriptor, forwards them into the
//! pipe and keeps the descriptor and [`Status`] bookkeeping a content writer
//! is expected to report.

use std::io;

use blobpipe_core::{apply_opts, CommitOpt, Descriptor, Digest, Info, Status};
use chrono::Utc;
use tracing::{debug, warn};

use crate::channel::{PipeWriter, WriteError};
use crate::error::{RemotesError, Result};

/// Trait for opening a content writer for a descriptor.
pub trait Pusher: Send {
    /// Writer type returned by [`Pusher::push`].
    type Writer: ContentWriter;

    /// Opens a writer for the content named by `desc`.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination refuses the content.
    fn push(&mut self, desc: &Descriptor) -> Result<&mut Self::Writer>;
}

/// A writer for a single piece of content.
///
/// Bytes go through [`io::Write`]; [`commit`](ContentWriter::commit) seals
/// the content with its size, digest and labels.
pub trait ContentWriter: io::Write + Send {
    /// Digest of the committed content; empty until committed.
    fn digest(&self) -> Digest;

    /// Commits the content. `size` and `expected` may be zero values when
    /// unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if an option fails or the content cannot be committed.
    fn commit(&mut self, size: u64, expected: Digest, opts: &[CommitOpt]) -> Result<()>;

    /// Returns the current state of the write.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be read.
    fn status(&self) -> Result<Status>;

    /// Changes the size of the content written so far.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer cannot truncate.
    fn truncate(&mut self, size: u64) -> Result<()>;

    /// Closes the writer without committing.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer cannot be closed.
    fn close(&mut self) -> Result<()>;

    /// Closes the writer and marks the content as failed.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer cannot be closed.
    fn abort(&mut self, reason: &str) -> Result<()> {
        let _ = reason;
        self.close()
    }
}

/// The push side of a pipe, created by [`PipeResolver::pusher`].
///
/// [`push`](Pusher::push) returns the pusher itself as the writer. Writes
/// block until the fetch side reads them.
///
/// [`PipeResolver::pusher`]: crate::PipeResolver::pusher
#[derive(Debug)]
pub struct PipePusher {
    descriptor: Descriptor,
    committed: Digest,
    status: Status,
    writer: PipeWriter,
}

impl PipePusher {
    pub(crate) fn new(reference: impl Into<String>, writer: PipeWriter) -> Self {
        Self {
            descriptor: Descriptor::default(),
            committed: Digest::empty(),
            status: Status::new(reference),
            writer,
        }
    }

    /// Descriptor recorded by the last push, updated on commit.
    #[must_use]
    pub const fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Forwards `data` to the pipe, blocking until the reader consumed it.
    ///
    /// Status advances by the bytes actually consumed, including on failure.
    ///
    /// # Errors
    ///
    /// Returns a [`WriteError`] with the partial byte count if either end of
    /// the pipe was closed.
    pub fn send(&mut self, data: &[u8]) -> std::result::Result<usize, WriteError> {
        let result = self.writer.send(data);
        let n = match &result {
            Ok(n) => *n,
            Err(err) => err.written,
        };
        self.status.total += n as u64;
        self.status.offset = self.status.total;
        self.status.updated_at = Some(Utc::now());
        result
    }
}

impl Pusher for PipePusher {
    type Writer = Self;

    fn push(&mut self, desc: &Descriptor) -> Result<&mut Self> {
        debug!(reference = %self.status.reference, digest = %desc.digest, "Push started");
        self.descriptor = desc.clone();
        self.status.started_at = Some(Utc::now());
        Ok(self)
    }
}

impl ContentWriter for PipePusher {
    fn digest(&self) -> Digest {
        self.committed.clone()
    }

    fn commit(&mut self, size: u64, expected: Digest, opts: &[CommitOpt]) -> Result<()> {
        let mut base = Info::default();
        if let Err(source) = apply_opts(&mut base, opts) {
            // The pipe stays open: the reader keeps waiting for a later
            // commit or close.
            warn!(reference = %self.status.reference, error = %source, "Commit option failed");
            return Err(RemotesError::CommitOption { source });
        }

        self.descriptor.size = size;
        self.descriptor.digest = expected.clone();
        self.descriptor.annotations = base.labels;
        self.committed = expected.clone();
        self.status.expected = expected;
        self.status.total = size;
        self.status.offset = size;
        self.status.updated_at = Some(Utc::now());
        self.writer.close();

        debug!(
            reference = %self.status.reference,
            digest = %self.descriptor.digest,
            size,
            "Push committed"
        );
        Ok(())
    }

    fn status(&self) -> Result<Status> {
        Ok(self.status.clone())
    }

    fn truncate(&mut self, size: u64) -> Result<()> {
        warn!(reference = %self.status.reference, size, "Truncate rejected");
        Err(RemotesError::NotSupported {
            operation: "truncate".to_string(),
        })
    }

    fn close(&mut self) -> Result<()> {
        debug!(reference = %self.status.reference, "Push closed");
        self.writer.close();
        Ok(())
    }

    fn abort(&mut self, reason: &str) -> Result<()> {
        debug!(reference = %self.status.reference, reason, "Push aborted");
        self.writer.close_with_error(reason);
        Ok(())
    }
}

impl io::Write for PipePusher {
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
