//! Streaming copy from a fetcher into a pusher.

use std::io::{ErrorKind, Read, Write};

use blobpipe_core::{with_labels, CommitOpt, Descriptor, Digest, Digester};
use tracing::{debug, info, warn};

use crate::error::{RemotesError, Result};
use crate::fetch::Fetcher;
use crate::push::{ContentWriter, Pusher};

/// Configuration for [`copy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyConfig {
    /// Size of the chunks read from the source and written to the sink.
    pub buffer_size: usize,

    /// Verify the sha256 digest of the copied bytes against the descriptor.
    pub verify_digest: bool,

    /// Verify the copied byte count against the descriptor size.
    pub verify_size: bool,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            buffer_size: 32 * 1024,
            verify_digest: true,
            verify_size: true,
        }
    }
}

impl CopyConfig {
    /// Sets the chunk size. Values below one byte are raised to one.
    #[must_use]
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Enables or disables digest verification.
    #[must_use]
    pub const fn with_verify_digest(mut self, verify: bool) -> Self {
        self.verify_digest = verify;
        self
    }

    /// Enables or disables size verification.
    #[must_use]
    pub const fn with_verify_size(mut self, verify: bool) -> Self {
        self.verify_size = verify;
        self
    }
}

/// Copies the content named by `desc` from `fetcher` into `pusher`.
///
/// The content is streamed in [`CopyConfig::buffer_size`] chunks and
/// committed with the descriptor's annotations as labels. When the copy
/// fails, the writer is aborted rather than committed so a downstream reader
/// never mistakes a partial object for a complete one.
///
/// This performs blocking I/O. When `pusher` is a [`PipePusher`], the fetch
/// side of its pipe must be read from another thread.
///
/// # Errors
///
/// Returns an error if fetching, pushing, reading, writing or committing
/// fails, or if verification is enabled and the size or digest differ from
/// `desc`. Digests are only verified for the sha256 algorithm.
///
/// [`PipePusher`]: crate::PipePusher
pub fn copy<F, P>(
    fetcher: &F,
    desc: &Descriptor,
    pusher: &mut P,
    config: &CopyConfig,
) -> Result<Descriptor>
where
    F: Fetcher + ?Sized,
    P: Pusher + ?Sized,
{
    let mut reader = fetcher.fetch(desc)?;
    let writer = pusher.push(desc)?;

    let committed = stream(&mut reader, writer, desc, config).and_then(|copied| {
        let opts: Vec<CommitOpt> = desc
            .annotations
            .clone()
            .map(|annotations| vec![with_labels(annotations)])
            .unwrap_or_default();
        writer.commit(copied, desc.digest.clone(), &opts)?;
        Ok(copied)
    });

    let copied = match committed {
        Ok(copied) => copied,
        Err(err) => {
            warn!(digest = %desc.digest, error = %err, "Copy failed");
            if let Err(abort_err) = writer.abort(&err.to_string()) {
                warn!(digest = %desc.digest, error = %abort_err, "Abort failed");
            }
            return Err(err);
        }
    };

    info!(digest = %desc.digest, bytes = copied, "Copy completed");
    Ok(Descriptor {
        media_type: desc.media_type.clone(),
        digest: writer.digest(),
        size: copied,
        annotations: desc.annotations.clone(),
    })
}

fn stream<R, W>(reader: &mut R, writer: &mut W, desc: &Descriptor, config: &CopyConfig) -> Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buf = vec![0u8; config.buffer_size.max(1)];
    let mut digester = Digester::new();

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        writer.write_all(&buf[..n])?;
        digester.update(&buf[..n]);
    }

    let copied = digester.len();
    debug!(digest = %desc.digest, bytes = copied, "Source drained");

    if config.verify_size && copied != desc.size {
        return Err(RemotesError::SizeMismatch {
            expected: desc.size,
            actual: copied,
        });
    }

    if config.verify_digest && desc.digest.algorithm() == Digest::SHA256 {
        let actual = digester.finish();
        if actual != desc.digest {
            return Err(RemotesError::DigestMismatch {
                expected: desc.digest.to_string(),
                actual: actual.to_string(),
            });
        }
    }

    Ok(copied)
}
