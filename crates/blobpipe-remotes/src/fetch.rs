//! Fetch side of a pipe.

use std::io::Read;

use blobpipe_core::Descriptor;
use tracing::debug;

use crate::channel::PipeReader;
use crate::error::Result;

/// Trait for producing a readable stream for a descriptor.
pub trait Fetcher: Send + Sync {
    /// Stream type returned by [`Fetcher::fetch`].
    type Reader: Read + Send;

    /// Returns a stream of the content named by `desc`.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be opened.
    fn fetch(&self, desc: &Descriptor) -> Result<Self::Reader>;
}

/// The fetch side of a pipe, created by [`PipeResolver::fetcher`].
///
/// Every [`fetch`](Fetcher::fetch) returns the same pipe read end, whatever
/// descriptor is asked for: a pipe carries exactly one object.
///
/// [`PipeResolver::fetcher`]: crate::PipeResolver::fetcher
#[derive(Debug, Clone)]
pub struct PipeFetcher {
    name: String,
    descriptor: Descriptor,
    reader: PipeReader,
}

impl PipeFetcher {
    pub(crate) const fn new(name: String, descriptor: Descriptor, reader: PipeReader) -> Self {
        Self {
            name,
            descriptor,
            reader,
        }
    }

    /// Canonical name the reference resolved to.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Descriptor the reference resolved to.
    #[must_use]
    pub const fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Closes the read end. Writes blocked on the pipe fail.
    pub fn close(&self) {
        self.reader.close();
    }
}

impl Fetcher for PipeFetcher {
    type Reader = PipeReader;

    fn fetch(&self, desc: &Descriptor) -> Result<PipeReader> {
        if desc.digest != self.descriptor.digest {
            debug!(
                requested = %desc.digest,
                resolved = %self.descriptor.digest,
                "Fetching pipe for a descriptor other than the resolved one"
            );
        }
        Ok(self.reader.clone())
    }
}
