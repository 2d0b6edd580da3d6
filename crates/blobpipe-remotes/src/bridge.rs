//! Resolver facade that wires a fetch side to a push side.
//!
//! A [`PipeResolver`] carries exactly one transfer: [`PipeResolver::fetcher`]
//! resolves the reference and allocates the pipe, [`PipeResolver::pusher`]
//! binds a writer to that same pipe. [`open`] does both in the only valid
//! order.

use blobpipe_core::Descriptor;
use tracing::{debug, instrument};

use crate::channel::{pipe, PipeReader, PipeWriter};
use crate::error::{RemotesError, Result};
use crate::fetch::PipeFetcher;
use crate::push::PipePusher;
use crate::resolver::{Resolved, Resolver};

/// Resolves `reference` through `resolver` and returns a connected fetch side
/// and push side.
///
/// Bytes written to the pusher are read from the fetcher's stream. Reader and
/// writer must be driven from different threads: a write returns only after
/// the reader consumed it.
///
/// # Errors
///
/// Returns the resolver's error if `reference` cannot be resolved.
///
/// # Examples
///
/// ```
/// use std::io::{Read, Write};
/// use blobpipe_core::{Descriptor, MediaType};
/// use blobpipe_remotes::{open, ContentWriter, Fetcher, Pusher, StaticResolver};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> blobpipe_remotes::Result<()> {
/// let desc = Descriptor::for_bytes(MediaType::octet_stream(), b"hello");
/// let resolver = StaticResolver::new().with_reference("img:v1", desc.clone());
///
/// let (fetcher, mut pusher) = open(resolver, "img:v1").await?;
///
/// let writer = std::thread::spawn(move || -> blobpipe_remotes::Result<()> {
///     let content = pusher.push(&desc)?;
///     content.write_all(b"hello")?;
///     content.commit(5, desc.digest.clone(), &[])
/// });
///
/// let mut out = Vec::new();
/// fetcher.fetch(fetcher.descriptor())?.read_to_end(&mut out)?;
/// writer.join().expect("writer thread panicked")?;
/// assert_eq!(out, b"hello");
/// # Ok(())
/// # }
/// ```
pub async fn open<R: Resolver>(resolver: R, reference: &str) -> Result<(PipeFetcher, PipePusher)> {
    let mut bridge = PipeResolver::new(resolver);
    let fetcher = bridge.fetcher(reference).await?;
    let pusher = bridge.pusher(reference)?;
    Ok((fetcher, pusher))
}

/// A resolver facade carrying one in-flight transfer.
#[derive(Debug)]
pub struct PipeResolver<R> {
    resolver: R,
    descriptor: Option<Descriptor>,
    channel: Option<(PipeReader, PipeWriter)>,
}

impl<R: Resolver> PipeResolver<R> {
    /// Creates a facade over `resolver` with no pipe allocated yet.
    pub const fn new(resolver: R) -> Self {
        Self {
            resolver,
            descriptor: None,
            channel: None,
        }
    }

    /// Resolves `reference` through the wrapped resolver. No caching, no retry.
    ///
    /// # Errors
    ///
    /// Returns the resolver's error unchanged.
    pub async fn resolve(&self, reference: &str) -> Result<Resolved> {
        self.resolver.resolve(reference).await
    }

    /// Allocates a new pipe, resolves `reference` and returns the fetch side
    /// bound to the pipe's read end.
    ///
    /// On failure the new pipe is discarded and the facade is left as it was.
    ///
    /// # Errors
    ///
    /// Returns the resolver's error unchanged.
    #[instrument(skip(self))]
    pub async fn fetcher(&mut self, reference: &str) -> Result<PipeFetcher> {
        let (reader, writer) = pipe();
        let resolved = self.resolve(reference).await?;
        debug!(name = %resolved.name, digest = %resolved.descriptor.digest, "Reference resolved");

        self.descriptor = Some(resolved.descriptor.clone());
        self.channel = Some((reader.clone(), writer));
        Ok(PipeFetcher::new(resolved.name, resolved.descriptor, reader))
    }

    /// Returns a push side bound to the write end of the pipe allocated by
    /// the last successful [`fetcher`](Self::fetcher) call.
    ///
    /// # Errors
    ///
    /// Returns [`RemotesError::Precondition`] if no pipe has been allocated.
    pub fn pusher(&self, reference: &str) -> Result<PipePusher> {
        let (_, writer) = self
            .channel
            .as_ref()
            .ok_or_else(|| RemotesError::Precondition {
                reason: "pusher requested before fetcher allocated a pipe".to_string(),
            })?;
        debug!(reference, "Pusher bound to pipe");
        Ok(PipePusher::new(reference, writer.clone()))
    }

    /// Descriptor resolved by the last successful [`fetcher`](Self::fetcher) call.
    #[must_use]
    pub const fn descriptor(&self) -> Option<&Descriptor> {
        self.descriptor.as_ref()
    }
}
