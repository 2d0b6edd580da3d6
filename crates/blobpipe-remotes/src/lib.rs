//! # Blobpipe Remotes
//!
//! Drives a pull-oriented content source through a push-oriented sink.
//!
//! [`open`] resolves a reference and returns a [`PipeFetcher`] and a
//! [`PipePusher`] joined by an unbuffered in-memory pipe. Whatever is written
//! to the pusher is what the fetcher's stream yields, without holding the
//! object in memory. A program that only knows how to push content can
//! therefore feed a consumer that only knows how to fetch it.
//!
//! ## Threading
//!
//! The pipe is synchronous: a write returns only after a read consumed its
//! bytes. The reader and the writer must run on different threads, and the
//! only way to release a blocked reader is for the writer to commit, close or
//! abort. Dropping a caller's future or context does not unblock either side.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  resolve   ┌────────────────────────────────────────┐
//! │   Resolver   │◀───────────│              PipeResolver              │
//! └──────────────┘            │  fetcher() ──▶ pipe() ◀── pusher()     │
//!                             └──────┬────────────────────────┬────────┘
//!                                    ▼                        ▼
//!                             ┌─────────────┐   bytes  ┌─────────────┐
//!                             │ PipeFetcher │◀─────────│ PipePusher  │
//!                             │ (PipeReader)│          │ (PipeWriter)│
//!                             └─────────────┘          └─────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod bridge;
mod channel;
mod copy;
mod error;
mod fetch;
mod push;
mod resolver;

pub use bridge::{open, PipeResolver};
pub use channel::{pipe, PipeReader, PipeWriter, WriteError};
pub use copy::{copy, CopyConfig};
pub use error::{RemotesError, Result};
pub use fetch::{Fetcher, PipeFetcher};
pub use push::{ContentWriter, PipePusher, Pusher};
pub use resolver::{Resolved, Resolver, StaticResolver};
