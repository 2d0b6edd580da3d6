//! # Blobpipe Core
//!
//! Content model shared by the blobpipe crates.
//!
//! This crate provides the data structures that describe a blob in transit:
//!
//! - [`Descriptor`] - media type, digest, size and annotations of a blob
//! - [`Digest`] - `algorithm:encoded` content identifier, with [`Digester`]
//!   for streamed SHA-256 computation
//! - [`Status`] - progress of an in-flight write
//! - [`Info`] and [`CommitOpt`] - metadata record mutated when content is committed
//!
//! ## Example
//!
//! ```rust
//! use blobpipe_core::{Descriptor, MediaType, Status};
//!
//! let desc = Descriptor::for_bytes(MediaType::octet_stream(), b"hello")
//!     .with_annotation("org.opencontainers.image.title", "hello.txt");
//! assert_eq!(desc.size, 5);
//!
//! let status = Status::new("example.com/hello:latest");
//! assert!(status.expected.is_empty());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod content;
pub mod digest;
pub mod error;
pub mod oci;


// Re-export main types at crate root
pub use content::{apply_opts, with_label, with_labels, CommitOpt, Info, Status};
pub use digest::{Digest, Digester};
pub use error::{Error, Result};
pub use oci::{Descriptor, MediaType};
