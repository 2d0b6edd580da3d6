//! Content digests.
//!
//! A digest is the `algorithm:encoded` string that identifies a blob by the
//! hash of its bytes, e.g. `sha256:e3b0c442...`.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::error::{Error, Result};

/// A content digest in `algorithm:encoded` form.
///
/// The default value is the empty digest, which stands for "unknown" or
/// "not yet committed".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(String);

impl Digest {
    /// The SHA-256 algorithm identifier.
    pub const SHA256: &'static str = "sha256";

    /// Parses and validates a digest string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDigest`] if the string is not of the form
    /// `algorithm:encoded`, or if a `sha256` digest is not 64 lowercase hex
    /// characters.
    ///
    /// # Examples
    ///
    /// ```
    /// use blobpipe_core::Digest;
    ///
    /// let digest = Digest::parse(
    ///     "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
    /// )?;
    /// assert_eq!(digest.algorithm(), "sha256");
    /// # Ok::<(), blobpipe_core::Error>(())
    /// ```
    pub fn parse(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        let invalid = |reason: &str| Error::InvalidDigest {
            digest: s.clone(),
            reason: reason.to_string(),
        };

        let (algorithm, encoded) = s
            .split_once(':')
            .ok_or_else(|| invalid("missing ':' separator"))?;

        if algorithm.is_empty() {
            return Err(invalid("algorithm cannot be empty"));
        }
        if !algorithm
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "+._-".contains(c))
        {
            return Err(invalid("algorithm contains invalid characters"));
        }
        if encoded.is_empty() {
            return Err(invalid("encoded part cannot be empty"));
        }
        if algorithm == Self::SHA256
            && (encoded.len() != 64
                || !encoded
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)))
        {
            return Err(invalid("sha256 digest must be 64 lowercase hex characters"));
        }

        Ok(Self(s))
    }

    /// Computes the SHA-256 digest of `data`.
    #[must_use]
    pub fn sha256(data: &[u8]) -> Self {
        let mut digester = Digester::new();
        digester.update(data);
        digester.finish()
    }

    /// Returns the empty digest.
    #[must_use]
    pub const fn empty() -> Self {
        Self(String::new())
    }

    /// Returns `true` for the empty digest.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the digest string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the algorithm part (e.g., "sha256"), or `""` for the empty digest.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        self.0.split_once(':').map_or("", |(algorithm, _)| algorithm)
    }

    /// Returns the encoded part (without algorithm prefix).
    #[must_use]
    pub fn encoded(&self) -> &str {
        self.0.split_once(':').map_or(&self.0, |(_, encoded)| encoded)
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Digest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Digest {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() {
            return Ok(Self::empty());
        }
        Self::parse(s).map_err(serde::de::Error::custom)
    }
}

/// Incremental SHA-256 digest computation for streamed content.
#[derive(Clone, Default)]
pub struct Digester {
    hasher: Sha256,
    len: u64,
}

impl Digester {
    /// Creates a new digester.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds bytes into the digest.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.len += data.len() as u64;
    }

    /// Returns the number of bytes fed so far.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` if no bytes have been fed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Consumes the digester and returns the digest.
    #[must_use]
    pub fn finish(self) -> Digest {
        Digest(format!(
            "{}:{}",
            Digest::SHA256,
            hex::encode(self.hasher.finalize())
        ))
    }
}

impl std::fmt::Debug for Digester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Digester").field("len", &self.len).finish_non_exhaustive()
    }
}
