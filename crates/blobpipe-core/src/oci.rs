//! OCI content descriptor types.
//!
//! A [`Descriptor`] names the blob moving through a pipe: what kind of content
//! it is, which digest identifies it and how many bytes it holds.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::digest::Digest;

/// OCI media type of a piece of content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MediaType(String);

impl MediaType {
    /// OCI image manifest media type.
    pub const OCI_MANIFEST: &'static str = "application/vnd.oci.image.manifest.v1+json";

    /// OCI image index media type.
    pub const OCI_INDEX: &'static str = "application/vnd.oci.image.index.v1+json";

    /// OCI image config media type.
    pub const OCI_CONFIG: &'static str = "application/vnd.oci.image.config.v1+json";

    /// Uncompressed OCI layer media type.
    pub const OCI_LAYER_TAR: &'static str = "application/vnd.oci.image.layer.v1.tar";

    /// Gzip-compressed OCI layer media type.
    pub const OCI_LAYER_TAR_GZIP: &'static str = "application/vnd.oci.image.layer.v1.tar+gzip";

    /// Opaque binary content.
    pub const OCTET_STREAM: &'static str = "application/octet-stream";

    /// Creates a new media type.
    #[must_use]
    pub fn new(media_type: impl Into<String>) -> Self {
        Self(media_type.into())
    }

    /// Returns the media type string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creates the gzip-compressed layer media type.
    #[must_use]
    pub fn layer_gzip() -> Self {
        Self::new(Self::OCI_LAYER_TAR_GZIP)
    }

    /// Creates the image manifest media type.
    #[must_use]
    pub fn manifest() -> Self {
        Self::new(Self::OCI_MANIFEST)
    }

    /// Creates the opaque binary media type.
    #[must_use]
    pub fn octet_stream() -> Self {
        Self::new(Self::OCTET_STREAM)
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MediaType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl Serialize for MediaType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MediaType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self(s))
    }
}

/// OCI content descriptor.
///
/// A descriptor describes the disposition of targeted content. It includes
/// the type of the content, a content identifier (digest), and the byte-size
/// of the raw content. The default descriptor is empty: no media type, the
/// empty digest and size zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Media type of the referenced content.
    #[serde(default)]
    pub media_type: MediaType,

    /// Digest of the targeted content.
    #[serde(default)]
    pub digest: Digest,

    /// Size in bytes of the content.
    #[serde(default)]
    pub size: u64,

    /// Optional annotations (key-value metadata).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<HashMap<String, String>>,
}

impl Descriptor {
    /// Creates a new descriptor.
    ///
    /// # Examples
    ///
    /// ```
    /// use blobpipe_core::{Descriptor, Digest, MediaType};
    ///
    /// let desc = Descriptor::new(MediaType::layer_gzip(), Digest::sha256(b"layer"), 5);
    /// assert_eq!(desc.size, 5);
    /// ```
    #[must_use]
    pub const fn new(media_type: MediaType, digest: Digest, size: u64) -> Self {
        Self {
            media_type,
            digest,
            size,
            annotations: None,
        }
    }

    /// Creates a descriptor for `data`, computing its SHA-256 digest and size.
    #[must_use]
    pub fn for_bytes(media_type: MediaType, data: &[u8]) -> Self {
        Self::new(media_type, Digest::sha256(data), data.len() as u64)
    }

    /// Adds an annotation to the descriptor.
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Returns the annotation value for `key`, if present.
    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations
            .as_ref()
            .and_then(|annotations| annotations.get(key))
            .map(String::as_str)
    }
}
