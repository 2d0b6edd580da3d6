//! Content records shared between writers and their callers.
//!
//! [`Status`] tracks an in-flight write; [`Info`] is the metadata record that
//! commit options mutate before a write is committed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::error::{Error, Result};

/// Metadata about a piece of committed content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Info {
    /// Digest of the content.
    pub digest: Digest,

    /// Size of the content in bytes.
    pub size: u64,

    /// Labels attached to the content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,

    /// When the content was created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// When the content was last updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Progress of a single content write.
///
/// Status snapshots are diagnostic. They are not meant for flow control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    /// Reference the write was opened for.
    #[serde(rename = "ref")]
    pub reference: String,

    /// Bytes confirmed so far.
    pub offset: u64,

    /// Total bytes seen so far, or the committed size once committed.
    pub total: u64,

    /// Expected digest, known once the write is committed.
    pub expected: Digest,

    /// When the writer accepted its descriptor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// When the status was last changed by a write or commit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Status {
    /// Creates an empty status for `reference`.
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            ..Self::default()
        }
    }
}

/// An option applied to an [`Info`] record when committing content.
///
/// Options run in order; the first error aborts the commit.
pub type CommitOpt = Box<dyn Fn(&mut Info) -> Result<()> + Send + Sync>;

/// Merges `labels` into the record's labels.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use blobpipe_core::{with_labels, Info};
///
/// let opt = with_labels(HashMap::from([("tier".to_string(), "gold".to_string())]));
/// let mut info = Info::default();
/// opt(&mut info)?;
/// assert_eq!(info.labels.unwrap()["tier"], "gold");
/// # Ok::<(), blobpipe_core::Error>(())
/// ```
#[must_use]
pub fn with_labels(labels: HashMap<String, String>) -> CommitOpt {
    Box::new(move |info: &mut Info| {
        info.labels
            .get_or_insert_with(HashMap::new)
            .extend(labels.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    })
}

/// Sets a single label on the record. Fails if `key` is empty.
#[must_use]
pub fn with_label(key: impl Into<String>, value: impl Into<String>) -> CommitOpt {
    let key = key.into();
    let value = value.into();
    Box::new(move |info: &mut Info| {
        if key.is_empty() {
            return Err(Error::InvalidLabel {
                key: key.clone(),
                reason: "label key cannot be empty".to_string(),
            });
        }
        info.labels
            .get_or_insert_with(HashMap::new)
            .insert(key.clone(), value.clone());
        Ok(())
    })
}

/// Applies `opts` to `info` in order, stopping at the first error.
///
/// # Errors
///
/// Returns the first error produced by an option; later options do not run.
pub fn apply_opts(info: &mut Info, opts: &[CommitOpt]) -> Result<()> {
    for opt in opts {
        opt(info)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_status_new() {
        let status = Status::new("img:v1");
        assert_eq!(status.reference, "img:v1");
        assert_eq!(status.offset, 0);
        assert_eq!(status.total, 0);
        assert!(status.expected.is_empty());
        assert!(status.updated_at.is_none());
    }

    #[test]
    fn test_status_serializes_ref_key() {
        let json = serde_json::to_string(&Status::new("img:v1")).unwrap();
        assert!(json.contains("\"ref\":\"img:v1\""));
        assert!(!json.contains("updatedAt"));
    }

    #[test]
    fn test_with_labels_merges() {
        let mut info = Info::default();
        let opts = vec![
            with_labels(HashMap::from([("a".to_string(), "1".to_string())])),
            with_label("b", "2"),
            with_label("a", "3"),
        ];
        apply_opts(&mut info, &opts).unwrap();

        let labels = info.labels.unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels["a"], "3");
        assert_eq!(labels["b"], "2");
    }

    #[test]
    fn test_no_opts_leaves_labels_unset() {
        let mut info = Info::default();
        apply_opts(&mut info, &[]).unwrap();
        assert!(info.labels.is_none());
    }

    #[test]
    fn test_first_error_stops_remaining_opts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let opts: Vec<CommitOpt> = vec![
            with_label("", "rejected"),
            Box::new(move |_info: &mut Info| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        ];

        let mut info = Info::default();
        let err = apply_opts(&mut info, &opts).unwrap_err();
        assert!(matches!(err, Error::InvalidLabel { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(info.labels.is_none());
    }
}
